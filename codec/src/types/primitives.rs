//! Codec implementations for Rust primitive types.
//!
//! Records live in word-addressed memory regions, so every value is written
//! little-endian and `bool` occupies a full 32-bit word (`0` or `1`). This
//! keeps a struct of primitives laid out exactly like its in-memory image.

use crate::{util::at_least, Error, FixedSize, Read, ReadExt, Write};
use bytes::{Buf, BufMut};

macro_rules! impl_numeric {
    ($type:ty, $read_method:ident, $write_method:ident) => {
        impl Write for $type {
            #[inline]
            fn write(&self, buf: &mut impl BufMut) {
                buf.$write_method(*self);
            }
        }

        impl Read for $type {
            type Cfg = ();
            #[inline]
            fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
                at_least(buf, std::mem::size_of::<$type>())?;
                Ok(buf.$read_method())
            }
        }

        impl FixedSize for $type {
            const SIZE: usize = std::mem::size_of::<$type>();
        }
    };
}

impl_numeric!(u8, get_u8, put_u8);
impl_numeric!(u16, get_u16_le, put_u16_le);
impl_numeric!(u32, get_u32_le, put_u32_le);
impl_numeric!(u64, get_u64_le, put_u64_le);
impl_numeric!(i32, get_i32_le, put_i32_le);
impl_numeric!(i64, get_i64_le, put_i64_le);

impl Write for bool {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(u32::from(*self));
    }
}

impl Read for bool {
    type Cfg = ();
    #[inline]
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        match u32::read(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::InvalidBool(other)),
        }
    }
}

impl FixedSize for bool {
    const SIZE: usize = u32::SIZE;
}

// Word arrays (seeds, bitmaps)
impl<const N: usize> Write for [u32; N] {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        for word in self {
            buf.put_u32_le(*word);
        }
    }
}

impl<const N: usize> Read for [u32; N] {
    type Cfg = ();
    #[inline]
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        at_least(buf, N * u32::SIZE)?;
        let mut dst = [0u32; N];
        for word in dst.iter_mut() {
            *word = buf.get_u32_le();
        }
        Ok(dst)
    }
}

impl<const N: usize> FixedSize for [u32; N] {
    const SIZE: usize = N * u32::SIZE;
}
