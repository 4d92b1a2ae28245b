//! Helpers shared by codec implementations.

use crate::Error;
use bytes::Buf;

/// Returns an error if the buffer holds fewer than `len` bytes.
#[inline]
pub fn at_least<B: Buf>(buf: &mut B, len: usize) -> Result<(), Error> {
    if buf.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    Ok(())
}
