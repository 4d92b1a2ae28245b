//! Serialize word-aligned records.
//!
//! # Overview
//!
//! A small binary serialization library for the fixed-layout records a node
//! exchanges with its bulk store and control plane:
//! - Persisted parameter blocks (read at start, written back at pause)
//! - Recording records flushed each tick
//! - Inbound control messages
//!
//! Every primitive is little-endian and `bool` occupies a full word, so the
//! encoding of a struct of primitives matches its in-memory image.
//!
//! # Example
//!
//! ```
//! use bytes::{Buf, BufMut};
//! use neurocore_codec::{DecodeExt, Encode, Error, FixedSize, Read, ReadExt, Write};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Window {
//!     start: u32,
//!     end: u32,
//! }
//!
//! impl Write for Window {
//!     fn write(&self, buf: &mut impl BufMut) {
//!         self.start.write(buf);
//!         self.end.write(buf);
//!     }
//! }
//!
//! impl Read for Window {
//!     type Cfg = ();
//!     fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
//!         let start = u32::read(buf)?;
//!         let end = u32::read(buf)?;
//!         Ok(Self { start, end })
//!     }
//! }
//!
//! impl FixedSize for Window {
//!     const SIZE: usize = u32::SIZE + u32::SIZE;
//! }
//!
//! let window = Window { start: 3, end: 9 };
//! let encoded = window.encode();
//! assert_eq!(encoded.len(), 8);
//! assert_eq!(Window::decode(encoded).unwrap(), window);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod types;
pub mod util;

pub use codec::{Decode, DecodeExt, Encode, EncodeSize, FixedSize, Read, ReadExt, Write};
pub use config::RangeCfg;
pub use error::Error;
