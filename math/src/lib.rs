//! Fixed-point arithmetic and reproducible random variates.
//!
//! # Overview
//!
//! Spike generation must replay bit for bit from persisted state, so this
//! crate avoids floating point on every per-tick path:
//! - [Accum] and [UFract] are word-sized fixed-point types.
//! - [Kiss64] is a small generator whose whole state is four words.
//! - [variate] draws exponential, Poisson and normal variates from any
//!   [rand::RngCore] using integer arithmetic only.

pub mod fixed;
pub use fixed::{Accum, UFract};
pub mod kiss;
pub use kiss::Kiss64;
pub mod variate;
