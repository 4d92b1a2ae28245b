//! Implementations of the codec traits for common types

pub mod primitives;
pub mod vec;
