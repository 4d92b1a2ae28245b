//! Implementations of the [crate::Store] trait.

pub mod memory;
