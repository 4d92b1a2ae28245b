//! Types for use as [crate::Read::Cfg].

use core::ops::{Bound, RangeBounds};

/// Configuration for limiting the number of entries in a length-prefixed value.
///
/// Inbound messages are decoded with a bound so a corrupt count cannot trigger
/// an oversized allocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RangeCfg {
    start: Bound<usize>,
    end: Bound<usize>,
}

impl RangeCfg {
    /// Creates a new `RangeCfg` from any range of `usize`.
    pub fn new(r: impl RangeBounds<usize>) -> Self {
        Self {
            start: r.start_bound().cloned(),
            end: r.end_bound().cloned(),
        }
    }

    /// Returns `true` if `len` lies within the range.
    pub fn contains(&self, len: &usize) -> bool {
        (self.start, self.end).contains(len)
    }
}

impl From<core::ops::RangeInclusive<usize>> for RangeCfg {
    fn from(r: core::ops::RangeInclusive<usize>) -> Self {
        Self::new(r)
    }
}

impl From<core::ops::RangeToInclusive<usize>> for RangeCfg {
    fn from(r: core::ops::RangeToInclusive<usize>) -> Self {
        Self::new(r)
    }
}

impl From<core::ops::RangeFull> for RangeCfg {
    fn from(r: core::ops::RangeFull) -> Self {
        Self::new(r)
    }
}
