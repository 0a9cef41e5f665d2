//! Half-open address ranges.
//!
//! `AddrRange` describes the contiguous `[start, start + size)` region covered by
//! sections, blocks, data objects and byte-map runs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::addr::Addr;

/// A half-open contiguous region of the address space.
///
/// The exclusive end may equal `2^64` (a range ending at the very top of the
/// address space), so bound arithmetic is done in `u128`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddrRange {
    /// The starting address of the range (inclusive)
    pub start: Addr,
    /// The size of the range in bytes
    pub size: u64,
}

impl AddrRange {
    pub fn new(start: Addr, size: u64) -> Self {
        Self { start, size }
    }

    /// Range covering the inclusive bounds `[first, last]`, if `first <= last`
    /// and the size is representable.
    pub fn from_bounds(first: Addr, last: Addr) -> Option<Self> {
        if first > last {
            return None;
        }
        let size = (last.value() - first.value()).checked_add(1)?;
        Some(Self::new(first, size))
    }

    /// Exclusive end, or `None` when it lies at `2^64`.
    pub fn end(&self) -> Option<Addr> {
        self.start.checked_add(self.size)
    }

    /// Last address inside the range, or `None` for an empty range.
    pub fn last(&self) -> Option<Addr> {
        self.start.last_of(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn end_u128(&self) -> u128 {
        self.start.value() as u128 + self.size as u128
    }

    /// Check if this range contains the given address.
    pub fn contains(&self, address: Addr) -> bool {
        address >= self.start && (address.value() as u128) < self.end_u128()
    }

    /// Check if `other` lies completely within this range.
    pub fn contains_range(&self, other: &AddrRange) -> bool {
        other.start >= self.start && other.end_u128() <= self.end_u128()
    }

    /// Check if the two ranges share at least one address.
    pub fn overlaps(&self, other: &AddrRange) -> bool {
        (self.start.value() as u128) < other.end_u128()
            && (other.start.value() as u128) < self.end_u128()
    }

    /// Check if the ranges overlap or touch end-to-start.
    pub fn touches(&self, other: &AddrRange) -> bool {
        (self.start.value() as u128) <= other.end_u128()
            && (other.start.value() as u128) <= self.end_u128()
    }

    /// The shared part of two ranges, if any.
    pub fn intersection(&self, other: &AddrRange) -> Option<AddrRange> {
        let start = self.start.max(other.start);
        let end = self.end_u128().min(other.end_u128());
        if (start.value() as u128) >= end {
            return None;
        }
        Some(AddrRange::new(start, (end - start.value() as u128) as u64))
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, +{:#x})", self.start, self.size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, size: u64) -> AddrRange {
        AddrRange::new(Addr::new(start), size)
    }

    #[test]
    fn test_contains_address() {
        let r = range(0x1000, 0x1000);
        assert!(r.contains(Addr::new(0x1500)));
        assert!(r.contains(Addr::new(0x1000)));
        assert!(!r.contains(Addr::new(0x2000)));
        assert!(!r.contains(Addr::new(0x500)));
        assert!(!range(0x1000, 0).contains(Addr::new(0x1000)));
    }

    #[test]
    fn test_contains_range() {
        let r = range(0x1000, 0x1000);
        assert!(r.contains_range(&range(0x1200, 0x200)));
        assert!(!r.contains_range(&range(0x800, 0x1000)));
        assert!(r.contains_range(&r));
    }

    #[test]
    fn test_overlaps_and_touches() {
        let r = range(0x1000, 0x1000);
        assert!(r.overlaps(&range(0x800, 0x1000)));
        assert!(!r.overlaps(&range(0x3000, 0x1000)));
        assert!(!r.overlaps(&range(0x2000, 0x1000)));
        assert!(r.touches(&range(0x2000, 0x1000)));
        assert!(!r.touches(&range(0x2001, 0x10)));
    }

    #[test]
    fn test_intersection() {
        let i = range(0x1000, 0x1000)
            .intersection(&range(0x800, 0x1000))
            .unwrap();
        assert_eq!(i, range(0x1000, 0x800));
        assert!(range(0x1000, 0x1000)
            .intersection(&range(0x3000, 0x10))
            .is_none());
    }

    #[test]
    fn test_top_of_address_space() {
        let r = range(u64::MAX - 1, 2);
        assert_eq!(r.end(), None);
        assert_eq!(r.last(), Some(Addr::MAX));
        assert!(r.contains(Addr::MAX));
        assert_eq!(r.to_string(), "[0xfffffffffffffffe, +0x2)");
    }

    #[test]
    fn test_from_bounds() {
        assert_eq!(
            AddrRange::from_bounds(Addr::new(100), Addr::new(200)),
            Some(range(100, 101))
        );
        assert_eq!(AddrRange::from_bounds(Addr::new(2), Addr::new(1)), None);
        assert_eq!(AddrRange::from_bounds(Addr::MIN, Addr::MAX), None);
    }
}
