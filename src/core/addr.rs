//! Address type for binary IR.
//!
//! This module provides the `Addr` value type that every other IR entity uses to
//! name a location in a program's virtual address space.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A 64-bit virtual address.
///
/// Arithmetic with offsets is total: `+` and `-` wrap at the ends of the address
/// space instead of panicking. Callers that need to detect wraparound use the
/// `checked_*` variants, and `saturating_*` clamps to `[0, u64::MAX]`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Addr(u64);

impl Addr {
    /// The lowest address.
    pub const MIN: Addr = Addr(0);
    /// The highest address.
    pub const MAX: Addr = Addr(u64::MAX);

    pub const fn new(value: u64) -> Self {
        Addr(value)
    }

    /// The raw numeric value.
    pub const fn value(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, offset: u64) -> Option<Self> {
        self.0.checked_add(offset).map(Addr)
    }

    pub fn checked_sub(self, offset: u64) -> Option<Self> {
        self.0.checked_sub(offset).map(Addr)
    }

    pub fn saturating_add(self, offset: u64) -> Self {
        Addr(self.0.saturating_add(offset))
    }

    pub fn saturating_sub(self, offset: u64) -> Self {
        Addr(self.0.saturating_sub(offset))
    }

    /// Apply a signed displacement, wrapping at the ends of the address space.
    pub fn offset_by(self, delta: i64) -> Self {
        Addr(self.0.wrapping_add_signed(delta))
    }

    /// Signed distance `self - origin`.
    pub fn offset_from(self, origin: Addr) -> i64 {
        self.0.wrapping_sub(origin.0) as i64
    }

    /// Address of the last byte of a `length`-byte access at `self`, or `None`
    /// when the access is empty or runs past the end of the address space.
    pub fn last_of(self, length: u64) -> Option<Addr> {
        if length == 0 {
            return None;
        }
        self.0.checked_add(length - 1).map(Addr)
    }
}

impl From<u64> for Addr {
    fn from(value: u64) -> Self {
        Addr(value)
    }
}

impl From<Addr> for u64 {
    fn from(addr: Addr) -> Self {
        addr.0
    }
}

impl Add<u64> for Addr {
    type Output = Addr;

    fn add(self, offset: u64) -> Addr {
        Addr(self.0.wrapping_add(offset))
    }
}

impl AddAssign<u64> for Addr {
    fn add_assign(&mut self, offset: u64) {
        *self = *self + offset;
    }
}

impl Sub<u64> for Addr {
    type Output = Addr;

    fn sub(self, offset: u64) -> Addr {
        Addr(self.0.wrapping_sub(offset))
    }
}

impl SubAssign<u64> for Addr {
    fn sub_assign(&mut self, offset: u64) {
        *self = *self - offset;
    }
}

impl Sub<Addr> for Addr {
    type Output = i64;

    fn sub(self, other: Addr) -> i64 {
        self.offset_from(other)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}
