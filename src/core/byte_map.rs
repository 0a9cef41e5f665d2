//! Sparse, address-indexed byte storage.
//!
//! A `ByteMap` stores the bytes known at each address as a set of
//! non-overlapping runs. Writes overwrite whatever they cover and are coalesced
//! with overlapping or adjacent runs, so a contiguous written region always
//! lives in exactly one run. The map enforces no bounds of its own; bounded
//! access is the job of [`ImageByteMap`](crate::core::image_byte_map::ImageByteMap).

use std::collections::BTreeMap;
use std::ops::Bound;
use tracing::trace;

use crate::core::addr::Addr;
use crate::core::addr_range::AddrRange;
use crate::error::{IrError, Result};

const ADDRESS_SPACE_END: u128 = 1 << 64;

/// Largest run a single [`ByteMap::fill`] will materialize.
pub const MAX_FILL_BYTES: usize = 1 << 30;

/// Interval map from addresses to the latest bytes written there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteMap {
    runs: BTreeMap<Addr, Vec<u8>>,
}

fn run_end(start: Addr, run: &[u8]) -> u128 {
    start.value() as u128 + run.len() as u128
}

impl ByteMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `data` at `address`, replacing any bytes previously stored there.
    pub fn set_data(&mut self, address: Addr, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let start = address.value() as u128;
        let end = start + data.len() as u128;
        if end > ADDRESS_SPACE_END {
            return Err(IrError::RangeError {
                address,
                length: data.len() as u64,
            });
        }

        // Runs that overlap or abut [start, end), in descending address order.
        let upper = if end == ADDRESS_SPACE_END {
            Bound::Unbounded
        } else {
            Bound::Included(Addr::new(end as u64))
        };
        let touching: Vec<Addr> = self
            .runs
            .range((Bound::Unbounded, upper))
            .rev()
            .take_while(|(run_start, run)| run_end(**run_start, run) >= start)
            .map(|(run_start, _)| *run_start)
            .collect();

        // Fast path: a single run already spans the whole write.
        if let [only] = touching.as_slice() {
            if let Some(run) = self.runs.get_mut(only) {
                if *only <= address && run_end(*only, run) >= end {
                    let offset = (address.value() - only.value()) as usize;
                    run[offset..offset + data.len()].copy_from_slice(data);
                    trace!(%address, len = data.len(), "overwrote bytes in place");
                    return Ok(());
                }
            }
        }

        let merged_start = touching
            .last()
            .map_or(address, |first| (*first).min(address));
        let mut merged_end = end;
        let mut merged = Vec::new();
        let mut pieces = Vec::with_capacity(touching.len());
        for run_start in touching.iter().rev() {
            if let Some(run) = self.runs.remove(run_start) {
                merged_end = merged_end.max(run_end(*run_start, &run));
                pieces.push((*run_start, run));
            }
        }
        merged.resize((merged_end - merged_start.value() as u128) as usize, 0);
        for (run_start, run) in pieces {
            let offset = (run_start.value() - merged_start.value()) as usize;
            merged[offset..offset + run.len()].copy_from_slice(&run);
        }
        let offset = (address.value() - merged_start.value()) as usize;
        merged[offset..offset + data.len()].copy_from_slice(data);

        trace!(
            %address,
            len = data.len(),
            merged_runs = touching.len(),
            "stored bytes"
        );
        self.runs.insert(merged_start, merged);
        Ok(())
    }

    /// Write `length` copies of `value` starting at `address`.
    ///
    /// Lengths above [`MAX_FILL_BYTES`], or that cannot be allocated, fail
    /// with `ResourceExhausted` and leave the map unchanged.
    pub fn fill(&mut self, address: Addr, length: u64, value: u8) -> Result<()> {
        let exhausted = || IrError::ResourceExhausted {
            resource: "fill bytes".to_string(),
            used: usize::try_from(length).unwrap_or(usize::MAX),
            limit: MAX_FILL_BYTES,
        };
        let count = usize::try_from(length)
            .ok()
            .filter(|&n| n <= MAX_FILL_BYTES)
            .ok_or_else(exhausted)?;
        let mut run = Vec::new();
        run.try_reserve_exact(count).map_err(|_| exhausted())?;
        run.resize(count, value);
        self.set_data(address, &run)
    }

    /// Borrow `length` stored bytes starting at `address`.
    ///
    /// Fails with `RangeError` unless every byte of the access was written.
    pub fn get_slice(&self, address: Addr, length: u64) -> Result<&[u8]> {
        if length == 0 {
            return Ok(&[]);
        }
        let end = address.value() as u128 + length as u128;
        let (run_start, run) = self
            .runs
            .range(..=address)
            .next_back()
            .ok_or(IrError::RangeError { address, length })?;
        if run_end(*run_start, run) < end {
            return Err(IrError::RangeError { address, length });
        }
        let offset = (address.value() - run_start.value()) as usize;
        Ok(&run[offset..offset + length as usize])
    }

    /// Copy `length` stored bytes starting at `address`.
    pub fn get_data(&self, address: Addr, length: u64) -> Result<Vec<u8>> {
        self.get_slice(address, length).map(<[u8]>::to_vec)
    }

    /// True if every byte of `[address, address + length)` has been written.
    pub fn covers(&self, address: Addr, length: u64) -> bool {
        self.get_slice(address, length).is_ok()
    }

    /// The stored runs in ascending address order.
    pub fn runs(&self) -> impl Iterator<Item = (Addr, &[u8])> {
        self.runs.iter().map(|(start, run)| (*start, run.as_slice()))
    }

    /// The address ranges covered by stored runs.
    pub fn ranges(&self) -> impl Iterator<Item = AddrRange> + '_ {
        self.runs
            .iter()
            .map(|(start, run)| AddrRange::new(*start, run.len() as u64))
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Total number of stored bytes.
    pub fn len_bytes(&self) -> u64 {
        self.runs.values().map(|run| run.len() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(value: u64) -> Addr {
        Addr::new(value)
    }

    #[test]
    fn test_read_back_exact_write() {
        let mut map = ByteMap::new();
        map.set_data(addr(0x1000), &[1, 2, 3, 4]).unwrap();
        assert_eq!(map.get_data(addr(0x1000), 4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(map.get_data(addr(0x1001), 2).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_unwritten_bytes_are_a_range_error() {
        let mut map = ByteMap::new();
        map.set_data(addr(0x1000), &[1, 2, 3, 4]).unwrap();

        assert!(matches!(
            map.get_data(addr(0x1002), 4),
            Err(IrError::RangeError { .. })
        ));
        assert!(matches!(
            map.get_data(addr(0xfff), 2),
            Err(IrError::RangeError { .. })
        ));
        assert!(map.get_data(addr(0x10), 1).is_err());
    }

    #[test]
    fn test_last_writer_wins() {
        let mut map = ByteMap::new();
        map.set_data(addr(10), &[0xaa; 8]).unwrap();
        map.set_data(addr(14), &[0xbb; 8]).unwrap();

        assert_eq!(map.run_count(), 1);
        assert_eq!(
            map.get_data(addr(10), 12).unwrap(),
            vec![0xaa, 0xaa, 0xaa, 0xaa, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb]
        );

        map.set_data(addr(12), &[0xcc]).unwrap();
        assert_eq!(map.get_data(addr(12), 1).unwrap(), vec![0xcc]);
        assert_eq!(map.run_count(), 1);
    }

    #[test]
    fn test_write_spanning_several_runs_coalesces() {
        let mut map = ByteMap::new();
        map.set_data(addr(0), &[1, 1]).unwrap();
        map.set_data(addr(4), &[2, 2]).unwrap();
        map.set_data(addr(8), &[3, 3]).unwrap();
        assert_eq!(map.run_count(), 3);

        map.set_data(addr(1), &[9; 8]).unwrap();
        assert_eq!(map.run_count(), 1);
        assert_eq!(map.get_data(addr(0), 10).unwrap(), vec![1, 9, 9, 9, 9, 9, 9, 9, 9, 3]);
    }

    #[test]
    fn test_adjacent_writes_merge() {
        let mut map = ByteMap::new();
        map.set_data(addr(0x20), &[2, 2]).unwrap();
        map.set_data(addr(0x1e), &[1, 1]).unwrap();
        map.set_data(addr(0x22), &[3]).unwrap();

        let ranges: Vec<AddrRange> = map.ranges().collect();
        assert_eq!(ranges, vec![AddrRange::new(addr(0x1e), 5)]);
        assert_eq!(map.get_data(addr(0x1e), 5).unwrap(), vec![1, 1, 2, 2, 3]);
    }

    #[test]
    fn test_disjoint_runs_stay_separate() {
        let mut map = ByteMap::new();
        map.set_data(addr(0x100), &[1]).unwrap();
        map.set_data(addr(0x200), &[2]).unwrap();
        assert_eq!(map.run_count(), 2);
        assert!(!map.covers(addr(0x100), 0x101));
        assert_eq!(map.len_bytes(), 2);
    }

    #[test]
    fn test_fill() {
        let mut map = ByteMap::new();
        map.set_data(addr(0), &[1, 2, 3, 4, 5]).unwrap();
        map.fill(addr(1), 3, 0x90).unwrap();
        assert_eq!(map.get_data(addr(0), 5).unwrap(), vec![1, 0x90, 0x90, 0x90, 5]);
    }

    #[test]
    fn test_oversized_fill_is_rejected() {
        let mut map = ByteMap::new();
        map.set_data(addr(0), &[1]).unwrap();
        assert!(matches!(
            map.fill(addr(0), u64::MAX, 0),
            Err(IrError::ResourceExhausted { limit: MAX_FILL_BYTES, .. })
        ));
        assert!(matches!(
            map.fill(addr(0), MAX_FILL_BYTES as u64 + 1, 0),
            Err(IrError::ResourceExhausted { .. })
        ));
        assert_eq!(map.len_bytes(), 1);
    }

    #[test]
    fn test_top_of_address_space() {
        let mut map = ByteMap::new();
        map.set_data(Addr::MAX - 1, &[7, 8]).unwrap();
        assert_eq!(map.get_data(Addr::MAX, 1).unwrap(), vec![8]);
        assert!(matches!(
            map.set_data(Addr::MAX, &[1, 2]),
            Err(IrError::RangeError { .. })
        ));
        assert!(map.get_data(Addr::MAX, 2).is_err());
    }

    #[test]
    fn test_empty_access() {
        let mut map = ByteMap::new();
        map.set_data(addr(5), &[]).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.get_data(addr(5), 0).unwrap(), Vec::<u8>::new());
    }
}
