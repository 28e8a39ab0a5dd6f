//! Dense bit-per-cell presence structure over a multidimensional grid.
//!
//! A [`BitMatrix`] records which tiles of a grid a value actually touches,
//! so iteration can skip the (often vast) untouched remainder. It is
//! populated once while the grid state is built and only read afterwards.

use crate::config::DEFAULT_ALLOC_CEILING;
use crate::error::{Result, TesselError};
use smallvec::SmallVec;

/// Coordinate vector for up to four grid dimensions.
pub type Coords = SmallVec<[usize; 4]>;

/// Dense presence bitmap over a row-major flattened grid.
#[derive(Debug, Clone)]
pub struct BitMatrix {
    counts: Coords,
    strides: Coords,
    bits: Vec<u8>,
}

impl BitMatrix {
    /// Allocate a zeroed matrix for a grid with the given per-dimension cell
    /// counts, under the default allocation ceiling.
    pub fn make(counts: &[usize]) -> Result<Self> {
        Self::make_with(counts, DEFAULT_ALLOC_CEILING)
    }

    /// Allocate a zeroed matrix under an explicit allocation ceiling.
    pub fn make_with(counts: &[usize], ceiling: usize) -> Result<Self> {
        if counts.is_empty() {
            return Err(TesselError::Configuration(
                "bit matrix needs at least one dimension".to_string(),
            ));
        }
        if counts.contains(&0) {
            return Err(TesselError::Configuration(
                "bit matrix dimensions must be non-empty".to_string(),
            ));
        }
        let mut strides: Coords = SmallVec::with_capacity(counts.len());
        let mut total: usize = 1;
        for &count in counts {
            strides.push(total);
            total = total
                .checked_mul(count)
                .ok_or(TesselError::AllocationLimit {
                    requested: usize::MAX,
                    ceiling,
                })?;
        }
        let bytes = total.div_ceil(8);
        if bytes > ceiling {
            return Err(TesselError::AllocationLimit {
                requested: bytes,
                ceiling,
            });
        }
        Ok(Self {
            counts: SmallVec::from_slice(counts),
            strides,
            bits: vec![0u8; bytes],
        })
    }

    /// Per-dimension cell counts this matrix was sized for.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    fn flat_index(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.counts.len());
        coords
            .iter()
            .zip(self.strides.iter())
            .map(|(&c, &s)| c * s)
            .sum()
    }

    /// Mark the cell at `coords`.
    pub fn set_bit(&mut self, coords: &[usize]) {
        let idx = self.flat_index(coords);
        self.bits[idx / 8] |= 1 << (idx % 8);
    }

    /// Whether the cell at `coords` is marked.
    pub fn test_bit(&self, coords: &[usize]) -> bool {
        let idx = self.flat_index(coords);
        self.bits[idx / 8] & (1 << (idx % 8)) != 0
    }

    /// Mark every cell in the cartesian product of the given inclusive
    /// per-dimension ranges.
    pub fn set_region(&mut self, ranges: &[(usize, usize)]) {
        debug_assert_eq!(ranges.len(), self.counts.len());
        let mut coords: Coords = ranges.iter().map(|&(lo, _)| lo).collect();
        loop {
            self.set_bit(&coords);
            let mut dim = 0;
            loop {
                if dim == coords.len() {
                    return;
                }
                coords[dim] += 1;
                if coords[dim] <= ranges[dim].1 {
                    break;
                }
                coords[dim] = ranges[dim].0;
                dim += 1;
            }
        }
    }

    /// Number of marked cells.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }
}
