//! Symmetric pair counters.
//!
//! Co-change and dependency analysis both count unordered pairs of small
//! integer ids. [`PairCounts`] hides the storage: [`DensePairCounts`] keeps a
//! packed upper triangle, [`SparsePairCounts`] a hash map. Both report the
//! same pairs in the same order, so the choice only affects speed and memory.

use std::collections::HashMap;

/// Counter over unordered pairs `{a, b}` with `a != b` and ids `< size`.
///
/// # Examples
///
/// ```
/// use strata_pulse::matrix::{DensePairCounts, PairCounts, SparsePairCounts};
///
/// fn fill<C: PairCounts>() -> Vec<(usize, usize, u32)> {
///     let mut counts = C::with_size(4);
///     counts.increment(2, 0);
///     counts.increment(0, 2);
///     counts.increment(1, 3);
///     counts.nonzero()
/// }
/// assert_eq!(fill::<DensePairCounts>(), vec![(0, 2, 2), (1, 3, 1)]);
/// assert_eq!(fill::<DensePairCounts>(), fill::<SparsePairCounts>());
/// ```
pub trait PairCounts {
    /// Empty counter for ids `0..size`.
    fn with_size(size: usize) -> Self
    where
        Self: Sized;

    /// Add one to pair `{a, b}`. Self-pairs are ignored.
    fn increment(&mut self, a: usize, b: usize);

    /// Current count of pair `{a, b}`.
    fn get(&self, a: usize, b: usize) -> u32;

    /// All non-zero pairs as `(low, high, count)`, sorted by `(low, high)`.
    fn nonzero(&self) -> Vec<(usize, usize, u32)>;
}

/// Packed upper-triangular array; the default backend.
#[derive(Debug, Clone)]
pub struct DensePairCounts {
    size: usize,
    cells: Vec<u32>,
}

impl DensePairCounts {
    fn slot(&self, a: usize, b: usize) -> Option<usize> {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        if lo == hi || hi >= self.size {
            return None;
        }
        // Row `lo` starts after the rows 0..lo, which hold size-1, size-2, ... cells.
        Some(lo * (2 * self.size - lo - 1) / 2 + (hi - lo - 1))
    }
}

impl PairCounts for DensePairCounts {
    fn with_size(size: usize) -> Self {
        let cells = size * size.saturating_sub(1) / 2;
        Self {
            size,
            cells: vec![0; cells],
        }
    }

    fn increment(&mut self, a: usize, b: usize) {
        if let Some(slot) = self.slot(a, b) {
            self.cells[slot] += 1;
        }
    }

    fn get(&self, a: usize, b: usize) -> u32 {
        self.slot(a, b).map_or(0, |slot| self.cells[slot])
    }

    fn nonzero(&self) -> Vec<(usize, usize, u32)> {
        let mut out = Vec::new();
        let mut slot = 0;
        for lo in 0..self.size {
            for hi in (lo + 1)..self.size {
                let count = self.cells[slot];
                if count > 0 {
                    out.push((lo, hi, count));
                }
                slot += 1;
            }
        }
        out
    }
}

/// Hash-map backend for large, sparsely populated id spaces.
#[derive(Debug, Clone, Default)]
pub struct SparsePairCounts {
    cells: HashMap<(usize, usize), u32>,
}

impl PairCounts for SparsePairCounts {
    fn with_size(_size: usize) -> Self {
        Self::default()
    }

    fn increment(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        *self.cells.entry(key).or_default() += 1;
    }

    fn get(&self, a: usize, b: usize) -> u32 {
        let key = if a < b { (a, b) } else { (b, a) };
        self.cells.get(&key).copied().unwrap_or(0)
    }

    fn nonzero(&self) -> Vec<(usize, usize, u32)> {
        let mut out: Vec<(usize, usize, u32)> = self
            .cells
            .iter()
            .map(|(&(lo, hi), &count)| (lo, hi, count))
            .collect();
        out.sort_unstable();
        out
    }
}
