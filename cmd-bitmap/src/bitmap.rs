//! Bit index → signal lookup
//!
//! Signals may declare overlapping ranges. Overlaps are resolved
//! last-write-wins in input order: a later signal in the slice overwrites
//! an earlier claim on a shared bit. Legend display uses
//! [`unique_signals`] instead, so every id shows up exactly once.

use crate::types::Signal;
use std::collections::HashSet;
use std::ops::Range;

/// Lookup from absolute bit index to the owning signal
///
/// Stored as resolved, non-overlapping runs sorted by start bit, so the
/// size depends on the number of signals rather than on their offsets.
/// Owners are indices into the signal slice the map was built from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitMap {
    runs: Vec<(usize, Range<usize>)>,
    len: usize,
}

impl BitMap {
    /// Owner index of a bit, `None` if no signal claims it
    pub fn owner(&self, bit: usize) -> Option<usize> {
        let after = self.runs.partition_point(|(_, range)| range.start <= bit);
        let (owner, range) = self.runs.get(after.checked_sub(1)?)?;
        range.contains(&bit).then_some(*owner)
    }

    /// Total bits covered (the largest `bit_offset + bit_length`)
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bits with an owner
    pub fn owned_bits(&self) -> usize {
        self.runs.iter().map(|(_, range)| range.len()).sum()
    }

    /// Contiguous runs of bits sharing one owner, in bit order
    pub fn ranges(&self) -> Vec<(usize, Range<usize>)> {
        self.runs.clone()
    }

    /// All bits owned by the signal at `index`, in ascending order
    pub fn bits_of(&self, index: usize) -> Vec<usize> {
        self.runs
            .iter()
            .filter(|(owner, _)| *owner == index)
            .flat_map(|(_, range)| range.clone())
            .collect()
    }
}

/// Build the bit → signal lookup for a signal list
///
/// Signals whose end bit overflows `usize` are skipped; the renderer
/// rejects them before calling this.
pub fn build_bit_map(signals: &[Signal]) -> BitMap {
    let spans: Vec<(usize, Range<usize>)> = signals
        .iter()
        .enumerate()
        .filter_map(|(index, signal)| Some((index, signal.bit_offset..signal.end_bit()?)))
        .collect();
    let len = spans.iter().map(|(_, range)| range.end).max().unwrap_or(0);

    let mut bounds: Vec<usize> = spans
        .iter()
        .filter(|(_, range)| !range.is_empty())
        .flat_map(|(_, range)| [range.start, range.end])
        .collect();
    bounds.sort_unstable();
    bounds.dedup();

    let mut runs: Vec<(usize, Range<usize>)> = Vec::new();
    for piece in bounds.windows(2) {
        let (start, end) = (piece[0], piece[1]);
        let mut claims = spans
            .iter()
            .filter(|(_, range)| range.start <= start && end <= range.end)
            .map(|(index, _)| *index);

        let Some(mut owner) = claims.next() else { continue };
        for later in claims {
            if later != owner {
                log::trace!(
                    "Signal '{}' overrides '{}' on bits {}..{}",
                    signals[later].id,
                    signals[owner].id,
                    start,
                    end
                );
            }
            owner = later;
        }

        match runs.last_mut() {
            Some((last_owner, range)) if *last_owner == owner && range.end == start => {
                range.end = end;
            }
            _ => runs.push((owner, start..end)),
        }
    }

    BitMap { runs, len }
}

/// First signal per id, in first-occurrence order
pub fn unique_signals(signals: &[Signal]) -> Vec<&Signal> {
    let mut seen = HashSet::new();
    signals
        .iter()
        .filter(|signal| seen.insert(signal.id.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(id: &str, offset: usize, length: usize) -> Signal {
        Signal::new(id, id, offset, length)
    }

    #[test]
    fn test_ranges_reproduce_declared_ranges() {
        let signals = vec![sig("a", 0, 4), sig("b", 4, 4), sig("c", 10, 3)];
        let map = build_bit_map(&signals);

        assert_eq!(map.len(), 13);
        assert_eq!(map.ranges(), vec![(0, 0..4), (1, 4..8), (2, 10..13)]);
        assert_eq!(map.owner(8), None);
        assert_eq!(map.owner(9), None);
        assert_eq!(map.owner(13), None);
        assert_eq!(map.owned_bits(), 11);
    }

    #[test]
    fn test_overlap_last_write_wins_by_input_order() {
        // "late" is declared first by offset but comes last in the input
        let signals = vec![sig("wide", 0, 8), sig("late", 2, 3)];
        let map = build_bit_map(&signals);
        assert_eq!(map.bits_of(1), vec![2, 3, 4]);
        assert_eq!(map.bits_of(0), vec![0, 1, 5, 6, 7]);

        let reversed = vec![sig("late", 2, 3), sig("wide", 0, 8)];
        let map = build_bit_map(&reversed);
        assert!(map.bits_of(0).is_empty());
        assert_eq!(map.bits_of(1), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_length_and_empty() {
        let map = build_bit_map(&[]);
        assert!(map.is_empty());

        let map = build_bit_map(&[sig("z", 5, 0)]);
        assert_eq!(map.len(), 5);
        assert_eq!(map.owned_bits(), 0);
    }

    #[test]
    fn test_huge_offsets_stay_sparse() {
        let signals = vec![sig("far", 1 << 34, 1), sig("edge", usize::MAX - 1, 1)];
        let map = build_bit_map(&signals);

        assert_eq!(map.len(), usize::MAX);
        assert_eq!(map.owned_bits(), 2);
        assert_eq!(map.owner(1 << 34), Some(0));
        assert_eq!(map.owner((1 << 34) + 1), None);
        assert_eq!(map.owner(usize::MAX - 1), Some(1));
        assert_eq!(map.owner(0), None);

        // Overflowing end bits are skipped
        let map = build_bit_map(&[sig("overflow", usize::MAX, 2), sig("a", 0, 2)]);
        assert_eq!(map.ranges(), vec![(1, 0..2)]);
    }

    #[test]
    fn test_unique_signals_first_occurrence() {
        let signals = vec![sig("a", 0, 1), sig("b", 1, 1), sig("a", 7, 1), sig("c", 2, 1)];
        let unique = unique_signals(&signals);

        let ids: Vec<_> = unique.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(unique[0].bit_offset, 0);
    }
}
