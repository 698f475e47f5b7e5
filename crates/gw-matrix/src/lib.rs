//! Binary-matrix index arithmetic.
//!
//! Every level is one perfect binary tree with 1-based breadth-first global
//! indices: the children of `g` are `2g` and `2g + 1`. A user's local view is
//! the same numbering re-rooted at their own global index, so local position
//! `p` maps to `g * 2^depth(p) + (p - 2^depth(p))` without materializing the
//! tree.

use async_trait::async_trait;
use gw_api_types::{Address, Level, MatrixSlot};
use tracing::debug;

/// Local positions shown in the tree view: self, two children, four grandchildren.
pub const NEIGHBORHOOD_SIZE: u64 = 7;

/// Depth of a local position (`floor(log2 p)`); `None` for position 0.
pub fn depth_of(local: u64) -> Option<u32> {
    (local != 0).then(|| local.ilog2())
}

/// Global index of local position `local` in the subtree rooted at `root`.
pub fn derive_global(root: u64, local: u64) -> Option<u64> {
    if root == 0 {
        return None;
    }
    let depth = depth_of(local)?;
    let row_start = 1u64 << depth;
    let offset = local - row_start;
    root.checked_mul(row_start)?.checked_add(offset)
}

/// Global indices for local positions `1..=7`.
pub fn neighborhood(root: u64) -> Option<Vec<u64>> {
    (1..=NEIGHBORHOOD_SIZE)
        .map(|local| derive_global(root, local))
        .collect()
}

/// Global indices of the full row `depth` levels below `root`, truncated to `cap`.
pub fn table_row(root: u64, depth: u32, cap: usize) -> Option<Vec<u64>> {
    if depth >= 63 {
        return None;
    }
    let width = 1u64 << depth;
    let start = derive_global(root, width)?;
    let take = width.min(cap as u64);
    let last = start.checked_add(take.saturating_sub(1))?;
    Some((start..=last).take(take as usize).collect())
}

/// Depths offered by the table view; the tree already shows 0 through 2.
pub const TABLE_DEPTHS: std::ops::RangeInclusive<u32> = 3..=12;

/// First row below the tree that a 100-slot cap actually truncates.
pub const DEFAULT_TABLE_DEPTH: u32 = 7;

/// Parse a depth chosen in the UI, clamped to [`TABLE_DEPTHS`].
pub fn table_depth(raw: &str) -> u32 {
    raw.trim()
        .parse::<u32>()
        .map_or(DEFAULT_TABLE_DEPTH, |depth| {
            depth.clamp(*TABLE_DEPTHS.start(), *TABLE_DEPTHS.end())
        })
}

/// `(depth, column)` of a local position, used to lay the tree out.
pub fn layout_of(local: u64) -> Option<(u32, u64)> {
    let depth = depth_of(local)?;
    Some((depth, local - (1u64 << depth)))
}

/// Source of matrix occupants; `None` means empty (zero address or unreadable).
#[async_trait(?Send)]
pub trait OccupantSource {
    async fn occupant(&self, level: Level, global_index: u64) -> Option<Address>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixView {
    pub level: Level,
    pub root: u64,
    pub slots: Vec<MatrixSlot>,
}

impl MatrixView {
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.occupant.is_some()).count()
    }

    pub fn slot(&self, local: u64) -> Option<&MatrixSlot> {
        self.slots.iter().find(|slot| slot.local_position == local)
    }
}

/// Fetch the seven-slot neighborhood around `root`. A zero root (user not yet
/// placed on this level) yields an empty view.
pub async fn load_neighborhood<S>(source: &S, level: Level, root: u64) -> MatrixView
where
    S: OccupantSource + ?Sized,
{
    let mut slots = Vec::with_capacity(NEIGHBORHOOD_SIZE as usize);
    if let Some(indices) = neighborhood(root) {
        for (local, global_index) in (1..=NEIGHBORHOOD_SIZE).zip(indices) {
            let occupant = source.occupant(level, global_index).await;
            slots.push(MatrixSlot {
                local_position: local,
                global_index,
                occupant,
            });
        }
    } else {
        debug!("no matrix position for level {level}, root {root}");
    }
    MatrixView { level, root, slots }
}

/// Fetch one row of the table view. Local positions follow the row numbering
/// (`2^depth ..`).
pub async fn load_row<S>(source: &S, level: Level, root: u64, depth: u32, cap: usize) -> MatrixView
where
    S: OccupantSource + ?Sized,
{
    let mut slots = Vec::new();
    if let Some(indices) = table_row(root, depth, cap) {
        let row_start = 1u64 << depth;
        for (column, global_index) in indices.into_iter().enumerate() {
            let occupant = source.occupant(level, global_index).await;
            slots.push(MatrixSlot {
                local_position: row_start + column as u64,
                global_index,
                occupant,
            });
        }
    }
    MatrixView { level, root, slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn root_maps_to_itself() {
        for g in [1, 2, 7, 1_000, u64::MAX / 4] {
            assert_eq!(derive_global(g, 1), Some(g));
        }
    }

    #[test]
    fn doubling_rule_holds() {
        for g in 1..=64u64 {
            for p in 1..=512u64 {
                let parent = derive_global(g, p).unwrap();
                assert_eq!(derive_global(g, 2 * p), Some(2 * parent), "g={g} p={p}");
                assert_eq!(derive_global(g, 2 * p + 1), Some(2 * parent + 1), "g={g} p={p}");
            }
        }
    }

    #[test]
    fn rejects_zero_and_overflow() {
        assert_eq!(derive_global(0, 1), None);
        assert_eq!(derive_global(5, 0), None);
        assert_eq!(derive_global(u64::MAX, 2), None);
    }

    #[test]
    fn neighborhood_of_three() {
        assert_eq!(neighborhood(3), Some(vec![3, 6, 7, 12, 13, 14, 15]));
    }

    #[test]
    fn rows_are_capped() {
        assert_eq!(table_row(2, 2, 100), Some(vec![8, 9, 10, 11]));
        let wide = table_row(1, 10, 100).unwrap();
        assert_eq!(wide.len(), 100);
        assert_eq!(wide[0], 1024);
        assert_eq!(wide[99], 1123);
    }

    #[test]
    fn table_depths_sit_below_the_tree() {
        assert_eq!(table_depth("7"), 7);
        assert_eq!(table_depth(" 4 "), 4);
        assert_eq!(table_depth("2"), 3);
        assert_eq!(table_depth("40"), 12);
        assert_eq!(table_depth("deep"), DEFAULT_TABLE_DEPTH);

        let grandchildren = neighborhood(5).unwrap()[3..].to_vec();
        let first = table_row(5, *TABLE_DEPTHS.start(), 100).unwrap();
        assert!(first.iter().all(|g| !grandchildren.contains(g)));

        let capped = table_row(5, DEFAULT_TABLE_DEPTH, 100).unwrap();
        assert_eq!(capped.len(), 100);
        assert_eq!(capped[0], 5 * 128);
    }

    #[test]
    fn layout_positions() {
        assert_eq!(layout_of(1), Some((0, 0)));
        assert_eq!(layout_of(3), Some((1, 1)));
        assert_eq!(layout_of(6), Some((2, 2)));
        assert_eq!(layout_of(0), None);
    }

    struct Fixture(HashMap<u64, Address>);

    #[async_trait(?Send)]
    impl OccupantSource for Fixture {
        async fn occupant(&self, _level: Level, global_index: u64) -> Option<Address> {
            self.0.get(&global_index).copied()
        }
    }

    #[tokio::test]
    async fn neighborhood_marks_empty_slots() -> anyhow::Result<()> {
        let level = Level::new(3).unwrap();
        let source = Fixture(HashMap::from([
            (5, Address::repeat_byte(1)),
            (10, Address::repeat_byte(2)),
            (21, Address::repeat_byte(3)),
        ]));

        let view = load_neighborhood(&source, level, 5).await;
        assert_eq!(view.slots.len(), 7);
        assert_eq!(view.filled(), 3);
        assert_eq!(view.slot(2).and_then(|s| s.occupant), Some(Address::repeat_byte(2)));
        assert_eq!(view.slot(3).map(|s| s.global_index), Some(11));
        assert_eq!(view.slot(3).and_then(|s| s.occupant), None);
        assert_eq!(view.slot(5).map(|s| s.global_index), Some(21));

        let unplaced = load_neighborhood(&source, level, 0).await;
        assert!(unplaced.slots.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn row_uses_row_local_positions() {
        let level = Level::new(1).unwrap();
        let source = Fixture(HashMap::from([(9, Address::repeat_byte(9))]));
        let view = load_row(&source, level, 2, 2, 100).await;
        let positions: Vec<u64> = view.slots.iter().map(|s| s.local_position).collect();
        assert_eq!(positions, vec![4, 5, 6, 7]);
        assert_eq!(view.filled(), 1);
    }
}
