// --- File: collector.rs ---
//! Per-frame traversal of the newest snapshot into a deduplicated cell set.
//!
//! Traversal is an optimistic read. The simulation keeps growing and pruning
//! the very graph being walked, and nothing here synchronizes with it beyond
//! non-blocking `try_read`s. When a walk runs into a lock held by the writer,
//! the organism being walked is dropped for this frame and the walk moves on.
//! A frame may therefore show a subset of the population; no frame waits on
//! the simulation or fails because of it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::ecosystem::{Cell, CellId, CellKind, Ecosystem, Organism, SnapshotFeed};
pub use crate::ecosystem::TraversalError;

/// Value copy of a cell taken during traversal. Nothing outlives the frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CellRecord {
    pub x: i32,
    pub y: i32,
    pub kind: CellKind,
    pub activated: bool,
}

impl CellRecord {
    fn of(cell: &Cell) -> Self {
        let (x, y) = cell.position();
        Self {
            x,
            y,
            kind: cell.kind(),
            activated: cell.is_activated(),
        }
    }
}

/// Cells discovered this frame, keyed by identity.
pub type CellSet = HashMap<CellId, CellRecord>;

/// Result of one acquire step.
#[derive(Debug, Default)]
pub struct Collection {
    pub snapshot: Option<Arc<Ecosystem>>,
    pub cells: CellSet,
    /// Organisms left out because a walk hit a concurrent mutation.
    pub dropped_organisms: usize,
}

impl Collection {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SnapshotCollector {
    // Reused when the feed itself is mid-publish.
    last_seen: Option<Arc<Ecosystem>>,
    dropped_since_report: usize,
}

impl SnapshotCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peeks the newest snapshot and flattens every organism it can read.
    ///
    /// Never blocks and never fails: an empty feed yields an empty collection.
    pub fn collect(&mut self, feed: &SnapshotFeed) -> Collection {
        match feed.peek_latest() {
            Ok(latest) => self.last_seen = latest,
            Err(err) => log::trace!("snapshot feed busy ({err}); reusing last snapshot"),
        }

        let Some(snapshot) = self.last_seen.clone() else {
            return Collection::default();
        };

        let (cells, dropped_organisms) = collect_cells(&snapshot);
        self.dropped_since_report += dropped_organisms;
        Collection {
            snapshot: Some(snapshot),
            cells,
            dropped_organisms,
        }
    }

    /// Returns and resets the count of organisms dropped since the last call.
    pub fn take_dropped(&mut self) -> usize {
        std::mem::take(&mut self.dropped_since_report)
    }
}

/// Walks every organism of `ecosystem`, returning the cell set and the number
/// of organisms that had to be skipped.
pub fn collect_cells(ecosystem: &Ecosystem) -> (CellSet, usize) {
    let mut cells = CellSet::new();

    let organisms = match ecosystem.organisms() {
        Ok(organisms) => organisms,
        Err(err) => {
            log::trace!("organism list unavailable this frame: {err}");
            return (cells, 0);
        }
    };

    let mut dropped = 0;
    let mut scratch = Vec::new();
    for organism in &organisms {
        scratch.clear();
        match walk_organism(organism, &mut scratch) {
            Ok(()) => cells.extend(scratch.drain(..)),
            Err(err) => {
                // Partial contribution is discarded along with `scratch`.
                log::trace!("skipping organism {} this frame: {err}", organism.id());
                dropped += 1;
            }
        }
    }
    (cells, dropped)
}

fn walk_organism(
    organism: &Organism,
    out: &mut Vec<(CellId, CellRecord)>,
) -> Result<(), TraversalError> {
    let mut visited = HashSet::new();
    let mut stack = vec![Arc::clone(organism.root())];
    while let Some(cell) = stack.pop() {
        // Shared sub-structures and torn edges may revisit a cell.
        if !visited.insert(cell.id()) {
            continue;
        }
        out.push((cell.id(), CellRecord::of(&cell)));
        stack.extend(cell.children()?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant(first_id: u64, x: i32) -> Arc<Organism> {
        let root = Cell::new(CellId(first_id), x, 10, CellKind::Root);
        let stem = Cell::new(CellId(first_id + 1), x, 9, CellKind::Stem);
        let leaf = Cell::new(CellId(first_id + 2), x + 1, 9, CellKind::Leaf);
        stem.attach(leaf);
        root.attach(stem);
        Organism::new(first_id, root)
    }

    fn ecosystem_with(organisms: Vec<Arc<Organism>>) -> Arc<Ecosystem> {
        let eco = Arc::new(Ecosystem::new("test", 32, 32, 10));
        eco.update_population(organisms, &[]);
        eco
    }

    #[test]
    fn empty_feed_yields_empty_collection() {
        let feed = SnapshotFeed::new();
        let mut collector = SnapshotCollector::new();
        let collection = collector.collect(&feed);
        assert!(collection.snapshot.is_none());
        assert!(collection.is_empty());
        assert_eq!(collection.dropped_organisms, 0);
    }

    #[test]
    fn collects_every_reachable_cell() {
        let feed = SnapshotFeed::new();
        feed.publish(ecosystem_with(vec![plant(1, 2), plant(10, 6)]));
        let collection = SnapshotCollector::new().collect(&feed);
        assert_eq!(collection.cells.len(), 6);
        assert_eq!(
            collection.cells[&CellId(12)],
            CellRecord {
                x: 7,
                y: 9,
                kind: CellKind::Leaf,
                activated: false
            }
        );
    }

    #[test]
    fn shared_cells_are_deduplicated() {
        let shared = Cell::new(CellId(100), 5, 5, CellKind::Seed);
        shared.activate();
        let a = Cell::new(CellId(1), 4, 5, CellKind::Stem);
        let b = Cell::new(CellId(2), 6, 5, CellKind::Stem);
        a.attach(Arc::clone(&shared));
        b.attach(Arc::clone(&shared));
        let eco = ecosystem_with(vec![Organism::new(1, a), Organism::new(2, b)]);

        let (cells, dropped) = collect_cells(&eco);
        assert_eq!(dropped, 0);
        assert_eq!(cells.len(), 3);
        assert!(cells[&CellId(100)].activated);
    }

    #[test]
    fn contended_organism_is_skipped_without_error() {
        let healthy = plant(1, 2);
        let busy = plant(10, 6);
        let eco = ecosystem_with(vec![Arc::clone(&healthy), Arc::clone(&busy)]);

        // Stem of the second plant is mid-mutation: its root is reachable,
        // the rest is not, and the partial walk must not leak into the set.
        let busy_stem = busy.root().children().unwrap().remove(0);
        let _guard = busy_stem.lock_children_for_write();

        let (cells, dropped) = collect_cells(&eco);
        assert_eq!(dropped, 1);
        assert_eq!(cells.len(), 3);
        assert!(!cells.contains_key(&CellId(10)));
        assert!(cells.contains_key(&CellId(1)));
    }

    #[test]
    fn busy_organism_list_renders_nothing_this_frame() {
        let eco = ecosystem_with(vec![plant(1, 2)]);
        let _guard = eco.lock_organisms_for_write();
        let (cells, dropped) = collect_cells(&eco);
        assert!(cells.is_empty());
        assert_eq!(dropped, 0);
    }

    #[test]
    fn same_snapshot_is_observed_across_frames() {
        let feed = SnapshotFeed::new();
        feed.publish(ecosystem_with(vec![plant(1, 2)]));
        let mut collector = SnapshotCollector::new();
        let first = collector.collect(&feed);
        let second = collector.collect(&feed);
        assert!(Arc::ptr_eq(
            first.snapshot.as_ref().unwrap(),
            second.snapshot.as_ref().unwrap()
        ));
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn cyclic_edges_terminate() {
        let a = Cell::new(CellId(1), 0, 0, CellKind::Stem);
        let b = Cell::new(CellId(2), 0, 1, CellKind::Stem);
        a.attach(Arc::clone(&b));
        b.attach(Arc::clone(&a));
        let eco = ecosystem_with(vec![Organism::new(1, Arc::clone(&a))]);
        let (cells, _) = collect_cells(&eco);
        assert_eq!(cells.len(), 2);
        // Break the cycle so the test does not leak.
        b.detach(CellId(1));
    }

    #[test]
    fn dropped_counter_accumulates_until_taken() {
        let busy = plant(1, 2);
        let feed = SnapshotFeed::new();
        feed.publish(ecosystem_with(vec![Arc::clone(&busy)]));
        let _guard = busy.root().lock_children_for_write();

        let mut collector = SnapshotCollector::new();
        collector.collect(&feed);
        collector.collect(&feed);
        assert_eq!(collector.take_dropped(), 2);
        assert_eq!(collector.take_dropped(), 0);
    }
}
// --- End of File: collector.rs ---
