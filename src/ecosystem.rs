// --- File: ecosystem.rs ---
//! Shared world state published by the simulation and read by the renderer.
//!
//! The simulation thread owns and mutates these structures in place. The
//! renderer never takes a blocking lock on them: every read goes through a
//! `try_read`, and a lock that is currently held for writing surfaces as a
//! [`TraversalError`] that the caller is expected to shrug off for one frame.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, TryLockError};

/// Simulation-wide unique cell identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CellKind {
    Leaf,
    Stem,
    Seed,
    Root,
    Other,
}

impl CellKind {
    /// Maps a textual type tag onto a kind; anything unrecognized is `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "leaf" => CellKind::Leaf,
            "stem" => CellKind::Stem,
            "seed" => CellKind::Seed,
            "root" => CellKind::Root,
            _ => CellKind::Other,
        }
    }
}

/// Failure to follow a reference in a graph that is being mutated concurrently.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TraversalError {
    /// The simulation holds the write side of the lock right now.
    Contended,
    /// A writer panicked while holding the lock.
    Poisoned,
}

impl fmt::Display for TraversalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalError::Contended => write!(f, "structure is being mutated"),
            TraversalError::Poisoned => write!(f, "structure was poisoned by a panicking writer"),
        }
    }
}

impl std::error::Error for TraversalError {}

impl<T> From<TryLockError<T>> for TraversalError {
    fn from(err: TryLockError<T>) -> Self {
        match err {
            TryLockError::WouldBlock => TraversalError::Contended,
            TryLockError::Poisoned(_) => TraversalError::Poisoned,
        }
    }
}

// --- Cells ---

#[derive(Debug)]
pub struct Cell {
    id: CellId,
    x: i32,
    y: i32,
    kind: CellKind,
    // Only meaningful for seeds.
    activated: AtomicBool,
    children: RwLock<Vec<Arc<Cell>>>,
}

impl Cell {
    pub fn new(id: CellId, x: i32, y: i32, kind: CellKind) -> Arc<Self> {
        Arc::new(Self {
            id,
            x,
            y,
            kind,
            activated: AtomicBool::new(false),
            children: RwLock::new(Vec::new()),
        })
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Relaxed)
    }

    pub fn activate(&self) {
        self.activated.store(true, Ordering::Relaxed);
    }

    /// Clones the current child list without blocking.
    pub fn children(&self) -> Result<Vec<Arc<Cell>>, TraversalError> {
        let children = self.children.try_read()?;
        Ok(children.clone())
    }

    // --- Writer side (simulation thread) ---

    pub fn attach(&self, child: Arc<Cell>) {
        match self.children.write() {
            Ok(mut children) => children.push(child),
            Err(poisoned) => poisoned.into_inner().push(child),
        }
    }

    /// Removes a direct child, returning whether it was found.
    pub fn detach(&self, id: CellId) -> bool {
        let mut children = match self.children.write() {
            Ok(children) => children,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = children.len();
        children.retain(|c| c.id != id);
        children.len() != before
    }

    /// Test hook: holds the child list for writing so readers observe contention.
    #[doc(hidden)]
    pub fn lock_children_for_write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Cell>>> {
        match self.children.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// --- Organisms ---

#[derive(Debug)]
pub struct Organism {
    id: u64,
    root: Arc<Cell>,
}

impl Organism {
    pub fn new(id: u64, root: Arc<Cell>) -> Arc<Self> {
        Arc::new(Self { id, root })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn root(&self) -> &Arc<Cell> {
        &self.root
    }
}

// --- Time ---

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TemporalCoordinates {
    /// Tick within the current day.
    pub current_tick: u64,
    pub total_ticks: u64,
    pub total_days: u64,
}

// --- Ecosystem (one snapshot) ---

/// A live epoch of the simulation. The renderer treats it as read-only.
#[derive(Debug)]
pub struct Ecosystem {
    name: String,
    width: u32,
    height: u32,
    ticks_per_day: u64,
    total_ticks: AtomicU64,
    organisms: RwLock<Vec<Arc<Organism>>>,
}

impl Ecosystem {
    pub fn new(name: impl Into<String>, width: u32, height: u32, ticks_per_day: u64) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            ticks_per_day: ticks_per_day.max(1),
            total_ticks: AtomicU64::new(0),
            organisms: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn time(&self) -> TemporalCoordinates {
        let total_ticks = self.total_ticks.load(Ordering::Relaxed);
        TemporalCoordinates {
            current_tick: total_ticks % self.ticks_per_day,
            total_ticks,
            total_days: total_ticks / self.ticks_per_day,
        }
    }

    /// Clones the organism list without blocking.
    pub fn organisms(&self) -> Result<Vec<Arc<Organism>>, TraversalError> {
        let organisms = self.organisms.try_read()?;
        Ok(organisms.clone())
    }

    // --- Writer side (simulation thread) ---

    pub fn advance_tick(&self) -> TemporalCoordinates {
        self.total_ticks.fetch_add(1, Ordering::Relaxed);
        self.time()
    }

    /// Applies births and deaths under a single write lock.
    pub fn update_population(&self, born: Vec<Arc<Organism>>, died: &[u64]) {
        if born.is_empty() && died.is_empty() {
            return;
        }
        let mut organisms = match self.organisms.write() {
            Ok(organisms) => organisms,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !died.is_empty() {
            organisms.retain(|o| !died.contains(&o.id));
        }
        organisms.extend(born);
    }

    pub fn population(&self) -> usize {
        match self.organisms.read() {
            Ok(organisms) => organisms.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Test hook: holds the organism list for writing.
    #[doc(hidden)]
    pub fn lock_organisms_for_write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Organism>>> {
        match self.organisms.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// --- Snapshot Feed ---

/// Append-only sequence of epochs. Readers only ever peek at the newest one.
#[derive(Debug, Default)]
pub struct SnapshotFeed {
    epochs: RwLock<Vec<Arc<Ecosystem>>>,
}

impl SnapshotFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, ecosystem: Arc<Ecosystem>) {
        match self.epochs.write() {
            Ok(mut epochs) => epochs.push(ecosystem),
            Err(poisoned) => poisoned.into_inner().push(ecosystem),
        }
    }

    /// Non-blocking peek at the most recently published epoch.
    ///
    /// `Err(Contended)` means a publish is in flight; the item is never removed.
    pub fn peek_latest(&self) -> Result<Option<Arc<Ecosystem>>, TraversalError> {
        let epochs = self.epochs.try_read()?;
        Ok(epochs.last().cloned())
    }

    pub fn len(&self) -> usize {
        match self.epochs.read() {
            Ok(epochs) => epochs.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_map_to_other() {
        assert_eq!(CellKind::from_tag("leaf"), CellKind::Leaf);
        assert_eq!(CellKind::from_tag("root"), CellKind::Root);
        assert_eq!(CellKind::from_tag("bark"), CellKind::Other);
        assert_eq!(CellKind::from_tag(""), CellKind::Other);
    }

    #[test]
    fn time_splits_ticks_into_days() {
        let eco = Ecosystem::new("t", 4, 4, 10);
        for _ in 0..23 {
            eco.advance_tick();
        }
        assert_eq!(
            eco.time(),
            TemporalCoordinates {
                current_tick: 3,
                total_ticks: 23,
                total_days: 2
            }
        );
    }

    #[test]
    fn contended_child_list_reports_contention() {
        let cell = Cell::new(CellId(1), 0, 0, CellKind::Stem);
        cell.attach(Cell::new(CellId(2), 0, -1, CellKind::Leaf));
        let guard = cell.lock_children_for_write();
        assert_eq!(cell.children().unwrap_err(), TraversalError::Contended);
        drop(guard);
        assert_eq!(cell.children().unwrap().len(), 1);
    }

    #[test]
    fn peek_latest_does_not_consume() {
        let feed = SnapshotFeed::new();
        assert!(feed.peek_latest().unwrap().is_none());
        feed.publish(Arc::new(Ecosystem::new("a", 1, 1, 1)));
        feed.publish(Arc::new(Ecosystem::new("b", 1, 1, 1)));
        for _ in 0..3 {
            let latest = feed.peek_latest().unwrap().unwrap();
            assert_eq!(latest.name(), "b");
        }
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn population_updates_apply_births_and_deaths() {
        let eco = Ecosystem::new("p", 8, 8, 1);
        let a = Organism::new(1, Cell::new(CellId(1), 0, 0, CellKind::Root));
        let b = Organism::new(2, Cell::new(CellId(2), 1, 0, CellKind::Root));
        eco.update_population(vec![a, b], &[]);
        eco.update_population(Vec::new(), &[1]);
        let ids: Vec<u64> = eco.organisms().unwrap().iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec![2]);
    }
}
// --- End of File: ecosystem.rs ---
