// --- File: simulation.rs ---
//! Demo plant-growth engine that feeds the renderer.
//!
//! Each organism starts as a single root cell at the soil surface and grows
//! roots downward, stems upward, leaves beside its stems and seeds on top.
//! Seeds ripen, turn active, and are finally ejected to found new organisms.
//! Everything is mutated in place on the simulation thread while the
//! renderer reads it, which is exactly the access pattern the collector has
//! to tolerate.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimulationConfig;
use crate::constants::GROUND_LEVEL_FRACTION;
use crate::ecosystem::{Cell, CellId, CellKind, Ecosystem, Organism, SnapshotFeed};

pub type GridKey = (i32, i32);
pub type SimRng = StdRng;

// --- Growth Tuning ---
const BASE_ENERGY_PER_TICK: f32 = 0.15;
const LEAF_ENERGY_PER_TICK: f32 = 0.08;
const GROWTH_COST: f32 = 1.0;
const SEED_COST: f32 = 4.0;
const MAX_CELLS_PER_PLANT: usize = 160;
const MIN_LIFESPAN_DAYS: u64 = 20;
const MAX_LIFESPAN_DAYS: u64 = 45;
const SEED_ACTIVATION_TICKS: u64 = 40;
const SEED_EJECTION_TICKS: u64 = 90;
const SEED_EJECTION_RANGE: i32 = 12;
const MAX_POPULATION: usize = 2_000;

struct Seed {
    cell: Arc<Cell>,
    parent: Arc<Cell>,
    age: u64,
}

struct Plant {
    organism: Arc<Organism>,
    // Growth candidates (every non-seed cell).
    cells: Vec<Arc<Cell>>,
    seeds: Vec<Seed>,
    leaves: usize,
    age: u64,
    lifespan: u64,
    energy: f32,
}

/// Grid bookkeeping shared by all plants of one epoch.
struct Soil {
    occupied: HashSet<GridKey>,
    next_cell_id: u64,
    width: i32,
    height: i32,
    ground: i32,
}

impl Soil {
    fn is_free(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height && !self.occupied.contains(&(x, y))
    }

    fn claim(&mut self, x: i32, y: i32, kind: CellKind) -> Option<Arc<Cell>> {
        if !self.is_free(x, y) {
            return None;
        }
        self.occupied.insert((x, y));
        let id = CellId(self.next_cell_id);
        self.next_cell_id += 1;
        Some(Cell::new(id, x, y, kind))
    }

    fn release(&mut self, cell: &Cell) {
        self.occupied.remove(&cell.position());
    }
}

pub struct SimulationState {
    ecosystem: Arc<Ecosystem>,
    rng: SimRng,
    soil: Soil,
    plants: Vec<Plant>,
    ticks_per_day: u64,
    next_organism_id: u64,
    // Reused per tick.
    born_buffer: Vec<Plant>,
    died_buffer: Vec<u64>,
    ejected_buffer: Vec<i32>,
}

impl SimulationState {
    /// Plants one founder per x coordinate in `founders` at the soil surface.
    pub fn new(
        ecosystem: Arc<Ecosystem>,
        config: &SimulationConfig,
        rng: SimRng,
        founders: &[i32],
    ) -> Self {
        let (width, height) = ecosystem.dimensions();
        let ground = ((height as f32 * GROUND_LEVEL_FRACTION) as i32).clamp(0, height as i32 - 1);
        let mut state = Self {
            ecosystem,
            rng,
            soil: Soil {
                occupied: HashSet::new(),
                next_cell_id: 1,
                width: width as i32,
                height: height as i32,
                ground,
            },
            plants: Vec::with_capacity(founders.len()),
            ticks_per_day: config.ticks_per_day.max(1),
            next_organism_id: 1,
            born_buffer: Vec::new(),
            died_buffer: Vec::new(),
            ejected_buffer: Vec::new(),
        };
        for &x in founders {
            if let Some(plant) = state.found_plant(x) {
                state.born_buffer.push(plant);
            }
        }
        state.commit_population();
        state
    }

    pub fn ecosystem(&self) -> &Arc<Ecosystem> {
        &self.ecosystem
    }

    pub fn ground_level(&self) -> i32 {
        self.soil.ground
    }

    pub fn population(&self) -> usize {
        self.plants.len()
    }

    /// X coordinates of up to `limit` living organisms, oldest first.
    pub fn survivor_positions(&self, limit: usize) -> Vec<i32> {
        self.plants
            .iter()
            .take(limit)
            .map(|p| p.organism.root().position().0)
            .collect()
    }

    fn found_plant(&mut self, x: i32) -> Option<Plant> {
        if self.plants.len() + self.born_buffer.len() >= MAX_POPULATION {
            return None;
        }
        let root = self.soil.claim(x, self.soil.ground, CellKind::Root)?;
        let id = self.next_organism_id;
        self.next_organism_id += 1;
        let lifespan_days = self.rng.gen_range(MIN_LIFESPAN_DAYS..=MAX_LIFESPAN_DAYS);
        Some(Plant {
            organism: Organism::new(id, Arc::clone(&root)),
            cells: vec![root],
            seeds: Vec::new(),
            leaves: 0,
            age: 0,
            lifespan: lifespan_days * self.ticks_per_day,
            energy: GROWTH_COST,
        })
    }

    /// Advances the world by one tick.
    pub fn tick(&mut self) {
        self.ecosystem.advance_tick();

        let Self {
            plants,
            rng,
            soil,
            died_buffer,
            ejected_buffer,
            ..
        } = self;

        for plant in plants.iter_mut() {
            plant.age += 1;
            if plant.age > plant.lifespan {
                died_buffer.push(plant.organism.id());
                continue;
            }
            plant.energy += BASE_ENERGY_PER_TICK + LEAF_ENERGY_PER_TICK * plant.leaves as f32;
            if plant.energy >= GROWTH_COST && plant.cells.len() < MAX_CELLS_PER_PLANT {
                grow(plant, rng, soil);
            }
            ripen_seeds(plant, soil, ejected_buffer);
        }

        // Dead plants give their ground back.
        if !died_buffer.is_empty() {
            let died: &[u64] = died_buffer;
            plants.retain(|plant| {
                if !died.contains(&plant.organism.id()) {
                    return true;
                }
                for cell in &plant.cells {
                    soil.release(cell);
                }
                for seed in &plant.seeds {
                    soil.release(&seed.cell);
                }
                false
            });
        }

        let mut ejected = std::mem::take(&mut self.ejected_buffer);
        for seed_x in ejected.drain(..) {
            let offset = self.rng.gen_range(-SEED_EJECTION_RANGE..=SEED_EJECTION_RANGE);
            if let Some(plant) = self.found_plant(seed_x + offset) {
                self.born_buffer.push(plant);
            }
        }
        self.ejected_buffer = ejected;

        self.commit_population();
    }

    fn commit_population(&mut self) {
        let born: Vec<Arc<Organism>> = self
            .born_buffer
            .iter()
            .map(|p| Arc::clone(&p.organism))
            .collect();
        self.ecosystem.update_population(born, &self.died_buffer);
        self.plants.append(&mut self.born_buffer);
        self.died_buffer.clear();
    }
}

fn grow(plant: &mut Plant, rng: &mut SimRng, soil: &mut Soil) {
    let parent = Arc::clone(&plant.cells[rng.gen_range(0..plant.cells.len())]);
    let (x, y) = parent.position();
    let sprout = parent.id() == plant.organism.root().id() && rng.gen_bool(0.5);

    let (kind, tx, ty) = match parent.kind() {
        CellKind::Root if sprout => (CellKind::Stem, x, y - 1),
        CellKind::Root => (CellKind::Root, x + rng.gen_range(-1..=1), y + 1),
        CellKind::Stem => match rng.gen_range(0..10) {
            0..=4 => (CellKind::Stem, x + rng.gen_range(-1..=1) * rng.gen_range(0..=1), y - 1),
            5..=7 => (CellKind::Leaf, x + if rng.gen_bool(0.5) { 1 } else { -1 }, y),
            _ if plant.energy >= SEED_COST => (CellKind::Seed, x, y - 1),
            _ => return,
        },
        CellKind::Leaf | CellKind::Seed | CellKind::Other => return,
    };

    // Shoots stay above the soil, roots below it.
    let above_ground = ty < soil.ground;
    if (kind == CellKind::Root) == above_ground {
        return;
    }

    let Some(child) = soil.claim(tx, ty, kind) else {
        return;
    };
    parent.attach(Arc::clone(&child));
    match kind {
        CellKind::Seed => {
            plant.energy -= SEED_COST;
            plant.seeds.push(Seed {
                cell: child,
                parent,
                age: 0,
            });
        }
        CellKind::Leaf => {
            plant.energy -= GROWTH_COST;
            plant.leaves += 1;
            plant.cells.push(child);
        }
        _ => {
            plant.energy -= GROWTH_COST;
            plant.cells.push(child);
        }
    }
}

fn ripen_seeds(plant: &mut Plant, soil: &mut Soil, ejected: &mut Vec<i32>) {
    plant.seeds.retain_mut(|seed| {
        seed.age += 1;
        if seed.age == SEED_ACTIVATION_TICKS {
            seed.cell.activate();
        }
        if seed.age < SEED_EJECTION_TICKS {
            return true;
        }
        seed.parent.detach(seed.cell.id());
        soil.release(&seed.cell);
        ejected.push(seed.cell.position().0);
        false
    });
}

// --- Threaded Runner ---

/// Owns the simulation thread; stops and joins it on drop.
pub struct SimulationHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SimulationHandle {
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("simulation thread panicked");
            }
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs every configured epoch on a dedicated thread, publishing each new
/// epoch into `feed` as it starts.
pub fn spawn(
    config: SimulationConfig,
    feed: Arc<SnapshotFeed>,
) -> std::io::Result<SimulationHandle> {
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);
    let thread = std::thread::Builder::new()
        .name("simulation".to_string())
        .spawn(move || run_epochs(&config, &feed, &thread_stop))?;
    Ok(SimulationHandle {
        stop,
        thread: Some(thread),
    })
}

fn run_epochs(config: &SimulationConfig, feed: &SnapshotFeed, stop: &AtomicBool) {
    let mut rng = match config.seed {
        Some(seed) => SimRng::seed_from_u64(seed),
        None => SimRng::from_entropy(),
    };
    let delay = Duration::from_millis(config.tick_delay_ms);
    let mut survivors: Vec<i32> = Vec::new();

    for epoch in 0..config.epochs {
        let name = if config.epochs > 1 {
            format!("{} (epoch {})", config.name, epoch + 1)
        } else {
            config.name.clone()
        };
        let ecosystem = Arc::new(Ecosystem::new(
            name,
            config.width,
            config.height,
            config.ticks_per_day,
        ));

        let mut founders = survivors.clone();
        while founders.len() < config.initial_population_size.max(survivors.len()) {
            founders.push(rng.gen_range(0..config.width as i32));
        }
        let epoch_rng = SimRng::seed_from_u64(rng.gen_range(0..u64::MAX));
        let mut state = SimulationState::new(Arc::clone(&ecosystem), config, epoch_rng, &founders);
        feed.publish(Arc::clone(&ecosystem));
        log::info!(
            "epoch {}/{} started with {} organisms",
            epoch + 1,
            config.epochs,
            state.population()
        );

        while !stop.load(Ordering::Relaxed) && ecosystem.time().total_days < config.max_days {
            state.tick();
            if state.population() == 0 {
                log::info!("epoch {} died out", epoch + 1);
                break;
            }
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
        if stop.load(Ordering::Relaxed) {
            return;
        }
        survivors = state.survivor_positions(config.reuse_population_size);
    }
    log::info!("simulation finished after {} epochs", config.epochs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::collect_cells;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            width: 64,
            height: 48,
            ticks_per_day: 4,
            tick_delay_ms: 0,
            max_days: 2,
            epochs: 1,
            initial_population_size: 6,
            reuse_population_size: 3,
            seed: Some(7),
            ..SimulationConfig::default()
        }
    }

    fn state(founders: &[i32]) -> SimulationState {
        let config = small_config();
        let eco = Arc::new(Ecosystem::new("t", config.width, config.height, config.ticks_per_day));
        SimulationState::new(eco, &config, SimRng::seed_from_u64(3), founders)
    }

    #[test]
    fn founders_are_published_immediately() {
        let state = state(&[5, 10, 15]);
        assert_eq!(state.population(), 3);
        assert_eq!(state.ecosystem().population(), 3);
        let (cells, _) = collect_cells(state.ecosystem());
        assert_eq!(cells.len(), 3);
        assert!(cells.values().all(|c| c.kind == CellKind::Root && c.y == state.ground_level()));
    }

    #[test]
    fn duplicate_founder_positions_collapse() {
        assert_eq!(state(&[5, 5, 5]).population(), 1);
    }

    #[test]
    fn growth_respects_bounds_and_soil_line() {
        let mut state = state(&[2, 20, 40, 61]);
        // Shorter than the minimum lifespan so every founder is still alive.
        for _ in 0..60 {
            state.tick();
        }
        let ground = state.ground_level();
        let (cells, dropped) = collect_cells(state.ecosystem());
        assert_eq!(dropped, 0);
        assert!(cells.len() > state.population());

        let mut positions = HashSet::new();
        for cell in cells.values() {
            assert!(cell.x >= 0 && cell.x < 64 && cell.y >= 0 && cell.y < 48);
            match cell.kind {
                CellKind::Root => assert!(cell.y >= ground),
                _ => assert!(cell.y < ground, "{:?} at {} is underground", cell.kind, cell.y),
            }
            assert!(positions.insert((cell.x, cell.y)), "two cells share a grid square");
        }
    }

    #[test]
    fn time_advances_per_tick() {
        let mut state = state(&[1]);
        for _ in 0..9 {
            state.tick();
        }
        let time = state.ecosystem().time();
        assert_eq!(time.total_ticks, 9);
        assert_eq!(time.total_days, 2);
        assert_eq!(time.current_tick, 1);
    }

    #[test]
    fn plants_die_of_old_age() {
        let mut state = state(&[1, 30]);
        let max_lifespan = MAX_LIFESPAN_DAYS * 4;
        for _ in 0..=max_lifespan {
            state.tick();
        }
        // Founders are gone; anything alive now was born from an ejected seed.
        let ids: Vec<u64> = state
            .ecosystem()
            .organisms()
            .unwrap()
            .iter()
            .map(|o| o.id())
            .collect();
        assert!(!ids.contains(&1) && !ids.contains(&2));
    }

    #[test]
    fn threaded_runner_publishes_and_stops() {
        let feed = Arc::new(SnapshotFeed::new());
        let mut handle = spawn(small_config(), Arc::clone(&feed)).unwrap();
        handle.stop();
        assert!(feed.len() <= 1);
    }
}
// --- End of File: simulation.rs ---
