use std::sync::Arc;
use std::time::{Duration, Instant};

use genegl::app::prepare_frame;
use genegl::collector::SnapshotCollector;
use genegl::config::SimulationConfig;
use genegl::ecosystem::SnapshotFeed;
use genegl::simulation;

fn busy_config() -> SimulationConfig {
    SimulationConfig {
        width: 96,
        height: 64,
        ticks_per_day: 5,
        tick_delay_ms: 0,
        // Shorter than any lifespan, so every epoch ends populated.
        max_days: 15,
        epochs: 3,
        initial_population_size: 30,
        reuse_population_size: 10,
        seed: Some(2024),
        ..SimulationConfig::default()
    }
}

#[test]
fn frames_stay_consistent_while_the_simulation_mutates() {
    let config = busy_config();
    let feed = Arc::new(SnapshotFeed::new());
    let mut handle = simulation::spawn(config.clone(), Arc::clone(&feed)).unwrap();

    let mut collector = SnapshotCollector::new();
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut frames_with_cells = 0;
    let mut frames = 0;

    while Instant::now() < deadline {
        let frame = prepare_frame(&mut collector, &feed);
        frames += 1;

        assert_eq!(frame.geometry.positions.len(), frame.geometry.colors.len());
        assert_eq!(frame.geometry.point_count(), frame.collection.cells.len());
        for [x, y] in &frame.geometry.positions {
            assert!(*x >= 0.0 && *x < config.width as f32);
            assert!(*y >= 0.0 && *y < config.height as f32);
        }
        if frame.plan.draw {
            frames_with_cells += 1;
        }
    }

    handle.stop();
    assert!(frames > 0);
    assert!(frames_with_cells > 0, "no frame saw any cells in {frames} frames");
}

#[test]
fn stopping_the_producer_leaves_the_last_epoch_readable() {
    let feed = Arc::new(SnapshotFeed::new());
    let mut handle = simulation::spawn(
        SimulationConfig {
            tick_delay_ms: 1,
            ..busy_config()
        },
        Arc::clone(&feed),
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while feed.is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    handle.stop();

    let mut collector = SnapshotCollector::new();
    let first = prepare_frame(&mut collector, &feed);
    let second = prepare_frame(&mut collector, &feed);
    assert!(first.collection.snapshot.is_some());
    // Nothing mutates any more, so consecutive frames agree exactly.
    assert_eq!(first.collection.cells, second.collection.cells);
    assert_eq!(first.collection.dropped_organisms, 0);
}
