// --- File: config.rs ---
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::constants::{
    DEFAULT_BASE_POINT_SIZE, DEFAULT_PIXEL_SCALE, DEFAULT_WORLD_HEIGHT, DEFAULT_WORLD_WIDTH,
};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GeneGlConfig {
    pub simulation: SimulationConfig,
    pub viewport: ViewportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SimulationConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub ticks_per_day: u64,
    pub tick_delay_ms: u64,
    pub max_days: u64,
    pub epochs: u32,
    pub initial_population_size: usize,
    /// Seeds carried from one epoch's survivors into the next.
    pub reuse_population_size: usize,
    /// Fixed RNG seed; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: "GeneGL".to_string(),
            width: DEFAULT_WORLD_WIDTH,
            height: DEFAULT_WORLD_HEIGHT,
            ticks_per_day: 10,
            tick_delay_ms: 20,
            max_days: 100,
            epochs: 5,
            initial_population_size: 40,
            reuse_population_size: 20,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ViewportConfig {
    /// Logical pixels per world cell at start-up.
    pub pixel_scale: u32,
    pub base_point_size: f32,
    pub grid_mode: bool,
    pub font_path: Option<PathBuf>,
    pub vsync: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            pixel_scale: DEFAULT_PIXEL_SCALE,
            base_point_size: DEFAULT_BASE_POINT_SIZE,
            grid_mode: true,
            font_path: None,
            vsync: true,
        }
    }
}

impl GeneGlConfig {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text).context("invalid configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let sim = &self.simulation;
        anyhow::ensure!(sim.width > 0 && sim.height > 0, "world dimensions must be non-zero");
        anyhow::ensure!(sim.ticks_per_day > 0, "ticks-per-day must be at least 1");
        anyhow::ensure!(self.viewport.pixel_scale > 0, "pixel-scale must be at least 1");
        Ok(())
    }
}

/// Reads and parses a configuration file.
pub fn load(path: &Path) -> anyhow::Result<GeneGlConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    GeneGlConfig::from_json(&text)
        .with_context(|| format!("failed to load configuration {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = GeneGlConfig::from_json("{}").unwrap();
        assert_eq!(config.simulation.width, DEFAULT_WORLD_WIDTH);
        assert_eq!(config.viewport.pixel_scale, 4);
        assert!(config.viewport.grid_mode);
        assert!(config.viewport.font_path.is_none());
    }

    #[test]
    fn kebab_case_keys_are_read() {
        let config = GeneGlConfig::from_json(
            r#"{
                "simulation": {
                    "name": "meadow",
                    "width": 120,
                    "height": 80,
                    "ticks-per-day": 24,
                    "tick-delay-ms": 5,
                    "max-days": 3,
                    "epochs": 2,
                    "initial-population-size": 7,
                    "reuse-population-size": 4,
                    "seed": 99
                },
                "viewport": { "pixel-scale": 2, "grid-mode": false, "font-path": "f.ttf" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.simulation.name, "meadow");
        assert_eq!(config.simulation.ticks_per_day, 24);
        assert_eq!(config.simulation.initial_population_size, 7);
        assert_eq!(config.simulation.seed, Some(99));
        assert_eq!(config.viewport.pixel_scale, 2);
        assert!(!config.viewport.grid_mode);
        assert_eq!(config.viewport.font_path, Some(PathBuf::from("f.ttf")));
        assert_eq!(config.viewport.base_point_size, DEFAULT_BASE_POINT_SIZE);
    }

    #[test]
    fn zero_sized_world_is_rejected() {
        assert!(GeneGlConfig::from_json(r#"{"simulation": {"width": 0}}"#).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.json"));
    }
}
// --- End of File: config.rs ---
