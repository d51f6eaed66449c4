//! Simulation configuration
//!
//! Loaded from `config.json` inside a project directory. Keys use the same
//! PascalCase spelling as the configuration files the simulator has always
//! read, so existing projects keep working.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::{CONFIG_FILE, GRAVITY};
use crate::error::{Error, Result};

/// Falling body spawn distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParticleConfig {
    pub n_particles: usize,
    pub radius: f64,
    /// Horizontal spawn jitter (symmetric)
    pub init_delta_x: f64,
    /// Vertical spawn jitter (upward only)
    pub init_delta_y: f64,
    pub init_delta_vx: f64,
    pub init_delta_vy: f64,
    /// Restitution applied on wall bounces
    #[serde(default = "unit_damping")]
    pub damping: f64,
}

fn unit_damping() -> f64 {
    1.0
}

/// Time-driven peg oscillation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Displacement {
    #[serde(rename = "Displacement")]
    pub enabled: bool,
    pub amplitude_x: f64,
    pub amplitude_y: f64,
    pub frequency_x: f64,
    pub frequency_y: f64,
}

impl Displacement {
    /// Oscillation offset from the rest position at time `t`
    pub fn offset_at(&self, t: f64) -> DVec2 {
        DVec2::new(
            self.amplitude_x * (self.frequency_x * t).cos(),
            self.amplitude_y * (self.frequency_y * t).sin(),
        )
    }
}

/// Peg lattice appearance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PegConfig {
    pub min_radius: f64,
    pub max_radius: f64,
    /// Radial restitution applied to bodies bouncing off a peg
    pub damping: f64,
    /// Radius distribution selector, see [`crate::sim::PegDistribution`]
    pub distribution: u32,
    pub delta_factor: f64,
    pub center_factor: i32,
    #[serde(default)]
    pub displacement: Displacement,
}

/// Lattice extents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoardConfig {
    pub vertical_space: f64,
    pub horizontal_space: f64,
    #[serde(rename = "NRows")]
    pub n_rows: usize,
    #[serde(rename = "NCols")]
    pub n_cols: usize,
}

/// Integration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EngineConfig {
    pub sub_steps: usize,
    pub max_steps: usize,
    pub dt: f64,
    /// Tiles per grid axis in the collision sweep
    pub thread_count: usize,
    #[serde(default = "default_gravity")]
    pub gravity: DVec2,
}

fn default_gravity() -> DVec2 {
    GRAVITY
}

/// Output toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaveConfig {
    pub save_paths: bool,
    pub save_histogram: bool,
}

/// Complete configuration for one simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "ParticleConfig")]
    pub particles: ParticleConfig,
    #[serde(rename = "PegConfig")]
    pub pegs: PegConfig,
    #[serde(rename = "BoardConfig")]
    pub board: BoardConfig,
    #[serde(rename = "EngineConfig")]
    pub engine: EngineConfig,
    #[serde(rename = "SaveConfig")]
    pub save: SaveConfig,
    /// Spawn RNG seed; drawn at random when absent
    #[serde(rename = "Seed", default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            particles: ParticleConfig {
                n_particles: 100,
                radius: 1.0,
                init_delta_x: 0.5,
                init_delta_y: 0.0,
                init_delta_vx: 1.0,
                init_delta_vy: 0.0,
                damping: 1.0,
            },
            pegs: PegConfig {
                min_radius: 7.0,
                max_radius: 7.0,
                damping: 0.5,
                distribution: 0,
                delta_factor: 0.1,
                center_factor: 0,
                displacement: Displacement::default(),
            },
            board: BoardConfig {
                vertical_space: 20.0,
                horizontal_space: 20.0,
                n_rows: 20,
                n_cols: 25,
            },
            engine: EngineConfig {
                sub_steps: 2,
                max_steps: 10_000,
                dt: 0.03,
                thread_count: 1,
                gravity: GRAVITY,
            },
            save: SaveConfig {
                save_paths: true,
                save_histogram: true,
            },
            seed: None,
        }
    }
}

impl Config {
    /// Reject values the engine cannot simulate
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg| Err(Error::InvalidConfig(msg));

        if !(self.particles.radius > 0.0) {
            return invalid("particle radius must be positive");
        }
        if self.board.n_rows < 1 {
            return invalid("board needs at least one row");
        }
        if self.board.n_cols < 2 {
            return invalid("board needs at least two columns");
        }
        if !(self.board.horizontal_space > 0.0 && self.board.vertical_space > 0.0) {
            return invalid("lattice spacing must be positive");
        }
        if !(self.pegs.min_radius > 0.0) || self.pegs.max_radius < self.pegs.min_radius {
            return invalid("peg radii must satisfy 0 < min <= max");
        }
        if self.engine.sub_steps == 0 {
            return invalid("sub_steps must be at least 1");
        }
        if self.engine.thread_count == 0 {
            return invalid("thread_count must be at least 1");
        }
        if !(self.engine.dt > 0.0 && self.engine.dt.is_finite()) {
            return invalid("dt must be positive and finite");
        }
        if !self.engine.gravity.is_finite() {
            return invalid("gravity must be finite");
        }
        Ok(())
    }

    /// Load and validate `config.json` from a project directory
    pub fn load(dir: &Path) -> Result<Self> {
        let file = File::open(dir.join(CONFIG_FILE))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration unless one already exists
    ///
    /// Returns whether a file was written.
    pub fn write_default(dir: &Path) -> Result<bool> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            return Ok(false);
        }
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &Self::default())?;
        log::info!("Created default configuration at {}", path.display());
        Ok(true)
    }
}
