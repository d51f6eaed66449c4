//! Galton Board - a particle cascade through a lattice of pegs
//!
//! Core modules:
//! - `sim`: Deterministic physics (grid broad phase, RK4, collisions, engine)
//! - `config`: On-disk simulation configuration
//! - `export`: CSV trajectory and histogram output
//! - `error`: Error taxonomy shared by every stage

pub mod config;
pub mod error;
pub mod export;
pub mod sim;

pub use config::Config;
pub use error::{Error, Result};

use glam::DVec2;

/// 2D vector used for positions, velocities and accelerations
pub type Point = DVec2;

/// Simulation constants
pub mod consts {
    use glam::DVec2;

    /// Standard gravity pointing down the board
    pub const GRAVITY: DVec2 = DVec2::new(0.0, -9.81);

    /// Name of the configuration file inside a project directory
    pub const CONFIG_FILE: &str = "config.json";

    /// Type tag written for boundary polygon points
    pub const BOUNDARY_TAG: u8 = 2;
    /// Nominal radius written for boundary polygon points
    pub const BOUNDARY_RADIUS: f64 = 0.5;
}

/// Squared distance between two centers
#[inline]
pub fn distance_squared(a: Point, b: Point) -> f64 {
    a.distance_squared(b)
}

/// Whether two circles strictly overlap (no square root on the hot path)
#[inline]
pub fn circles_overlap(a: Point, ra: f64, b: Point, rb: f64) -> bool {
    let sum = ra + rb;
    distance_squared(a, b) < sum * sum
}
