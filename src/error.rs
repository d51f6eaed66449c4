//! Error taxonomy for simulation runs
//!
//! Every failure is reported to the run driver, which aborts that run only.

use glam::DVec2;
use thiserror::Error;

/// Errors raised while building or stepping a simulation
#[derive(Debug, Error)]
pub enum Error {
    /// A position could not be mapped onto the grid
    #[error("position ({}, {}) maps outside the grid (row {row}, column {col})", position.x, position.y)]
    InvariantViolation { position: DVec2, row: i64, col: i64 },

    /// Peg radius distribution selector not recognised
    #[error(
        "invalid peg distribution {selector}, valid values are:\n\
         HORIZONTAL DISTRIBUTIONS\n\
         \t0: Uniform distribution\n\
         \t1: Logarithmic distribution\n\
         \t2: Gaussian distribution\n\
         \t3: Inverse Gaussian distribution\n\
         \t4: Sine distribution\n\
         VERTICAL DISTRIBUTIONS\n\
         \t5: Logarithmic distribution\n\
         \t6: Gaussian distribution\n\
         \t7: Inverse Gaussian distribution\n\
         \t8: Sine distribution\n\
         RADIAL DISTRIBUTIONS\n\
         \t9: Spheric distribution\n\
         \t10: Spheric Gaussian distribution"
    )]
    UnknownDistribution { selector: u32 },

    /// A body was claimed by more than one sweep tile
    #[error("body {body} in cell ({row}, {col}) is owned by two tiles")]
    TileOverlap { body: usize, row: usize, col: usize },

    /// A grid cell is covered by no tile or by several
    #[error("cell ({row}, {col}) is not covered exactly once by the tile partition")]
    TileGap { row: usize, col: usize },

    /// Configuration values that cannot be simulated
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
