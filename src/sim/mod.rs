//! Deterministic physics core
//!
//! Given the same configuration and seed a run is reproducible regardless of
//! the tile count used by the collision sweep:
//! - Bodies and pegs live in index-addressed arenas
//! - The grid is rebuilt from scratch every substep
//! - A body is only ever mutated by the tile owning its cell

pub mod collision;
pub mod engine;
pub mod grid;
pub mod integrator;
pub mod state;
pub mod tiles;

pub use collision::{DefaultModel, PhysicsModel, contact_angle};
pub use engine::{Engine, Frame, NullRecorder, Recorder, RunSummary};
pub use grid::{Cell, Grid};
pub use integrator::{Kinematics, RungeKutta4};
pub use state::{
    Boundary, Bounds, Particle, ParticleKind, PegDistribution, build_pegs, spawn_bodies,
};
pub use tiles::{Tile, partition};
