//! Simulation engine
//!
//! Each substep runs the same pipeline:
//! forces -> integration -> grid rebuild -> parallel collision sweep -> walls.
//! Only the collision sweep fans out; it joins before the wall pass starts.

use std::io;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use rayon::prelude::*;

use super::collision::{DefaultModel, PhysicsModel};
use super::grid::Grid;
use super::state::{Boundary, Bounds, Particle, ParticleKind, build_pegs, spawn_bodies};
use super::tiles::{Tile, partition};
use crate::circles_overlap;
use crate::config::Config;
use crate::error::{Error, Result};

/// Snapshot handed to a [`Recorder`] once per outer step
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub bodies: &'a [Particle],
    pub pegs: &'a [Particle],
    pub boundary: &'a Boundary,
}

/// Sink for trajectory frames and the final histogram
pub trait Recorder {
    fn record_frame(&mut self, _frame: Frame<'_>) -> io::Result<()> {
        Ok(())
    }

    fn record_histogram(&mut self, _counts: &[u32]) -> io::Result<()> {
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullRecorder;

impl Recorder for NullRecorder {}

/// Outcome of [`Engine::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Outer steps executed
    pub steps: usize,
    /// Bodies resting on the floor at the end
    pub terminal: usize,
    /// Stopped before `max_steps` because every body landed
    pub stopped_early: bool,
}

/// Bodies of one cell, exclusively borrowed by the tile that owns the cell
struct CellWork<'a> {
    row: usize,
    col: usize,
    bodies: Vec<&'a mut Particle>,
}

pub struct Engine<M: PhysicsModel = DefaultModel> {
    config: Config,
    bodies: Vec<Particle>,
    pegs: Vec<Particle>,
    boundary: Boundary,
    bounds: Bounds,
    grid: Grid,
    tiles: Vec<Tile>,
    model: M,
    histogram: Vec<u32>,
    time: f64,
}

impl Engine<DefaultModel> {
    /// Build the lattice and spawn bodies from a configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let boundary = Boundary::from_board(&config.board);
        let pegs = build_pegs(&config.pegs, &config.board)?;

        let seed = config.seed.unwrap_or_else(rand::random);
        log::info!(
            "Spawning {} bodies over {} pegs (seed {})",
            config.particles.n_particles,
            pegs.len(),
            seed
        );
        let mut rng = Pcg32::seed_from_u64(seed);
        let bodies = spawn_bodies(&config.particles, boundary.apex(), &mut rng);

        Self::from_parts(config, DefaultModel::default(), bodies, pegs)
    }
}

impl<M: PhysicsModel> Engine<M> {
    /// Assemble an engine from explicit bodies and pegs
    ///
    /// Board extents still come from `config.board`. Pegs are indexed into
    /// the grid here and never re-indexed.
    pub fn from_parts(
        config: Config,
        model: M,
        bodies: Vec<Particle>,
        mut pegs: Vec<Particle>,
    ) -> Result<Self> {
        config.validate()?;
        let boundary = Boundary::from_board(&config.board);
        let mut grid = Grid::new(config.board.n_rows, config.board.n_cols, boundary.extent())?;

        let displacement = &config.pegs.displacement;
        for (id, peg) in pegs.iter_mut().enumerate() {
            if displacement.enabled {
                peg.prev_offset = displacement.offset_at(0.0);
            }
            grid.insert(peg.pos, ParticleKind::Peg, id)?;
        }

        let tiles = partition(grid.rows(), grid.cols(), config.engine.thread_count)?;
        let histogram = vec![0; config.board.n_cols - 1];

        Ok(Self {
            bounds: boundary.bounds(),
            boundary,
            grid,
            tiles,
            model,
            histogram,
            bodies,
            pegs,
            config,
            time: 0.0,
        })
    }

    pub fn bodies(&self) -> &[Particle] {
        &self.bodies
    }

    pub fn pegs(&self) -> &[Particle] {
        &self.pegs
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Landing counts per slot between adjacent peg columns
    pub fn histogram(&self) -> &[u32] {
        &self.histogram
    }

    /// Simulated time elapsed
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            bodies: &self.bodies,
            pegs: &self.pegs,
            boundary: &self.boundary,
        }
    }

    pub fn all_terminal(&self) -> bool {
        self.bodies.iter().all(|b| b.terminal)
    }

    /// Run until `max_steps` outer steps or until every body has landed
    pub fn run(&mut self, recorder: &mut dyn Recorder) -> Result<RunSummary> {
        let sub_steps = self.config.engine.sub_steps;
        let max_steps = self.config.engine.max_steps;
        let dt = self.config.engine.dt / sub_steps as f64;

        let mut steps = 0;
        let mut stopped_early = false;
        while steps < max_steps {
            if self.all_terminal() {
                log::info!("All bodies stopped after {} steps", steps);
                stopped_early = true;
                break;
            }

            for _ in 0..sub_steps {
                self.substep(dt)?;
            }
            if self.config.save.save_paths {
                recorder.record_frame(self.frame())?;
            }
            steps += 1;
        }

        if self.config.save.save_histogram {
            recorder.record_histogram(&self.histogram)?;
        }

        Ok(RunSummary {
            steps,
            terminal: self.bodies.iter().filter(|b| b.terminal).count(),
            stopped_early,
        })
    }

    /// One pass of the full pipeline over `dt`
    pub fn substep(&mut self, dt: f64) -> Result<()> {
        self.apply_forces();
        self.integrate(dt);
        self.rebuild_grid()?;
        self.resolve_collisions()?;
        self.apply_constraints();
        self.time += dt;
        Ok(())
    }

    /// Set gravity on every falling body
    pub fn apply_forces(&mut self) {
        let gravity = self.config.engine.gravity;
        for body in self.bodies.iter_mut().filter(|b| !b.terminal) {
            body.acc = gravity;
        }
    }

    /// Advance falling bodies and oscillating pegs from the current time
    pub fn integrate(&mut self, dt: f64) {
        let t = self.time;
        for body in self.bodies.iter_mut().filter(|b| !b.terminal) {
            self.model.advance_body(body, t, dt);
        }

        let displacement = &self.config.pegs.displacement;
        if displacement.enabled {
            for peg in &mut self.pegs {
                self.model.advance_peg(peg, t, dt, displacement);
            }
        }
    }

    /// Reindex every body, terminal ones included
    pub fn rebuild_grid(&mut self) -> Result<()> {
        self.grid.clear_bodies();
        for (id, body) in self.bodies.iter().enumerate() {
            self.grid.insert(body.pos, ParticleKind::Body, id)?;
        }
        Ok(())
    }

    /// Resolve body-peg overlaps, one task per tile
    ///
    /// Each body is lent to the single tile owning its cell; pegs, grid and
    /// model are shared read-only.
    pub fn resolve_collisions(&mut self) -> Result<()> {
        let Self {
            bodies,
            pegs,
            grid,
            tiles,
            model,
            ..
        } = self;

        let mut slots: Vec<Option<&mut Particle>> = bodies.iter_mut().map(Some).collect();
        let mut work: Vec<Vec<CellWork<'_>>> = Vec::with_capacity(tiles.len());
        for tile in tiles.iter() {
            let mut cells = Vec::new();
            for (row, col) in tile.cells() {
                let Some(cell) = grid.cell_at(row, col) else {
                    return Err(Error::TileGap { row, col });
                };
                let mut owned = Vec::with_capacity(cell.bodies().len());
                for &id in cell.bodies() {
                    let body = slots
                        .get_mut(id)
                        .and_then(Option::take)
                        .ok_or(Error::TileOverlap { body: id, row, col })?;
                    if !body.terminal {
                        owned.push(body);
                    }
                }
                if !owned.is_empty() {
                    cells.push(CellWork { row, col, bodies: owned });
                }
            }
            work.push(cells);
        }

        let grid = &*grid;
        let pegs = pegs.as_slice();
        let model = &*model;
        work.into_par_iter().for_each(|cells| {
            for CellWork { row, col, bodies } in cells {
                for body in bodies {
                    for neighbor in grid.neighborhood(row, col) {
                        for &peg_id in neighbor.pegs() {
                            let peg = &pegs[peg_id];
                            if circles_overlap(body.pos, body.radius, peg.pos, peg.radius) {
                                model.resolve_collision(body, peg);
                            }
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// Wall pass over the border cells, counting floor landings
    pub fn apply_constraints(&mut self) {
        let Self {
            bodies,
            grid,
            bounds,
            histogram,
            config,
            ..
        } = self;
        let spacing = config.board.horizontal_space;
        let last = histogram.len() - 1;

        for (row, col) in grid.border_cells() {
            let Some(cell) = grid.cell_at(row, col) else {
                continue;
            };
            for &id in cell.bodies() {
                let body = &mut bodies[id];
                if body.terminal {
                    continue;
                }
                if let Some(x) = bounds.confine(body) {
                    let bucket = ((x - bounds.x_min) / spacing).floor() as usize;
                    histogram[bucket.min(last)] += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::integrator::{Kinematics, RungeKutta4};
    use glam::DVec2;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.particles.n_particles = 40;
        config.board.n_rows = 6;
        config.board.n_cols = 7;
        config.pegs.min_radius = 3.0;
        config.pegs.max_radius = 3.0;
        config.engine.max_steps = 50;
        config.seed = Some(11);
        config
    }

    #[derive(Default)]
    struct CountingRecorder {
        frames: usize,
        histogram: Option<Vec<u32>>,
    }

    impl Recorder for CountingRecorder {
        fn record_frame(&mut self, frame: Frame<'_>) -> io::Result<()> {
            assert!(!frame.bodies.is_empty());
            self.frames += 1;
            Ok(())
        }

        fn record_histogram(&mut self, counts: &[u32]) -> io::Result<()> {
            self.histogram = Some(counts.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_integration_matches_rk4() {
        let mut engine = Engine::new(small_config()).unwrap();
        let dt = 0.01;
        let before = engine.bodies().to_vec();
        engine.apply_forces();
        engine.integrate(dt);

        let rk = RungeKutta4::default();
        for (old, new) in before.iter().zip(engine.bodies()) {
            let state = Kinematics {
                pos: old.pos,
                vel: old.vel,
                acc: DVec2::new(0.0, -9.81),
            };
            let (pos, vel) = rk.step(0.0, dt, state);
            assert_eq!(new.pos, pos);
            assert_eq!(new.vel, vel);
            let closed = old.pos + old.vel * dt + 0.5 * state.acc * dt * dt;
            assert!((new.pos - closed).length() < 1e-12);
        }
    }

    #[test]
    fn test_terminal_bodies_are_frozen() {
        let mut engine = Engine::new(small_config()).unwrap();
        engine.bodies[0].terminal = true;
        let frozen = engine.bodies[0].clone();
        for _ in 0..10 {
            engine.substep(0.01).unwrap();
        }
        assert_eq!(engine.bodies[0], frozen);
    }

    #[test]
    fn test_all_terminal_stops_before_work() {
        let mut engine = Engine::new(small_config()).unwrap();
        for body in &mut engine.bodies {
            body.terminal = true;
        }
        let before = engine.bodies().to_vec();
        let mut recorder = CountingRecorder::default();
        let summary = engine.run(&mut recorder).unwrap();

        assert_eq!(summary.steps, 0);
        assert!(summary.stopped_early);
        assert_eq!(recorder.frames, 0);
        assert_eq!(engine.time(), 0.0);
        assert_eq!(engine.bodies(), before.as_slice());
    }

    #[test]
    fn test_run_records_one_frame_per_step() {
        let mut config = small_config();
        config.engine.max_steps = 5;
        let mut engine = Engine::new(config).unwrap();
        let mut recorder = CountingRecorder::default();
        let summary = engine.run(&mut recorder).unwrap();

        assert_eq!(summary.steps, 5);
        assert_eq!(recorder.frames, 5);
        assert_eq!(recorder.histogram.map(|h| h.len()), Some(6));
    }

    #[test]
    fn test_toggles_silence_recorder() {
        let mut config = small_config();
        config.engine.max_steps = 3;
        config.save.save_paths = false;
        config.save.save_histogram = false;
        let mut engine = Engine::new(config).unwrap();
        let mut recorder = CountingRecorder::default();
        engine.run(&mut recorder).unwrap();
        assert_eq!(recorder.frames, 0);
        assert!(recorder.histogram.is_none());
    }

    #[test]
    fn test_rebuild_indexes_every_body() {
        let mut engine = Engine::new(small_config()).unwrap();
        engine.rebuild_grid().unwrap();
        let grid = engine.grid();
        let mut ids = Vec::new();
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                ids.extend_from_slice(grid.cell_at(row, col).unwrap().bodies());
            }
        }
        ids.sort_unstable();
        assert_eq!(ids, (0..engine.bodies().len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_floor_landing_increments_bucket() {
        let config = small_config();
        let body = Particle::body(DVec2::new(25.0, -0.5), 1.0, 1.0)
            .with_vel(DVec2::new(0.0, -3.0));
        let mut engine =
            Engine::from_parts(config, DefaultModel::default(), vec![body], Vec::new()).unwrap();
        engine.rebuild_grid().unwrap();
        engine.apply_constraints();

        assert!(engine.bodies()[0].terminal);
        assert_eq!(engine.histogram()[1], 1);
        assert_eq!(engine.histogram().iter().sum::<u32>(), 1);

        // Landing is counted once
        engine.apply_constraints();
        assert_eq!(engine.histogram().iter().sum::<u32>(), 1);
    }

    #[test]
    fn test_oscillating_pegs_move_but_stay_indexed() {
        let mut config = small_config();
        config.pegs.displacement.enabled = true;
        config.pegs.displacement.amplitude_x = 1.0;
        config.pegs.displacement.frequency_x = 2.0;
        let mut engine = Engine::new(config).unwrap();
        let rest: Vec<_> = engine.pegs().iter().map(|p| p.pos).collect();
        let indexed: usize = (0..engine.grid().rows())
            .flat_map(|r| (0..engine.grid().cols()).map(move |c| (r, c)))
            .map(|(r, c)| engine.grid().cell_at(r, c).unwrap().pegs().len())
            .sum();

        for _ in 0..20 {
            engine.substep(0.05).unwrap();
        }
        assert!(engine.pegs().iter().zip(&rest).any(|(p, r)| p.pos != *r));
        let after: usize = (0..engine.grid().rows())
            .flat_map(|r| (0..engine.grid().cols()).map(move |c| (r, c)))
            .map(|(r, c)| engine.grid().cell_at(r, c).unwrap().pegs().len())
            .sum();
        assert_eq!(indexed, after);
    }

    #[test]
    fn test_body_outside_board_is_fatal_for_run() {
        let config = small_config();
        let body = Particle::body(DVec2::new(-500.0, 10.0), 1.0, 1.0);
        let mut engine =
            Engine::from_parts(config, DefaultModel::default(), vec![body], Vec::new()).unwrap();
        let err = engine.run(&mut NullRecorder).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation { .. }));
    }
}
