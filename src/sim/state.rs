//! Entity model: bodies, pegs and the board boundary
//!
//! Bodies and pegs share one physical record, told apart by [`ParticleKind`].
//! Both live in arenas addressed by stable index for the whole run.

use glam::DVec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::config::{BoardConfig, ParticleConfig, PegConfig};
use crate::error::{Error, Result};

/// What a particle record represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Peg,
    Body,
}

impl ParticleKind {
    /// Numeric tag used by the trajectory export
    pub fn tag(self) -> u8 {
        match self {
            ParticleKind::Peg => 0,
            ParticleKind::Body => 1,
        }
    }
}

/// A falling body or a peg
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub pos: DVec2,
    pub vel: DVec2,
    pub acc: DVec2,
    /// Restitution: wall bounces for bodies, radial response for pegs
    pub damping: f64,
    pub radius: f64,
    pub kind: ParticleKind,
    /// Reached the floor; frozen for the rest of the run
    pub terminal: bool,
    /// Oscillation offset applied at the previous peg update
    pub prev_offset: DVec2,
}

impl Particle {
    /// A body at rest
    pub fn body(pos: DVec2, radius: f64, damping: f64) -> Self {
        Self {
            pos,
            vel: DVec2::ZERO,
            acc: DVec2::ZERO,
            damping,
            radius,
            kind: ParticleKind::Body,
            terminal: false,
            prev_offset: DVec2::ZERO,
        }
    }

    pub fn peg(pos: DVec2, radius: f64, damping: f64) -> Self {
        Self {
            kind: ParticleKind::Peg,
            ..Self::body(pos, radius, damping)
        }
    }

    /// Builder-style initial velocity
    pub fn with_vel(mut self, vel: DVec2) -> Self {
        self.vel = vel;
        self
    }
}

/// How peg radii vary across the lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PegDistribution {
    Uniform,
    LogarithmicHorizontal,
    GaussianHorizontal,
    InverseGaussianHorizontal,
    SineHorizontal,
    LogarithmicVertical,
    GaussianVertical,
    InverseGaussianVertical,
    SineVertical,
    Spheric,
    SphericGaussian,
}

impl TryFrom<u32> for PegDistribution {
    type Error = Error;

    fn try_from(selector: u32) -> Result<Self> {
        use PegDistribution::*;
        Ok(match selector {
            0 => Uniform,
            1 => LogarithmicHorizontal,
            2 => GaussianHorizontal,
            3 => InverseGaussianHorizontal,
            4 => SineHorizontal,
            5 => LogarithmicVertical,
            6 => GaussianVertical,
            7 => InverseGaussianVertical,
            8 => SineVertical,
            9 => Spheric,
            10 => SphericGaussian,
            _ => return Err(Error::UnknownDistribution { selector }),
        })
    }
}

impl PegDistribution {
    /// Peg radius at a lattice position
    pub fn radius(self, pegs: &PegConfig, board: &BoardConfig, row: usize, col: usize) -> f64 {
        use PegDistribution::*;

        let min = pegs.min_radius;
        let span = pegs.max_radius - pegs.min_radius;
        let half_cols = (board.n_cols / 2) as i64;
        let half_rows = (board.n_rows / 2) as i64;
        let dx = col as i64 - half_cols;
        let dy = row as i64 - half_rows;
        let gauss = |x: f64| (-pegs.delta_factor * (x - pegs.center_factor as f64).powi(2)).exp();
        let sine = |i: usize| (i as f64 * pegs.delta_factor).sin().powi(2);

        match self {
            Uniform => min,
            LogarithmicHorizontal => min + log_profile(dx, half_cols) * span,
            LogarithmicVertical => min + log_profile(dy, half_rows) * span,
            GaussianHorizontal => min + span * gauss(dx as f64),
            GaussianVertical => min + span * gauss(dy as f64),
            InverseGaussianHorizontal => pegs.max_radius - span * gauss(dx as f64),
            InverseGaussianVertical => pegs.max_radius - span * gauss(dy as f64),
            SineHorizontal => min + span * sine(col),
            SineVertical => min + span * sine(row),
            Spheric => {
                let d_max = ((half_cols * half_cols + half_rows * half_rows) as f64).sqrt();
                if d_max == 0.0 {
                    return min;
                }
                let d = ((dx * dx + dy * dy) as f64).sqrt();
                min + span * (d / d_max).min(1.0)
            }
            SphericGaussian => {
                let d = ((dx * dx + dy * dy) as f64).sqrt();
                min + span * gauss(d)
            }
        }
    }
}

/// Logarithmic growth away from the centre line, symmetric on both sides
fn log_profile(offset: i64, half: i64) -> f64 {
    if half == 0 {
        return 0.0;
    }
    // Offsets are shifted away from zero so the centre peg sits at ln(1) = 0
    let x = offset.unsigned_abs() as f64 + 1.0;
    x.ln() / (half as f64 + 1.0).ln()
}

/// Build the peg lattice
///
/// Alternate rows are offset by half the horizontal spacing and drop their
/// last column so every row stays inside the board.
pub fn build_pegs(pegs: &PegConfig, board: &BoardConfig) -> Result<Vec<Particle>> {
    let distribution = PegDistribution::try_from(pegs.distribution)?;
    let mut out = Vec::with_capacity(board.n_rows * board.n_cols);

    for row in 0..board.n_rows {
        let offset_row = row % 2 != 0;
        for col in 0..board.n_cols {
            if offset_row && col == board.n_cols - 1 {
                continue;
            }
            let mut x = col as f64 * board.horizontal_space;
            if offset_row {
                x += board.horizontal_space / 2.0;
            }
            let y = row as f64 * board.vertical_space;
            let radius = distribution.radius(pegs, board, row, col);
            out.push(Particle::peg(DVec2::new(x, y), radius, pegs.damping));
        }
    }

    Ok(out)
}

/// Spawn bodies around a point with the configured jitter
pub fn spawn_bodies(config: &ParticleConfig, spawn: DVec2, rng: &mut Pcg32) -> Vec<Particle> {
    (0..config.n_particles)
        .map(|_| {
            let vx = config.init_delta_vx * (2.0 * rng.random::<f64>() - 1.0);
            let vy = config.init_delta_vy * rng.random::<f64>();
            let x = config.init_delta_x * (2.0 * rng.random::<f64>() - 1.0);
            let y = config.init_delta_y * rng.random::<f64>();
            Particle::body(spawn + DVec2::new(x, y), config.radius, config.damping)
                .with_vel(DVec2::new(vx, vy))
        })
        .collect()
}

/// Funnel outline used for export
///
/// Points: apex, top-right, bottom-right, bottom-left, top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub points: [DVec2; 5],
}

impl Boundary {
    pub fn from_board(board: &BoardConfig) -> Self {
        let width = board.horizontal_space * (board.n_cols - 1) as f64;
        let height = board.vertical_space * (board.n_rows + 1) as f64;
        Self {
            points: [
                DVec2::new(width / 2.0, height),
                DVec2::new(width, height),
                DVec2::new(width, 0.0),
                DVec2::ZERO,
                DVec2::new(0.0, height),
            ],
        }
    }

    /// Spawn point for new bodies
    pub fn apex(&self) -> DVec2 {
        self.points[0]
    }

    /// Board rectangle size
    pub fn extent(&self) -> DVec2 {
        self.points[1]
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            x_min: self.points[3].x,
            x_max: self.points[1].x,
            y_min: self.points[3].y,
            y_max: self.points[1].y,
        }
    }
}

/// Scalar wall positions for constraint checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    /// Keep a body inside the walls
    ///
    /// Each wall is corrected independently. Crossing the floor marks the
    /// body terminal and returns its landing x.
    pub fn confine(&self, body: &mut Particle) -> Option<f64> {
        let r = body.radius;
        let mut landed = None;

        if body.pos.x - r < self.x_min {
            body.pos.x = self.x_min + r;
            body.vel.x = -body.vel.x * body.damping;
        }
        if body.pos.x + r > self.x_max {
            body.pos.x = self.x_max - r;
            body.vel.x = -body.vel.x * body.damping;
        }
        if body.pos.y - r < self.y_min {
            body.pos.y = self.y_min + r;
            body.vel.y = -body.vel.y * body.damping;
            body.terminal = true;
            landed = Some(body.pos.x);
        }
        if body.pos.y + r > self.y_max {
            body.pos.y = self.y_max - r;
            body.vel.y = -body.vel.y * body.damping;
        }

        landed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::SeedableRng;

    fn board(rows: usize, cols: usize) -> BoardConfig {
        BoardConfig {
            vertical_space: 20.0,
            horizontal_space: 10.0,
            n_rows: rows,
            n_cols: cols,
        }
    }

    #[test]
    fn test_lattice_layout() {
        let config = Config::default();
        let pegs = build_pegs(&config.pegs, &board(3, 4)).unwrap();
        // Offset row skips its last column
        assert_eq!(pegs.len(), 4 + 3 + 4);
        assert_eq!(pegs[0].pos, DVec2::new(0.0, 0.0));
        assert_eq!(pegs[4].pos, DVec2::new(5.0, 20.0));
        assert_eq!(pegs[6].pos, DVec2::new(25.0, 20.0));
        assert_eq!(pegs[7].pos, DVec2::new(0.0, 40.0));
        assert!(pegs.iter().all(|p| p.kind == ParticleKind::Peg));
        assert!(pegs.iter().all(|p| p.damping == config.pegs.damping));
    }

    #[test]
    fn test_uniform_radius_is_constant() {
        let mut config = Config::default();
        config.pegs.min_radius = 5.0;
        config.pegs.max_radius = 5.0;
        config.pegs.distribution = 0;
        let pegs = build_pegs(&config.pegs, &board(7, 9)).unwrap();
        assert!(pegs.iter().all(|p| p.radius == 5.0));
    }

    #[test]
    fn test_unknown_distribution_rejected() {
        let mut config = Config::default();
        config.pegs.distribution = 11;
        let err = build_pegs(&config.pegs, &board(2, 3)).unwrap_err();
        assert!(matches!(err, Error::UnknownDistribution { selector: 11 }));
    }

    #[test]
    fn test_distributions_stay_within_radius_range() {
        let mut config = Config::default();
        config.pegs.min_radius = 2.0;
        config.pegs.max_radius = 6.0;
        let b = board(9, 11);
        for selector in 0..=10 {
            config.pegs.distribution = selector;
            for peg in build_pegs(&config.pegs, &b).unwrap() {
                assert!(
                    peg.radius >= 2.0 - 1e-9 && peg.radius <= 6.0 + 1e-9,
                    "selector {selector} produced radius {}",
                    peg.radius
                );
            }
        }
    }

    #[test]
    fn test_gaussian_peaks_at_centre_column() {
        let mut config = Config::default();
        config.pegs.min_radius = 1.0;
        config.pegs.max_radius = 4.0;
        let b = board(3, 11);
        let centre = PegDistribution::GaussianHorizontal.radius(&config.pegs, &b, 0, 5);
        let edge = PegDistribution::GaussianHorizontal.radius(&config.pegs, &b, 0, 0);
        assert!((centre - 4.0).abs() < 1e-12);
        assert!(edge < centre);

        let inverse = PegDistribution::InverseGaussianHorizontal.radius(&config.pegs, &b, 0, 5);
        assert!((inverse - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_logarithmic_is_symmetric() {
        let mut config = Config::default();
        config.pegs.min_radius = 1.0;
        config.pegs.max_radius = 3.0;
        let b = board(3, 11);
        let left = PegDistribution::LogarithmicHorizontal.radius(&config.pegs, &b, 0, 3);
        let right = PegDistribution::LogarithmicHorizontal.radius(&config.pegs, &b, 0, 7);
        let centre = PegDistribution::LogarithmicHorizontal.radius(&config.pegs, &b, 0, 5);
        assert!((left - right).abs() < 1e-12);
        assert_eq!(centre, 1.0);
        assert!(left > centre);
    }

    #[test]
    fn test_boundary_funnel() {
        let boundary = Boundary::from_board(&board(4, 5));
        assert_eq!(boundary.apex(), DVec2::new(20.0, 100.0));
        assert_eq!(boundary.points[2], DVec2::new(40.0, 0.0));
        assert_eq!(boundary.points[4], DVec2::new(0.0, 100.0));
        let bounds = boundary.bounds();
        assert_eq!((bounds.x_min, bounds.x_max), (0.0, 40.0));
        assert_eq!((bounds.y_min, bounds.y_max), (0.0, 100.0));
    }

    #[test]
    fn test_spawn_is_deterministic_and_jittered() {
        let config = Config::default().particles;
        let apex = DVec2::new(50.0, 100.0);
        let a = spawn_bodies(&config, apex, &mut Pcg32::seed_from_u64(7));
        let b = spawn_bodies(&config, apex, &mut Pcg32::seed_from_u64(7));
        assert_eq!(a, b);
        assert_eq!(a.len(), config.n_particles);
        for body in &a {
            assert!((body.pos.x - apex.x).abs() <= config.init_delta_x);
            assert_eq!(body.pos.y, apex.y);
            assert!(body.vel.x.abs() <= config.init_delta_vx);
            assert_eq!(body.kind, ParticleKind::Body);
        }
    }

    #[test]
    fn test_confine_floor_terminates() {
        let bounds = Bounds { x_min: 0.0, x_max: 40.0, y_min: 0.0, y_max: 100.0 };
        let mut body = Particle::body(DVec2::new(12.0, -0.5), 1.0, 0.5)
            .with_vel(DVec2::new(0.0, -4.0));
        assert_eq!(bounds.confine(&mut body), Some(12.0));
        assert!(body.terminal);
        assert_eq!(body.pos.y, 1.0);
        assert_eq!(body.vel.y, 2.0);
    }

    #[test]
    fn test_confine_corner_applies_both_walls() {
        let bounds = Bounds { x_min: 0.0, x_max: 40.0, y_min: 0.0, y_max: 100.0 };
        let mut body = Particle::body(DVec2::new(40.5, 100.5), 1.0, 1.0)
            .with_vel(DVec2::new(3.0, 2.0));
        assert_eq!(bounds.confine(&mut body), None);
        assert!(!body.terminal);
        assert_eq!(body.pos, DVec2::new(39.0, 99.0));
        assert_eq!(body.vel, DVec2::new(-3.0, -2.0));
    }
}
