//! Uniform spatial grid for the collision broad phase
//!
//! The board rectangle is split into `rows x cols` cells. Pegs are indexed
//! once at construction; bodies are cleared and reinserted every substep.

use glam::DVec2;

use super::state::ParticleKind;
use crate::error::{Error, Result};

/// One grid bucket
#[derive(Debug, Clone, Default)]
pub struct Cell {
    bodies: Vec<usize>,
    pegs: Vec<usize>,
}

impl Cell {
    pub fn bodies(&self) -> &[usize] {
        &self.bodies
    }

    pub fn pegs(&self) -> &[usize] {
        &self.pegs
    }
}

/// Uniform grid over `[0, width] x [0, height]`
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cell_size: DVec2,
    /// Column-major: `col * rows + row`
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize, extent: DVec2) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidConfig("grid needs at least one row and column"));
        }
        if !(extent.x > 0.0 && extent.y > 0.0) {
            return Err(Error::InvalidConfig("grid extent must be positive"));
        }

        log::debug!("Grid {}x{} over {}x{}", rows, cols, extent.x, extent.y);
        Ok(Self {
            rows,
            cols,
            cell_size: DVec2::new(extent.x / cols as f64, extent.y / rows as f64),
            cells: vec![Cell::default(); rows * cols],
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cell coordinate `(row, col)` owning a position
    ///
    /// Uses ceiling division, clamped at the upper edge only. A position so
    /// far below or left of the board that the index goes negative is an
    /// invariant violation, as is a non-finite position.
    pub fn locate(&self, pos: DVec2) -> Result<(usize, usize)> {
        let row = (pos.y / self.cell_size.y).ceil();
        let col = (pos.x / self.cell_size.x).ceil();

        if !row.is_finite() || !col.is_finite() || row < 0.0 || col < 0.0 {
            return Err(Error::InvariantViolation {
                position: pos,
                row: row as i64,
                col: col as i64,
            });
        }

        let row = (row as usize).min(self.rows - 1);
        let col = (col as usize).min(self.cols - 1);
        Ok((row, col))
    }

    /// Index `id` into the cell owning `pos`
    pub fn insert(&mut self, pos: DVec2, kind: ParticleKind, id: usize) -> Result<()> {
        let (row, col) = self.locate(pos)?;
        let index = self.index(row, col);
        let cell = &mut self.cells[index];
        match kind {
            ParticleKind::Peg => cell.pegs.push(id),
            ParticleKind::Body => cell.bodies.push(id),
        }
        Ok(())
    }

    /// Empty every body list, keeping the peg index
    pub fn clear_bodies(&mut self) {
        for cell in &mut self.cells {
            cell.bodies.clear();
        }
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(&self.cells[self.index(row, col)])
    }

    /// The cell and its in-range Moore neighbours
    pub fn neighborhood(&self, row: usize, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        (-1isize..=1)
            .flat_map(move |dr| (-1isize..=1).map(move |dc| (dr, dc)))
            .filter_map(move |(dr, dc)| {
                let r = row.checked_add_signed(dr)?;
                let c = col.checked_add_signed(dc)?;
                self.cell_at(r, c)
            })
    }

    /// Coordinates of the outer ring of cells, each visited once
    pub fn border_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (rows, cols) = (self.rows, self.cols);
        (0..rows)
            .flat_map(move |row| (0..cols).map(move |col| (row, col)))
            .filter(move |&(row, col)| row == 0 || row == rows - 1 || col == 0 || col == cols - 1)
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        col * self.rows + row
    }
}
