//! Rectangular tiling of the grid for the parallel collision sweep
//!
//! The grid is cut into `threads x threads` equal tiles; rows or columns left
//! over by the integer division go to two remainder tiles. The partition is
//! checked when it is built, so a sweep never runs on overlapping tiles.

use std::ops::Range;

use crate::error::{Error, Result};

/// Contiguous block of grid cells handled by one sweep task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl Tile {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows
            .clone()
            .flat_map(move |row| self.cols.clone().map(move |col| (row, col)))
    }
}

/// Split a `rows x cols` grid into disjoint tiles covering every cell
pub fn partition(rows: usize, cols: usize, threads: usize) -> Result<Vec<Tile>> {
    if threads == 0 {
        return Err(Error::InvalidConfig("thread_count must be at least 1"));
    }

    let tile_rows = rows / threads;
    let tile_cols = cols / threads;
    let covered_rows = tile_rows * threads;
    let covered_cols = tile_cols * threads;

    let mut tiles = Vec::with_capacity(threads * threads + 2);
    for i in 0..threads {
        for j in 0..threads {
            tiles.push(Tile {
                rows: i * tile_rows..(i + 1) * tile_rows,
                cols: j * tile_cols..(j + 1) * tile_cols,
            });
        }
    }
    // Leftover rows span every column; leftover columns span the tiled rows
    tiles.push(Tile {
        rows: covered_rows..rows,
        cols: 0..cols,
    });
    tiles.push(Tile {
        rows: 0..covered_rows,
        cols: covered_cols..cols,
    });
    tiles.retain(|tile| !tile.is_empty());

    check_cover(rows, cols, &tiles)?;
    log::debug!("Partitioned {}x{} grid into {} tiles", rows, cols, tiles.len());
    Ok(tiles)
}

/// Every cell must belong to exactly one tile
fn check_cover(rows: usize, cols: usize, tiles: &[Tile]) -> Result<()> {
    let mut hits = vec![0u32; rows * cols];
    for tile in tiles {
        for (row, col) in tile.cells() {
            if row >= rows || col >= cols {
                return Err(Error::TileGap { row, col });
            }
            hits[row * cols + col] += 1;
        }
    }
    match hits.iter().position(|&n| n != 1) {
        Some(i) => Err(Error::TileGap {
            row: i / cols,
            col: i % cols,
        }),
        None => Ok(()),
    }
}
