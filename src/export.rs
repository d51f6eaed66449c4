//! CSV trajectory and histogram output
//!
//! Files are never overwritten: each run picks the first free
//! `paths-N.csv` / `histogram-N.csv` in the project directory.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::SaveConfig;
use crate::consts::{BOUNDARY_RADIUS, BOUNDARY_TAG};
use crate::sim::{Frame, Particle, Recorder};

/// Buffer size for trajectory output
const BUFFER_SIZE: usize = 512 * 1024;

/// Write one trajectory frame
///
/// A header gives the row count, then bodies, pegs and boundary points
/// follow with a running index.
pub fn write_frame<W: Write>(w: &mut W, frame: Frame<'_>) -> io::Result<()> {
    let total = frame.bodies.len() + frame.pegs.len() + frame.boundary.points.len();
    write!(w, "{}\naver\n", total)?;

    let particles = frame.bodies.iter().chain(frame.pegs);
    for (index, particle) in particles.enumerate() {
        write_row(w, index, particle.kind.tag(), particle)?;
    }

    let offset = frame.bodies.len() + frame.pegs.len();
    for (i, point) in frame.boundary.points.iter().enumerate() {
        writeln!(
            w,
            "{} \t {} \t {:.6} \t {:.6} \t {:.6} ",
            offset + i,
            BOUNDARY_TAG,
            point.x,
            point.y,
            BOUNDARY_RADIUS
        )?;
    }
    Ok(())
}

fn write_row<W: Write>(w: &mut W, index: usize, tag: u8, p: &Particle) -> io::Result<()> {
    writeln!(
        w,
        "{} \t {} \t {:.6} \t {:.6} \t {:.6} ",
        index, tag, p.pos.x, p.pos.y, p.radius
    )
}

/// Write landing counts, buckets numbered from 1
pub fn write_histogram<W: Write>(w: &mut W, counts: &[u32]) -> io::Result<()> {
    for (i, count) in counts.iter().enumerate() {
        writeln!(w, "{}\t{}", i + 1, count)?;
    }
    Ok(())
}

/// First `stem-N.csv` in `dir` that does not exist yet
pub fn unused_path(dir: &Path, stem: &str) -> PathBuf {
    (0..)
        .map(|i| dir.join(format!("{stem}-{i}.csv")))
        .find(|path| !path.exists())
        .unwrap_or_else(|| dir.join(format!("{stem}.csv")))
}

/// Recorder writing the enabled outputs into a project directory
#[derive(Debug)]
pub struct CsvExporter {
    paths: Option<BufWriter<File>>,
    histogram: Option<BufWriter<File>>,
}

impl CsvExporter {
    pub fn create(dir: &Path, save: &SaveConfig) -> io::Result<Self> {
        let open = |stem: &str| -> io::Result<BufWriter<File>> {
            let path = unused_path(dir, stem);
            log::debug!("Writing {}", path.display());
            Ok(BufWriter::with_capacity(BUFFER_SIZE, File::create(path)?))
        };

        Ok(Self {
            paths: save.save_paths.then(|| open("paths")).transpose()?,
            histogram: save.save_histogram.then(|| open("histogram")).transpose()?,
        })
    }

    /// Flush and close every file
    pub fn finish(mut self) -> io::Result<()> {
        for writer in [self.paths.take(), self.histogram.take()].into_iter().flatten() {
            writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        }
        Ok(())
    }
}

impl Recorder for CsvExporter {
    fn record_frame(&mut self, frame: Frame<'_>) -> io::Result<()> {
        match self.paths.as_mut() {
            Some(w) => write_frame(w, frame),
            None => Ok(()),
        }
    }

    fn record_histogram(&mut self, counts: &[u32]) -> io::Result<()> {
        match self.histogram.as_mut() {
            Some(w) => write_histogram(w, counts),
            None => Ok(()),
        }
    }
}
