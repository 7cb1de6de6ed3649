//! Reading point files and writing cluster assignments
//!
//! Point files are headerless CSV with one `index,x,y` record per line. Assignment files hold
//! one `pointIndex, clusterIndex` line per point.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use ndarray::{Array2, ArrayBase, Data, Ix1, Ix2};
use tracing::debug;

use crate::error::{Error, Result};

/// Read the points stored in the file at `path`.
pub fn read_points<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let points = read_points_from(File::open(path)?)?;
    debug!(path = %path.display(), n_points = points.nrows(), "read points");
    Ok(points)
}

/// Read `index,x,y` records into an array of shape `(n_points, 2)`.
///
/// Each point is stored at row `index`. The indices have to cover `0..n_points` exactly once,
/// in any order.
pub fn read_points_from<R: Read>(reader: R) -> Result<Array2<f64>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = reader
        .deserialize::<(usize, f64, f64)>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    records.sort_by_key(|&(index, _, _)| index);

    let mut points = Array2::zeros((records.len(), 2));
    for (row, &(index, x, y)) in records.iter().enumerate() {
        if index != row {
            return Err(Error::Records(format!(
                "expected point index {}, found {}",
                row, index
            )));
        }
        points[[row, 0]] = x;
        points[[row, 1]] = y;
    }
    Ok(points)
}

/// Write `index,x,y` records for `points` to the file at `path`.
pub fn write_points<P: AsRef<Path>>(
    path: P,
    points: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Result<()> {
    write_points_to(File::create(path)?, points)
}

pub fn write_points_to<W: Write>(
    writer: W,
    points: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    for (index, point) in points.rows().into_iter().enumerate() {
        writer.serialize((index, point[0], point[1]))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the cluster of every point to the file at `path`.
pub fn write_assignments<P: AsRef<Path>>(
    path: P,
    memberships: &ArrayBase<impl Data<Elem = usize>, Ix1>,
) -> Result<()> {
    write_assignments_to(BufWriter::new(File::create(path)?), memberships)
}

pub fn write_assignments_to<W: Write>(
    mut writer: W,
    memberships: &ArrayBase<impl Data<Elem = usize>, Ix1>,
) -> Result<()> {
    for (index, cluster) in memberships.iter().enumerate() {
        writeln!(writer, "{}, {}", index, cluster)?;
    }
    writer.flush()?;
    Ok(())
}
