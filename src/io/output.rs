use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::registration::point_buffer::RegistrationPointBuffer;
use crate::tracking::catheter::Catheter;

#[derive(Debug, Serialize)]
struct CurveRow {
    catheter: String,
    index: usize,
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Serialize)]
struct FiducialRow {
    index: usize,
    from_x: f64,
    from_y: f64,
    from_z: f64,
    to_x: f64,
    to_y: f64,
    to_z: f64,
}

/// Writes the current display curve of each catheter as one CSV row per
/// control point.
pub fn export_curve_csv<P: AsRef<Path>>(path: P, catheters: &[&Catheter]) -> Result<()> {
    let file = create_output_file(path.as_ref())?;
    write_curve_rows(file, catheters)
}

fn write_curve_rows<W: Write>(writer: W, catheters: &[&Catheter]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for catheter in catheters {
        for (index, p) in catheter.curve.points().iter().enumerate() {
            wtr.serialize(CurveRow {
                catheter: catheter.name.clone(),
                index,
                x: p.x,
                y: p.y,
                z: p.z,
            })
            .context("failed to write curve record")?;
        }
    }
    wtr.flush().context("failed to flush curve export")?;
    Ok(())
}

/// Dumps the fiducial buffer as paired from/to coordinates, one row per
/// pair, in buffer slot order.
pub fn export_fiducials_csv<P: AsRef<Path>>(
    path: P,
    buffer: &RegistrationPointBuffer,
) -> Result<()> {
    let file = create_output_file(path.as_ref())?;
    write_fiducial_rows(file, buffer)
}

fn write_fiducial_rows<W: Write>(writer: W, buffer: &RegistrationPointBuffer) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (index, (f, t)) in buffer
        .from_points()
        .iter()
        .zip(buffer.to_points())
        .enumerate()
    {
        wtr.serialize(FiducialRow {
            index,
            from_x: f.x,
            from_y: f.y,
            from_z: f.z,
            to_x: t.x,
            to_y: t.y,
            to_z: t.z,
        })
        .context("failed to write fiducial record")?;
    }
    wtr.flush().context("failed to flush fiducial export")?;
    Ok(())
}

fn create_output_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("could not create output directory {:?}", parent))?;
        }
    }
    File::create(path).with_context(|| format!("could not create output file {:?}", path))
}
