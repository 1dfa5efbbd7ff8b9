use crate::domain::data::{DataHandle, FormatKind};
use crate::domain::wavefront::Wavefront;
use crate::formats::wavefront_archive;
use crate::utils::error::{Result, SimError};
use std::path::Path;

/// Writes `x,y,value` rows (positions in meters) for a map indexed `y * nx + x`.
fn write_map<W: std::io::Write>(
    writer: W,
    xs: &[f64],
    ys: &[f64],
    values: &[f64],
    value_column: &str,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["x", "y", value_column])?;
    let nx = xs.len();
    for (i, value) in values.iter().enumerate() {
        csv_writer.write_record(&[
            xs[i % nx].to_string(),
            ys[i / nx].to_string(),
            value.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Time-integrated fluence (J/m^2) of a wavefront as CSV.
pub fn fluence_csv(wavefront: &Wavefront) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_map(
        &mut buffer,
        &wavefront.mesh.x.values(),
        &wavefront.mesh.y.values(),
        &wavefront.integrated_intensity(),
        "fluence",
    )?;
    Ok(buffer)
}

/// One diffraction pattern as CSV, positions given in pixel indices.
pub fn pattern_csv(shape: [usize; 2], pattern: &[f64]) -> Result<Vec<u8>> {
    let [ny, nx] = shape;
    if nx.checked_mul(ny) != Some(pattern.len()) {
        return Err(SimError::data_format(
            "pattern",
            format!("{} pixels do not match shape {:?}", pattern.len(), shape),
        ));
    }
    let xs: Vec<f64> = (0..nx).map(|i| i as f64).collect();
    let ys: Vec<f64> = (0..ny).map(|i| i as f64).collect();
    let mut buffer = Vec::new();
    write_map(&mut buffer, &xs, &ys, pattern, "photons")?;
    Ok(buffer)
}

/// Converts a stored wavefront archive into a fluence CSV next to `target`.
pub fn convert_wavefront(handle: &DataHandle, target: impl AsRef<Path>) -> Result<DataHandle> {
    if handle.format != FormatKind::WavefrontArchive {
        return Err(SimError::data_format(
            handle.format.to_string(),
            format!("cannot convert '{}' to {}", handle.key, FormatKind::IntensityCsv),
        ));
    }
    let wavefront = wavefront_archive::read_file(&handle.path)?;
    let target = target.as_ref();
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(target, fluence_csv(&wavefront)?)?;
    tracing::info!("📄 Wrote fluence map of '{}' to {}", handle.key, target.display());
    Ok(DataHandle::new(&handle.key, target, FormatKind::IntensityCsv))
}
