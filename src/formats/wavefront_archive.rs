//! Zip container for wavefronts: `mesh.json` with the photon energy and axes,
//! `field.bin` with little-endian f32 `(re, im)` pairs in mesh order.

use crate::domain::wavefront::{Complex32, Mesh, Wavefront};
use crate::utils::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

const FORMAT_NAME: &str = "wavefront archive";
const FORMAT_VERSION: u32 = 1;
const MESH_ENTRY: &str = "mesh.json";
const FIELD_ENTRY: &str = "field.bin";

#[derive(Debug, Serialize, Deserialize)]
struct MeshHeader {
    format_version: u32,
    photon_energy_ev: f64,
    mesh: Mesh,
}

pub fn encode(wavefront: &Wavefront) -> Result<Vec<u8>> {
    let header = MeshHeader {
        format_version: FORMAT_VERSION,
        photon_energy_ev: wavefront.photon_energy_ev,
        mesh: wavefront.mesh,
    };

    let mut field_bytes = Vec::with_capacity(wavefront.field().len() * 8);
    for sample in wavefront.field() {
        field_bytes.extend_from_slice(&sample.re.to_le_bytes());
        field_bytes.extend_from_slice(&sample.im.to_le_bytes());
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file::<_, ()>(MESH_ENTRY, FileOptions::default())?;
    zip.write_all(serde_json::to_string_pretty(&header)?.as_bytes())?;

    zip.start_file::<_, ()>(FIELD_ENTRY, FileOptions::default())?;
    zip.write_all(&field_bytes)?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

pub fn decode(bytes: &[u8]) -> Result<Wavefront> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let header: MeshHeader = {
        let mut entry = archive.by_name(MESH_ENTRY)?;
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        serde_json::from_str(&content)?
    };
    if header.format_version != FORMAT_VERSION {
        return Err(SimError::data_format(
            FORMAT_NAME,
            format!("unsupported format version {}", header.format_version),
        ));
    }

    let field_bytes = {
        let mut entry = archive.by_name(FIELD_ENTRY)?;
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        content
    };
    if field_bytes.len() % 8 != 0 {
        return Err(SimError::data_format(
            FORMAT_NAME,
            format!("field payload of {} bytes is not a whole number of samples", field_bytes.len()),
        ));
    }

    let field = field_bytes
        .chunks_exact(8)
        .map(|c| {
            Complex32::new(
                f32::from_le_bytes([c[0], c[1], c[2], c[3]]),
                f32::from_le_bytes([c[4], c[5], c[6], c[7]]),
            )
        })
        .collect();

    Wavefront::new(header.photon_energy_ev, header.mesh, field)
}

pub fn read_file(path: impl AsRef<std::path::Path>) -> Result<Wavefront> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::wavefront::Axis;

    fn small_wavefront() -> Wavefront {
        let mesh = Mesh {
            x: Axis::new(-1e-4, 1e-4, 3),
            y: Axis::new(-1e-4, 1e-4, 2),
            t: Axis::new(-1e-14, 1e-14, 2),
        };
        let field = (0..mesh.len())
            .map(|i| Complex32::new(i as f32, -(i as f32) * 0.5))
            .collect();
        Wavefront::new(9000.0, mesh, field).unwrap()
    }

    #[test]
    fn test_encode_decode_preserves_field() {
        let wf = small_wavefront();
        let decoded = decode(&encode(&wf).unwrap()).unwrap();
        assert_eq!(decoded, wf);
        assert_eq!(decoded.at(2, 1, 1), Complex32::new(11.0, -5.5));
    }

    #[test]
    fn test_archive_contains_expected_entries() {
        let bytes = encode(&small_wavefront()).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec![FIELD_ENTRY, MESH_ENTRY]);
    }

    fn archive_with(mesh: Mesh, field_bytes: &[u8]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file::<_, ()>(MESH_ENTRY, FileOptions::default()).unwrap();
        let header = MeshHeader {
            format_version: FORMAT_VERSION,
            photon_energy_ev: 9000.0,
            mesh,
        };
        zip.write_all(serde_json::to_string(&header).unwrap().as_bytes()).unwrap();
        zip.start_file::<_, ()>(FIELD_ENTRY, FileOptions::default()).unwrap();
        zip.write_all(field_bytes).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_truncated_field_rejected() {
        let bytes = archive_with(small_wavefront().mesh, &[0u8; 16]);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, SimError::DataFormatError { .. }));
    }

    #[test]
    fn test_empty_axis_rejected() {
        let mut mesh = small_wavefront().mesh;
        mesh.x.n = 0;
        let err = decode(&archive_with(mesh, &[])).unwrap_err();
        assert!(matches!(err, SimError::DataFormatError { .. }));
    }

    #[test]
    fn test_overflowing_mesh_rejected() {
        let mut mesh = small_wavefront().mesh;
        mesh.x.n = 1 << 32;
        mesh.y.n = 1 << 32;
        let err = decode(&archive_with(mesh, &[])).unwrap_err();
        assert!(matches!(err, SimError::DataFormatError { .. }));
    }

    #[test]
    fn test_garbage_is_zip_error() {
        assert!(matches!(decode(b"not a zip").unwrap_err(), SimError::ZipError(_)));
    }
}
