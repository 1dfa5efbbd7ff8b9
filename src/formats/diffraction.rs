//! Diffraction pattern archives.
//!
//! Layout: `params.json` (free-form simulation parameters, e.g.
//! `beam.photonEnergy`), `shape.json` (`[ny, nx]`) and one
//! `data/<id:07>/diffr.bin` entry per pattern holding little-endian f32
//! intensities in expected photons per pixel.

use crate::utils::error::{Result, SimError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};
use std::collections::BTreeSet;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

const FORMAT_NAME: &str = "diffraction archive";
const PARAMS_ENTRY: &str = "params.json";
const SHAPE_ENTRY: &str = "shape.json";

fn pattern_entry(id: u32) -> String {
    format!("data/{:07}/diffr.bin", id)
}

/// Only the canonical zero-padded spelling names a pattern.
fn parse_pattern_entry(name: &str) -> Option<u32> {
    let id: u32 = name
        .strip_prefix("data/")?
        .strip_suffix("/diffr.bin")?
        .parse()
        .ok()?;
    (pattern_entry(id) == name).then_some(id)
}

/// Pixels per pattern, or a format error when `ny * nx` overflows.
fn pixel_count(shape: [usize; 2]) -> Result<usize> {
    shape[0].checked_mul(shape[1]).ok_or_else(|| {
        SimError::data_format(FORMAT_NAME, format!("shape {:?} is too large to address", shape))
    })
}

/// Which patterns to load. Ids are the pattern indices stored in the file,
/// not positions in the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSelection {
    All,
    One(u32),
    List(Vec<u32>),
}

impl From<u32> for PatternSelection {
    fn from(id: u32) -> Self {
        PatternSelection::One(id)
    }
}

impl From<Vec<u32>> for PatternSelection {
    fn from(ids: Vec<u32>) -> Self {
        PatternSelection::List(ids)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Replace each expected count with a Poisson draw.
    pub poissonize: bool,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternStack {
    pub ids: Vec<u32>,
    pub shape: [usize; 2],
    pub patterns: Vec<Vec<f64>>,
}

impl PatternStack {
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.patterns.iter().flatten().sum()
    }

    /// Pixel-wise sum over all loaded patterns.
    pub fn total_pattern(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.patterns.first().map_or(0, Vec::len)];
        for pattern in &self.patterns {
            for (acc, v) in total.iter_mut().zip(pattern) {
                *acc += v;
            }
        }
        total
    }
}

/// Builds a diffraction archive in memory.
pub struct DiffractionWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    pixels: usize,
    ids: BTreeSet<u32>,
}

impl DiffractionWriter {
    pub fn new(params: &serde_json::Value, shape: [usize; 2]) -> Result<Self> {
        let pixels = pixel_count(shape)?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file::<_, ()>(PARAMS_ENTRY, FileOptions::default())?;
        zip.write_all(serde_json::to_string_pretty(params)?.as_bytes())?;
        zip.start_file::<_, ()>(SHAPE_ENTRY, FileOptions::default())?;
        zip.write_all(serde_json::to_string(&shape)?.as_bytes())?;
        Ok(Self {
            zip,
            pixels,
            ids: BTreeSet::new(),
        })
    }

    pub fn add_pattern(&mut self, id: u32, intensities: &[f32]) -> Result<()> {
        let expected = self.pixels;
        if intensities.len() != expected {
            return Err(SimError::data_format(
                FORMAT_NAME,
                format!("pattern {} has {} pixels, expected {}", id, intensities.len(), expected),
            ));
        }
        if !self.ids.insert(id) {
            return Err(SimError::data_format(
                FORMAT_NAME,
                format!("pattern {} written twice", id),
            ));
        }
        let bytes: Vec<u8> = intensities.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.zip
            .start_file::<_, ()>(pattern_entry(id), FileOptions::default())?;
        self.zip.write_all(&bytes)?;
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

/// Read access to a diffraction archive.
#[derive(Debug, Clone)]
pub struct DiffractionPatterns {
    bytes: Vec<u8>,
    params: serde_json::Value,
    shape: [usize; 2],
    pixels: usize,
    ids: Vec<u32>,
}

impl DiffractionPatterns {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Opening diffraction archive {}", path.display());
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let (params, shape, ids) = {
            let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))?;
            let params: serde_json::Value = serde_json::from_str(&read_text(&mut archive, PARAMS_ENTRY)?)?;
            let shape: [usize; 2] = serde_json::from_str(&read_text(&mut archive, SHAPE_ENTRY)?)?;
            let mut ids: Vec<u32> = archive.file_names().filter_map(parse_pattern_entry).collect();
            ids.sort_unstable();
            (params, shape, ids)
        };
        let pixels = pixel_count(shape)?;
        Ok(Self {
            bytes,
            params,
            shape,
            pixels,
            ids,
        })
    }

    pub fn parameters(&self) -> &serde_json::Value {
        &self.params
    }

    pub fn photon_energy(&self) -> Option<f64> {
        self.params.get("beam")?.get("photonEnergy")?.as_f64()
    }

    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    pub fn pattern_total(&self) -> usize {
        self.ids.len()
    }

    pub fn pattern_ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn load(&self, selection: impl Into<PatternSelection>, options: LoadOptions) -> Result<PatternStack> {
        let ids = match selection.into() {
            PatternSelection::All => self.ids.clone(),
            PatternSelection::One(id) => vec![id],
            PatternSelection::List(ids) => ids,
        };

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        let mut patterns = Vec::with_capacity(ids.len());
        for &id in &ids {
            if self.ids.binary_search(&id).is_err() {
                return Err(SimError::PatternNotFound(id));
            }
            let mut pattern = self.read_pattern(&mut archive, id)?;
            if options.poissonize {
                poissonize(&mut pattern, &mut rng);
            }
            patterns.push(pattern);
        }

        tracing::debug!("Loaded {} diffraction patterns", patterns.len());
        Ok(PatternStack {
            ids,
            shape: self.shape,
            patterns,
        })
    }

    fn read_pattern(&self, archive: &mut ZipArchive<Cursor<&[u8]>>, id: u32) -> Result<Vec<f64>> {
        let mut entry = archive.by_name(&pattern_entry(id))?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;

        if bytes.len() / 4 != self.pixels || bytes.len() % 4 != 0 {
            return Err(SimError::data_format(
                FORMAT_NAME,
                format!("pattern {} has {} bytes, expected {} f32 pixels", id, bytes.len(), self.pixels),
            ));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect())
    }
}

fn read_text(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String> {
    let mut entry = archive.by_name(name)?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

/// Non-positive or non-finite expectations yield zero photons.
fn poissonize(pattern: &mut [f64], rng: &mut StdRng) {
    for value in pattern.iter_mut() {
        *value = match Poisson::new(*value) {
            Ok(poisson) if *value > 0.0 => poisson.sample(rng),
            _ => 0.0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive_with(ids: &[u32], value: f32) -> Vec<u8> {
        let params = serde_json::json!({"beam": {"photonEnergy": 4960.0}});
        let mut writer = DiffractionWriter::new(&params, [2, 3]).unwrap();
        for &id in ids {
            writer.add_pattern(id, &[value; 6]).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_ids_sorted_and_counted() {
        let patterns = DiffractionPatterns::from_bytes(archive_with(&[294, 1, 146], 1.0)).unwrap();
        assert_eq!(patterns.pattern_total(), 3);
        assert_eq!(patterns.pattern_ids(), &[1, 146, 294]);
        assert_eq!(patterns.photon_energy(), Some(4960.0));
        assert_eq!(patterns.shape(), [2, 3]);
    }

    #[test]
    fn test_load_selection_by_id() {
        let patterns = DiffractionPatterns::from_bytes(archive_with(&[1, 146, 294], 2.0)).unwrap();

        let one = patterns.load(PatternSelection::One(146), LoadOptions::default()).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one.ids, vec![146]);

        let two = patterns.load(vec![146u32, 294], LoadOptions::default()).unwrap();
        assert_eq!(two.len(), 2);
        assert!((two.sum() - 24.0).abs() < 1e-9);

        let all = patterns.load(PatternSelection::All, LoadOptions::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.total_pattern(), vec![6.0; 6]);

        let err = patterns.load(7u32, LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SimError::PatternNotFound(7)));
    }

    #[test]
    fn test_poissonize_tiny_intensities_yield_zero() {
        let patterns = DiffractionPatterns::from_bytes(archive_with(&[1, 2], 1e-9)).unwrap();
        let options = LoadOptions {
            poissonize: true,
            seed: Some(3),
        };
        let stack = patterns.load(PatternSelection::All, options).unwrap();
        assert_eq!(stack.sum(), 0.0);
    }

    #[test]
    fn test_poissonize_is_seeded_and_integral() {
        let patterns = DiffractionPatterns::from_bytes(archive_with(&[1], 50.0)).unwrap();
        let options = LoadOptions {
            poissonize: true,
            seed: Some(11),
        };
        let a = patterns.load(1u32, options).unwrap();
        let b = patterns.load(1u32, options).unwrap();
        assert_eq!(a, b);
        assert!(a.patterns[0].iter().all(|v| v.fract() == 0.0 && *v >= 0.0));
        assert!(a.sum() > 0.0);
    }

    #[test]
    fn test_writer_rejects_bad_patterns() {
        let mut writer = DiffractionWriter::new(&serde_json::json!({}), [2, 2]).unwrap();
        assert!(writer.add_pattern(1, &[0.0; 3]).is_err());
        writer.add_pattern(1, &[0.0; 4]).unwrap();
        assert!(writer.add_pattern(1, &[0.0; 4]).is_err());
    }

    #[test]
    fn test_parse_pattern_entry() {
        assert_eq!(parse_pattern_entry("data/0000146/diffr.bin"), Some(146));
        assert_eq!(parse_pattern_entry("params.json"), None);
        assert_eq!(parse_pattern_entry("data/abc/diffr.bin"), None);
        assert_eq!(parse_pattern_entry("data/146/diffr.bin"), None);
        assert_eq!(parse_pattern_entry("data/+000146/diffr.bin"), None);
    }

    fn raw_archive(shape_json: &str, entries: &[&str]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file::<_, ()>(PARAMS_ENTRY, FileOptions::default()).unwrap();
        zip.write_all(b"{}").unwrap();
        zip.start_file::<_, ()>(SHAPE_ENTRY, FileOptions::default()).unwrap();
        zip.write_all(shape_json.as_bytes()).unwrap();
        for name in entries {
            zip.start_file::<_, ()>(*name, FileOptions::default()).unwrap();
            zip.write_all(&[0u8; 4]).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        let err = DiffractionPatterns::from_bytes(raw_archive("[4294967296, 4294967296]", &[])).unwrap_err();
        assert!(matches!(err, SimError::DataFormatError { .. }));
        assert!(DiffractionWriter::new(&serde_json::json!({}), [usize::MAX, 2]).is_err());
    }

    #[test]
    fn test_non_canonical_entries_not_listed() {
        let bytes = raw_archive(
            "[1, 1]",
            &["data/0000146/diffr.bin", "data/146/diffr.bin", "data/+146/diffr.bin"],
        );
        let patterns = DiffractionPatterns::from_bytes(bytes).unwrap();
        assert_eq!(patterns.pattern_ids(), &[146]);
        let stack = patterns.load(PatternSelection::All, LoadOptions::default()).unwrap();
        assert_eq!(stack.len(), 1);
    }
}
