pub mod csv_export;
pub mod diffraction;
pub mod wavefront_archive;

pub use diffraction::{DiffractionPatterns, DiffractionWriter, LoadOptions, PatternSelection, PatternStack};
