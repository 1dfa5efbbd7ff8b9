use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    WavefrontArchive,
    DiffractionArchive,
    IntensityCsv,
}

impl FormatKind {
    pub fn extension(self) -> &'static str {
        match self {
            FormatKind::WavefrontArchive | FormatKind::DiffractionArchive => "zip",
            FormatKind::IntensityCsv => "csv",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatKind::WavefrontArchive => "wavefront archive",
            FormatKind::DiffractionArchive => "diffraction archive",
            FormatKind::IntensityCsv => "intensity csv",
        };
        f.write_str(name)
    }
}

/// A file produced or consumed by a calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataHandle {
    pub key: String,
    pub path: PathBuf,
    pub format: FormatKind,
}

impl DataHandle {
    pub fn new(key: &str, path: impl AsRef<Path>, format: FormatKind) -> Self {
        Self {
            key: key.to_string(),
            path: path.as_ref().to_path_buf(),
            format,
        }
    }
}

/// Output of a calculator: data handles addressed by key, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataCollection {
    entries: Vec<DataHandle>,
}

impl DataCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handle, replacing any previous entry with the same key.
    pub fn add(&mut self, handle: DataHandle) {
        match self.entries.iter_mut().find(|h| h.key == handle.key) {
            Some(existing) => *existing = handle,
            None => self.entries.push(handle),
        }
    }

    pub fn get(&self, key: &str) -> Option<&DataHandle> {
        self.entries.iter().find(|h| h.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|h| h.key.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataHandle> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
