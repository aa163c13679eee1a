//! Persisted conversion records.
//!
//! One JSON document maps each source filename to the hash of the bytes
//! last converted and the raster file that conversion produced:
//!
//! ```json
//! {
//!   "S_0_0_lco.paa": { "hash": "9f86d0…", "producedFile": "S_0_0_lco.png" }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Record of one successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// SHA-256 of the source bytes that were converted.
    pub hash: String,
    /// Filename of the raster output, relative to the cache directory.
    pub produced_file: String,
}

impl CacheEntry {
    pub fn new(hash: impl Into<String>, produced_file: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            produced_file: produced_file.into(),
        }
    }
}

/// In-memory view of the record file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordStore {
    entries: BTreeMap<String, CacheEntry>,
}

impl RecordStore {
    /// Load records from `path`.
    pub fn load(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        serde_json::from_reader(reader).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to parse conversion records: {}", e),
            )
        })
    }

    /// Load records from `path`, treating a missing or corrupt file as empty.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(store) => store,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Ignoring unreadable conversion records"
                );
                Self::default()
            }
        }
    }

    /// Write all records to `path`.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| io::Error::other(format!("Failed to serialize records: {}", e)))?;
        writer.flush()?;
        drop(writer);

        std::fs::rename(&temp_path, path)
    }

    pub fn get(&self, filename: &str) -> Option<&CacheEntry> {
        self.entries.get(filename)
    }

    /// Insert or replace the record for `filename`.
    pub fn insert(&mut self, filename: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(filename.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate records in filename order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
