//! # Manifest
//!
//! The authoritative ordered list of live segment files, oldest first.
//! Persisted as `manifest.json` in the data directory and rewritten through a
//! temp-file + rename so a crash can never leave a torn manifest behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use strata_core::error::{Error, Result};

const SEGMENT_SUFFIX: &str = ".sst";

/// Persistent segment registry. Mutated only by flushes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    segments: Vec<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the manifest at `path`, or create and persist an empty one.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let raw = fs::read(path).map_err(|e| Error::Io {
                message: format!("failed to read manifest at {:?}", path),
                source: e,
            })?;
            let manifest: Manifest = serde_json::from_slice(&raw).map_err(|e| Error::Manifest {
                message: format!("unreadable manifest at {:?}: {}", path, e),
            })?;
            info!(segments = manifest.segments.len(), "loaded manifest");
            Ok(manifest)
        } else {
            info!("no manifest found, creating new store");
            let manifest = Self::new();
            manifest.save(path)?;
            Ok(manifest)
        }
    }

    /// Persist atomically: write to a sibling temp file, then rename over the
    /// live manifest.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");

        let body = serde_json::to_vec_pretty(self).map_err(|e| Error::Manifest {
            message: format!("failed to serialize manifest: {}", e),
        })?;
        {
            let mut file = File::create(&tmp).map_err(|e| Error::Io {
                message: format!("failed to create manifest temp file at {:?}", tmp),
                source: e,
            })?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path).map_err(|e| Error::Io {
            message: format!("failed to rename manifest into place at {:?}", path),
            source: e,
        })?;
        Ok(())
    }

    /// Append a segment name. Creation order, oldest first.
    pub fn add(&mut self, name: impl Into<String>) {
        self.segments.push(name.into());
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Next segment filename: `max(existing numeric prefixes) + 1`, zero
    /// padded, e.g. `000007.sst`.
    pub fn next_name(&self) -> String {
        let max = self
            .segments
            .iter()
            .filter_map(|s| s.strip_suffix(SEGMENT_SUFFIX))
            .filter_map(|s| s.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("{:06}{}", max + 1, SEGMENT_SUFFIX)
    }
}
