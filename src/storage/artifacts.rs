//! Write-once store for accepted payloads

use crate::storage::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory of accepted artifacts; files are created once and never rewritten
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Opens the store, creating the directory if needed
    pub fn open(dir: &Path) -> StorageResult<Self> {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves a payload under `<stem>_<timestamp>.json`
    pub fn save(&self, source_name: &str, body: &[u8]) -> StorageResult<PathBuf> {
        self.save_at(source_name, body, Utc::now())
    }

    /// Saves a payload stamped with an explicit capture time
    ///
    /// A name collision appends `_<n>`; an existing file is never opened for
    /// writing.
    pub fn save_at(
        &self,
        source_name: &str,
        body: &[u8],
        captured: DateTime<Utc>,
    ) -> StorageResult<PathBuf> {
        let base = format!(
            "{}_{}",
            artifact_stem(source_name),
            captured.format("%Y%m%d%H%M%S")
        );

        let mut suffix = 0u32;
        loop {
            let name = if suffix == 0 {
                format!("{}.json", base)
            } else {
                format!("{}_{}.json", base, suffix)
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(source) = file.write_all(body).and_then(|_| file.sync_all()) {
                        drop(file);
                        // a truncated artifact would be seeded as a known hash next run
                        if let Err(e) = std::fs::remove_file(&path) {
                            tracing::warn!("Could not remove partial artifact {}: {}", path.display(), e);
                        }
                        return Err(StorageError::Io { path, source });
                    }
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => suffix += 1,
                Err(source) => return Err(StorageError::Io { path, source }),
            }
        }
    }

    /// Lists stored `*.json` artifacts, sorted by name
    pub fn list(&self) -> StorageResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

/// Derives a file-system safe stem from a source file name
fn artifact_stem(source_name: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(|c| c == '_' || c == '.').is_empty() {
        "config".to_string()
    } else {
        cleaned
    }
}
