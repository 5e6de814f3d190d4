//! Content fingerprints for cross-URL deduplication
//!
//! The index holds two sets: hashes of artifacts already on disk (seeded at
//! startup) and hashes claimed during the current run. A payload whose hash
//! is in either set is a duplicate, whatever URL served it.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Hex-encoded SHA-256 of a payload's raw bytes
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Outcome of claiming a hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashClaim {
    /// First sighting; the caller owns this payload
    New,
    /// Matches an artifact that was already stored before this run
    Stored,
    /// Already claimed earlier in this run
    SeenThisRun,
}

#[derive(Debug, Default)]
struct HashSets {
    stored: HashSet<String>,
    seen: HashSet<String>,
}

/// Thread-safe set of content hashes
#[derive(Debug, Default)]
pub struct ContentHashIndex {
    sets: Mutex<HashSets>,
}

impl ContentHashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from hashes of previously stored artifacts
    pub fn with_stored<I: IntoIterator<Item = String>>(hashes: I) -> Self {
        Self {
            sets: Mutex::new(HashSets {
                stored: hashes.into_iter().collect(),
                seen: HashSet::new(),
            }),
        }
    }

    /// Hashes every `*.json` file in `dir`
    ///
    /// A missing directory seeds nothing; unreadable files are logged and
    /// skipped.
    pub fn seed_from_dir(dir: &Path) -> Self {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("No artifacts to seed from {}: {}", dir.display(), e);
                return Self::new();
            }
        };

        let mut hashes = HashSet::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") || !path.is_file() {
                continue;
            }
            match std::fs::read(&path) {
                Ok(bytes) => {
                    hashes.insert(content_hash(&bytes));
                }
                Err(e) => {
                    tracing::warn!("Could not read or hash file {}: {}", path.display(), e);
                }
            }
        }

        tracing::info!(
            "Seeded {} content hashes from {}",
            hashes.len(),
            dir.display()
        );
        Self::with_stored(hashes)
    }

    /// Atomically checks a hash against both sets and claims it if new
    pub fn claim(&self, hash: &str) -> HashClaim {
        let mut sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        if sets.stored.contains(hash) {
            HashClaim::Stored
        } else if !sets.seen.insert(hash.to_string()) {
            HashClaim::SeenThisRun
        } else {
            HashClaim::New
        }
    }

    /// Gives back a hash claimed this run
    ///
    /// Used when the claimed payload could not be stored, so the same
    /// content from another URL still gets its chance.
    pub fn release(&self, hash: &str) -> bool {
        self.sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .seen
            .remove(hash)
    }

    pub fn contains(&self, hash: &str) -> bool {
        let sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        sets.stored.contains(hash) || sets.seen.contains(hash)
    }

    /// Number of hashes seeded from storage
    pub fn stored_len(&self) -> usize {
        self.sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stored
            .len()
    }

    /// Number of hashes claimed this run
    pub fn seen_len(&self) -> usize {
        self.sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .seen
            .len()
    }
}
