//! Plain-text URL lists, one URL per line

use crate::storage::{StorageError, StorageResult};
use reqwest::Client;
use std::collections::BTreeSet;
use std::path::Path;

/// Non-empty trimmed lines of `text`
pub fn parse_url_list(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads a URL list; a missing file is an empty list
pub fn read_url_list(path: &Path) -> StorageResult<BTreeSet<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_url_list(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("URL list {} not found, starting empty", path.display());
            Ok(BTreeSet::new())
        }
        Err(source) => Err(StorageError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes the list sorted, creating parent directories
pub fn write_url_list(path: &Path, urls: &BTreeSet<String>) -> StorageResult<()> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut text = urls.iter().map(String::as_str).collect::<Vec<_>>().join("\n");
    text.push('\n');
    std::fs::write(path, text).map_err(io_err)?;

    tracing::info!("Wrote {} URLs to {}", urls.len(), path.display());
    Ok(())
}

/// Downloads a remote URL list
pub async fn fetch_url_list(client: &Client, url: &str) -> Result<BTreeSet<String>, reqwest::Error> {
    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_url_list(&text))
}
