use crate::CoreError;
use harbormaster_schema::{declared_services, is_manifest_file_name};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredManifest {
    pub path: PathBuf,
    /// Every service key, including build-only services.
    pub services: Vec<String>,
}

/// Find compose manifests under `base`, sorted by path.
///
/// Depth 1 is the files directly inside `base`. Hidden directories and symlinked
/// directories are not entered. A subdirectory that cannot be read is skipped with a
/// warning; an unreadable `base` is an error.
pub fn discover(base: &Path, max_depth: usize) -> Result<Vec<DiscoveredManifest>, CoreError> {
    let mut paths = Vec::new();
    if max_depth > 0 {
        collect(base, 1, max_depth, &mut paths)?;
    }
    paths.sort();
    paths.dedup();

    Ok(paths
        .into_iter()
        .map(|path| {
            let services = match std::fs::read_to_string(&path) {
                Ok(text) => declared_services(&text),
                Err(e) => {
                    warn!("cannot read {}: {e}", path.display());
                    Vec::new()
                }
            };
            DiscoveredManifest { path, services }
        })
        .collect())
}

fn collect(
    dir: &Path,
    depth: usize,
    max_depth: usize,
    found: &mut Vec<PathBuf>,
) -> Result<(), CoreError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if depth < max_depth && !name.starts_with('.') {
                if let Err(e) = collect(&path, depth + 1, max_depth, found) {
                    warn!("skipping {}: {e}", path.display());
                }
            }
        } else if is_manifest_file_name(&name) && path.is_file() {
            debug!("found {}", path.display());
            found.push(path);
        }
    }
    Ok(())
}
