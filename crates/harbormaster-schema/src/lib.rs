//! Manifest scanning, variable substitution, image references and tag policy.
//!
//! This crate is the pure layer of Harbormaster: it extracts service→image bindings
//! from compose-style manifests (`scan_manifest`), resolves `${VAR}` tokens against an
//! environment file with process-environment fallback (`Environment`, `substitute`),
//! normalizes image references into registry/repository/tag (`ImageReference`) and
//! decides whether a tag is expected to move (`is_upgradeable`). Nothing here touches
//! the network or a container engine.

pub mod compose;
pub mod env;
pub mod policy;
pub mod reference;
pub mod substitute;

pub use compose::{
    declared_services, is_manifest_file_name, locate_manifest, read_manifest, scan_manifest,
    ServiceImageBinding, MANIFEST_FILE_NAMES,
};
pub use env::{parse_env_file, Environment};
pub use policy::{is_upgradeable, MUTABLE_TAGS};
pub use reference::{ImageReference, DEFAULT_REGISTRY, DEFAULT_TAG};
pub use substitute::substitute;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("compose file not found: {}", .0.display())]
    ComposeNotFound(PathBuf),
    #[error("no services with an image found in {}", .0.display())]
    NoServices(PathBuf),
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// Stable machine-readable code, as surfaced in reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ComposeNotFound(_) => "compose_not_found",
            Self::NoServices(_) => "no_services",
            Self::Io(_) => "io_error",
        }
    }
}
