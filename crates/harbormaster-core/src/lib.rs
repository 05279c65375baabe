//! Update checks and safe upgrades for compose deployments.
//!
//! This crate ties the manifest layer, the registry client and the container engine
//! together: `Project` resolves a manifest's images, `Checker` compares local and
//! remote digests in parallel into a `CheckReport`, `Orchestrator` drives the
//! validated SCAN → PLAN → CONFIRM → PULL → STOP → START → PRUNE upgrade sequence,
//! and `discover` finds manifests under a directory tree.

pub mod check;
pub mod compare;
pub mod concurrency;
pub mod discover;
pub mod project;
pub mod upgrade;

pub use check::{CheckReport, Checker, StatusCounts, DEFAULT_CONCURRENCY};
pub use compare::{compare, DigestComparison, ServiceStatus};
pub use concurrency::{install_signal_handler, shutdown_requested, UpgradeLock};
pub use discover::{discover, DiscoveredManifest, DEFAULT_MAX_DEPTH};
pub use project::{Project, ResolvedImage};
pub use upgrade::{
    build_plan, validate_transition, Confirm, Orchestrator, UpgradeOptions, UpgradeOutcome,
    UpgradePlan, UpgradeState,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Schema(#[from] harbormaster_schema::SchemaError),
    #[error("runtime error: {0}")]
    Runtime(#[from] harbormaster_runtime::RuntimeError),
    #[error("registry config error: {0}")]
    Config(#[from] harbormaster_remote::ConfigError),
    #[error("invalid upgrade transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("another upgrade of {} is in progress", .0.display())]
    Locked(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this is a problem with the manifest itself (missing, no services).
    pub fn is_manifest_error(&self) -> bool {
        matches!(self, Self::Schema(_))
    }
}
