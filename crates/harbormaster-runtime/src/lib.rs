//! Container engine integration for Harbormaster.
//!
//! The `ContainerEngine` trait is the only way the rest of the workspace talks to a
//! container engine: local digest lookup through `image inspect`, and the compose
//! `pull` / `stop` / `up -d` phases plus `image prune` used by upgrades. `CliEngine`
//! drives the docker or podman CLI; `MockEngine` records calls for tests and the
//! `--engine mock` CLI mode.

pub mod cli;
pub mod engine;
pub mod mock;
pub mod prereq;

pub use cli::{digest_from_repo_digests, CliEngine};
pub use engine::{detect_engine, select_engine, ComposeProject, ContainerEngine};
pub use mock::{EngineCall, MockEngine, Phase};
pub use prereq::{check_engine_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("container engine '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("`{command}` failed{}: {stderr}", exit_suffix(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("unexpected engine output: {0}")]
    InvalidOutput(String),
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (exit {c})")).unwrap_or_default()
}
