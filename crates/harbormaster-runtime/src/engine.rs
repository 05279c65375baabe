use crate::RuntimeError;
use harbormaster_schema::ImageReference;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The compose deployment an engine operates on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposeProject {
    pub manifest_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<PathBuf>,
}

impl ComposeProject {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            env_file: None,
        }
    }

    #[must_use]
    pub fn with_env_file(mut self, env_file: impl Into<PathBuf>) -> Self {
        self.env_file = Some(env_file.into());
        self
    }

    /// Directory holding the manifest.
    pub fn project_dir(&self) -> &Path {
        self.manifest_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

pub trait ContainerEngine: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    /// Digest recorded locally for `image`, `None` if it was never pulled.
    fn local_digest(&self, image: &ImageReference) -> Result<Option<String>, RuntimeError>;

    /// Pull new images for `services`. An empty list is a no-op.
    fn pull(&self, project: &ComposeProject, services: &[String]) -> Result<(), RuntimeError>;

    fn stop(&self, project: &ComposeProject, services: &[String]) -> Result<(), RuntimeError>;

    /// Recreate `services` detached.
    fn start(&self, project: &ComposeProject, services: &[String]) -> Result<(), RuntimeError>;

    /// Remove dangling images.
    fn prune(&self) -> Result<(), RuntimeError>;
}

/// Engine by name: `docker`, `podman`, `mock`, or `auto` for the first CLI found.
pub fn select_engine(name: &str) -> Result<Box<dyn ContainerEngine>, RuntimeError> {
    match name {
        "docker" | "podman" => Ok(Box::new(crate::cli::CliEngine::new(name))),
        "mock" => Ok(Box::new(crate::mock::MockEngine::new())),
        "auto" => detect_engine()
            .map(|program| Box::new(crate::cli::CliEngine::new(program)) as Box<dyn ContainerEngine>)
            .ok_or_else(|| RuntimeError::BackendUnavailable("docker or podman".to_owned())),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}

/// First engine CLI on `PATH`, docker preferred.
pub fn detect_engine() -> Option<&'static str> {
    ["docker", "podman"]
        .into_iter()
        .find(|program| crate::prereq::command_exists(program))
}
