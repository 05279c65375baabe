use crate::CoreError;
use harbormaster_runtime::ComposeProject;
use harbormaster_schema::{
    is_upgradeable, locate_manifest, read_manifest, scan_manifest, substitute, Environment,
    ImageReference, SchemaError, ServiceImageBinding,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A service binding after `${VAR}` substitution and normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedImage {
    pub service_name: String,
    pub raw_image_reference: String,
    pub image: ImageReference,
}

impl ResolvedImage {
    pub fn resolve(binding: &ServiceImageBinding, env: &Environment) -> Self {
        let substituted = substitute(&binding.raw_image_reference, env);
        Self {
            service_name: binding.service_name.clone(),
            raw_image_reference: binding.raw_image_reference.clone(),
            image: ImageReference::normalize(&substituted),
        }
    }

    /// Whether an upgrade may move this service: never for digest-pinned
    /// references, otherwise the tag classifier decides.
    pub fn upgradeable(&self) -> bool {
        !self.image.is_digest_pinned && is_upgradeable(&self.image.tag_or_digest)
    }
}

/// A manifest on disk with its environment, ready to check or upgrade.
#[derive(Debug, Clone)]
pub struct Project {
    manifest_path: PathBuf,
    env_file: Option<PathBuf>,
    images: Vec<ResolvedImage>,
}

impl Project {
    /// Open `path` (a manifest file, or a directory holding one).
    ///
    /// Variables come from `env_file` when given, else from `.env` next to the
    /// manifest, over the process environment.
    pub fn open(path: &Path, env_file: Option<&Path>) -> Result<Self, CoreError> {
        let manifest_path = if path.is_dir() {
            locate_manifest(path).ok_or_else(|| SchemaError::ComposeNotFound(path.to_path_buf()))?
        } else {
            path.to_path_buf()
        };
        let text = read_manifest(&manifest_path)?;

        let default_env = manifest_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(".env");
        let env = Environment::load(Some(env_file.unwrap_or(default_env.as_path())))?;

        Self::from_text(&manifest_path, &text, &env)
            .map(|project| project.with_env_file(env_file.map(Path::to_path_buf)))
    }

    /// Build a project from manifest text already in memory.
    pub fn from_text(manifest_path: &Path, text: &str, env: &Environment) -> Result<Self, CoreError> {
        let bindings = scan_manifest(text);
        if bindings.is_empty() {
            return Err(SchemaError::NoServices(manifest_path.to_path_buf()).into());
        }
        let images: Vec<ResolvedImage> = bindings
            .iter()
            .map(|binding| ResolvedImage::resolve(binding, env))
            .collect();
        for resolved in &images {
            debug!(
                "{}: {} -> {}",
                resolved.service_name, resolved.raw_image_reference, resolved.image
            );
        }
        Ok(Self {
            manifest_path: manifest_path.to_path_buf(),
            env_file: None,
            images,
        })
    }

    fn with_env_file(mut self, env_file: Option<PathBuf>) -> Self {
        self.env_file = env_file;
        self
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Images in manifest order.
    pub fn images(&self) -> &[ResolvedImage] {
        &self.images
    }

    /// The engine-side view of this project. Only an explicitly chosen env file is
    /// passed on; compose reads `.env` next to the manifest by itself.
    pub fn compose_project(&self) -> ComposeProject {
        let project = ComposeProject::new(&self.manifest_path);
        match &self.env_file {
            Some(env_file) => project.with_env_file(env_file),
            None => project,
        }
    }
}
