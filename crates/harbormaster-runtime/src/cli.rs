use crate::engine::{ComposeProject, ContainerEngine};
use crate::RuntimeError;
use harbormaster_schema::ImageReference;
use std::process::{Command, Output};

/// Drives the `docker` or `podman` CLI.
///
/// - `<engine> image inspect --format '{{json .RepoDigests}}' <ref>`
/// - `<engine> compose -f <file> [--env-file <env>] pull|stop|up -d <services...>`
/// - `<engine> image prune -f`
pub struct CliEngine {
    program: String,
}

impl CliEngine {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_owned(),
        }
    }

    fn run(&self, args: &[String]) -> Result<Output, RuntimeError> {
        let command = format!("{} {}", self.program, args.join(" "));
        tracing::debug!("running: {command}");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    RuntimeError::BackendUnavailable(self.program.clone())
                }
                _ => RuntimeError::Io(e),
            })?;
        if output.status.success() {
            return Ok(output);
        }
        Err(RuntimeError::CommandFailed {
            command,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }

    fn compose(
        &self,
        project: &ComposeProject,
        verb: &[&str],
        services: &[String],
    ) -> Result<(), RuntimeError> {
        if services.is_empty() {
            return Ok(());
        }
        self.run(&compose_args(project, verb, services))?;
        Ok(())
    }
}

pub(crate) fn compose_args(
    project: &ComposeProject,
    verb: &[&str],
    services: &[String],
) -> Vec<String> {
    let mut args = vec![
        "compose".to_owned(),
        "-f".to_owned(),
        project.manifest_path.to_string_lossy().into_owned(),
    ];
    if let Some(env_file) = &project.env_file {
        args.push("--env-file".to_owned());
        args.push(env_file.to_string_lossy().into_owned());
    }
    args.extend(verb.iter().map(|v| (*v).to_owned()));
    args.extend(services.iter().cloned());
    args
}

impl ContainerEngine for CliEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn available(&self) -> bool {
        crate::prereq::command_exists(&self.program)
    }

    fn local_digest(&self, image: &ImageReference) -> Result<Option<String>, RuntimeError> {
        let args = [
            "image".to_owned(),
            "inspect".to_owned(),
            "--format".to_owned(),
            "{{json .RepoDigests}}".to_owned(),
            image.full_reference(),
        ];
        match self.run(&args) {
            Ok(output) => digest_from_repo_digests(&String::from_utf8_lossy(&output.stdout), image),
            Err(RuntimeError::CommandFailed { stderr, .. }) if is_missing_image(&stderr) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn pull(&self, project: &ComposeProject, services: &[String]) -> Result<(), RuntimeError> {
        self.compose(project, &["pull"], services)
    }

    fn stop(&self, project: &ComposeProject, services: &[String]) -> Result<(), RuntimeError> {
        self.compose(project, &["stop"], services)
    }

    fn start(&self, project: &ComposeProject, services: &[String]) -> Result<(), RuntimeError> {
        self.compose(project, &["up", "-d"], services)
    }

    fn prune(&self) -> Result<(), RuntimeError> {
        self.run(&["image".to_owned(), "prune".to_owned(), "-f".to_owned()])?;
        Ok(())
    }
}

fn is_missing_image(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    ["no such image", "image not known", "not found"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Pick the digest for `image` out of `{{json .RepoDigests}}` output.
///
/// Entries look like `nginx@sha256:..` (docker) or `docker.io/library/nginx@sha256:..`
/// (podman); both are normalized before comparing against `image`. `null` or no
/// matching entry means the image was never pulled from that repository.
pub fn digest_from_repo_digests(
    json: &str,
    image: &ImageReference,
) -> Result<Option<String>, RuntimeError> {
    let entries: Option<Vec<String>> = serde_json::from_str(json.trim())
        .map_err(|e| RuntimeError::InvalidOutput(format!("RepoDigests: {e}")))?;
    Ok(entries.unwrap_or_default().into_iter().find_map(|entry| {
        let (name, digest) = entry.split_once('@')?;
        let candidate = ImageReference::normalize(name);
        (candidate.registry == image.registry && candidate.repository == image.repository)
            .then(|| digest.to_owned())
    }))
}
