use crate::engine::{ComposeProject, ContainerEngine};
use crate::RuntimeError;
use harbormaster_schema::ImageReference;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Engine operations, as recorded by [`MockEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Inspect,
    Pull,
    Stop,
    Start,
    Prune,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCall {
    pub phase: Phase,
    pub services: Vec<String>,
}

/// In-memory engine: serves configured local digests, records every call, and
/// fails the phases it is told to fail.
#[derive(Default)]
pub struct MockEngine {
    digests: HashMap<String, String>,
    failing: HashSet<Phase>,
    calls: Mutex<Vec<EngineCall>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `digest` as pulled for `reference` (normalized before storing).
    #[must_use]
    pub fn with_local_digest(mut self, reference: &str, digest: &str) -> Self {
        self.digests.insert(
            ImageReference::normalize(reference).full_reference(),
            digest.to_owned(),
        );
        self
    }

    #[must_use]
    pub fn failing(mut self, phase: Phase) -> Self {
        self.failing.insert(phase);
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Calls other than `Inspect`, i.e. the ones that change engine state.
    pub fn mutating_calls(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.phase != Phase::Inspect)
            .collect()
    }

    fn record(&self, phase: Phase, services: &[String]) -> Result<(), RuntimeError> {
        let mut calls = self
            .calls
            .lock()
            .map_err(|e| RuntimeError::InvalidOutput(format!("mutex poisoned: {e}")))?;
        calls.push(EngineCall {
            phase,
            services: services.to_vec(),
        });
        if self.failing.contains(&phase) {
            return Err(RuntimeError::CommandFailed {
                command: format!("mock {phase:?}").to_lowercase(),
                code: Some(1),
                stderr: "mock failure".to_owned(),
            });
        }
        Ok(())
    }
}

impl ContainerEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn local_digest(&self, image: &ImageReference) -> Result<Option<String>, RuntimeError> {
        let reference = image.full_reference();
        self.record(Phase::Inspect, std::slice::from_ref(&reference))?;
        Ok(self.digests.get(&reference).cloned())
    }

    fn pull(&self, _project: &ComposeProject, services: &[String]) -> Result<(), RuntimeError> {
        self.record(Phase::Pull, services)
    }

    fn stop(&self, _project: &ComposeProject, services: &[String]) -> Result<(), RuntimeError> {
        self.record(Phase::Stop, services)
    }

    fn start(&self, _project: &ComposeProject, services: &[String]) -> Result<(), RuntimeError> {
        self.record(Phase::Start, services)
    }

    fn prune(&self) -> Result<(), RuntimeError> {
        self.record(Phase::Prune, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_digest_matches_normalized_reference() {
        let engine = MockEngine::new().with_local_digest("nginx", "sha256:abc");
        let digest = engine
            .local_digest(&ImageReference::normalize("docker.io/library/nginx:latest"))
            .unwrap();
        assert_eq!(digest.as_deref(), Some("sha256:abc"));
        assert_eq!(
            engine
                .local_digest(&ImageReference::normalize("redis"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn records_calls_in_order() {
        let engine = MockEngine::new();
        let project = ComposeProject::new("compose.yaml");
        let web = vec!["web".to_owned()];
        engine.pull(&project, &web).unwrap();
        engine.stop(&project, &web).unwrap();
        engine.start(&project, &web).unwrap();
        engine.prune().unwrap();

        let phases: Vec<Phase> = engine.calls().iter().map(|c| c.phase).collect();
        assert_eq!(
            phases,
            [Phase::Pull, Phase::Stop, Phase::Start, Phase::Prune]
        );
        assert_eq!(engine.calls()[0].services, web);
    }

    #[test]
    fn failing_phase_errors_but_is_recorded() {
        let engine = MockEngine::new().failing(Phase::Pull);
        let err = engine
            .pull(&ComposeProject::new("compose.yaml"), &["db".to_owned()])
            .unwrap_err();
        assert!(err.to_string().contains("mock pull"));
        assert_eq!(engine.calls().len(), 1);
    }

    #[test]
    fn mutating_calls_skip_inspects() {
        let engine = MockEngine::new();
        engine
            .local_digest(&ImageReference::normalize("nginx"))
            .unwrap();
        assert_eq!(engine.calls().len(), 1);
        assert!(engine.mutating_calls().is_empty());
    }
}
