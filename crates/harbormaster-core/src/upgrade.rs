use crate::concurrency::{shutdown_requested, UpgradeLock};
use crate::project::{Project, ResolvedImage};
use crate::CoreError;
use harbormaster_runtime::ContainerEngine;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpgradeState {
    Scan,
    Plan,
    Report,
    Confirm,
    Pull,
    Stop,
    Start,
    Prune,
    Done,
    Aborted,
    Cancelled,
}

impl UpgradeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::Cancelled)
    }
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scan => "SCAN",
            Self::Plan => "PLAN",
            Self::Report => "REPORT",
            Self::Confirm => "CONFIRM",
            Self::Pull => "PULL",
            Self::Stop => "STOP",
            Self::Start => "START",
            Self::Prune => "PRUNE",
            Self::Done => "DONE",
            Self::Aborted => "ABORTED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

pub fn validate_transition(from: UpgradeState, to: UpgradeState) -> Result<(), CoreError> {
    use UpgradeState::{
        Aborted, Cancelled, Confirm, Done, Plan, Prune, Pull, Report, Scan, Start, Stop,
    };
    let valid = matches!(
        (from, to),
        (Scan, Plan)
            | (Plan, Report | Confirm | Done)
            | (Report, Done)
            | (Confirm, Pull | Cancelled | Aborted)
            | (Pull, Stop | Aborted)
            | (Stop, Start)
            | (Start, Prune | Aborted)
            | (Prune, Done)
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Plan and report only; no engine calls.
    pub dry_run: bool,
    /// Select every service, whatever its tag.
    pub force: bool,
    /// Skip confirmation (`--yes`, or stdin is not a terminal).
    pub unattended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePlan {
    pub selected_services: Vec<String>,
    /// Services left alone because their reference is pinned.
    #[serde(default)]
    pub skipped_services: Vec<String>,
    pub dry_run: bool,
    pub force: bool,
}

impl UpgradePlan {
    pub fn is_empty(&self) -> bool {
        self.selected_services.is_empty()
    }
}

/// Select the services an upgrade touches, in manifest order.
pub fn build_plan(images: &[ResolvedImage], options: &UpgradeOptions) -> UpgradePlan {
    let (selected, skipped): (Vec<&ResolvedImage>, Vec<&ResolvedImage>) = images
        .iter()
        .partition(|image| options.force || image.upgradeable());
    UpgradePlan {
        selected_services: selected.iter().map(|i| i.service_name.clone()).collect(),
        skipped_services: skipped.iter().map(|i| i.service_name.clone()).collect(),
        dry_run: options.dry_run,
        force: options.force,
    }
}

/// Asks the operator whether to go ahead with a plan.
pub trait Confirm {
    fn confirm(&self, plan: &UpgradePlan) -> bool;
}

impl<F: Fn(&UpgradePlan) -> bool> Confirm for F {
    fn confirm(&self, plan: &UpgradePlan) -> bool {
        self(plan)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeOutcome {
    pub plan: UpgradePlan,
    pub final_state: UpgradeState,
    /// Every state entered, starting with `SCAN`.
    pub transitions: Vec<UpgradeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Best-effort failures (STOP, PRUNE) that did not end the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl UpgradeOutcome {
    pub fn succeeded(&self) -> bool {
        self.final_state == UpgradeState::Done
    }
}

/// Tracks the current state and the path taken to it.
struct Run {
    state: UpgradeState,
    transitions: Vec<UpgradeState>,
    error: Option<String>,
    warnings: Vec<String>,
}

impl Run {
    fn new() -> Self {
        Self {
            state: UpgradeState::Scan,
            transitions: vec![UpgradeState::Scan],
            error: None,
            warnings: Vec::new(),
        }
    }

    fn advance(&mut self, to: UpgradeState) -> Result<(), CoreError> {
        validate_transition(self.state, to)?;
        info!("{} -> {to}", self.state);
        self.state = to;
        self.transitions.push(to);
        Ok(())
    }

    fn abort(&mut self, error: String) -> Result<(), CoreError> {
        warn!("upgrade aborted: {error}");
        self.error = Some(error);
        self.advance(UpgradeState::Aborted)
    }

    fn finish(self, plan: UpgradePlan) -> UpgradeOutcome {
        UpgradeOutcome {
            plan,
            final_state: self.state,
            transitions: self.transitions,
            error: self.error,
            warnings: self.warnings,
        }
    }
}

/// Drives an upgrade through SCAN → PLAN → CONFIRM → PULL → STOP → START → PRUNE.
///
/// Each phase is one batch call to the engine over the selected services. A PULL
/// failure aborts before anything is stopped; STOP and PRUNE failures are recorded
/// as warnings; a START failure aborts.
pub struct Orchestrator<'a> {
    engine: &'a dyn ContainerEngine,
    shutdown: fn() -> bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(engine: &'a dyn ContainerEngine) -> Self {
        Self {
            engine,
            shutdown: shutdown_requested,
        }
    }

    /// Replace the Ctrl-C check consulted before PULL and before STOP.
    #[must_use]
    pub fn with_shutdown_check(mut self, shutdown: fn() -> bool) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn run(
        &self,
        project: &Project,
        options: &UpgradeOptions,
        confirm: &dyn Confirm,
    ) -> Result<UpgradeOutcome, CoreError> {
        let mut run = Run::new();

        run.advance(UpgradeState::Plan)?;
        let plan = build_plan(project.images(), options);
        info!(
            "{} selected, {} skipped",
            plan.selected_services.len(),
            plan.skipped_services.len()
        );

        if plan.is_empty() {
            run.advance(UpgradeState::Done)?;
            return Ok(run.finish(plan));
        }
        if options.dry_run {
            run.advance(UpgradeState::Report)?;
            run.advance(UpgradeState::Done)?;
            return Ok(run.finish(plan));
        }

        run.advance(UpgradeState::Confirm)?;
        if !options.unattended && !confirm.confirm(&plan) {
            run.advance(UpgradeState::Cancelled)?;
            return Ok(run.finish(plan));
        }
        if (self.shutdown)() {
            run.abort("interrupted before pull".to_owned())?;
            return Ok(run.finish(plan));
        }

        let _lock = UpgradeLock::acquire(project.manifest_path())?;
        let compose = project.compose_project();
        let services = &plan.selected_services;

        run.advance(UpgradeState::Pull)?;
        if let Err(e) = self.engine.pull(&compose, services) {
            run.abort(format!("pull failed: {e}"))?;
            return Ok(run.finish(plan));
        }
        if (self.shutdown)() {
            run.abort("interrupted before stop".to_owned())?;
            return Ok(run.finish(plan));
        }

        run.advance(UpgradeState::Stop)?;
        if let Err(e) = self.engine.stop(&compose, services) {
            warn!("stop failed, continuing: {e}");
            run.warnings.push(format!("stop failed: {e}"));
        }

        run.advance(UpgradeState::Start)?;
        if let Err(e) = self.engine.start(&compose, services) {
            run.abort(format!("start failed: {e}"))?;
            return Ok(run.finish(plan));
        }

        run.advance(UpgradeState::Prune)?;
        if let Err(e) = self.engine.prune() {
            warn!("prune failed: {e}");
            run.warnings.push(format!("prune failed: {e}"));
        }

        run.advance(UpgradeState::Done)?;
        Ok(run.finish(plan))
    }
}
