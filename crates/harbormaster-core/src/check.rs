use crate::compare::{compare, DigestComparison, ServiceStatus};
use crate::project::{Project, ResolvedImage};
use chrono::{DateTime, Utc};
use harbormaster_remote::DigestSource;
use harbormaster_runtime::ContainerEngine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use tracing::{debug, info, warn};

/// Worker threads used when the caller does not choose.
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pinned: usize,
    pub not_pulled: usize,
    pub current: usize,
    pub update: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn tally(results: &[DigestComparison]) -> Self {
        let mut counts = Self::default();
        for result in results {
            *counts.slot(result.status) += 1;
        }
        counts
    }

    pub fn get(&self, status: ServiceStatus) -> usize {
        match status {
            ServiceStatus::Pinned => self.pinned,
            ServiceStatus::NotPulled => self.not_pulled,
            ServiceStatus::Current => self.current,
            ServiceStatus::Update => self.update,
            ServiceStatus::Error => self.error,
        }
    }

    pub fn total(&self) -> usize {
        ServiceStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }

    fn slot(&mut self, status: ServiceStatus) -> &mut usize {
        match status {
            ServiceStatus::Pinned => &mut self.pinned,
            ServiceStatus::NotPulled => &mut self.not_pulled,
            ServiceStatus::Current => &mut self.current,
            ServiceStatus::Update => &mut self.update,
            ServiceStatus::Error => &mut self.error,
        }
    }
}

/// Result of checking every service of one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub manifest: PathBuf,
    pub checked_at: DateTime<Utc>,
    /// In manifest order.
    pub services: Vec<DigestComparison>,
    pub summary: StatusCounts,
}

impl CheckReport {
    pub fn new(manifest: PathBuf, services: Vec<DigestComparison>) -> Self {
        let summary = StatusCounts::tally(&services);
        Self {
            manifest,
            checked_at: Utc::now(),
            services,
            summary,
        }
    }

    /// Services with a newer remote image that an upgrade would pick up.
    pub fn updates(&self) -> impl Iterator<Item = &DigestComparison> {
        self.services
            .iter()
            .filter(|s| s.status == ServiceStatus::Update && s.upgradeable)
    }

    pub fn has_errors(&self) -> bool {
        self.summary.error > 0
    }
}

/// Compares local and remote digests for a set of images.
pub struct Checker<'a> {
    registry: &'a dyn DigestSource,
    engine: &'a dyn ContainerEngine,
    concurrency: usize,
}

impl<'a> Checker<'a> {
    pub fn new(registry: &'a dyn DigestSource, engine: &'a dyn ContainerEngine) -> Self {
        Self {
            registry,
            engine,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn check_project(&self, project: &Project) -> CheckReport {
        info!(
            "checking {} services in {}",
            project.images().len(),
            project.manifest_path().display()
        );
        let results = self.check_all(project.images());
        CheckReport::new(project.manifest_path().to_path_buf(), results)
    }

    /// Check every image on a bounded pool of scoped worker threads. Results keep
    /// the order of `images` whatever order the lookups finish in.
    pub fn check_all(&self, images: &[ResolvedImage]) -> Vec<DigestComparison> {
        let workers = self.concurrency.min(images.len());
        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                scope.spawn(move || loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(image) = images.get(index) else {
                        break;
                    };
                    if tx.send((index, self.check_one(image))).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        let mut indexed: Vec<(usize, DigestComparison)> = rx.into_iter().collect();
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    /// Check a single image. Digest-pinned references touch neither the engine
    /// nor the registry.
    pub fn check_one(&self, resolved: &ResolvedImage) -> DigestComparison {
        let image = &resolved.image;
        if let Some(digest) = image.digest() {
            return compare(
                &resolved.service_name,
                image.clone(),
                None,
                Ok(digest.to_owned()),
            );
        }
        let local = match self.engine.local_digest(image) {
            Ok(digest) => digest,
            Err(e) => {
                warn!("{}: local digest lookup failed: {e}", resolved.service_name);
                None
            }
        };
        let remote = self.registry.remote_digest(image);
        let result = compare(&resolved.service_name, image.clone(), local, remote);
        debug!("{}: {}", result.service_name, result.status);
        result
    }
}
