use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Exclusive lock held for the mutating phases of an upgrade, so two runs never
/// pull and restart the same project at once.
pub struct UpgradeLock {
    lock_file: File,
    path: PathBuf,
}

impl UpgradeLock {
    /// Lock file for `manifest`, under the system temp directory.
    pub fn path_for(manifest: &Path) -> PathBuf {
        let absolute = std::fs::canonicalize(manifest).unwrap_or_else(|_| manifest.to_path_buf());
        let key: String = absolute
            .to_string_lossy()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        std::env::temp_dir().join(format!("harbormaster-{key}.lock"))
    }

    /// Take the lock for `manifest`, failing with [`CoreError::Locked`] when another
    /// process holds it.
    pub fn acquire(manifest: &Path) -> Result<Self, CoreError> {
        let path = Self::path_for(manifest);
        Self::try_acquire_at(&path)?.ok_or_else(|| CoreError::Locked(manifest.to_path_buf()))
    }

    pub fn try_acquire_at(lock_path: &Path) -> Result<Option<Self>, CoreError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                lock_file: file,
                path: lock_path.to_path_buf(),
            })),
            Err(_) => Ok(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UpgradeLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            std::process::exit(130);
        }
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\nshutdown requested, stopping before the next upgrade phase...");
    });
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
