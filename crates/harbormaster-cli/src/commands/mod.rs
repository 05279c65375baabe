pub mod check;
pub mod completions;
pub mod doctor;
pub mod scan;
pub mod upgrade;

use harbormaster_core::{CoreError, Project, ServiceStatus};
use harbormaster_remote::{ConfigError, RegistryConfig};
use harbormaster_runtime::{select_engine, ContainerEngine};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Color `text` (usually the padded status label) by `status`.
pub fn colorize_status(status: ServiceStatus, text: &str) -> String {
    use console::Style;
    let style = match status {
        ServiceStatus::Update => Style::new().yellow().bold(),
        ServiceStatus::Current => Style::new().green(),
        ServiceStatus::Pinned => Style::new().blue(),
        ServiceStatus::NotPulled => Style::new().dim(),
        ServiceStatus::Error => Style::new().red(),
    };
    style.apply_to(text).to_string()
}

/// First 12 hex characters of a `sha256:` digest, `-` when absent.
pub fn short_digest(digest: Option<&str>) -> String {
    match digest {
        Some(d) => {
            let hex = d.split_once(':').map_or(d, |(_, hex)| hex);
            hex.chars().take(12).collect()
        }
        None => "-".to_owned(),
    }
}

/// Map a core error to the CLI message; manifest problems get the prefix that
/// selects [`EXIT_MANIFEST_ERROR`].
pub fn core_error(e: &CoreError) -> String {
    if e.is_manifest_error() {
        format!("manifest error: {e}")
    } else {
        e.to_string()
    }
}

pub fn open_project(manifest: &Path, env_file: Option<&Path>) -> Result<Project, String> {
    Project::open(manifest, env_file).map_err(|e| core_error(&e))
}

pub fn make_engine(name: &str) -> Result<Box<dyn ContainerEngine>, String> {
    select_engine(name).map_err(|e| e.to_string())
}

/// Registry settings from the user config, with `timeout_secs` overriding the
/// total request timeout.
pub fn load_registry_config(timeout_secs: Option<u64>) -> Result<RegistryConfig, String> {
    let mut config = match RegistryConfig::load_default() {
        Ok(config) => config,
        Err(ConfigError::NoHome) => {
            RegistryConfig::default().with_env_token(|name| std::env::var(name).ok())
        }
        Err(e) => return Err(e.to_string()),
    };
    if let Some(secs) = timeout_secs {
        config.total_timeout_secs = secs;
        config.connect_timeout_secs = config.connect_timeout_secs.min(secs);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbormaster_schema::SchemaError;
    use std::path::PathBuf;

    #[test]
    fn json_pretty_serializes_string() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn colorize_status_keeps_text() {
        for status in ServiceStatus::ALL {
            let label = status.to_string();
            assert!(colorize_status(status, &label).contains(&label));
        }
    }

    #[test]
    fn short_digest_strips_algorithm() {
        assert_eq!(
            short_digest(Some(
                "sha256:abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789"
            )),
            "abcdef012345"
        );
        assert_eq!(short_digest(None), "-");
    }

    #[test]
    fn manifest_errors_get_manifest_prefix() {
        let missing = CoreError::Schema(SchemaError::ComposeNotFound(PathBuf::from("/x")));
        assert!(core_error(&missing).starts_with("manifest error:"));

        let locked = CoreError::Locked(PathBuf::from("/x/compose.yaml"));
        assert!(!core_error(&locked).starts_with("manifest error:"));
    }

    #[test]
    fn unknown_engine_is_rejected() {
        assert!(make_engine("containerd").is_err());
        assert_eq!(make_engine("mock").unwrap().name(), "mock");
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_MANIFEST_ERROR);
        assert_ne!(EXIT_SUCCESS, EXIT_MANIFEST_ERROR);
    }

    #[test]
    fn spinner_finishes_cleanly() {
        let pb = spinner("checking");
        spin_ok(&pb, "done");
        assert!(pb.is_finished());

        let pb = spinner("checking");
        spin_fail(&pb, "failed");
        assert!(pb.is_finished());
    }
}
