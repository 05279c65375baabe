use super::{EXIT_FAILURE, EXIT_SUCCESS};
use harbormaster_remote::{default_config_path, RegistryConfig};
use harbormaster_runtime::{check_engine_prereqs, detect_engine, format_missing};

pub fn run(engine_name: &str, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_engine(engine_name, &mut checks, &mut all_pass);
    check_registry_config(&mut checks, &mut all_pass);

    print_results(&checks, all_pass, json_output)
}

fn check_engine(engine_name: &str, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let program = match engine_name {
        "auto" => {
            if let Some(program) = detect_engine() {
                program
            } else {
                *all_pass = false;
                checks.push(Check::fail(
                    "engine",
                    "No container engine found (install docker or podman)",
                ));
                return;
            }
        }
        "docker" | "podman" | "mock" => engine_name,
        other => {
            *all_pass = false;
            checks.push(Check::fail(
                "engine",
                &format!("Unknown engine '{other}' (expected docker, podman, mock, or auto)"),
            ));
            return;
        }
    };

    let missing = check_engine_prereqs(program);
    if missing.is_empty() {
        checks.push(Check::pass(
            "engine",
            &format!("Container engine '{program}' ready"),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail("engine", &format_missing(&missing)));
    }
}

fn check_registry_config(checks: &mut Vec<Check>, all_pass: &mut bool) {
    match default_config_path() {
        Ok(path) if path.exists() => match RegistryConfig::load(&path) {
            Ok(_) => checks.push(Check::pass(
                "registry_config",
                &format!("Registry config {} is valid", path.display()),
            )),
            Err(e) => {
                *all_pass = false;
                checks.push(Check::fail("registry_config", &e.to_string()));
            }
        },
        Ok(path) => checks.push(Check::info(
            "registry_config",
            &format!("No registry config at {} (using defaults)", path.display()),
        )),
        Err(e) => checks.push(Check::warn(
            "registry_config",
            &format!("Cannot locate registry config: {e}"),
        )),
    }

    let has_token = RegistryConfig::load_default()
        .ok()
        .and_then(|c| c.ghcr_token)
        .is_some();
    if has_token {
        checks.push(Check::info("ghcr_token", "GHCR token configured"));
    } else {
        checks.push(Check::info(
            "ghcr_token",
            "No GHCR token (anonymous pulls only; set GHCR_TOKEN for private images)",
        ));
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Harbormaster Doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
