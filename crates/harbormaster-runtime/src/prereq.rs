use std::fmt;
use std::process::Command;

/// Tool an upgrade needs that is not installed, with where to get it.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  - {} is needed for {}", self.name, self.purpose)?;
        write!(f, "\n      get it: {}", self.install_hint)
    }
}

pub(crate) fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .is_ok_and(|out| out.status.success())
}

fn compose_plugin_works(program: &str) -> bool {
    Command::new(program)
        .args(["compose", "version"])
        .output()
        .is_ok_and(|out| out.status.success())
}

/// What `program` (docker or podman) lacks for inspecting images and running
/// compose phases. The mock engine needs nothing.
pub fn check_engine_prereqs(program: &str) -> Vec<MissingPrereq> {
    if program == "mock" {
        return Vec::new();
    }

    if !command_exists(program) {
        return vec![MissingPrereq {
            name: program.to_owned(),
            purpose: "image inspection and upgrades",
            install_hint: "https://docs.docker.com/engine/install/ | zypper install podman | apt install podman | dnf install podman",
        }];
    }
    if !compose_plugin_works(program) {
        return vec![MissingPrereq {
            name: format!("{program} compose"),
            purpose: "pulling and restarting compose services",
            install_hint: "install the docker compose plugin, or podman-compose for podman",
        }];
    }
    Vec::new()
}

/// One error message listing every missing tool.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    let lines: Vec<String> = missing.iter().map(ToString::to_string).collect();
    format!(
        "container engine not ready:\n{}\n\nHarbormaster inspects local images and runs upgrades through docker or podman.",
        lines.join("\n")
    )
}
