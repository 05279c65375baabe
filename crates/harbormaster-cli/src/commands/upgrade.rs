use super::{core_error, json_pretty, make_engine, open_project, EXIT_FAILURE, EXIT_SUCCESS};
use harbormaster_core::{Orchestrator, UpgradeOptions, UpgradeOutcome, UpgradePlan, UpgradeState};
use harbormaster_runtime::{check_engine_prereqs, format_missing};
use std::io::{stderr, stdin, IsTerminal};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct Flags {
    pub dry_run: bool,
    pub force: bool,
    pub yes: bool,
}

pub fn run(
    manifest: &Path,
    env_file: Option<&Path>,
    engine_name: &str,
    flags: Flags,
    json_output: bool,
) -> Result<u8, String> {
    let project = open_project(manifest, env_file)?;
    let engine = make_engine(engine_name)?;

    if !flags.dry_run && std::env::var("HARBORMASTER_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = check_engine_prereqs(engine.name());
        if !missing.is_empty() {
            return Err(format_missing(&missing));
        }
    }

    let interactive = stdin().is_terminal() && stderr().is_terminal();
    let options = UpgradeOptions {
        dry_run: flags.dry_run,
        force: flags.force,
        unattended: flags.yes || json_output || !interactive,
    };

    let outcome = Orchestrator::new(engine.as_ref())
        .run(&project, &options, &prompt)
        .map_err(|e| core_error(&e))?;

    if json_output {
        println!("{}", json_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(match outcome.final_state {
        UpgradeState::Aborted => EXIT_FAILURE,
        _ => EXIT_SUCCESS,
    })
}

fn prompt(plan: &UpgradePlan) -> bool {
    print_plan(plan);
    dialoguer::Confirm::new()
        .with_prompt(format!(
            "Pull and restart {} service(s)?",
            plan.selected_services.len()
        ))
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn print_plan(plan: &UpgradePlan) {
    eprintln!("will upgrade: {}", plan.selected_services.join(", "));
    if !plan.skipped_services.is_empty() {
        eprintln!("pinned, skipped: {}", plan.skipped_services.join(", "));
    }
}

fn print_outcome(outcome: &UpgradeOutcome) {
    let plan = &outcome.plan;
    match outcome.final_state {
        UpgradeState::Done if plan.is_empty() => {
            println!("nothing to upgrade: every service is pinned (use --force to upgrade anyway)");
        }
        UpgradeState::Done if plan.dry_run => {
            println!("dry run, no containers touched");
            println!("would upgrade: {}", plan.selected_services.join(", "));
            if !plan.skipped_services.is_empty() {
                println!("would skip: {}", plan.skipped_services.join(", "));
            }
        }
        UpgradeState::Done => {
            println!("upgraded: {}", plan.selected_services.join(", "));
        }
        UpgradeState::Cancelled => println!("upgrade cancelled"),
        _ => {
            println!(
                "upgrade aborted: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }
}
