use super::{
    colorize_status, json_pretty, load_registry_config, make_engine, open_project, short_digest,
    spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS,
};
use harbormaster_core::{CheckReport, Checker, ServiceStatus};
use harbormaster_remote::RegistryClient;
use std::path::Path;

pub fn run(
    manifest: &Path,
    env_file: Option<&Path>,
    engine_name: &str,
    concurrency: usize,
    timeout_secs: Option<u64>,
    json_output: bool,
) -> Result<u8, String> {
    let project = open_project(manifest, env_file)?;
    let client = RegistryClient::new(load_registry_config(timeout_secs)?);
    let engine = make_engine(engine_name)?;

    let checker = Checker::new(&client, engine.as_ref()).with_concurrency(concurrency);

    let report = if json_output {
        checker.check_project(&project)
    } else {
        let pb = spinner(&format!(
            "checking {} service(s) in {}",
            project.images().len(),
            project.manifest_path().display()
        ));
        let report = checker.check_project(&project);
        if report.has_errors() {
            spin_fail(&pb, "registry lookups finished with errors");
        } else {
            spin_ok(&pb, "registry lookups finished");
        }
        report
    };

    if json_output {
        println!("{}", json_pretty(&report)?);
    } else {
        print_table(&report);
    }

    Ok(if report.has_errors() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    })
}

fn print_table(report: &CheckReport) {
    let name_width = report
        .services
        .iter()
        .map(|s| s.service_name.len())
        .chain(std::iter::once("SERVICE".len()))
        .max()
        .unwrap_or(0);
    let image_width = report
        .services
        .iter()
        .map(|s| s.resolved_image.full_reference().len())
        .chain(std::iter::once("IMAGE".len()))
        .max()
        .unwrap_or(0);

    println!(
        "{:<name_width$}  {:<image_width$}  {:<12}  {:<12}  STATUS",
        "SERVICE", "IMAGE", "LOCAL", "REMOTE"
    );
    for s in &report.services {
        println!(
            "{:<name_width$}  {:<image_width$}  {:<12}  {:<12}  {}",
            s.service_name,
            s.resolved_image.full_reference(),
            short_digest(s.local_digest.as_deref()),
            short_digest(s.remote_digest.as_deref()),
            colorize_status(s.status, &s.status.to_string()),
        );
    }

    let problems: Vec<_> = report.services.iter().filter(|s| s.error.is_some()).collect();
    if !problems.is_empty() {
        println!();
        for s in problems {
            let code = s.error.as_deref().unwrap_or_default();
            match &s.hint {
                Some(hint) => println!("  {}: {code} ({hint})", s.service_name),
                None => println!("  {}: {code}", s.service_name),
            }
        }
    }

    println!();
    let summary: Vec<String> = ServiceStatus::ALL
        .into_iter()
        .filter(|status| report.summary.get(*status) > 0)
        .map(|status| format!("{} {status}", report.summary.get(status)))
        .collect();
    println!(
        "{} service(s): {}",
        report.summary.total(),
        if summary.is_empty() {
            "nothing to check".to_owned()
        } else {
            summary.join(", ")
        }
    );
    let updates = report.updates().count();
    if updates > 0 {
        println!("run `harbormaster upgrade` to pull {updates} newer image(s)");
    }
}
