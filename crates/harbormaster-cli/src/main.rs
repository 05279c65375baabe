mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR};
use harbormaster_core::{install_signal_handler, DEFAULT_CONCURRENCY, DEFAULT_MAX_DEPTH};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "harbormaster",
    version,
    about = "Check compose services for newer images and upgrade them safely"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compare local image digests with the registry for every service.
    Check {
        /// Compose file, or a directory containing one.
        #[arg(default_value = ".")]
        manifest: PathBuf,
        /// Variables file for ${VAR} substitution (default: .env next to the manifest).
        #[arg(long)]
        env_file: Option<PathBuf>,
        /// Container engine: docker, podman, mock, or auto.
        #[arg(long, default_value = "auto")]
        engine: String,
        /// Registry lookups run in parallel.
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
        /// Total timeout per registry request, in seconds.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
    },
    /// Pull, stop, restart, and prune services with moving tags.
    Upgrade {
        /// Compose file, or a directory containing one.
        #[arg(default_value = ".")]
        manifest: PathBuf,
        /// Show the plan without touching any container.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Upgrade every service, including pinned tags.
        #[arg(long, default_value_t = false)]
        force: bool,
        /// Do not ask for confirmation.
        #[arg(short, long, default_value_t = false)]
        yes: bool,
        /// Variables file passed to compose and used for ${VAR} substitution.
        #[arg(long)]
        env_file: Option<PathBuf>,
        /// Container engine: docker, podman, mock, or auto.
        #[arg(long, default_value = "auto")]
        engine: String,
    },
    /// Find compose files under a directory.
    Scan {
        /// Directory to search.
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// 1 = only files directly inside DIR.
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },
    /// Run diagnostic checks on the container engine and registry configuration.
    Doctor {
        /// Container engine: docker, podman, mock, or auto.
        #[arg(long, default_value = "auto")]
        engine: String,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("HARBORMASTER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    install_signal_handler();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Check {
            manifest,
            env_file,
            engine,
            concurrency,
            timeout,
        } => commands::check::run(
            &manifest,
            env_file.as_deref(),
            &engine,
            concurrency,
            timeout,
            json_output,
        ),
        Commands::Upgrade {
            manifest,
            dry_run,
            force,
            yes,
            env_file,
            engine,
        } => commands::upgrade::run(
            &manifest,
            env_file.as_deref(),
            &engine,
            commands::upgrade::Flags {
                dry_run,
                force,
                yes,
            },
            json_output,
        ),
        Commands::Scan { dir, max_depth } => commands::scan::run(&dir, max_depth, json_output),
        Commands::Doctor { engine } => commands::doctor::run(&engine, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:") {
                EXIT_MANIFEST_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
