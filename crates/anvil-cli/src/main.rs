use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod completion;
mod core_flows;
mod dispatch;
mod render;

use dispatch::run_cli;
use render::{error_output_style, render_error};

const LOG_ENV: &str = "ANVIL_LOG";

#[derive(Parser, Debug)]
#[command(name = "anvil")]
#[command(about = "Resolve packages and plan their builds", long_about = None)]
struct Cli {
    /// Directory holding the package index and checkouts.
    #[arg(long, global = true)]
    registry_root: Option<PathBuf>,
    /// Raise log verbosity; repeat for more.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve dependencies and update the lockfile.
    Resolve {
        #[arg(default_value = ".")]
        package_dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List the modules of the resolved package graph, dependencies first.
    Modules {
        #[arg(default_value = ".")]
        package_dir: PathBuf,
    },
    /// Write the build manifest for the package.
    Plan {
        #[arg(default_value = ".")]
        package_dir: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        build_dir: Option<PathBuf>,
        #[arg(long)]
        configuration: Option<String>,
        /// Compiler used for every module.
        #[arg(long)]
        toolchain: Option<PathBuf>,
    },
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render_error(error_output_style(), &err));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests;
