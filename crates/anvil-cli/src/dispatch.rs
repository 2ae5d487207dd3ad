use std::io::Write;
use std::path::PathBuf;

use anvil_registry::RegistryIndex;
use anyhow::{Context, Result};

use crate::completion::write_completions_script;
use crate::core_flows::{lower_workspace, plan_workspace, resolve_workspace, PlanOverrides};
use crate::render::{
    current_output_style, format_module_lines, format_resolved_lines, render_status_line,
    resolved_graph_json,
};
use crate::{Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let index = RegistryIndex::open(
        cli.registry_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(".")),
    );
    let style = current_output_style();

    match cli.command {
        Commands::Resolve { package_dir, json } => {
            let workspace = resolve_workspace(&package_dir, &index)?;
            if json {
                let rendered = serde_json::to_string_pretty(&resolved_graph_json(&workspace.graph))
                    .context("failed to serialize resolved graph")?;
                println!("{rendered}");
                return Ok(());
            }

            for line in format_resolved_lines(&workspace.graph) {
                println!("{line}");
            }
            if workspace.lockfile_updated {
                println!(
                    "{}",
                    render_status_line(
                        style,
                        "ok",
                        &format!("locked {} packages", workspace.graph.packages.len())
                    )
                );
            }
        }
        Commands::Modules { package_dir } => {
            let workspace = resolve_workspace(&package_dir, &index)?;
            let graph = lower_workspace(&workspace)?;
            for line in format_module_lines(&graph) {
                println!("{line}");
            }
        }
        Commands::Plan {
            package_dir,
            output,
            build_dir,
            configuration,
            toolchain,
        } => {
            let overrides = PlanOverrides {
                output,
                build_dir,
                configuration,
                toolchain,
            };
            let outcome = plan_workspace(&package_dir, &index, &overrides)?;
            let message = if outcome.written {
                format!(
                    "wrote {} ({} commands)",
                    outcome.manifest_path.display(),
                    outcome.commands
                )
            } else {
                format!("{} is up to date", outcome.manifest_path.display())
            };
            println!("{}", render_status_line(style, "ok", &message));
            if outcome.auxiliary_files > 0 {
                println!(
                    "{}",
                    render_status_line(
                        style,
                        "ok",
                        &format!("refreshed {} auxiliary files", outcome.auxiliary_files)
                    )
                );
            }
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout().lock();
            write_completions_script(shell, &mut stdout)?;
            stdout.flush().context("failed flushing completion script")?;
        }
    }

    Ok(())
}
