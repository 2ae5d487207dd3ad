use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects, Style};
use anvil_build::ModuleGraph;
use anvil_resolver::ResolvedGraph;
use serde_json::{json, Value};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    resolve_output_style(std::io::stdout().is_terminal(), no_color())
}

/// Style for diagnostics, which go to stderr.
pub(crate) fn error_output_style() -> OutputStyle {
    resolve_output_style(std::io::stderr().is_terminal(), no_color())
}

pub(crate) fn resolve_output_style(is_tty: bool, no_color: bool) -> OutputStyle {
    if is_tty && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

fn no_color() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("[{}] {message}", status.to_ascii_uppercase()),
    }
}

pub(crate) fn render_error(style: OutputStyle, err: &anyhow::Error) -> String {
    let prefix = match style {
        OutputStyle::Plain => "error:".to_string(),
        OutputStyle::Rich => colorize(error_style(), "error:"),
    };
    format!("{prefix} {err:#}")
}

pub(crate) fn format_resolved_lines(graph: &ResolvedGraph) -> Vec<String> {
    graph
        .ordered_packages()
        .map(|package| {
            format!(
                "{} {} ({})",
                package.identity, package.version, package.range
            )
        })
        .collect()
}

pub(crate) fn resolved_graph_json(graph: &ResolvedGraph) -> Value {
    let packages = graph
        .ordered_packages()
        .map(|package| {
            json!({
                "identity": package.identity.to_string(),
                "version": package.version.to_string(),
                "range": package.range.to_string(),
                "dependencies": package
                    .dependencies
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();
    json!({ "packages": packages })
}

pub(crate) fn format_module_lines(graph: &ModuleGraph) -> Vec<String> {
    graph
        .topological_order()
        .into_iter()
        .map(|id| {
            let module = graph.module(id);
            let dependencies = module
                .dependencies()
                .iter()
                .map(|dependency| graph.module(*dependency).name.as_str())
                .collect::<Vec<_>>();
            let mut line = format!("{} [{}] {}", module.name, module.kind.as_str(), module.package);
            if !dependencies.is_empty() {
                line.push_str(" <- ");
                line.push_str(&dependencies.join(", "));
            }
            line
        })
        .collect()
}

fn error_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightRed.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
