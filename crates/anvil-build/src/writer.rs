use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::auxiliary::file_contents;
use crate::config::ClientConfig;
use crate::manifest::BuildManifest;
use crate::node::{Node, NodeKind};
use crate::tool::Tool;

const CONTENT_EXCLUSION_PATTERNS: [&str; 2] = [".git", ".build"];

/// Renders `manifest` for the low-level executor. The same manifest always
/// renders to the same bytes; targets, nodes and commands appear in insertion
/// order.
pub fn render_manifest(manifest: &BuildManifest, client: &ClientConfig) -> String {
    let mut out = String::new();

    out.push_str("client:\n");
    line(&mut out, &format!("  name: {}", client.name));
    line(&mut out, &format!("  file-system: {}", client.file_system.as_str()));
    out.push_str("tools: {}\n");

    let mut targets = manifest.targets().peekable();
    if targets.peek().is_none() {
        out.push_str("targets: {}\n");
    } else {
        out.push_str("targets:\n");
        for (name, nodes) in targets {
            line(&mut out, &format!("  {}: {}", quoted(name), node_list(nodes)));
        }
    }
    line(&mut out, &format!("default: {}", quoted(manifest.default_target())));

    let mut flagged = manifest.nodes().filter(|node| node.has_attributes()).peekable();
    if flagged.peek().is_some() {
        out.push_str("nodes:\n");
        for node in flagged {
            write_node(&mut out, node);
        }
    }

    let mut commands = manifest.commands().peekable();
    if commands.peek().is_none() {
        out.push_str("commands: {}\n");
        return out;
    }
    out.push_str("commands:\n");
    for command in commands {
        let tool = &command.tool;
        line(&mut out, &format!("  {}:", quoted(&command.name)));
        line(&mut out, &format!("    tool: {}", tool.name()));
        line(&mut out, &format!("    inputs: {}", node_list(tool.inputs())));
        line(&mut out, &format!("    outputs: {}", node_list(tool.outputs())));
        write_tool_fields(&mut out, tool);
        out.push('\n');
    }

    out
}

/// Writes the rendered manifest to `path`, creating the parent directory.
/// Returns `false` without touching the file when its content is unchanged.
pub fn write_manifest(manifest: &BuildManifest, client: &ClientConfig, path: &Path) -> Result<bool> {
    let rendered = render_manifest(manifest, client);
    let written = write_if_changed(path, rendered.as_bytes())
        .with_context(|| format!("failed to write build manifest: {}", path.display()))?;
    info!(
        path = %path.display(),
        commands = manifest.commands().count(),
        written,
        "build manifest"
    );
    Ok(written)
}

/// Materializes the output of every `write-auxiliary-file` command from its
/// inputs. Returns how many files changed on disk.
pub fn write_auxiliary_files(manifest: &BuildManifest) -> Result<usize> {
    let mut changed = 0;
    for command in manifest.commands() {
        let Tool::WriteAuxiliaryFile(tool) = &command.tool else {
            continue;
        };
        let contents = file_contents(&tool.inputs)
            .with_context(|| format!("failed to compute contents for '{}'", command.name))?;
        let path = Path::new(tool.output_path());
        if write_if_changed(path, &contents)
            .with_context(|| format!("failed to write auxiliary file: {}", path.display()))?
        {
            debug!(path = %path.display(), "wrote auxiliary file");
            changed += 1;
        }
    }
    Ok(changed)
}

fn write_if_changed(path: &Path, contents: &[u8]) -> std::io::Result<bool> {
    if let Ok(existing) = fs::read(path) {
        if existing == contents {
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    Ok(true)
}

fn write_node(out: &mut String, node: &Node) {
    line(out, &format!("  {}:", quoted(node.name())));
    if node.kind() == NodeKind::DirectoryStructure {
        out.push_str("    is-directory-structure: true\n");
        let patterns = CONTENT_EXCLUSION_PATTERNS
            .iter()
            .map(|pattern| quoted(pattern))
            .collect::<Vec<_>>()
            .join(",");
        line(out, &format!("    content-exclusion-patterns: [{patterns}]"));
    }
    if node.is_mutated() {
        out.push_str("    is-mutated: true\n");
    }
    if node.kind() == NodeKind::CommandTimestamp {
        out.push_str("    is-command-timestamp: true\n");
    }
}

fn write_tool_fields(out: &mut String, tool: &Tool) {
    match tool {
        Tool::Phony(_) => {}
        Tool::Shell(shell) => {
            line(out, &format!("    description: {}", quoted(&shell.description)));
            line(out, &format!("    args: {}", string_list(&shell.arguments)));
            if !shell.environment.is_empty() {
                out.push_str("    env:\n");
                for (key, value) in &shell.environment {
                    line(out, &format!("      {}: {}", quoted(key), quoted(value)));
                }
            }
            if let Some(directory) = &shell.working_directory {
                line(out, &format!("    working-directory: {}", quoted(directory)));
            }
            if shell.allow_missing_inputs {
                out.push_str("    allow-missing-inputs: true\n");
            }
        }
        Tool::WriteAuxiliaryFile(write) => {
            let description = format!("Write auxiliary file {}", write.output_path());
            line(out, &format!("    description: {}", quoted(&description)));
        }
        Tool::Mkdir(mkdir) => {
            let path = mkdir.outputs.first().map(Node::name).unwrap_or_default();
            let description = format!("Creating directory {path}");
            line(out, &format!("    description: {}", quoted(&description)));
        }
    }
}

fn node_list(nodes: &[Node]) -> String {
    let items = nodes
        .iter()
        .map(|node| quoted(node.name()))
        .collect::<Vec<_>>();
    format!("[{}]", items.join(","))
}

fn string_list(values: &[String]) -> String {
    let items = values.iter().map(|value| quoted(value)).collect::<Vec<_>>();
    format!("[{}]", items.join(","))
}

fn line(out: &mut String, text: &str) {
    out.push_str(text);
    out.push('\n');
}

/// Double-quoted YAML scalar. Control characters without a short escape are
/// written as `\uXXXX`.
fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch.is_control() => out.push_str(&format!("\\u{:04X}", u32::from(ch))),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}
