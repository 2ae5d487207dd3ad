use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::BuildError;
use crate::node::{Node, NodeKind};

const ENTITLEMENT_PLIST: &str = "entitlement-plist";
const LINK_FILE_LIST: &str = "link-file-list";

/// Generated files written by the `write-auxiliary-file` tool.
///
/// The first input of every such command is a virtual node naming the kind;
/// the rest carry all the data the content is derived from. Both
/// [`AuxiliaryFile::compute_inputs`] and [`file_contents`] are pure, so the
/// executor can cache by input signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuxiliaryFile {
    EntitlementPlist { entitlements: Vec<String> },
    LinkFileList { objects: Vec<PathBuf> },
}

impl AuxiliaryFile {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::EntitlementPlist { .. } => ENTITLEMENT_PLIST,
            Self::LinkFileList { .. } => LINK_FILE_LIST,
        }
    }

    pub fn compute_inputs(&self) -> Vec<Node> {
        let mut inputs = vec![Node::virtual_node(self.kind_name())];
        match self {
            Self::EntitlementPlist { entitlements } => {
                inputs.extend(entitlements.iter().map(|name| Node::virtual_node(name)));
            }
            Self::LinkFileList { objects } => {
                inputs.extend(objects.iter().map(Node::file));
            }
        }
        inputs
    }
}

pub fn file_contents(inputs: &[Node]) -> Result<Vec<u8>, BuildError> {
    let Some((marker, rest)) = inputs.split_first() else {
        return Err(malformed("no inputs"));
    };
    if marker.kind() != NodeKind::Virtual {
        return Err(malformed(format!(
            "first input '{}' is not a kind marker",
            marker.name()
        )));
    }

    match marker.bare_name() {
        ENTITLEMENT_PLIST => Ok(render_plist(&entitlements(inputs)?).into_bytes()),
        LINK_FILE_LIST => {
            let mut content = String::new();
            for object in rest {
                if object.kind() != NodeKind::File {
                    return Err(malformed(format!(
                        "link file list entry '{}' is not a file",
                        object.name()
                    )));
                }
                content.push('"');
                content.push_str(&escape_link_path(object.name()));
                content.push_str("\"\n");
            }
            Ok(content.into_bytes())
        }
        other => Err(malformed(format!("unknown auxiliary file kind '{other}'"))),
    }
}

/// Decodes the entitlement inputs back into a flag-to-value mapping.
pub fn entitlements(inputs: &[Node]) -> Result<BTreeMap<String, bool>, BuildError> {
    let Some((marker, rest)) = inputs.split_first() else {
        return Err(malformed("no inputs"));
    };
    if marker.bare_name() != ENTITLEMENT_PLIST {
        return Err(malformed(format!(
            "expected '{ENTITLEMENT_PLIST}' marker, found '{}'",
            marker.name()
        )));
    }

    let mut flags = BTreeMap::new();
    for node in rest {
        if node.kind() != NodeKind::Virtual {
            return Err(malformed(format!(
                "entitlement '{}' is not a virtual node",
                node.name()
            )));
        }
        flags.insert(node.bare_name().to_string(), true);
    }
    Ok(flags)
}

fn render_plist(flags: &BTreeMap<String, bool>) -> String {
    let mut content = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n",
        "<plist version=\"1.0\">\n",
        "<dict>\n",
    ));
    for (name, value) in flags {
        content.push_str(&format!("\t<key>{}</key>\n", escape_xml(name)));
        content.push_str(if *value { "\t<true/>\n" } else { "\t<false/>\n" });
    }
    content.push_str("</dict>\n</plist>\n");
    content
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_link_path(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn malformed(reason: impl Into<String>) -> BuildError {
    BuildError::MalformedAuxiliaryInputs {
        reason: reason.into(),
    }
}
