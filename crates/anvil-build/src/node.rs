use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Directory,
    DirectoryStructure,
    Virtual,
    CommandTimestamp,
}

/// A build-graph node. Its identity is its rendered name: equal names denote
/// the same node across commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    name: String,
    kind: NodeKind,
    is_mutated: bool,
}

impl Node {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(path.as_ref().display().to_string(), NodeKind::File)
    }

    /// Rendered with a trailing `/`.
    pub fn directory(path: impl AsRef<Path>) -> Self {
        Self::new(directory_name(path.as_ref()), NodeKind::Directory)
    }

    /// A directory whose whole content tree is the input, rendered with a
    /// trailing `/`.
    pub fn directory_structure(path: impl AsRef<Path>) -> Self {
        Self::new(directory_name(path.as_ref()), NodeKind::DirectoryStructure)
    }

    /// A named node with no filesystem counterpart, rendered as `<name>`.
    pub fn virtual_node(name: &str) -> Self {
        Self::new(bracketed(name), NodeKind::Virtual)
    }

    /// A virtual node the executor stamps each time its producing command
    /// runs. Consumers depend on it to order themselves after a command that
    /// mutates a file in place.
    pub fn command_timestamp(name: &str) -> Self {
        Self::new(bracketed(name), NodeKind::CommandTimestamp)
    }

    fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            kind,
            is_mutated: false,
        }
    }

    pub fn mutated(mut self) -> Self {
        self.is_mutated = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_mutated(&self) -> bool {
        self.is_mutated
    }

    pub(crate) fn mark_mutated(&mut self) {
        self.is_mutated = true;
    }

    /// Whether the node needs an entry under `nodes:` in the rendered manifest.
    pub fn has_attributes(&self) -> bool {
        self.is_mutated
            || matches!(
                self.kind,
                NodeKind::DirectoryStructure | NodeKind::CommandTimestamp
            )
    }

    /// The name without the `<...>` brackets of virtual nodes.
    pub fn bare_name(&self) -> &str {
        match self.kind {
            NodeKind::Virtual | NodeKind::CommandTimestamp => self
                .name
                .strip_prefix('<')
                .and_then(|rest| rest.strip_suffix('>'))
                .unwrap_or(&self.name),
            _ => &self.name,
        }
    }
}

fn directory_name(path: &Path) -> String {
    let mut name = path.display().to_string();
    if !name.ends_with('/') {
        name.push('/');
    }
    name
}

fn bracketed(name: &str) -> String {
    if name.starts_with('<') && name.ends_with('>') {
        name.to_string()
    } else {
        format!("<{name}>")
    }
}
