//! Filesystem node types.
//!
//! A node is a file (with content) or a directory (with named children).
//! Children are exclusively owned nested values: there is no parent
//! back-reference, so the tree serializes cycle-free as-is. Parents are
//! derived from path strings by the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::perms::Mode;

/// A file or directory in the virtual tree.
///
/// `owner` and `group` are labels looked up against the account store,
/// never references into it. The serde shape matches the snapshot wire
/// format (`type: "file" | "dir"`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FsNode {
    pub name: String,
    #[serde(rename = "permissions")]
    pub mode: Mode,
    pub owner: String,
    pub group: String,
    /// Last-modification instant, milliseconds since the Unix epoch.
    pub mtime: i64,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// File/directory payload, mutually exclusive.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    #[serde(rename = "file")]
    File { content: String },
    #[serde(rename = "dir")]
    Directory { children: BTreeMap<String, FsNode> },
}

impl FsNode {
    /// A file with default mode (`rw-r--r--`) owned by the default user.
    pub fn file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: Mode::file_default(),
            owner: "user".to_string(),
            group: "user".to_string(),
            mtime: 0,
            kind: NodeKind::File {
                content: content.into(),
            },
        }
    }

    /// A directory with default mode (`rwxr-xr-x`) owned by the default
    /// user, keyed by the children's names.
    pub fn dir(name: impl Into<String>, children: Vec<FsNode>) -> Self {
        Self {
            name: name.into(),
            mode: Mode::dir_default(),
            owner: "user".to_string(),
            group: "user".to_string(),
            mtime: 0,
            kind: NodeKind::Directory {
                children: children.into_iter().map(|c| (c.name.clone(), c)).collect(),
            },
        }
    }

    /// Builder: replace the mode (display-string form).
    pub fn with_mode(mut self, mode: &str) -> Self {
        self.mode = Mode::from_display(mode);
        self
    }

    /// Builder: set owner and group to the same account (the usual seed
    /// case); use [`FsNode::with_group`] to diverge.
    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self.group = owner.to_string();
        self
    }

    /// Builder: override the group label only.
    pub fn with_group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    /// Builder: set the modification instant.
    pub fn with_mtime(mut self, mtime: i64) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Child map of a directory (`None` for files).
    pub fn children(&self) -> Option<&BTreeMap<String, FsNode>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<String, FsNode>> {
        match &mut self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    /// File content (`None` for directories).
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Named child of a directory.
    pub fn child(&self, name: &str) -> Option<&FsNode> {
        self.children().and_then(|c| c.get(name))
    }

    /// Byte size: content length for files, the conventional 4096 for
    /// directories.
    pub fn size(&self) -> usize {
        match &self.kind {
            NodeKind::File { content } => content.len(),
            NodeKind::Directory { .. } => 4096,
        }
    }

    /// Stamp `mtime` over this node and, for directories, every
    /// descendant (used when copies are materialized).
    pub fn stamp_mtime(&mut self, mtime: i64) {
        self.mtime = mtime;
        if let NodeKind::Directory { children } = &mut self.kind {
            for child in children.values_mut() {
                child.stamp_mtime(mtime);
            }
        }
    }
}

/// One row of a directory listing.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub mode: Mode,
    pub owner: String,
    pub group: String,
    pub size: usize,
    pub mtime: i64,
}

impl DirEntry {
    pub(crate) fn of(node: &FsNode) -> Self {
        Self {
            name: node.name.clone(),
            is_dir: node.is_dir(),
            mode: node.mode,
            owner: node.owner.clone(),
            group: node.group.clone(),
            size: node.size(),
            mtime: node.mtime,
        }
    }
}
