//! Snapshot wire format for persistence.
//!
//! The tree carries no parent references, so the nested structure is
//! cycle-free on the wire by construction. Where the bytes are stored is
//! the caller's concern.

use serde::{Deserialize, Serialize};

use super::account::{Group, User};
use super::node::FsNode;

/// Serialized filesystem + identity state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tree: FsNode,
    pub cwd: String,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub next_uid: u32,
    #[serde(default)]
    pub next_gid: u32,
}
