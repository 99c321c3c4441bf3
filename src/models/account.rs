//! Account records for the identity store.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A user account.
///
/// The primary group is always also a member of `supplemental_groups`, so
/// the full membership set is `supplemental_groups` alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub uid: u32,
    pub primary_group: String,
    pub supplemental_groups: BTreeSet<String>,
    pub home: String,
    pub shell: String,
    pub locked: bool,
}

impl User {
    /// Every group the user belongs to (primary included).
    pub fn all_groups(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_group.as_str())
            .chain(self.supplemental_groups.iter().map(|g| g.as_str()))
    }
}

/// A group record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub name: String,
    pub gid: u32,
}
