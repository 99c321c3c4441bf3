//! Identity & account store.
//!
//! Users and groups live here; the filesystem holds the store and wires
//! the tree-facing halves of the account operations (home directories,
//! ownership labels, the derived `/etc/passwd` file).
//!
//! The login-database file is derived state: it is regenerated from the
//! live user table after every mutating account operation and is never a
//! source of truth.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::error::FsError;
use crate::core::filesystem::FileSystem;
use crate::core::perms::{Identity, SUPERUSER};
use crate::core::{path, time};
use crate::models::{FsNode, Group, User};

/// Login shell given to new accounts.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Shell shown for locked accounts in the generated login database.
pub const NOLOGIN_SHELL: &str = "/usr/sbin/nologin";

/// Path of the derived login-database file.
pub const PASSWD_PATH: &str = "/etc/passwd";

/// First uid/gid handed out to dynamically created accounts.
const FIRST_DYNAMIC_ID: u32 = 1001;

// =============================================================================
// AccountStore
// =============================================================================

/// Users, groups and their id allocation state.
#[derive(Clone, Debug)]
pub struct AccountStore {
    users: BTreeMap<String, User>,
    groups: BTreeMap<String, u32>,
    next_uid: u32,
    next_gid: u32,
}

/// Seeding parameters for [`AccountStore::ensure_user`].
#[derive(Clone, Debug, Default)]
pub struct UserSeed {
    pub username: String,
    pub uid: Option<u32>,
    pub primary_group: Option<String>,
    pub supplemental_groups: Vec<String>,
    pub home: Option<String>,
    pub shell: Option<String>,
    pub locked: bool,
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
            next_uid: FIRST_DYNAMIC_ID,
            next_gid: FIRST_DYNAMIC_ID,
        }
    }

    /// Seed the fixed bootstrap set: system accounts with deterministic
    /// ids plus the staff groups the exercises reference.
    pub fn bootstrap() -> Self {
        let mut store = Self::new();

        store.ensure_group(SUPERUSER, Some(0));
        store.ensure_group("user", Some(1000));
        store.ensure_group("nobody", Some(65534));
        store.ensure_group("hr", Some(2000));
        store.ensure_group("security", Some(2001));
        store.ensure_group("admin", Some(2002));
        store.ensure_group("finance", Some(2003));
        store.ensure_group("executive", Some(2004));
        store.ensure_group("marketing", Some(2005));

        store.ensure_user(UserSeed {
            username: SUPERUSER.to_string(),
            uid: Some(0),
            home: Some("/root".to_string()),
            ..Default::default()
        });
        store.ensure_user(UserSeed {
            username: "user".to_string(),
            uid: Some(1000),
            home: Some("/home/user".to_string()),
            ..Default::default()
        });
        store.ensure_user(UserSeed {
            username: "nobody".to_string(),
            uid: Some(65534),
            home: Some("/nonexistent".to_string()),
            shell: Some(NOLOGIN_SHELL.to_string()),
            locked: true,
            ..Default::default()
        });

        store
    }

    /// Register a group if absent, returning its gid. A fixed id bumps the
    /// allocator past itself so later dynamic ids stay unique.
    pub fn ensure_group(&mut self, name: &str, fixed_gid: Option<u32>) -> u32 {
        if let Some(&gid) = self.groups.get(name) {
            return gid;
        }
        let gid = fixed_gid.unwrap_or_else(|| {
            let id = self.next_gid;
            self.next_gid += 1;
            id
        });
        if gid >= self.next_gid {
            self.next_gid = gid + 1;
        }
        self.groups.insert(name.to_string(), gid);
        gid
    }

    /// Register a user if absent. The primary group (and any listed
    /// supplemental groups) are created as needed; the primary group is
    /// always a member of the supplemental set.
    pub fn ensure_user(&mut self, seed: UserSeed) {
        if seed.username.is_empty() || self.users.contains_key(&seed.username) {
            return;
        }

        let primary = seed
            .primary_group
            .unwrap_or_else(|| seed.username.clone());
        self.ensure_group(&primary, None);
        for group in &seed.supplemental_groups {
            self.ensure_group(group, None);
        }

        let uid = seed.uid.unwrap_or_else(|| {
            let id = self.next_uid;
            self.next_uid += 1;
            id
        });
        if uid >= self.next_uid {
            self.next_uid = uid + 1;
        }

        let mut supplemental: BTreeSet<String> = seed.supplemental_groups.into_iter().collect();
        supplemental.insert(primary.clone());

        let home = seed
            .home
            .unwrap_or_else(|| format!("/home/{}", seed.username));
        self.users.insert(
            seed.username.clone(),
            User {
                username: seed.username,
                uid,
                primary_group: primary,
                supplemental_groups: supplemental,
                home,
                shell: seed.shell.unwrap_or_else(|| DEFAULT_SHELL.to_string()),
                locked: seed.locked,
            },
        );
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        self.users.get(name)
    }

    pub fn user_mut(&mut self, name: &str) -> Option<&mut User> {
        self.users.get_mut(name)
    }

    pub fn remove_user(&mut self, name: &str) -> Option<User> {
        self.users.remove(name)
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn gid(&self, name: &str) -> Option<u32> {
        self.groups.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() || self.groups.is_empty()
    }

    /// Users ordered by uid (the login-database order).
    pub fn users_by_uid(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by_key(|u| u.uid);
        users
    }

    /// Groups as records, ordered by gid.
    pub fn groups_sorted(&self) -> Vec<Group> {
        let mut groups: Vec<Group> = self
            .groups
            .iter()
            .map(|(name, &gid)| Group {
                name: name.clone(),
                gid,
            })
            .collect();
        groups.sort_by_key(|g| g.gid);
        groups
    }

    pub fn next_ids(&self) -> (u32, u32) {
        (self.next_uid, self.next_gid)
    }

    pub fn set_next_ids(&mut self, next_uid: u32, next_gid: u32) {
        self.next_uid = next_uid.max(FIRST_DYNAMIC_ID);
        self.next_gid = next_gid.max(FIRST_DYNAMIC_ID);
    }

    /// Restore records from a snapshot.
    pub fn load(&mut self, users: Vec<User>, groups: Vec<Group>) {
        self.users.clear();
        self.groups.clear();
        for group in groups {
            self.groups.insert(group.name, group.gid);
        }
        for mut user in users {
            user.supplemental_groups.insert(user.primary_group.clone());
            self.users.insert(user.username.clone(), user);
        }
    }

    /// Synthesize the login-database text: one `name:x:uid:gid:gecos:home:
    /// shell` line per user, sorted by uid, nologin shell when locked.
    pub fn passwd_content(&self) -> String {
        self.users_by_uid()
            .iter()
            .map(|user| {
                let gid = self.gid(&user.primary_group).unwrap_or(1000);
                let shell = if user.locked {
                    NOLOGIN_SHELL
                } else {
                    user.shell.as_str()
                };
                format!(
                    "{}:x:{}:{}:{}:{}:{}",
                    user.username, user.uid, gid, user.username, user.home, shell
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::bootstrap()
    }
}

/// `^[a-z_][a-z0-9_-]{0,31}$`
pub fn is_valid_account_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > 32 {
        return false;
    }
    let first = bytes[0];
    if !(first.is_ascii_lowercase() || first == b'_') {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
}

// =============================================================================
// Account operations on the filesystem
// =============================================================================

/// Options for [`FileSystem::useradd`].
#[derive(Clone, Debug, Default)]
pub struct UserAddOptions {
    pub primary_group: Option<String>,
    pub supplemental_groups: Vec<String>,
}

/// Options for [`FileSystem::usermod`].
#[derive(Clone, Debug, Default)]
pub struct UserModOptions {
    pub new_login: Option<String>,
    pub primary_group: Option<String>,
    pub supplemental_groups: Option<Vec<String>>,
    pub append_supplemental: bool,
    pub home: Option<String>,
    pub lock: bool,
}

impl FileSystem {
    /// Create a user account, its home directory, and regenerate the
    /// login database.
    ///
    /// Referenced groups must pre-exist; an unspecified primary group
    /// creates a per-user group of the same name.
    pub fn useradd(&mut self, username: &str, options: UserAddOptions) -> Result<(), FsError> {
        if !is_valid_account_name(username) {
            return Err(FsError::InvalidArgument(format!(
                "invalid user name '{}'",
                username
            )));
        }
        if self.accounts.user(username).is_some() {
            return Err(FsError::AlreadyExists(username.to_string()));
        }
        if let Some(primary) = &options.primary_group {
            if !self.accounts.has_group(primary) {
                return Err(FsError::NotFound(primary.clone()));
            }
        }
        for group in &options.supplemental_groups {
            if !self.accounts.has_group(group) {
                return Err(FsError::NotFound(group.clone()));
            }
        }

        let primary = options
            .primary_group
            .clone()
            .unwrap_or_else(|| username.to_string());
        let home = format!("/home/{}", username);
        self.accounts.ensure_user(UserSeed {
            username: username.to_string(),
            primary_group: Some(primary.clone()),
            supplemental_groups: options.supplemental_groups,
            home: Some(home.clone()),
            ..Default::default()
        });

        self.provision_home(&home, username, &primary);
        self.refresh_passwd_file();
        Ok(())
    }

    /// Modify a user account. All inputs are validated before anything is
    /// applied, so a rejected request changes nothing.
    pub fn usermod(&mut self, username: &str, options: UserModOptions) -> Result<(), FsError> {
        if self.accounts.user(username).is_none() {
            return Err(FsError::NotFound(username.to_string()));
        }
        if let Some(new_login) = &options.new_login {
            if !is_valid_account_name(new_login) {
                return Err(FsError::InvalidArgument(format!(
                    "invalid user name '{}'",
                    new_login
                )));
            }
            if self.accounts.user(new_login).is_some() {
                return Err(FsError::AlreadyExists(new_login.clone()));
            }
        }
        if let Some(primary) = &options.primary_group {
            if !self.accounts.has_group(primary) {
                return Err(FsError::NotFound(primary.clone()));
            }
        }
        if let Some(groups) = &options.supplemental_groups {
            for group in groups {
                if !self.accounts.has_group(group) {
                    return Err(FsError::NotFound(group.clone()));
                }
            }
        }

        let mut name = username.to_string();
        if let Some(new_login) = &options.new_login {
            let mut user = self.accounts.remove_user(&name).expect("validated above");
            user.username = new_login.clone();
            let old = std::mem::replace(&mut name, new_login.clone());
            self.accounts.users_insert(user);
            relabel_owner(&mut self.root, &old, new_login);
            if self.username == old {
                self.username = new_login.clone();
            }
        }

        {
            let user = self.accounts.user_mut(&name).expect("validated above");
            if let Some(primary) = &options.primary_group {
                user.primary_group = primary.clone();
                user.supplemental_groups.insert(primary.clone());
            }
            if let Some(groups) = &options.supplemental_groups {
                if options.append_supplemental {
                    user.supplemental_groups
                        .extend(groups.iter().cloned());
                } else {
                    let mut set: BTreeSet<String> = groups.iter().cloned().collect();
                    set.insert(user.primary_group.clone());
                    user.supplemental_groups = set;
                }
            }
            if options.lock {
                user.locked = true;
            }
        }

        if let Some(home) = &options.home {
            let home_abs = self.resolve(home);
            let (owner, primary) = {
                let user = self.accounts.user_mut(&name).expect("validated above");
                user.home = home_abs.clone();
                (user.username.clone(), user.primary_group.clone())
            };
            self.provision_home(&home_abs, &owner, &primary);
        }

        if self.username == name {
            self.sync_identity();
        }
        self.refresh_passwd_file();
        Ok(())
    }

    /// Delete a user account; group records persist. Optionally removes
    /// the home directory.
    pub fn userdel(&mut self, username: &str, remove_home: bool) -> Result<(), FsError> {
        if username == SUPERUSER {
            return Err(FsError::OperationNotPermitted(
                "cannot remove the superuser account".to_string(),
            ));
        }
        let user = self
            .accounts
            .remove_user(username)
            .ok_or_else(|| FsError::NotFound(username.to_string()))?;

        if remove_home {
            self.force_remove(&user.home);
        }
        self.refresh_passwd_file();
        Ok(())
    }

    /// Change ownership labels: `owner`, `owner:group` or `:group` forms.
    /// Unknown names are rejected before any mutation; the recursive form
    /// applies both fields uniformly over the whole subtree.
    pub fn chown(&mut self, target: &str, spec: &str, recursive: bool) -> Result<(), FsError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(FsError::InvalidArgument(
                "missing owner operand".to_string(),
            ));
        }

        let (new_owner, new_group) = if let Some(group) = spec.strip_prefix(':') {
            (None, Some(group.to_string()))
        } else if let Some((owner, group)) = spec.split_once(':') {
            (
                (!owner.is_empty()).then(|| owner.to_string()),
                (!group.is_empty()).then(|| group.to_string()),
            )
        } else {
            (Some(spec.to_string()), None)
        };

        if let Some(owner) = &new_owner {
            if self.accounts.user(owner).is_none() {
                return Err(FsError::InvalidArgument(format!(
                    "invalid user: '{}'",
                    owner
                )));
            }
        }
        if let Some(group) = &new_group {
            if !self.accounts.has_group(group) {
                return Err(FsError::InvalidArgument(format!(
                    "invalid group: '{}'",
                    group
                )));
            }
        }

        let abs = self.resolve(target);
        let node = self
            .node_mut(&abs)
            .ok_or_else(|| FsError::NotFound(target.to_string()))?;
        apply_ownership(node, new_owner.as_deref(), new_group.as_deref(), recursive);
        Ok(())
    }

    /// Recompute the acting identity's group set from the account store.
    pub(crate) fn sync_identity(&mut self) {
        let groups: BTreeSet<String> = match self.accounts.user(&self.username) {
            Some(user) => user.all_groups().map(|g| g.to_string()).collect(),
            None => std::iter::once(self.username.clone()).collect(),
        };
        self.identity = Identity {
            username: self.username.clone(),
            groups,
        };
    }

    /// Rewrite `/etc/passwd` from the live user table. The write bypasses
    /// permission checks: the file is derived state, not a user edit.
    pub(crate) fn refresh_passwd_file(&mut self) {
        let content = self.accounts.passwd_content();
        let now = time::now_millis();
        if let Some(node) = self.node_mut(PASSWD_PATH) {
            if let crate::models::NodeKind::File { content: c } = &mut node.kind {
                *c = content;
                node.mtime = now;
            }
        }
    }

    /// Create (or re-own) a home directory, bypassing permission checks:
    /// home allocation is a privileged side effect of account management.
    fn provision_home(&mut self, home: &str, owner: &str, group: &str) {
        self.force_make_dir_all(home);
        if let Some(node) = self.node_mut(home) {
            node.owner = owner.to_string();
            node.group = group.to_string();
            node.mode = crate::core::perms::Mode::dir_default();
        }
    }

    /// Create every missing directory on `abs` without permission checks.
    fn force_make_dir_all(&mut self, abs: &str) {
        let now = time::now_millis();
        let mut current = &mut self.root;
        for segment in abs.split('/').filter(|s| !s.is_empty()) {
            let Some(children) = current.children_mut() else {
                return;
            };
            let entry = children.entry(segment.to_string()).or_insert_with(|| {
                FsNode::dir(segment, Vec::new()).with_mtime(now)
            });
            if !entry.is_dir() {
                return;
            }
            current = entry;
        }
    }

    /// Detach a path from the tree without permission checks.
    fn force_remove(&mut self, target: &str) -> bool {
        let abs = self.resolve(target);
        if abs == "/" {
            return false;
        }
        let parent_abs = path::parent(&abs);
        let name = path::file_name(&abs).to_string();
        match self.node_mut(&parent_abs).and_then(|n| n.children_mut()) {
            Some(children) => children.remove(&name).is_some(),
            None => false,
        }
    }
}

impl AccountStore {
    fn users_insert(&mut self, user: User) {
        self.users.insert(user.username.clone(), user);
    }
}

fn relabel_owner(node: &mut FsNode, old: &str, new: &str) {
    if node.owner == old {
        node.owner = new.to_string();
    }
    if let Some(children) = node.children_mut() {
        for child in children.values_mut() {
            relabel_owner(child, old, new);
        }
    }
}

fn apply_ownership(node: &mut FsNode, owner: Option<&str>, group: Option<&str>, recursive: bool) {
    if let Some(owner) = owner {
        node.owner = owner.to_string();
    }
    if let Some(group) = group {
        node.group = group.to_string();
    }
    if recursive {
        if let Some(children) = node.children_mut() {
            for child in children.values_mut() {
                apply_ownership(child, owner, group, true);
            }
        }
    }
}
