//! The virtual filesystem: an in-memory tree of owned nodes plus the
//! acting identity and the account store.
//!
//! Every public operation resolves its path arguments, re-validates
//! traversal and mode bits, and either mutates the tree or returns a
//! tagged [`FsError`] — never both. A denied operation leaves the tree
//! untouched.

use regex::{Regex, RegexBuilder};

use crate::core::accounts::{AccountStore, UserSeed};
use crate::core::error::FsError;
use crate::core::perms::{self, Identity, Mode, Perm, SUPERUSER};
use crate::core::{path, time};
use crate::models::{DirEntry, FsNode, NodeKind, Snapshot, User};

// =============================================================================
// Search parameter types
// =============================================================================

/// Node-kind filter for `find -type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FindKind {
    File,
    Directory,
}

/// Criteria for [`FileSystem::find`]. Age conditions are the raw
/// signed-prefix strings (`+N` strictly older, `-N` strictly younger,
/// bare `N` floor-equal) and are validated when the search runs.
#[derive(Clone, Debug, Default)]
pub struct FindCriteria {
    pub name: Option<String>,
    pub iname: Option<String>,
    pub kind: Option<FindKind>,
    pub mtime: Option<String>,
    pub mmin: Option<String>,
}

/// Options for [`FileSystem::grep`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GrepOptions {
    pub ignore_case: bool,
    pub recursive: bool,
}

/// One grep hit: file path, 1-based line number, line text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrepMatch {
    pub file: String,
    pub line: usize,
    pub text: String,
}

/// Compiled form of an age condition.
enum AgeCondition {
    OlderThan(f64),
    YoungerThan(f64),
    Exactly(f64),
}

impl AgeCondition {
    fn parse(condition: &str) -> Result<Self, FsError> {
        let (rest, build): (&str, fn(f64) -> AgeCondition) =
            if let Some(rest) = condition.strip_prefix('+') {
                (rest, AgeCondition::OlderThan)
            } else if let Some(rest) = condition.strip_prefix('-') {
                (rest, AgeCondition::YoungerThan)
            } else {
                (condition, AgeCondition::Exactly)
            };
        rest.parse::<f64>()
            .map(build)
            .map_err(|_| FsError::InvalidArgument(format!("invalid time predicate: '{}'", condition)))
    }

    fn matches(&self, age: f64) -> bool {
        match self {
            AgeCondition::OlderThan(n) => age > *n,
            AgeCondition::YoungerThan(n) => age < *n,
            AgeCondition::Exactly(n) => age.floor() == *n,
        }
    }
}

/// Compile a glob pattern (`*` = any run of characters, everything else
/// literal) into an anchored regex.
fn compile_glob(pattern: &str, ignore_case: bool) -> Result<Regex, FsError> {
    let mut source = String::from("^");
    for c in pattern.chars() {
        if c == '*' {
            source.push_str(".*");
        } else {
            source.push_str(&regex::escape(&c.to_string()));
        }
    }
    source.push('$');
    RegexBuilder::new(&source)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|_| FsError::InvalidArgument(format!("invalid pattern: '{}'", pattern)))
}

// =============================================================================
// FileSystem
// =============================================================================

/// The in-memory filesystem for one world.
///
/// Created once per world (fresh start or restored snapshot); the account
/// store is seeded from the fixed bootstrap set plus any owner or group
/// referenced by the seed tree.
#[derive(Clone, Debug)]
pub struct FileSystem {
    pub(crate) root: FsNode,
    pub(crate) cwd: String,
    pub(crate) home: String,
    pub(crate) hostname: String,
    pub(crate) username: String,
    pub(crate) identity: Identity,
    pub(crate) accounts: AccountStore,
}

impl FileSystem {
    /// Build a world from a seed tree. The acting identity is the default
    /// user; accounts referenced by the tree are registered.
    pub fn new(mut seed: FsNode) -> Self {
        seed.name = "/".to_string();
        let mut fs = Self {
            root: seed,
            cwd: crate::config::DEFAULT_HOME.to_string(),
            home: crate::config::DEFAULT_HOME.to_string(),
            hostname: crate::config::DEFAULT_HOSTNAME.to_string(),
            username: crate::config::DEFAULT_USERNAME.to_string(),
            identity: Identity::new(crate::config::DEFAULT_USERNAME, std::iter::empty()),
            accounts: AccountStore::bootstrap(),
        };
        fs.register_tree_accounts();
        fs.sync_identity();
        fs.refresh_passwd_file();
        fs
    }

    /// Register every owner/group label the tree mentions, so labels
    /// always resolve against the store.
    fn register_tree_accounts(&mut self) {
        fn collect(node: &FsNode, seen: &mut Vec<(String, String)>) {
            seen.push((node.owner.clone(), node.group.clone()));
            if let Some(children) = node.children() {
                for child in children.values() {
                    collect(child, seen);
                }
            }
        }
        let mut seen = Vec::new();
        collect(&self.root, &mut seen);
        for (owner, group) in seen {
            self.accounts.ensure_group(&group, None);
            let home = if owner == SUPERUSER {
                "/root".to_string()
            } else {
                format!("/home/{}", owner)
            };
            self.accounts.ensure_user(UserSeed {
                username: owner,
                primary_group: Some(group),
                home: Some(home),
                ..Default::default()
            });
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        self.accounts.user(name)
    }

    /// Resolve a path expression against the current directory and home.
    pub fn resolve(&self, p: &str) -> String {
        path::resolve(p, &self.cwd, &self.home)
    }

    /// Fold the home prefix into `~` for prompts and messages.
    pub fn display_path(&self, p: &str) -> String {
        path::display(p, &self.home)
    }

    /// Look up a node by any path expression.
    pub fn node(&self, p: &str) -> Option<&FsNode> {
        let abs = self.resolve(p);
        let mut current = &self.root;
        for segment in abs.split('/').filter(|s| !s.is_empty()) {
            current = current.child(segment)?;
        }
        Some(current)
    }

    pub(crate) fn node_mut(&mut self, abs: &str) -> Option<&mut FsNode> {
        let mut current = &mut self.root;
        for segment in abs.split('/').filter(|s| !s.is_empty()) {
            current = current.children_mut()?.get_mut(segment)?;
        }
        Some(current)
    }

    // =========================================================================
    // Permission plumbing
    // =========================================================================

    fn allowed(&self, node: &FsNode, perm: Perm) -> bool {
        perms::has_permission(node.mode, &node.owner, &node.group, &self.identity, perm)
    }

    /// Walk every segment of an absolute path checking the execute bit on
    /// directory segments. The final segment's bit is only required when
    /// `include_final_dir` is set. A missing segment passes: existence is
    /// the caller's check.
    pub fn can_traverse(&self, abs: &str, include_final_dir: bool) -> bool {
        let segments: Vec<&str> = abs.split('/').filter(|s| !s.is_empty()).collect();
        let mut current = &self.root;
        for (i, segment) in segments.iter().enumerate() {
            let Some(child) = current.child(segment) else {
                return true;
            };
            let last = i == segments.len() - 1;
            if child.is_dir() && (!last || include_final_dir) && !self.allowed(child, Perm::Execute)
            {
                return false;
            }
            current = child;
        }
        true
    }

    /// Parent directory must exist, be traversable, and grant both write
    /// and execute. Returns the parent's absolute path.
    fn writable_parent(&self, abs: &str, denied: &str) -> Result<String, FsError> {
        let parent_abs = path::parent(abs);
        let parent = self
            .node(&parent_abs)
            .ok_or_else(|| FsError::NotFound(denied.to_string()))?;
        if !parent.is_dir() {
            return Err(FsError::NotADirectory(denied.to_string()));
        }
        if !self.can_traverse(&parent_abs, true)
            || !self.allowed(parent, Perm::Execute)
            || !self.allowed(parent, Perm::Write)
        {
            return Err(FsError::PermissionDenied(denied.to_string()));
        }
        Ok(parent_abs)
    }

    // =========================================================================
    // Read operations
    // =========================================================================

    /// List a directory (or a single file, Unix `ls file` style).
    pub fn list_dir(&self, target: &str, show_hidden: bool) -> Result<Vec<DirEntry>, FsError> {
        let requested = if target.is_empty() { "." } else { target };
        let abs = self.resolve(requested);
        let node = self
            .node(&abs)
            .ok_or_else(|| FsError::NotFound(requested.to_string()))?;
        if !self.can_traverse(&abs, node.is_dir()) {
            return Err(FsError::PermissionDenied(requested.to_string()));
        }
        if !self.allowed(node, Perm::Read) {
            return Err(FsError::PermissionDenied(requested.to_string()));
        }

        match node.children() {
            None => Ok(vec![DirEntry::of(node)]),
            Some(children) => Ok(children
                .values()
                .filter(|child| show_hidden || !child.name.starts_with('.'))
                .map(DirEntry::of)
                .collect()),
        }
    }

    /// Read a file's content.
    pub fn read_file(&self, target: &str) -> Result<String, FsError> {
        let abs = self.resolve(target);
        let node = self
            .node(&abs)
            .ok_or_else(|| FsError::NotFound(target.to_string()))?;
        match node.content() {
            None => Err(FsError::IsADirectory(target.to_string())),
            Some(content) => {
                if !self.can_traverse(&abs, false) || !self.allowed(node, Perm::Read) {
                    return Err(FsError::PermissionDenied(target.to_string()));
                }
                Ok(content.to_string())
            }
        }
    }

    // =========================================================================
    // Mutating operations
    // =========================================================================

    /// Create an empty file, or touch an existing one (updating content
    /// only when non-empty content is supplied).
    pub fn create_file(&mut self, target: &str, content: &str) -> Result<(), FsError> {
        let abs = self.resolve(target);
        let name = path::file_name(&abs).to_string();
        if name.is_empty() {
            return Err(FsError::IsADirectory(target.to_string()));
        }
        let parent_abs = self.writable_parent(&abs, target)?;

        if let Some(existing) = self.node(&abs) {
            if existing.is_dir() {
                return Err(FsError::IsADirectory(target.to_string()));
            }
            if !self.allowed(existing, Perm::Write) {
                return Err(FsError::PermissionDenied(target.to_string()));
            }
            let now = time::now_millis();
            let node = self.node_mut(&abs).expect("checked above");
            if !content.is_empty() {
                if let NodeKind::File { content: c } = &mut node.kind {
                    *c = content.to_string();
                }
            }
            node.mtime = now;
            return Ok(());
        }

        let (owner, group) = self.creator_labels();
        let node = FsNode {
            name: name.clone(),
            mode: Mode::file_default(),
            owner,
            group,
            mtime: time::now_millis(),
            kind: NodeKind::File {
                content: content.to_string(),
            },
        };
        self.node_mut(&parent_abs)
            .and_then(|p| p.children_mut())
            .expect("parent validated as directory")
            .insert(name, node);
        Ok(())
    }

    /// Create a directory; with `recursive`, every missing ancestor too.
    pub fn create_dir(&mut self, target: &str, recursive: bool) -> Result<(), FsError> {
        let abs = self.resolve(target);

        if recursive {
            let segments: Vec<String> = abs
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            let (owner, group) = self.creator_labels();
            let identity = self.identity.clone();
            let now = time::now_millis();

            let mut current = &mut self.root;
            for segment in segments {
                let has_child = current
                    .children()
                    .is_some_and(|c| c.contains_key(&segment));
                if !has_child {
                    let can_write = perms::has_permission(
                        current.mode,
                        &current.owner,
                        &current.group,
                        &identity,
                        Perm::Write,
                    ) && perms::has_permission(
                        current.mode,
                        &current.owner,
                        &current.group,
                        &identity,
                        Perm::Execute,
                    );
                    if !can_write {
                        return Err(FsError::PermissionDenied(target.to_string()));
                    }
                    let node = FsNode {
                        name: segment.clone(),
                        mode: Mode::dir_default(),
                        owner: owner.clone(),
                        group: group.clone(),
                        mtime: now,
                        kind: NodeKind::Directory {
                            children: Default::default(),
                        },
                    };
                    current
                        .children_mut()
                        .expect("walk stays on directories")
                        .insert(segment.clone(), node);
                }
                let child = current
                    .children_mut()
                    .expect("walk stays on directories")
                    .get_mut(&segment)
                    .expect("just ensured");
                if !child.is_dir() {
                    return Err(FsError::AlreadyExists(target.to_string()));
                }
                if !perms::has_permission(
                    child.mode,
                    &child.owner,
                    &child.group,
                    &identity,
                    Perm::Execute,
                ) {
                    return Err(FsError::PermissionDenied(target.to_string()));
                }
                current = child;
            }
            return Ok(());
        }

        let name = path::file_name(&abs).to_string();
        if self.node(&abs).is_some() {
            return Err(FsError::AlreadyExists(target.to_string()));
        }
        let parent_abs = self.writable_parent(&abs, target)?;

        let (owner, group) = self.creator_labels();
        let node = FsNode {
            name: name.clone(),
            mode: Mode::dir_default(),
            owner,
            group,
            mtime: time::now_millis(),
            kind: NodeKind::Directory {
                children: Default::default(),
            },
        };
        self.node_mut(&parent_abs)
            .and_then(|p| p.children_mut())
            .expect("parent validated as directory")
            .insert(name, node);
        Ok(())
    }

    /// Remove a file or directory. Directories — empty or not — require
    /// the recursive flag (intentional simplification of the exercise).
    pub fn remove(&mut self, target: &str, recursive: bool) -> Result<(), FsError> {
        let abs = self.resolve(target);
        if abs == "/" {
            return Err(FsError::OperationNotPermitted(format!(
                "cannot remove '{}': Operation not permitted",
                target
            )));
        }
        let name = path::file_name(&abs).to_string();
        let parent_abs = path::parent(&abs);

        let Some(node) = self.node(&abs) else {
            return Err(FsError::NotFound(target.to_string()));
        };
        let is_dir = node.is_dir();
        let parent = self
            .node(&parent_abs)
            .ok_or_else(|| FsError::NotFound(target.to_string()))?;
        if !self.can_traverse(&parent_abs, true)
            || !self.allowed(parent, Perm::Execute)
            || !self.allowed(parent, Perm::Write)
        {
            return Err(FsError::PermissionDenied(target.to_string()));
        }
        if is_dir && !recursive {
            return Err(FsError::IsADirectory(target.to_string()));
        }

        self.node_mut(&parent_abs)
            .and_then(|p| p.children_mut())
            .expect("parent validated as directory")
            .remove(&name);
        Ok(())
    }

    /// Copy `src` to `dest`. An existing directory destination receives
    /// the source *inside* it; otherwise the copy takes the destination's
    /// trailing name. Directory sources require the recursive flag.
    pub fn copy(&mut self, src: &str, dest: &str, recursive: bool) -> Result<(), FsError> {
        let src_abs = self.resolve(src);
        let src_node = self
            .node(&src_abs)
            .ok_or_else(|| FsError::NotFound(src.to_string()))?;
        if src_node.is_dir() && !recursive {
            return Err(FsError::IsADirectory(src.to_string()));
        }
        if !self.can_traverse(&src_abs, src_node.is_dir()) {
            return Err(FsError::PermissionDenied(src.to_string()));
        }
        let readable = if src_node.is_dir() {
            self.allowed(src_node, Perm::Read) && self.allowed(src_node, Perm::Execute)
        } else {
            self.allowed(src_node, Perm::Read)
        };
        if !readable {
            return Err(FsError::PermissionDenied(src.to_string()));
        }

        let dest_abs = self.resolve(dest);
        let now = time::now_millis();

        if let Some(dest_node) = self.node(&dest_abs) {
            if dest_node.is_dir() {
                if !self.can_traverse(&dest_abs, true)
                    || !self.allowed(dest_node, Perm::Execute)
                    || !self.allowed(dest_node, Perm::Write)
                {
                    return Err(FsError::PermissionDenied(dest.to_string()));
                }
                let mut cloned = self.node(&src_abs).expect("checked above").clone();
                cloned.stamp_mtime(now);
                let name = cloned.name.clone();
                self.node_mut(&dest_abs)
                    .and_then(|n| n.children_mut())
                    .expect("destination validated as directory")
                    .insert(name, cloned);
                return Ok(());
            }
        }

        let dest_name = path::file_name(&dest_abs).to_string();
        let dest_parent_abs = self.writable_parent(&dest_abs, dest)?;
        let mut cloned = self.node(&src_abs).expect("checked above").clone();
        cloned.stamp_mtime(now);
        cloned.name = dest_name.clone();
        self.node_mut(&dest_parent_abs)
            .and_then(|n| n.children_mut())
            .expect("parent validated as directory")
            .insert(dest_name, cloned);
        Ok(())
    }

    /// Move (rename) `src` to `dest`.
    ///
    /// Refuses to move the root, a node onto itself, or a directory into
    /// its own descendant — the cycle check is a prefix test on resolved
    /// absolute paths, not a tree walk. Moving a node onto its own parent
    /// (or onto its identical path) is a successful no-op.
    pub fn move_node(&mut self, src: &str, dest: &str) -> Result<(), FsError> {
        let src_abs = self.resolve(src);
        let src_node = self
            .node(&src_abs)
            .ok_or_else(|| FsError::NotFound(src.to_string()))?;
        let src_is_dir = src_node.is_dir();
        if src_abs == "/" {
            return Err(FsError::OperationNotPermitted(format!(
                "cannot move '{}': Operation not permitted",
                src
            )));
        }
        if !self.can_traverse(&src_abs, src_is_dir) {
            return Err(FsError::PermissionDenied(src.to_string()));
        }

        let src_parent_abs = path::parent(&src_abs);
        let src_name = path::file_name(&src_abs).to_string();
        let src_parent = self
            .node(&src_parent_abs)
            .ok_or_else(|| FsError::NotFound(src.to_string()))?;
        if !self.can_traverse(&src_parent_abs, true)
            || !self.allowed(src_parent, Perm::Execute)
            || !self.allowed(src_parent, Perm::Write)
        {
            return Err(FsError::PermissionDenied(src.to_string()));
        }

        let dest_abs = self.resolve(dest);
        let dest_node = self.node(&dest_abs);
        let expects_directory = dest.trim_end().ends_with('/');
        if expects_directory && !dest_node.is_some_and(|n| n.is_dir()) {
            return Err(FsError::NotADirectory(dest.to_string()));
        }

        let into_itself = || {
            FsError::OperationNotPermitted(format!(
                "cannot move '{}' to '{}': Cannot move a directory into itself",
                src, dest
            ))
        };

        if let Some(dest_node) = dest_node {
            if dest_node.is_dir() {
                if !self.can_traverse(&dest_abs, true)
                    || !self.allowed(dest_node, Perm::Execute)
                    || !self.allowed(dest_node, Perm::Write)
                {
                    return Err(FsError::PermissionDenied(dest.to_string()));
                }
                if dest_abs == src_parent_abs {
                    return Ok(());
                }
                if dest_abs == src_abs {
                    return Err(into_itself());
                }
                if src_is_dir && path::is_same_or_descendant(&dest_abs, &src_abs) {
                    return Err(into_itself());
                }

                let node = self
                    .node_mut(&src_parent_abs)
                    .and_then(|p| p.children_mut())
                    .expect("source parent validated")
                    .remove(&src_name)
                    .expect("source validated");
                let name = node.name.clone();
                self.node_mut(&dest_abs)
                    .and_then(|n| n.children_mut())
                    .expect("destination validated as directory")
                    .insert(name, node);
                return Ok(());
            }
        }

        if src_abs == dest_abs {
            return Ok(());
        }

        let dest_name = path::file_name(&dest_abs).to_string();
        let dest_parent_abs = self.writable_parent(&dest_abs, dest)?;
        if src_is_dir && path::is_same_or_descendant(&dest_parent_abs, &src_abs) {
            return Err(into_itself());
        }

        let mut node = self
            .node_mut(&src_parent_abs)
            .and_then(|p| p.children_mut())
            .expect("source parent validated")
            .remove(&src_name)
            .expect("source validated");
        node.name = dest_name.clone();
        self.node_mut(&dest_parent_abs)
            .and_then(|n| n.children_mut())
            .expect("parent validated as directory")
            .insert(dest_name, node);
        Ok(())
    }

    /// Change a node's mode: numeric (`755`) or symbolic (`g-rw`,
    /// `u=r,g=r,o=r`). Only the owner and the superuser may do this.
    pub fn chmod(&mut self, target: &str, mode_expr: &str) -> Result<(), FsError> {
        let abs = self.resolve(target);
        let node = self
            .node(&abs)
            .ok_or_else(|| FsError::NotFound(target.to_string()))?;
        if !self.can_traverse(&abs, false) {
            return Err(FsError::PermissionDenied(target.to_string()));
        }
        if !self.identity.is_superuser() && node.owner != self.username {
            return Err(FsError::OperationNotPermitted(format!(
                "changing permissions of '{}': Operation not permitted",
                target
            )));
        }

        let new_mode = match Mode::from_numeric(mode_expr) {
            Some(mode) => mode,
            None => node.mode.apply_symbolic(mode_expr)?,
        };
        self.node_mut(&abs).expect("checked above").mode = new_mode;
        Ok(())
    }

    /// Change the working directory.
    pub fn change_dir(&mut self, target: &str) -> Result<(), FsError> {
        if target.is_empty() || target == "~" {
            self.cwd = self.home.clone();
            return Ok(());
        }
        let abs = self.resolve(target);
        let node = self
            .node(&abs)
            .ok_or_else(|| FsError::NotFound(target.to_string()))?;
        if !node.is_dir() {
            return Err(FsError::NotADirectory(target.to_string()));
        }
        if !self.can_traverse(&abs, true) {
            return Err(FsError::PermissionDenied(target.to_string()));
        }
        self.cwd = abs;
        Ok(())
    }

    /// Write content to a file: overwrite or append, creating the file if
    /// missing. This is the redirection sink.
    pub fn write_file(&mut self, target: &str, content: &str, append: bool) -> Result<(), FsError> {
        if !is_safe_write_path(target) {
            return Err(FsError::InvalidArgument(format!(
                "cannot write to '{}': Invalid path",
                target
            )));
        }

        let abs = self.resolve(target);
        match self.node(&abs) {
            Some(node) if node.is_dir() => Err(FsError::IsADirectory(target.to_string())),
            Some(node) => {
                if !self.can_traverse(&abs, false) || !self.allowed(node, Perm::Write) {
                    return Err(FsError::PermissionDenied(target.to_string()));
                }
                let now = time::now_millis();
                let node = self.node_mut(&abs).expect("checked above");
                if let NodeKind::File { content: c } = &mut node.kind {
                    if append {
                        c.push_str(content);
                    } else {
                        *c = content.to_string();
                    }
                }
                node.mtime = now;
                Ok(())
            }
            None => self.create_file(target, content),
        }
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Depth-first search producing absolute paths of matching nodes.
    pub fn find(&self, start: &str, criteria: &FindCriteria) -> Result<Vec<String>, FsError> {
        let start = if start.is_empty() { "." } else { start };
        let abs = self.resolve(start);
        let node = self
            .node(&abs)
            .ok_or_else(|| FsError::NotFound(start.to_string()))?;

        let name_re = criteria
            .name
            .as_deref()
            .map(|p| compile_glob(p, false))
            .transpose()?;
        let iname_re = criteria
            .iname
            .as_deref()
            .map(|p| compile_glob(p, true))
            .transpose()?;
        let mtime = criteria
            .mtime
            .as_deref()
            .map(AgeCondition::parse)
            .transpose()?;
        let mmin = criteria
            .mmin
            .as_deref()
            .map(AgeCondition::parse)
            .transpose()?;
        let now = time::now_millis();

        let matches = |node: &FsNode| -> bool {
            if let Some(re) = &name_re {
                if !re.is_match(&node.name) {
                    return false;
                }
            }
            if let Some(re) = &iname_re {
                if !re.is_match(&node.name) {
                    return false;
                }
            }
            if let Some(kind) = criteria.kind {
                let ok = match kind {
                    FindKind::File => node.is_file(),
                    FindKind::Directory => node.is_dir(),
                };
                if !ok {
                    return false;
                }
            }
            let age_ms = (now - node.mtime).max(0) as f64;
            if let Some(condition) = &mtime {
                if !condition.matches(age_ms / time::DAY_MS as f64) {
                    return false;
                }
            }
            if let Some(condition) = &mmin {
                if !condition.matches(age_ms / time::MINUTE_MS as f64) {
                    return false;
                }
            }
            true
        };

        let mut results = Vec::new();
        if node.is_file() {
            if matches(node) {
                results.push(abs);
            }
            return Ok(results);
        }

        fn walk(
            node: &FsNode,
            current: &str,
            matches: &dyn Fn(&FsNode) -> bool,
            results: &mut Vec<String>,
        ) {
            if let Some(children) = node.children() {
                for child in children.values() {
                    let child_path = path::join(current, &child.name);
                    if matches(child) {
                        results.push(child_path.clone());
                    }
                    walk(child, &child_path, matches, results);
                }
            }
        }
        walk(node, &abs, &matches, &mut results);
        Ok(results)
    }

    /// Line-oriented regex search. A directory target requires the
    /// recursive flag; the recursive walk skips unreadable files.
    pub fn grep(
        &self,
        pattern: &str,
        target: &str,
        options: GrepOptions,
    ) -> Result<Vec<GrepMatch>, FsError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(options.ignore_case)
            .build()
            .map_err(|_| FsError::InvalidArgument(format!("invalid pattern: '{}'", pattern)))?;

        let abs = self.resolve(target);
        let node = self
            .node(&abs)
            .ok_or_else(|| FsError::NotFound(target.to_string()))?;

        let mut results = Vec::new();
        if node.is_file() {
            if !self.can_traverse(&abs, false) || !self.allowed(node, Perm::Read) {
                return Err(FsError::PermissionDenied(target.to_string()));
            }
            search_file(node, &abs, &regex, &mut results);
            return Ok(results);
        }
        if !options.recursive {
            return Err(FsError::IsADirectory(target.to_string()));
        }

        fn walk(
            fs: &FileSystem,
            node: &FsNode,
            current: &str,
            regex: &Regex,
            results: &mut Vec<GrepMatch>,
        ) {
            if let Some(children) = node.children() {
                for child in children.values() {
                    let child_path = path::join(current, &child.name);
                    if child.is_file() {
                        if fs.allowed(child, Perm::Read) {
                            search_file(child, &child_path, regex, results);
                        }
                    } else if fs.allowed(child, Perm::Execute) {
                        walk(fs, child, &child_path, regex, results);
                    }
                }
            }
        }
        walk(self, node, &abs, &regex, &mut results);
        Ok(results)
    }

    // =========================================================================
    // Snapshot / restore
    // =========================================================================

    /// Serialize the world: tree, working directory and account state.
    pub fn snapshot(&self) -> Snapshot {
        let (next_uid, next_gid) = self.accounts.next_ids();
        Snapshot {
            tree: self.root.clone(),
            cwd: self.cwd.clone(),
            users: self.accounts.users_by_uid().into_iter().cloned().collect(),
            groups: self.accounts.groups_sorted(),
            next_uid,
            next_gid,
        }
    }

    /// Rebuild the world from a snapshot. Missing or empty account data
    /// falls back to re-seeding the defaults rather than failing.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.root = snapshot.tree;
        self.root.name = "/".to_string();
        self.cwd = if snapshot.cwd.is_empty() {
            self.home.clone()
        } else {
            snapshot.cwd
        };

        self.accounts = AccountStore::new();
        self.accounts.load(snapshot.users, snapshot.groups);
        self.accounts
            .set_next_ids(snapshot.next_uid, snapshot.next_gid);

        if self.accounts.is_empty() {
            self.accounts = AccountStore::bootstrap();
            self.register_tree_accounts();
        }

        self.sync_identity();
        self.refresh_passwd_file();
    }

    fn creator_labels(&self) -> (String, String) {
        let group = self
            .accounts
            .user(&self.username)
            .map(|u| u.primary_group.clone())
            .unwrap_or_else(|| self.username.clone());
        (self.username.clone(), group)
    }
}

fn search_file(node: &FsNode, file_path: &str, regex: &Regex, results: &mut Vec<GrepMatch>) {
    if let Some(content) = node.content() {
        for (i, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                results.push(GrepMatch {
                    file: file_path.to_string(),
                    line: i + 1,
                    text: line.to_string(),
                });
            }
        }
    }
}

/// Redirect/write targets must be plain forward paths: bounded length, no
/// NUL, no backslash, no `..` segment.
fn is_safe_write_path(target: &str) -> bool {
    let trimmed = target.trim();
    if trimmed.is_empty() || trimmed.len() > 260 {
        return false;
    }
    if trimmed.contains('\0') || trimmed.contains('\\') {
        return false;
    }
    !trimmed.split('/').any(|segment| segment == "..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn fs() -> FileSystem {
        FileSystem::new(config::seed_tree())
    }

    fn tree_json(fs: &FileSystem) -> String {
        serde_json::to_string(&fs.root).unwrap()
    }

    #[test]
    fn test_seeded_world() {
        let fs = fs();
        assert_eq!(fs.cwd(), "/home/user");
        assert!(fs.node("/home/user/documents/notes.txt").is_some());
        assert!(fs.node("/etc/passwd").is_some());
        assert!(fs.node("/var/log/system.log").is_some());
        assert!(fs.node("/missing").is_none());
    }

    #[test]
    fn test_list_dir_hides_dotfiles_by_default() {
        let fs = fs();
        let plain = fs.list_dir("/home/user", false).unwrap();
        assert!(plain.iter().all(|e| !e.name.starts_with('.')));
        let all = fs.list_dir("/home/user", true).unwrap();
        assert!(all.iter().any(|e| e.name == ".bashrc"));
        assert!(all.len() > plain.len());
    }

    #[test]
    fn test_list_dir_on_file_yields_single_entry() {
        let fs = fs();
        let entries = fs.list_dir("/home/user/documents/notes.txt", false).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "notes.txt");
        assert!(!entries[0].is_dir);
    }

    #[test]
    fn test_read_file() {
        let fs = fs();
        let content = fs.read_file("documents/notes.txt").unwrap();
        assert!(content.contains("first notes"));
        assert!(matches!(
            fs.read_file("documents"),
            Err(FsError::IsADirectory(_))
        ));
        assert!(matches!(
            fs.read_file("missing.txt"),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_create_file_and_touch() {
        let mut fs = fs();
        fs.create_file("new.txt", "").unwrap();
        let node = fs.node("/home/user/new.txt").unwrap();
        assert_eq!(node.owner, "user");
        assert_eq!(node.group, "user");

        // Touching an existing file with empty content keeps the content.
        fs.create_file("documents/notes.txt", "").unwrap();
        assert!(
            fs.read_file("documents/notes.txt")
                .unwrap()
                .contains("first notes")
        );

        assert!(matches!(
            fs.create_file("documents", ""),
            Err(FsError::IsADirectory(_))
        ));
        assert!(matches!(
            fs.create_file("ghost/new.txt", ""),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_create_dir_recursive_scenario() {
        let mut fs = fs();
        fs.change_dir("/home/user").unwrap();
        fs.create_dir("a/b/c", true).unwrap();
        assert!(fs.node("/home/user/a").unwrap().is_dir());
        assert!(fs.node("/home/user/a/b").unwrap().is_dir());
        assert!(fs.node("/home/user/a/b/c").unwrap().is_dir());
        // Idempotent over existing directories.
        fs.create_dir("a/b/c", true).unwrap();
    }

    #[test]
    fn test_create_dir_collision() {
        let mut fs = fs();
        assert!(matches!(
            fs.create_dir("documents", false),
            Err(FsError::AlreadyExists(_))
        ));
        assert!(matches!(
            fs.create_dir("documents/notes.txt/x", true),
            Err(FsError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_remove_gates_directories_behind_recursive() {
        let mut fs = fs();
        assert!(matches!(
            fs.remove("documents", false),
            Err(FsError::IsADirectory(_))
        ));
        // Even an empty directory wants the flag.
        fs.create_dir("emptydir", false).unwrap();
        assert!(matches!(
            fs.remove("emptydir", false),
            Err(FsError::IsADirectory(_))
        ));
        fs.remove("emptydir", true).unwrap();
        assert!(fs.node("/home/user/emptydir").is_none());

        fs.remove("documents", true).unwrap();
        assert!(fs.node("/home/user/documents").is_none());
    }

    #[test]
    fn test_copy_into_directory_and_rename() {
        let mut fs = fs();
        // Onto an existing directory: lands inside it.
        fs.copy("documents/notes.txt", "downloads", false).unwrap();
        assert!(fs.node("/home/user/downloads/notes.txt").is_some());
        // Onto a fresh path: takes the trailing name.
        fs.copy("documents/notes.txt", "copy.txt", false).unwrap();
        assert_eq!(
            fs.read_file("copy.txt").unwrap(),
            fs.read_file("documents/notes.txt").unwrap()
        );
    }

    #[test]
    fn test_copy_directory_requires_recursive() {
        let mut fs = fs();
        assert!(matches!(
            fs.copy("documents", "docs2", false),
            Err(FsError::IsADirectory(_))
        ));
        fs.copy("documents", "docs2", true).unwrap();
        assert!(fs.node("/home/user/docs2/notes.txt").is_some());
        // The original stays.
        assert!(fs.node("/home/user/documents/notes.txt").is_some());
    }

    #[test]
    fn test_move_rename_and_into_directory() {
        let mut fs = fs();
        fs.move_node("documents/todo.txt", "documents/tasks.txt")
            .unwrap();
        assert!(fs.node("/home/user/documents/tasks.txt").is_some());
        assert!(fs.node("/home/user/documents/todo.txt").is_none());

        fs.move_node("documents/tasks.txt", "downloads").unwrap();
        assert!(fs.node("/home/user/downloads/tasks.txt").is_some());
    }

    #[test]
    fn test_move_no_op_onto_own_parent() {
        let mut fs = fs();
        let before = tree_json(&fs);
        fs.move_node("documents/notes.txt", "documents").unwrap();
        assert_eq!(tree_json(&fs), before);
        fs.move_node("/home/user/documents/notes.txt", "/home/user/documents/notes.txt")
            .unwrap();
        assert_eq!(tree_json(&fs), before);
    }

    #[test]
    fn test_move_into_own_descendant_refused_tree_unchanged() {
        let mut fs = fs();
        let before = tree_json(&fs);
        let result = fs.move_node("/home", "/home/user");
        match result {
            Err(FsError::OperationNotPermitted(msg)) => {
                assert!(msg.contains("Cannot move a directory into itself"));
            }
            other => panic!("expected OperationNotPermitted, got {other:?}"),
        }
        assert_eq!(tree_json(&fs), before);

        assert!(fs.move_node("documents", "documents/projects/web").is_err());
        assert_eq!(tree_json(&fs), before);
    }

    #[test]
    fn test_move_root_refused() {
        let mut fs = fs();
        assert!(matches!(
            fs.move_node("/", "/tmp"),
            Err(FsError::OperationNotPermitted(_))
        ));
    }

    #[test]
    fn test_move_trailing_slash_requires_directory() {
        let mut fs = fs();
        fs.change_dir("downloads").unwrap();
        let result = fs.move_node("readme.md", "documents/");
        assert!(matches!(result, Err(FsError::NotADirectory(_))));
        assert!(fs.node("/home/user/downloads/readme.md").is_some());

        fs.move_node("readme.md", "../documents/").unwrap();
        assert!(fs.node("/home/user/documents/readme.md").is_some());
        assert!(fs.node("/home/user/downloads/readme.md").is_none());
    }

    #[test]
    fn test_chmod_numeric_round_trip() {
        let mut fs = fs();
        fs.chmod("documents/notes.txt", "755").unwrap();
        assert_eq!(
            fs.node("documents/notes.txt").unwrap().mode.to_string(),
            "rwxr-xr-x"
        );
        fs.chmod("documents/notes.txt", "644").unwrap();
        assert_eq!(
            fs.node("documents/notes.txt").unwrap().mode.to_string(),
            "rw-r--r--"
        );
    }

    #[test]
    fn test_chmod_symbolic_sequence() {
        let mut fs = fs();
        let target = "documents/bonuses.txt";
        assert_eq!(fs.node(target).unwrap().mode.to_string(), "rw-rw----");

        fs.chmod(target, "g-rw").unwrap();
        assert_eq!(fs.node(target).unwrap().mode.to_string(), "rw-------");

        fs.chmod(target, "u=r,g=r,o=r").unwrap();
        assert_eq!(fs.node(target).unwrap().mode.to_string(), "r--r--r--");

        fs.chmod(target, "u+wx").unwrap();
        assert_eq!(fs.node(target).unwrap().mode.to_string(), "rwxr--r--");
    }

    #[test]
    fn test_chmod_invalid_mode_rejected() {
        let mut fs = fs();
        let target = "documents/bonuses.txt";
        assert!(matches!(
            fs.chmod(target, "g?rw"),
            Err(FsError::InvalidArgument(_))
        ));
        assert_eq!(fs.node(target).unwrap().mode.to_string(), "rw-rw----");
    }

    #[test]
    fn test_chmod_requires_ownership() {
        let mut fs = fs();
        assert!(matches!(
            fs.chmod("/etc/passwd", "644"),
            Err(FsError::OperationNotPermitted(_))
        ));
    }

    #[test]
    fn test_permission_enforcement_on_etc() {
        let mut fs = fs();
        assert!(matches!(
            fs.write_file("/etc/passwd", "hacked", false),
            Err(FsError::PermissionDenied(_))
        ));
        assert!(matches!(
            fs.create_file("/etc/new.conf", ""),
            Err(FsError::PermissionDenied(_))
        ));
        assert!(matches!(
            fs.remove("/etc/passwd", false),
            Err(FsError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_unreadable_file_is_unreadable() {
        let mut fs = fs();
        fs.create_file("private.txt", "secret").unwrap();
        fs.chmod("private.txt", "000").unwrap();
        assert!(matches!(
            fs.read_file("private.txt"),
            Err(FsError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_traversal_blocked_without_execute_bit() {
        let mut fs = fs();
        fs.create_dir("locked", false).unwrap();
        fs.create_file("locked/inner.txt", "x").unwrap();
        fs.chmod("locked", "644").unwrap();
        assert!(matches!(
            fs.read_file("locked/inner.txt"),
            Err(FsError::PermissionDenied(_))
        ));
        assert!(matches!(
            fs.change_dir("locked"),
            Err(FsError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_change_dir() {
        let mut fs = fs();
        fs.change_dir("documents").unwrap();
        assert_eq!(fs.cwd(), "/home/user/documents");
        fs.change_dir("..").unwrap();
        assert_eq!(fs.cwd(), "/home/user");
        fs.change_dir("~").unwrap();
        assert_eq!(fs.cwd(), "/home/user");
        assert!(matches!(
            fs.change_dir("documents/notes.txt"),
            Err(FsError::NotADirectory(_))
        ));
        assert!(matches!(fs.change_dir("ghost"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_find_glob_scenario() {
        let fs = fs();
        let results = fs
            .find(
                "~",
                &FindCriteria {
                    name: Some("*.txt".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(results.contains(&"/home/user/documents/notes.txt".to_string()));
        assert!(results.contains(&"/home/user/documents/todo.txt".to_string()));
        assert!(results.iter().all(|p| p.ends_with(".txt")));
    }

    #[test]
    fn test_find_glob_does_not_leak_regex_metachars() {
        let mut fs = fs();
        fs.create_file("axtxt", "").unwrap();
        fs.create_file("a.txt", "").unwrap();
        // A literal dot must not match any character.
        let results = fs
            .find(
                "~",
                &FindCriteria {
                    name: Some("a.txt".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(results, vec!["/home/user/a.txt".to_string()]);
    }

    #[test]
    fn test_find_iname_and_type() {
        let fs = fs();
        let dirs = fs
            .find(
                "/home",
                &FindCriteria {
                    kind: Some(FindKind::Directory),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(dirs.contains(&"/home/user/documents".to_string()));
        assert!(dirs.iter().all(|p| fs.node(p).unwrap().is_dir()));

        let notes = fs
            .find(
                "~",
                &FindCriteria {
                    iname: Some("*NOTE*".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(notes.contains(&"/home/user/documents/notes.txt".to_string()));
    }

    #[test]
    fn test_find_age_predicates() {
        let fs = fs();
        // archive.zip is seeded 10 days old.
        let old = fs
            .find(
                "~/downloads",
                &FindCriteria {
                    mtime: Some("+7".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(old.contains(&"/home/user/downloads/archive.zip".to_string()));

        let recent = fs
            .find(
                "/tmp",
                &FindCriteria {
                    mmin: Some("-10".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(recent.contains(&"/tmp/session_123.tmp".to_string()));
        assert!(!recent.contains(&"/tmp/cache_old.tmp".to_string()));
    }

    #[test]
    fn test_find_invalid_predicate() {
        let fs = fs();
        assert!(matches!(
            fs.find(
                "~",
                &FindCriteria {
                    mtime: Some("+abc".to_string()),
                    ..Default::default()
                },
            ),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.find("/no/such/dir", &FindCriteria::default()),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_grep_single_file_line_numbers() {
        let fs = fs();
        let matches = fs
            .grep("Error", "/var/log/system.log", GrepOptions::default())
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line, 7);
        assert!(matches[0].text.contains("Error: connection timeout"));
        assert_eq!(matches[0].file, "/var/log/system.log");
    }

    #[test]
    fn test_grep_directory_requires_recursive() {
        let fs = fs();
        assert!(matches!(
            fs.grep("x", "/var/log", GrepOptions::default()),
            Err(FsError::IsADirectory(_))
        ));
        let matches = fs
            .grep(
                "Error",
                "/var/log",
                GrepOptions {
                    recursive: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!matches.is_empty());
    }

    #[test]
    fn test_grep_case_insensitive() {
        let fs = fs();
        let strict = fs
            .grep("warning", "/var/log/system.log", GrepOptions::default())
            .unwrap();
        assert!(strict.is_empty());
        let loose = fs
            .grep(
                "warning",
                "/var/log/system.log",
                GrepOptions {
                    ignore_case: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(loose.len(), 2);
    }

    #[test]
    fn test_grep_invalid_pattern() {
        let fs = fs();
        assert!(matches!(
            fs.grep("[", "/var/log/system.log", GrepOptions::default()),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_write_file_overwrite_append_create() {
        let mut fs = fs();
        fs.write_file("out.txt", "one", false).unwrap();
        assert_eq!(fs.read_file("out.txt").unwrap(), "one");
        fs.write_file("out.txt", "\ntwo", true).unwrap();
        assert_eq!(fs.read_file("out.txt").unwrap(), "one\ntwo");
        fs.write_file("out.txt", "three", false).unwrap();
        assert_eq!(fs.read_file("out.txt").unwrap(), "three");
    }

    #[test]
    fn test_write_file_rejects_unsafe_paths() {
        let mut fs = fs();
        for bad in ["", "   ", "a\\b", "up/../../etc/x"] {
            assert!(
                matches!(fs.write_file(bad, "x", false), Err(FsError::InvalidArgument(_))),
                "path {bad:?} should be rejected"
            );
        }
        assert!(matches!(
            fs.write_file("documents", "x", false),
            Err(FsError::IsADirectory(_))
        ));
    }

    #[test]
    fn test_superuser_bypasses_all_checks() {
        let mut fs = fs();
        fs.username = SUPERUSER.to_string();
        fs.sync_identity();
        fs.write_file("/etc/passwd", "rooted", false).unwrap();
        assert_eq!(fs.read_file("/etc/passwd").unwrap(), "rooted");
        fs.create_file("/etc/new.conf", "x").unwrap();
        fs.chmod("/etc/hosts", "600").unwrap();
        fs.remove("/etc/new.conf", false).unwrap();
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut fs = fs();
        fs.create_file("keep.txt", "kept").unwrap();
        fs.change_dir("documents").unwrap();
        let snapshot = fs.snapshot();

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();

        let mut restored = FileSystem::new(config::seed_tree());
        restored.restore(parsed);
        assert_eq!(restored.cwd(), "/home/user/documents");
        assert_eq!(restored.read_file("/home/user/keep.txt").unwrap(), "kept");
        assert!(restored.user("user").is_some());
    }

    #[test]
    fn test_restore_reseeds_missing_accounts() {
        let mut fs = fs();
        let mut snapshot = fs.snapshot();
        snapshot.users.clear();
        snapshot.groups.clear();
        fs.restore(snapshot);
        // Bootstrap accounts came back.
        assert!(fs.user("root").is_some());
        assert!(fs.user("user").is_some());
        assert!(fs.accounts().has_group("hr"));
    }

    #[test]
    fn test_snapshot_wire_format() {
        let fs = fs();
        let json = serde_json::to_value(fs.snapshot()).unwrap();
        assert_eq!(json["tree"]["type"], "dir");
        assert_eq!(json["cwd"], "/home/user");
        assert!(json["users"].as_array().unwrap().len() >= 3);
        assert!(json["nextUid"].as_u64().unwrap() > 65534);
    }
}
