//! In-memory Unix-like shell and filesystem engine for command-line
//! training.
//!
//! The crate simulates a small machine entirely in memory: a hierarchical
//! file tree with POSIX-style permissions and ownership, a quote-aware
//! command-line parser with pipes and redirection, a per-world command
//! registry, and the execution pipeline that chains it all together. A
//! presentation layer drives it one input line at a time:
//!
//! ```
//! use termgym::{FileSystem, Shell, config};
//!
//! let mut shell = Shell::new(FileSystem::new(config::seed_tree()));
//! let dispatch = shell.execute("cat /var/log/system.log | grep Error");
//! assert!(!dispatch.result.is_error);
//! assert!(dispatch.result.output.contains("Error"));
//! ```
//!
//! Everything a caller can observe — output text, error flags, parsed
//! commands, snapshots — travels as plain values; the engine never
//! panics on user input and never performs real I/O.

pub mod config;
pub mod core;
pub mod models;

pub use crate::core::accounts::{AccountStore, UserAddOptions, UserModOptions};
pub use crate::core::autocomplete::{Completion, complete};
pub use crate::core::commands::{CommandOutput, CommandRegistry, Dispatch, ExecContext, Shell};
pub use crate::core::editor::{EditorRequest, EditorSession};
pub use crate::core::error::FsError;
pub use crate::core::filesystem::{FileSystem, FindCriteria, FindKind, GrepMatch, GrepOptions};
pub use crate::core::parser::{
    Flags, Invocation, ParseError, ParsedCommand, Redirect, RedirectMode, parse,
};
pub use crate::core::perms::{AccessClass, Identity, Mode, Perm};
pub use crate::models::{DirEntry, FsNode, Group, NodeKind, Snapshot, User};
