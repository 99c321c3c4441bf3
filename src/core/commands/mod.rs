//! Command registry and dispatch contract.
//!
//! The registry is an explicit value constructed once per world and passed
//! by reference into the execution pipeline — no global mutable state. A
//! handler is a plain function over the filesystem, the parsed invocation,
//! optional piped stdin and the execution context; everything it can
//! report travels back as a [`CommandOutput`] value.

mod admin;
mod execute;
mod files;
mod navigation;
mod result;
mod search;
mod utils;

pub use execute::{Dispatch, Shell};
pub use result::CommandOutput;

use std::collections::BTreeMap;

use crate::core::filesystem::FileSystem;
use crate::core::parser::Invocation;

/// Handler contract: `(fs, invocation, stdin, context) -> output`.
///
/// Handlers are infallible by signature: user-level failures are output
/// values with the error flag set, never unwinding.
pub type CommandHandler =
    fn(&mut FileSystem, &Invocation, Option<&str>, &ExecContext<'_>) -> CommandOutput;

/// A registered command.
#[derive(Clone)]
pub struct CommandSpec {
    pub handler: CommandHandler,
    pub description: &'static str,
}

/// Name → handler table for one world.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in command set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        navigation::register(&mut registry);
        files::register(&mut registry);
        search::register(&mut registry);
        utils::register(&mut registry);
        admin::register(&mut registry);
        registry
    }

    pub fn register(&mut self, name: &str, handler: CommandHandler, description: &'static str) {
        self.commands.insert(
            name.to_string(),
            CommandSpec {
                handler,
                description,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// All command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandSpec)> {
        self.commands.iter().map(|(n, s)| (n.as_str(), s))
    }
}

/// Per-dispatch context handed to handlers.
#[derive(Clone, Copy)]
pub struct ExecContext<'a> {
    /// Prior raw input lines, oldest first.
    pub history: &'a [String],
    /// One-shot privilege elevation; never persisted across dispatches.
    pub elevated: bool,
    /// The world's registry (for `help`, `man` and `sudo` re-dispatch).
    pub registry: &'a CommandRegistry,
}
