//! Account-management commands and the `sudo` elevation gate.
//!
//! `useradd`, `usermod`, `userdel` and `chown` fail closed without
//! elevation. `sudo` re-dispatches exactly one allow-listed invocation
//! with the elevation flag set; the flag never persists.

use crate::core::commands::{CommandOutput, CommandRegistry, ExecContext};
use crate::core::accounts::{UserAddOptions, UserModOptions};
use crate::core::error::FsError;
use crate::core::filesystem::FileSystem;
use crate::core::parser::{FlagValue, Invocation};

/// The only commands `sudo` will elevate.
const SUDO_ALLOWLIST: [&str; 4] = ["useradd", "usermod", "userdel", "chown"];

pub fn register(registry: &mut CommandRegistry) {
    registry.register("sudo", cmd_sudo, "Run an account-management command with elevation");
    registry.register("useradd", cmd_useradd, "Create a new user account");
    registry.register("usermod", cmd_usermod, "Modify a user account");
    registry.register("userdel", cmd_userdel, "Delete a user account");
    registry.register("chown", cmd_chown, "Change file owner and group");
}

fn cmd_sudo(
    fs: &mut FileSystem,
    inv: &Invocation,
    stdin: Option<&str>,
    ctx: &ExecContext<'_>,
) -> CommandOutput {
    let Some(target) = inv.args.first() else {
        return CommandOutput::error("usage: sudo <command> [args...]");
    };
    if !SUDO_ALLOWLIST.contains(&target.as_str()) {
        return CommandOutput::error(format!(
            "sudo: '{}' is blocked by the elevation policy",
            target
        ));
    }
    let Some(spec) = ctx.registry.get(target) else {
        return CommandOutput::error(format!("sudo: {}: command not found", target));
    };

    let inner = Invocation {
        name: target.clone(),
        args: inv.args[1..].to_vec(),
        flags: inv.flags.clone(),
        raw: inv.raw.clone(),
        redirect: None,
    };
    let elevated = ExecContext {
        history: ctx.history,
        elevated: true,
        registry: ctx.registry,
    };
    (spec.handler)(fs, &inner, stdin, &elevated)
}

fn require_elevation(ctx: &ExecContext<'_>, command: &str) -> Option<CommandOutput> {
    if ctx.elevated {
        return None;
    }
    Some(CommandOutput::error(format!(
        "{}: permission denied (try 'sudo {} ...')",
        command, command
    )))
}

/// Pair value-taking short options with their values.
///
/// The parser keeps flag order, and a value always follows its option on
/// the line, so walking flags in order and consuming positionals from the
/// front pairs them correctly (`-g hr -G a,b name`).
fn take_flag_values<'a>(
    inv: &'a Invocation,
    value_flags: &[&str],
) -> (Vec<(String, String)>, Vec<&'a str>) {
    let mut values = Vec::new();
    let mut rest: std::collections::VecDeque<&str> =
        inv.args.iter().map(|s| s.as_str()).collect();

    for (name, value) in inv.flags.iter() {
        if !value_flags.contains(&name) {
            continue;
        }
        match value {
            FlagValue::Value(v) => values.push((name.to_string(), v.clone())),
            FlagValue::Set => {
                if let Some(v) = rest.pop_front() {
                    values.push((name.to_string(), v.to_string()));
                }
            }
        }
    }
    (values, rest.into_iter().collect())
}

fn split_groups(list: &str) -> Vec<String> {
    list.split(',')
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .map(|g| g.to_string())
        .collect()
}

fn cmd_useradd(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    ctx: &ExecContext<'_>,
) -> CommandOutput {
    if let Some(denied) = require_elevation(ctx, "useradd") {
        return denied;
    }
    let (values, positional) = take_flag_values(inv, &["g", "G"]);
    let Some(username) = positional.first().copied() else {
        return CommandOutput::error("useradd: missing operand\nUsage: useradd [-g group] [-G g1,g2] name");
    };

    let mut options = UserAddOptions::default();
    for (flag, value) in values {
        match flag.as_str() {
            "g" => options.primary_group = Some(value),
            _ => options.supplemental_groups = split_groups(&value),
        }
    }

    match fs.useradd(username, options) {
        Ok(()) => CommandOutput::empty(),
        Err(FsError::AlreadyExists(name)) => {
            CommandOutput::error(format!("useradd: user '{}' already exists", name))
        }
        Err(FsError::NotFound(group)) => {
            CommandOutput::error(format!("useradd: group '{}' does not exist", group))
        }
        Err(err) => CommandOutput::error(format!("useradd: {}", err)),
    }
}

fn cmd_usermod(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    ctx: &ExecContext<'_>,
) -> CommandOutput {
    if let Some(denied) = require_elevation(ctx, "usermod") {
        return denied;
    }
    let (values, positional) = take_flag_values(inv, &["g", "G", "d", "l"]);
    let Some(username) = positional.first().copied() else {
        return CommandOutput::error(
            "usermod: missing operand\nUsage: usermod [-g group] [-G g1,g2 [-a]] [-d home] [-l newname] [-L] name",
        );
    };

    let mut options = UserModOptions {
        append_supplemental: inv.flags.has("a"),
        lock: inv.flags.has("L"),
        ..Default::default()
    };
    for (flag, value) in values {
        match flag.as_str() {
            "g" => options.primary_group = Some(value),
            "G" => options.supplemental_groups = Some(split_groups(&value)),
            "d" => options.home = Some(value),
            _ => options.new_login = Some(value),
        }
    }

    match fs.usermod(username, options) {
        Ok(()) => CommandOutput::empty(),
        Err(FsError::NotFound(name)) if name == username => {
            CommandOutput::error(format!("usermod: user '{}' does not exist", name))
        }
        Err(FsError::NotFound(group)) => {
            CommandOutput::error(format!("usermod: group '{}' does not exist", group))
        }
        Err(FsError::AlreadyExists(name)) => {
            CommandOutput::error(format!("usermod: user '{}' already exists", name))
        }
        Err(err) => CommandOutput::error(format!("usermod: {}", err)),
    }
}

fn cmd_userdel(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    ctx: &ExecContext<'_>,
) -> CommandOutput {
    if let Some(denied) = require_elevation(ctx, "userdel") {
        return denied;
    }
    let Some(username) = inv.args.first() else {
        return CommandOutput::error("userdel: missing operand\nUsage: userdel [-r] name");
    };
    match fs.userdel(username, inv.flags.has("r")) {
        Ok(()) => CommandOutput::empty(),
        Err(FsError::NotFound(name)) => {
            CommandOutput::error(format!("userdel: user '{}' does not exist", name))
        }
        Err(err) => CommandOutput::error(format!("userdel: {}", err)),
    }
}

fn cmd_chown(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    ctx: &ExecContext<'_>,
) -> CommandOutput {
    if let Some(denied) = require_elevation(ctx, "chown") {
        return denied;
    }
    if inv.args.len() < 2 {
        return CommandOutput::error("chown: missing operand\nUsage: chown [-R] owner[:group] path");
    }
    let recursive = inv.flags.has("R");
    match fs.chown(&inv.args[1], &inv.args[0], recursive) {
        Ok(()) => CommandOutput::empty(),
        Err(FsError::NotFound(path)) => CommandOutput::error(format!(
            "chown: cannot access '{}': No such file or directory",
            path
        )),
        Err(err) => CommandOutput::error(format!("chown: {}", err)),
    }
}
