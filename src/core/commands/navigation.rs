//! Navigation commands: `pwd`, `cd`, `ls`.

use crate::core::commands::{CommandOutput, CommandRegistry, ExecContext};
use crate::core::filesystem::FileSystem;
use crate::core::parser::Invocation;
use crate::core::time;
use crate::models::DirEntry;

pub fn register(registry: &mut CommandRegistry) {
    registry.register("pwd", cmd_pwd, "Print working directory");
    registry.register("cd", cmd_cd, "Change directory");
    registry.register("ls", cmd_ls, "List directory contents");
}

fn cmd_pwd(
    fs: &mut FileSystem,
    _inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    CommandOutput::text(fs.cwd())
}

fn cmd_cd(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    let target = inv.args.first().map(|s| s.as_str()).unwrap_or("~");
    match fs.change_dir(target) {
        Ok(()) => CommandOutput::empty(),
        Err(err) => CommandOutput::error(format!("cd: {}", err)),
    }
}

fn cmd_ls(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    let target = inv.args.first().map(|s| s.as_str()).unwrap_or(".");
    let show_hidden = inv.flags.has("a") || inv.flags.has("A");
    let long = inv.flags.has("l");

    let entries = match fs.list_dir(target, show_hidden) {
        Ok(entries) => entries,
        Err(err) => return CommandOutput::error(format!("ls: {}", err)),
    };

    if entries.is_empty() {
        return CommandOutput::empty();
    }

    if long {
        let mut lines = vec![format!("total {}", entries.len())];
        lines.extend(entries.iter().map(long_row));
        CommandOutput::text(lines.join("\n"))
    } else {
        let names: Vec<String> = entries.iter().map(short_name).collect();
        CommandOutput::text(names.join("  "))
    }
}

fn long_row(entry: &DirEntry) -> String {
    format!(
        "{}{}  1 {} {} {:>5} {} {}",
        if entry.is_dir { 'd' } else { '-' },
        entry.mode,
        entry.owner,
        entry.group,
        entry.size,
        time::format_short(entry.mtime),
        short_name(entry),
    )
}

fn short_name(entry: &DirEntry) -> String {
    if entry.is_dir {
        format!("{}/", entry.name)
    } else {
        entry.name.clone()
    }
}
