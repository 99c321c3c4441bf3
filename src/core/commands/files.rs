//! File manipulation commands: `cat`, `touch`, `mkdir`, `rm`, `cp`,
//! `mv`, `chmod`.

use crate::core::commands::{CommandOutput, CommandRegistry, ExecContext};
use crate::core::error::FsError;
use crate::core::filesystem::FileSystem;
use crate::core::parser::Invocation;

pub fn register(registry: &mut CommandRegistry) {
    registry.register("cat", cmd_cat, "Concatenate and display files");
    registry.register("touch", cmd_touch, "Create empty files");
    registry.register("mkdir", cmd_mkdir, "Create directories");
    registry.register("rm", cmd_rm, "Remove files or directories");
    registry.register("cp", cmd_cp, "Copy files and directories");
    registry.register("mv", cmd_mv, "Move or rename files");
    registry.register("chmod", cmd_chmod, "Change file permissions");
}

fn cmd_cat(
    fs: &mut FileSystem,
    inv: &Invocation,
    stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    if inv.args.is_empty() {
        if let Some(stdin) = stdin {
            return CommandOutput::text(stdin);
        }
        return CommandOutput::error("cat: missing operand");
    }

    let mut outputs = Vec::new();
    for target in &inv.args {
        match fs.read_file(target) {
            Ok(content) => outputs.push(content),
            Err(err) => return CommandOutput::error(format!("cat: {}", err)),
        }
    }
    CommandOutput::text(outputs.join("\n"))
}

fn cmd_touch(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    if inv.args.is_empty() {
        return CommandOutput::error("touch: missing file operand");
    }
    for target in &inv.args {
        if let Err(err) = fs.create_file(target, "") {
            return CommandOutput::error(format!("touch: cannot create: {}", err));
        }
    }
    CommandOutput::empty()
}

fn cmd_mkdir(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    if inv.args.is_empty() {
        return CommandOutput::error("mkdir: missing operand");
    }
    let recursive = inv.flags.has("p");
    for target in &inv.args {
        if let Err(err) = fs.create_dir(target, recursive) {
            return CommandOutput::error(format!("mkdir: cannot create directory: {}", err));
        }
    }
    CommandOutput::empty()
}

fn cmd_rm(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    if inv.args.is_empty() {
        return CommandOutput::error("rm: missing operand");
    }
    let recursive = inv.flags.has("r") || inv.flags.has("R");
    let force = inv.flags.has("f");
    for target in &inv.args {
        match fs.remove(target, recursive) {
            Ok(()) => {}
            Err(FsError::NotFound(_)) if force => {}
            Err(FsError::IsADirectory(path)) => {
                return CommandOutput::error(format!(
                    "rm: cannot remove '{}': Is a directory (use -r)",
                    path
                ));
            }
            Err(err) => return CommandOutput::error(format!("rm: cannot remove: {}", err)),
        }
    }
    CommandOutput::empty()
}

fn cmd_cp(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    if inv.args.len() < 2 {
        return CommandOutput::error("cp: missing operand");
    }
    let recursive = inv.flags.has("r") || inv.flags.has("R");
    match fs.copy(&inv.args[0], &inv.args[1], recursive) {
        Ok(()) => CommandOutput::empty(),
        Err(FsError::IsADirectory(path)) => {
            CommandOutput::error(format!("cp: omitting directory '{}' (use -r)", path))
        }
        Err(err) => CommandOutput::error(format!("cp: {}", err)),
    }
}

fn cmd_mv(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    if inv.args.len() < 2 {
        return CommandOutput::error("mv: missing operand");
    }
    match fs.move_node(&inv.args[0], &inv.args[1]) {
        Ok(()) => CommandOutput::empty(),
        Err(err) => CommandOutput::error(format!("mv: {}", err)),
    }
}

fn cmd_chmod(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    if inv.args.len() < 2 {
        return CommandOutput::error("chmod: missing operand");
    }
    match fs.chmod(&inv.args[1], &inv.args[0]) {
        Ok(()) => CommandOutput::empty(),
        Err(err) => CommandOutput::error(format!("chmod: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::core::commands::Shell;

    fn shell() -> Shell {
        Shell::new(FileSystem::new(config::seed_tree()))
    }

    #[test]
    fn test_cat_file_and_multiple() {
        let mut shell = shell();
        let single = shell.execute("cat documents/notes.txt").result;
        assert!(!single.is_error);
        assert!(single.output.contains("first notes"));

        let both = shell
            .execute("cat documents/notes.txt documents/todo.txt")
            .result;
        assert!(both.output.contains("first notes"));
        assert!(both.output.contains("Learn the ls command"));
    }

    #[test]
    fn test_cat_errors() {
        let mut shell = shell();
        assert!(shell.execute("cat").result.is_error);
        let missing = shell.execute("cat ghost.txt").result;
        assert!(missing.output.contains("No such file or directory"));
        let dir = shell.execute("cat documents").result;
        assert!(dir.output.contains("Is a directory"));
    }

    #[test]
    fn test_touch_creates_multiple() {
        let mut shell = shell();
        shell.execute("touch a.txt b.txt");
        assert!(shell.fs().node("/home/user/a.txt").is_some());
        assert!(shell.fs().node("/home/user/b.txt").is_some());
    }

    #[test]
    fn test_mkdir_p_scenario() {
        let mut shell = shell();
        let result = shell.execute("mkdir -p a/b/c").result;
        assert!(!result.is_error);
        let fs = shell.fs();
        assert!(fs.node("/home/user/a").unwrap().is_dir());
        assert!(fs.node("/home/user/a/b").unwrap().is_dir());
        assert!(fs.node("/home/user/a/b/c").unwrap().is_dir());

        let nested = shell.execute("mkdir x/y").result;
        assert!(nested.is_error);
    }

    #[test]
    fn test_rm_directory_hint() {
        let mut shell = shell();
        let result = shell.execute("rm documents").result;
        assert!(result.is_error);
        assert!(result.output.contains("Is a directory (use -r)"));
        assert!(!shell.execute("rm -r documents").result.is_error);
        assert!(shell.fs().node("/home/user/documents").is_none());
    }

    #[test]
    fn test_rm_force_ignores_missing() {
        let mut shell = shell();
        assert!(shell.execute("rm ghost.txt").result.is_error);
        assert!(!shell.execute("rm -f ghost.txt").result.is_error);
    }

    #[test]
    fn test_cp_and_mv() {
        let mut shell = shell();
        shell.execute("cp documents/notes.txt notes_copy.txt");
        assert!(shell.fs().node("/home/user/notes_copy.txt").is_some());

        let dir_copy = shell.execute("cp documents docs_backup").result;
        assert!(dir_copy.output.contains("omitting directory"));
        shell.execute("cp -r documents docs_backup");
        assert!(shell.fs().node("/home/user/docs_backup/notes.txt").is_some());

        shell.execute("mv notes_copy.txt downloads");
        assert!(shell.fs().node("/home/user/downloads/notes_copy.txt").is_some());
        assert!(shell.fs().node("/home/user/notes_copy.txt").is_none());
    }

    #[test]
    fn test_mv_into_itself_message() {
        let mut shell = shell();
        let result = shell.execute("mv /home /home/user").result;
        assert!(result.is_error);
        assert!(result.output.contains("Cannot move a directory into itself"));
    }

    #[test]
    fn test_chmod_command() {
        let mut shell = shell();
        shell.execute("chmod g-rw documents/bonuses.txt");
        assert_eq!(
            shell
                .fs()
                .node("documents/bonuses.txt")
                .unwrap()
                .mode
                .to_string(),
            "rw-------"
        );
        let bad = shell.execute("chmod wat documents/bonuses.txt").result;
        assert!(bad.is_error);
        assert!(bad.output.contains("invalid mode"));
    }
}
