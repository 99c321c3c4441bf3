//! Utility commands: text output, counters, pagers, the editor entry
//! point and the manual.

use crate::core::commands::{CommandOutput, CommandRegistry, ExecContext};
use crate::core::editor::EditorRequest;
use crate::core::filesystem::FileSystem;
use crate::core::parser::{FlagValue, Invocation};
use crate::core::{path, time};

const DEFAULT_HEAD_LINES: usize = 10;
const DEFAULT_TAIL_LINES: usize = 10;

pub fn register(registry: &mut CommandRegistry) {
    registry.register("echo", cmd_echo, "Display text");
    registry.register("clear", cmd_clear, "Clear the terminal screen");
    registry.register("whoami", cmd_whoami, "Print current user name");
    registry.register("hostname", cmd_hostname, "Print system hostname");
    registry.register("date", cmd_date, "Display current date and time");
    registry.register("history", cmd_history, "Display command history");
    registry.register("head", cmd_head, "Output the first part of files");
    registry.register("tail", cmd_tail, "Output the last part of files");
    registry.register("wc", cmd_wc, "Print line, word, and byte counts");
    registry.register("less", cmd_less, "View file content (pager-like)");
    registry.register("nano", cmd_nano, "Edit files with a simplified nano mode");
    registry.register("man", cmd_man, "Display manual pages");
    registry.register("help", cmd_help, "Show available commands");
}

fn cmd_echo(
    _fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    CommandOutput::text(inv.args.join(" "))
}

fn cmd_clear(
    _fs: &mut FileSystem,
    _inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    CommandOutput::clear_screen()
}

fn cmd_whoami(
    fs: &mut FileSystem,
    _inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    CommandOutput::text(fs.username())
}

fn cmd_hostname(
    fs: &mut FileSystem,
    _inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    CommandOutput::text(fs.hostname())
}

fn cmd_date(
    _fs: &mut FileSystem,
    _inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    CommandOutput::text(time::format_long(time::now_millis()))
}

fn cmd_history(
    _fs: &mut FileSystem,
    _inv: &Invocation,
    _stdin: Option<&str>,
    ctx: &ExecContext<'_>,
) -> CommandOutput {
    if ctx.history.is_empty() {
        return CommandOutput::empty();
    }
    let lines: Vec<String> = ctx
        .history
        .iter()
        .enumerate()
        .map(|(i, cmd)| format!("{:>5}  {}", i + 1, cmd))
        .collect();
    CommandOutput::text(lines.join("\n"))
}

/// Line count and file for `head`/`tail`: supports `-n 3 file`,
/// `-n3`-less `--n=3` spellings are not a thing here — the count rides as
/// the first positional when `-n` was given bare.
fn count_and_path<'a>(inv: &'a Invocation, default: usize) -> (usize, Option<&'a str>) {
    match inv.flags.iter().find(|(n, _)| *n == "n") {
        Some((_, FlagValue::Set)) => {
            if let Some(count) = inv.args.first().and_then(|a| a.parse::<usize>().ok()) {
                return (count, inv.args.get(1).map(|s| s.as_str()));
            }
            (default, inv.args.first().map(|s| s.as_str()))
        }
        Some((_, FlagValue::Value(v))) => match v.parse::<usize>() {
            Ok(count) => (count, inv.args.first().map(|s| s.as_str())),
            Err(_) => (default, inv.args.first().map(|s| s.as_str())),
        },
        None => (default, inv.args.first().map(|s| s.as_str())),
    }
}

fn cmd_head(
    fs: &mut FileSystem,
    inv: &Invocation,
    stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    let (count, target) = count_and_path(inv, DEFAULT_HEAD_LINES);
    let content = match read_input(fs, stdin, target, "head") {
        Ok(content) => content,
        Err(output) => return output,
    };
    let lines: Vec<&str> = content.lines().take(count).collect();
    CommandOutput::text(lines.join("\n"))
}

fn cmd_tail(
    fs: &mut FileSystem,
    inv: &Invocation,
    stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    let (count, target) = count_and_path(inv, DEFAULT_TAIL_LINES);
    let content = match read_input(fs, stdin, target, "tail") {
        Ok(content) => content,
        Err(output) => return output,
    };
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(count);
    CommandOutput::text(lines[start..].join("\n"))
}

fn read_input(
    fs: &FileSystem,
    stdin: Option<&str>,
    target: Option<&str>,
    command: &str,
) -> Result<String, CommandOutput> {
    if let Some(stdin) = stdin {
        return Ok(stdin.to_string());
    }
    let Some(target) = target else {
        return Err(CommandOutput::error(format!(
            "{}: missing file operand",
            command
        )));
    };
    fs.read_file(target)
        .map_err(|err| CommandOutput::error(format!("{}: {}", command, err)))
}

fn cmd_wc(
    fs: &mut FileSystem,
    inv: &Invocation,
    stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    let count = |content: &str, name: &str| -> String {
        let lines = content.split('\n').count();
        let words = content.split_whitespace().count();
        let chars = content.len();
        let counts = if inv.flags.has("l") {
            lines.to_string()
        } else if inv.flags.has("w") {
            words.to_string()
        } else if inv.flags.has("c") || inv.flags.has("m") {
            chars.to_string()
        } else {
            format!("{:>4} {:>4} {:>4}", lines, words, chars)
        };
        if name.is_empty() {
            counts
        } else {
            format!("{} {}", counts, name)
        }
    };

    if let Some(stdin) = stdin {
        return CommandOutput::text(count(stdin, ""));
    }
    if inv.args.is_empty() {
        return CommandOutput::error("wc: missing file operand");
    }
    let mut outputs = Vec::new();
    for target in &inv.args {
        match fs.read_file(target) {
            Ok(content) => outputs.push(count(&content, target)),
            Err(err) => return CommandOutput::error(format!("wc: {}", err)),
        }
    }
    CommandOutput::text(outputs.join("\n"))
}

fn cmd_less(
    fs: &mut FileSystem,
    inv: &Invocation,
    stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    match read_input(fs, stdin, inv.args.first().map(|s| s.as_str()), "less") {
        Ok(content) => CommandOutput::text(content),
        Err(output) => output,
    }
}

fn cmd_nano(
    fs: &mut FileSystem,
    inv: &Invocation,
    stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    if stdin.is_some() {
        return CommandOutput::error("nano: cannot read from a pipe");
    }
    let Some(target) = inv.args.first() else {
        return CommandOutput::error("nano: missing file operand\nUsage: nano <file>");
    };

    let abs = fs.resolve(target);
    if fs.node(&abs).is_some_and(|n| n.is_dir()) {
        return CommandOutput::error(format!("nano: {}: Is a directory", target));
    }
    let parent = path::parent(&abs);
    if !fs.node(&parent).is_some_and(|n| n.is_dir()) {
        return CommandOutput::error(format!(
            "nano: cannot open '{}': No such file or directory",
            target
        ));
    }

    let content = fs
        .node(&abs)
        .and_then(|n| n.content())
        .unwrap_or_default()
        .to_string();
    let display = fs.display_path(&abs);
    CommandOutput {
        output: format!(
            "[nano] Editing {}\n[nano] Simplified mode: each input line is appended.\n[nano] Commands: /help /show /save /exit",
            display
        ),
        redirectable: false,
        editor: Some(EditorRequest { path: abs, content }),
        ..CommandOutput::default()
    }
}

fn cmd_man(
    _fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    ctx: &ExecContext<'_>,
) -> CommandOutput {
    let Some(name) = inv.args.first() else {
        return CommandOutput::error("What manual page do you want?\nUsage: man <command>");
    };
    let Some(spec) = ctx.registry.get(name) else {
        return CommandOutput::error(format!("No manual entry for {}", name));
    };
    match man_page(name) {
        Some(page) => CommandOutput::text(page),
        None => CommandOutput::text(format!(
            "{} - {}\n\n(No detailed manual page available)",
            name, spec.description
        )),
    }
}

fn cmd_help(
    _fs: &mut FileSystem,
    _inv: &Invocation,
    _stdin: Option<&str>,
    ctx: &ExecContext<'_>,
) -> CommandOutput {
    let width = ctx
        .registry
        .names()
        .iter()
        .map(|n| n.len())
        .max()
        .unwrap_or(0);
    let mut output = String::from("Available commands:\n\n");
    for (name, spec) in ctx.registry.iter() {
        output.push_str(&format!("  {:<width$}  {}\n", name, spec.description));
    }
    output.push_str("\nType 'man <command>' for details.");
    CommandOutput::text(output)
}

fn man_page(name: &str) -> Option<&'static str> {
    let page = match name {
        "ls" => {
            "ls - list directory contents\n\nUsage: ls [OPTIONS] [PATH]\n\nOptions:\n  -a    Show hidden files (starting with .)\n  -l    Long listing format\n  -la   Combine -l and -a\n\nExamples:\n  ls           List current directory\n  ls -la       Show all files with details\n  ls /etc      List the /etc directory"
        }
        "cd" => {
            "cd - change directory\n\nUsage: cd [PATH]\n\nSpecial paths:\n  ~     Home directory\n  ..    Parent directory\n  .     Current directory\n  /     Root directory\n\nExamples:\n  cd ~            Go home\n  cd ..           Go up one level\n  cd ./documents  Enter documents (relative)\n  cd /etc         Go to /etc (absolute)"
        }
        "pwd" => {
            "pwd - print working directory\n\nUsage: pwd\n\nDisplays the absolute path of the current directory."
        }
        "cat" => {
            "cat - concatenate and display files\n\nUsage: cat [FILE...]\n\nExamples:\n  cat file.txt             Display file content\n  cat file1.txt file2.txt  Display multiple files"
        }
        "touch" => {
            "touch - create empty files\n\nUsage: touch [FILE...]\n\nExamples:\n  touch newfile.txt      Create a new empty file\n  touch a.txt b.txt      Create multiple files"
        }
        "mkdir" => {
            "mkdir - create directories\n\nUsage: mkdir [OPTIONS] [DIR...]\n\nOptions:\n  -p    Create parent directories as needed\n\nExamples:\n  mkdir mydir            Create a directory\n  mkdir -p a/b/c         Create nested directories"
        }
        "rm" => {
            "rm - remove files or directories\n\nUsage: rm [OPTIONS] [FILE...]\n\nOptions:\n  -r    Remove directories recursively\n  -f    Force (ignore nonexistent files)\n\nExamples:\n  rm file.txt            Remove a file\n  rm -r mydir            Remove a directory and contents"
        }
        "cp" => {
            "cp - copy files and directories\n\nUsage: cp [OPTIONS] SOURCE DEST\n\nOptions:\n  -r    Copy directories recursively\n\nExamples:\n  cp file.txt copy.txt   Copy a file\n  cp -r dir1 dir2        Copy a directory"
        }
        "mv" => {
            "mv - move or rename files\n\nUsage: mv SOURCE DEST\n\nExamples:\n  mv old.txt new.txt     Rename a file\n  mv file.txt dir/       Move file into directory"
        }
        "grep" => {
            "grep - search for patterns in files\n\nUsage: grep [OPTIONS] PATTERN [FILE]\n\nOptions:\n  -i    Case insensitive\n  -r    Recursive search\n  -n    Show line numbers\n\nExamples:\n  grep \"error\" log.txt        Find \"error\" in file\n  grep -rn \"TODO\" .           Search recursively with line numbers\n  cat file | grep \"word\"      Search in piped input"
        }
        "find" => {
            "find - search for files\n\nUsage: find [PATH] [OPTIONS]\n\nOptions:\n  -name    Search by file name (case-sensitive)\n  -iname   Search by file name (case-insensitive)\n  -type    f for files, d for directories\n  -mtime   Match by age in days (+N, -N, N)\n  -mmin    Match by age in minutes (+N, -N, N)\n\nExamples:\n  find . -name \"*.txt\"        Find all .txt files\n  find /home -type d          Find all directories\n  find /tmp -mtime +1         Older than 1 day"
        }
        "echo" => {
            "echo - display text\n\nUsage: echo [TEXT...]\n\nExamples:\n  echo Hello World            Print text\n  echo \"Hello\" > file.txt     Write to file\n  echo \"More\" >> file.txt     Append to file"
        }
        "chmod" => {
            "chmod - change file permissions\n\nUsage: chmod MODE FILE\n\nNumeric mode (3 digits):\n  4 = read (r)\n  2 = write (w)\n  1 = execute (x)\n\nSymbolic mode:\n  u = user (owner)\n  g = group\n  o = others\n  a = all\n  + add permission(s)\n  - remove permission(s)\n  = set exact permission(s)\n\nExamples:\n  chmod 755 script.sh     rwxr-xr-x\n  chmod 644 file.txt      rw-r--r--\n  chmod g-rw secrets.txt  remove group read/write\n  chmod u=r,g=r,o=r f.txt set exact rights"
        }
        "head" => {
            "head - output the first part of files\n\nUsage: head [-n COUNT] [FILE]\n\nExamples:\n  head file.txt          Show first 10 lines\n  head -n 5 file.txt     Show first 5 lines"
        }
        "tail" => {
            "tail - output the last part of files\n\nUsage: tail [-n COUNT] [FILE]\n\nExamples:\n  tail file.txt          Show last 10 lines\n  tail -n 3 file.txt     Show last 3 lines"
        }
        "wc" => {
            "wc - print line, word, and byte counts\n\nUsage: wc [OPTIONS] [FILE]\n\nOptions:\n  -l    Count lines only\n  -w    Count words only\n  -c    Count bytes only\n\nExamples:\n  wc file.txt            Show all counts\n  wc -l file.txt         Count lines only\n  cat file | wc -w       Count words from pipe"
        }
        "less" => {
            "less - view file content (simplified pager)\n\nUsage: less [FILE]\n\nExamples:\n  less notes.txt           Display file content\n  grep Error log | less    View piped results"
        }
        "nano" => {
            "nano - edit files in a simplified mode\n\nUsage: nano FILE\n\nInside nano mode:\n  /help   Show nano commands\n  /show   Show current buffer\n  /save   Save buffer to file\n  /exit   Exit nano mode\n\nExamples:\n  nano notes.txt         Open a file\n  nano ~/project/log.txt Create/edit a file"
        }
        "sudo" => {
            "sudo - run an account-management command with elevation\n\nUsage: sudo COMMAND [ARGS...]\n\nOnly useradd, usermod, userdel and chown may be elevated;\neverything else is refused. Elevation lasts for exactly one\ncommand.\n\nExamples:\n  sudo useradd alice\n  sudo chown alice:hr report.txt"
        }
        "useradd" => {
            "useradd - create a new user account\n\nUsage: sudo useradd [-g GROUP] [-G G1,G2] NAME\n\nOptions:\n  -g    Primary group (must exist)\n  -G    Comma-separated supplemental groups (must exist)\n\nExamples:\n  sudo useradd alice\n  sudo useradd -G hr,finance bob"
        }
        "usermod" => {
            "usermod - modify a user account\n\nUsage: sudo usermod [OPTIONS] NAME\n\nOptions:\n  -g GROUP     Change primary group\n  -G G1,G2     Replace supplemental groups\n  -a           With -G, append instead of replace\n  -d HOME      Relocate home directory\n  -l NEWNAME   Rename the account\n  -L           Lock the account\n\nExamples:\n  sudo usermod -a -G marketing alice\n  sudo usermod -L bob"
        }
        "userdel" => {
            "userdel - delete a user account\n\nUsage: sudo userdel [-r] NAME\n\nOptions:\n  -r    Also remove the home directory\n\nExamples:\n  sudo userdel -r alice"
        }
        "chown" => {
            "chown - change file owner and group\n\nUsage: sudo chown [-R] OWNER[:GROUP] PATH\n\nForms:\n  owner         Change owner only\n  owner:group   Change both\n  :group        Change group only\n\nOptions:\n  -R    Apply recursively\n\nExamples:\n  sudo chown alice report.txt\n  sudo chown -R alice:hr /home/alice"
        }
        _ => return None,
    };
    Some(page)
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
    fn test_echo() {
        let mut shell = shell();
        assert_eq!(shell.execute("echo hello world").result.output, "hello world");
        assert_eq!(
            shell.execute("echo 'quoted  spaces'").result.output,
            "quoted  spaces"
        );
    }

    #[test]
    fn test_clear_flag() {
        let mut shell = shell();
        let result = shell.execute("clear").result;
        assert!(result.clear);
        assert!(!result.redirectable);
    }

    #[test]
    fn test_whoami_hostname() {
        let mut shell = shell();
        assert_eq!(shell.execute("whoami").result.output, "user");
        assert_eq!(shell.execute("hostname").result.output, "termgym");
    }

    #[test]
    fn test_date_shape() {
        let mut shell = shell();
        let output = shell.execute("date").result.output;
        assert!(output.ends_with("UTC"));
    }

    #[test]
    fn test_head_n_3() {
        let mut shell = shell();
        let output = shell.execute("head -n 3 /var/log/system.log").result.output;
        assert_eq!(output.lines().count(), 3);
        assert!(output.starts_with("[2024-01-15 08:00:01] System started"));
    }

    #[test]
    fn test_head_default_and_missing() {
        let mut shell = shell();
        let result = shell.execute("head").result;
        assert!(result.is_error);
        let output = shell.execute("head documents/todo.txt").result.output;
        assert!(output.lines().count() <= 10);
    }

    #[test]
    fn test_tail_n_3() {
        let mut shell = shell();
        let output = shell.execute("tail -n 3 /var/log/system.log").result.output;
        assert_eq!(output.lines().count(), 3);
        assert!(output.ends_with("Package update available"));
    }

    #[test]
    fn test_head_tail_from_pipe() {
        let mut shell = shell();
        let output = shell
            .execute("cat /var/log/system.log | head -n 2")
            .result
            .output;
        assert_eq!(output.lines().count(), 2);
        let output = shell
            .execute("cat /var/log/system.log | tail -n 1")
            .result
            .output;
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_wc_flags() {
        let mut shell = shell();
        let lines = shell.execute("wc -l documents/todo.txt").result.output;
        assert!(lines.starts_with('6'));
        let piped = shell.execute("echo one two three | wc -w").result.output;
        assert_eq!(piped, "3");
    }

    #[test]
    fn test_less_file_and_pipe() {
        let mut shell = shell();
        let from_file = shell.execute("less documents/notes.txt").result;
        assert!(from_file.output.contains("first notes"));
        let piped = shell.execute("echo paged | less").result;
        assert_eq!(piped.output, "paged");
    }

    #[test]
    fn test_nano_opens_editor() {
        let mut shell = shell();
        let result = shell.execute("nano documents/notes.txt").result;
        assert!(!result.is_error);
        assert!(result.output.contains("[nano]"));
        assert!(shell.in_editor());
    }

    #[test]
    fn test_nano_rejects_directories_and_orphans() {
        let mut shell = shell();
        let dir = shell.execute("nano documents").result;
        assert!(dir.is_error);
        assert!(dir.output.contains("Is a directory"));
        let orphan = shell.execute("nano ghost/file.txt").result;
        assert!(orphan.is_error);
        assert!(orphan.output.contains("No such file or directory"));
        assert!(!shell.in_editor());
    }

    #[test]
    fn test_man_pages() {
        let mut shell = shell();
        let page = shell.execute("man nano").result.output;
        assert!(page.contains("nano - edit files in a simplified mode"));
        assert!(page.contains("/save"));
        assert!(page.contains("/exit"));

        let missing = shell.execute("man frobnicate").result;
        assert!(missing.is_error);
        assert!(missing.output.contains("No manual entry"));

        let usage = shell.execute("man").result;
        assert!(usage.is_error);
    }

    #[test]
    fn test_help_lists_commands() {
        let mut shell = shell();
        let output = shell.execute("help").result.output;
        assert!(output.contains("ls"));
        assert!(output.contains("sudo"));
        assert!(output.contains("man <command>"));
    }

    #[test]
    fn test_history_command() {
        let mut shell = shell();
        shell.execute("pwd");
        let output = shell.execute("history").result.output;
        assert!(output.contains("1  pwd"));
        assert!(output.contains("2  history"));
    }
}
