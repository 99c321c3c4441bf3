//! Search commands: `grep` and `find`.

use regex::RegexBuilder;

use crate::core::commands::{CommandOutput, CommandRegistry, ExecContext};
use crate::core::filesystem::{FileSystem, FindCriteria, FindKind, GrepOptions};
use crate::core::parser::Invocation;

pub fn register(registry: &mut CommandRegistry) {
    registry.register("grep", cmd_grep, "Search for patterns in files");
    registry.register("find", cmd_find, "Search for files in a directory hierarchy");
}

fn cmd_grep(
    fs: &mut FileSystem,
    inv: &Invocation,
    stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    let Some(pattern) = inv.args.first() else {
        return CommandOutput::error("grep: missing pattern");
    };
    let ignore_case = inv.flags.has("i");
    let recursive = inv.flags.has("r") || inv.flags.has("R");
    let line_numbers = inv.flags.has("n");

    // Piped input: filter stdin lines instead of reading files.
    if let Some(stdin) = stdin {
        let regex = match RegexBuilder::new(pattern).case_insensitive(ignore_case).build() {
            Ok(regex) => regex,
            Err(_) => return CommandOutput::error(format!("grep: invalid pattern: '{}'", pattern)),
        };
        let matches: Vec<String> = stdin
            .lines()
            .enumerate()
            .filter(|(_, line)| regex.is_match(line))
            .map(|(i, line)| {
                if line_numbers {
                    format!("{}:{}", i + 1, line)
                } else {
                    line.to_string()
                }
            })
            .collect();
        return CommandOutput::text(matches.join("\n"));
    }

    let Some(target) = inv.args.get(1) else {
        return CommandOutput::error("grep: missing file operand");
    };

    let matches = match fs.grep(
        pattern,
        target,
        GrepOptions {
            ignore_case,
            recursive,
        },
    ) {
        Ok(matches) => matches,
        Err(err) => return CommandOutput::error(format!("grep: {}", err)),
    };

    // Prefix file paths when more than one file could match.
    let multiple_files = recursive || inv.args.len() > 2;
    let lines: Vec<String> = matches
        .iter()
        .map(|m| {
            let mut line = String::new();
            if multiple_files {
                line.push_str(&m.file);
                line.push(':');
            }
            if line_numbers {
                line.push_str(&m.line.to_string());
                line.push(':');
            }
            line.push_str(&m.text);
            line
        })
        .collect();
    CommandOutput::text(lines.join("\n"))
}

fn cmd_find(
    fs: &mut FileSystem,
    inv: &Invocation,
    _stdin: Option<&str>,
    _ctx: &ExecContext<'_>,
) -> CommandOutput {
    // Long-option spellings (`--name=x`) plus the passthrough pairs
    // (`-name x`) the parser kept positional.
    let mut criteria = FindCriteria {
        name: inv.flags.value("name").map(String::from),
        iname: inv.flags.value("iname").map(String::from),
        kind: None,
        mtime: inv.flags.value("mtime").map(String::from),
        mmin: inv.flags.value("mmin").map(String::from),
    };
    let mut type_arg = inv.flags.value("type").map(String::from);

    let mut positional = Vec::new();
    let mut args = inv.args.iter();
    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "-name" => &mut criteria.name,
            "-iname" => &mut criteria.iname,
            "-type" => &mut type_arg,
            "-mtime" => &mut criteria.mtime,
            "-mmin" => &mut criteria.mmin,
            _ => {
                positional.push(arg.clone());
                continue;
            }
        };
        if let Some(value) = args.next() {
            *slot = Some(value.clone());
        }
    }

    criteria.kind = match type_arg.as_deref() {
        None => None,
        Some("f") => Some(FindKind::File),
        Some("d") => Some(FindKind::Directory),
        Some(other) => {
            return CommandOutput::error(format!("find: unknown argument to -type: '{}'", other));
        }
    };

    let start = positional.first().map(|s| s.as_str()).unwrap_or(".");
    match fs.find(start, &criteria) {
        Ok(results) => CommandOutput::text(results.join("\n")),
        Err(err) => CommandOutput::error(format!("find: {}", err)),
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
    fn test_grep_file_with_line_numbers() {
        let mut shell = shell();
        let result = shell.execute("grep -n Error /var/log/system.log").result;
        assert!(!result.is_error);
        assert_eq!(result.output.lines().count(), 1);
        assert!(result.output.starts_with("7:"));
    }

    #[test]
    fn test_grep_directory_needs_recursive() {
        let mut shell = shell();
        let result = shell.execute("grep Error /var/log").result;
        assert!(result.is_error);
        assert!(result.output.contains("Is a directory"));

        let recursive = shell.execute("grep -r Error /var/log").result;
        assert!(!recursive.is_error);
        // Recursive output prefixes file paths.
        assert!(recursive.output.contains("/var/log/system.log:"));
    }

    #[test]
    fn test_grep_stdin() {
        let mut shell = shell();
        let result = shell.execute("echo alpha | grep alp").result;
        assert_eq!(result.output, "alpha");
        let no_match = shell.execute("echo alpha | grep beta").result;
        assert!(no_match.output.is_empty());
        assert!(!no_match.is_error);
    }

    #[test]
    fn test_grep_case_insensitive_flag() {
        let mut shell = shell();
        let result = shell.execute("grep -i WARNING /var/log/system.log").result;
        assert_eq!(result.output.lines().count(), 2);
    }

    #[test]
    fn test_grep_missing_operands() {
        let mut shell = shell();
        assert!(shell.execute("grep").result.is_error);
        assert!(shell.execute("grep pattern").result.is_error);
    }

    #[test]
    fn test_find_name_scenario() {
        let mut shell = shell();
        let result = shell.execute("find ~ -name \"*.txt\"").result;
        assert!(!result.is_error);
        let lines: Vec<&str> = result.output.lines().collect();
        assert!(lines.contains(&"/home/user/documents/notes.txt"));
        assert!(lines.contains(&"/home/user/documents/todo.txt"));
        assert!(lines.iter().all(|l| l.ends_with(".txt")));
    }

    #[test]
    fn test_find_without_start_defaults_to_cwd() {
        let mut shell = shell();
        let result = shell.execute("find -name \"*.txt\"").result;
        assert!(result.output.contains("/home/user/documents/notes.txt"));
    }

    #[test]
    fn test_find_type_directories() {
        let mut shell = shell();
        let result = shell.execute("find /home -type d").result;
        assert!(result.output.contains("/home/user/documents"));
        assert!(!result.output.contains("notes.txt"));
    }

    #[test]
    fn test_find_iname_and_age() {
        let mut shell = shell();
        let result = shell.execute("find ~ -iname \"*NOTE*\"").result;
        assert!(result.output.contains("/home/user/documents/notes.txt"));

        let old = shell.execute("find ~/downloads -mtime +7").result;
        assert!(old.output.contains("/home/user/downloads/archive.zip"));
    }

    #[test]
    fn test_find_bad_type() {
        let mut shell = shell();
        let result = shell.execute("find . -type z").result;
        assert!(result.is_error);
    }
}
