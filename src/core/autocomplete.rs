//! Tab-completion over command names and filesystem paths.
//!
//! The first word completes against the registry; later words complete
//! against directory entries. Multiple candidates extend to their common
//! prefix and are returned for display.

use crate::core::commands::CommandRegistry;
use crate::core::filesystem::FileSystem;

/// Completion outcome: an optional replacement for the partial word plus
/// the candidate list when it is ambiguous.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Completion {
    pub completed: Option<String>,
    pub options: Vec<String>,
}

/// Complete the last word of `input`.
pub fn complete(input: &str, fs: &FileSystem, registry: &CommandRegistry) -> Completion {
    let parts: Vec<&str> = input.split(' ').collect();
    if parts.len() <= 1 {
        complete_command(parts.first().copied().unwrap_or(""), registry)
    } else {
        complete_path(parts.last().copied().unwrap_or(""), fs)
    }
}

fn complete_command(partial: &str, registry: &CommandRegistry) -> Completion {
    let matches: Vec<&str> = registry
        .names()
        .into_iter()
        .filter(|name| name.starts_with(partial))
        .collect();

    match matches.as_slice() {
        [] => Completion::default(),
        [only] => Completion {
            completed: Some(format!("{} ", only)),
            options: Vec::new(),
        },
        _ => {
            let common = common_prefix(&matches);
            Completion {
                completed: (common != partial).then(|| common.to_string()),
                options: matches.iter().map(|m| m.to_string()).collect(),
            }
        }
    }
}

fn complete_path(partial: &str, fs: &FileSystem) -> Completion {
    let (dir_part, prefix) = match partial.rfind('/') {
        Some(pos) => {
            let dir = &partial[..pos];
            (if dir.is_empty() { "/" } else { dir }, &partial[pos + 1..])
        }
        None => (".", partial),
    };

    let Some(node) = fs.node(dir_part) else {
        return Completion::default();
    };
    let Some(children) = node.children() else {
        return Completion::default();
    };

    let matches: Vec<&crate::models::FsNode> = children
        .values()
        .filter(|child| child.name.starts_with(prefix))
        .collect();
    if matches.is_empty() {
        return Completion::default();
    }

    let base = match partial.rfind('/') {
        Some(pos) => &partial[..=pos],
        None => "",
    };

    if let [only] = matches.as_slice() {
        let suffix = if only.is_dir() { "/" } else { " " };
        return Completion {
            completed: Some(format!("{}{}{}", base, only.name, suffix)),
            options: Vec::new(),
        };
    }

    let names: Vec<&str> = matches.iter().map(|m| m.name.as_str()).collect();
    let common = common_prefix(&names);
    Completion {
        completed: (common != prefix).then(|| format!("{}{}", base, common)),
        options: matches
            .iter()
            .map(|m| {
                if m.is_dir() {
                    format!("{}/", m.name)
                } else {
                    m.name.clone()
                }
            })
            .collect(),
    }
}

fn common_prefix<'a>(strings: &[&'a str]) -> &'a str {
    let Some(&first) = strings.first() else {
        return "";
    };
    let mut prefix = first;
    for s in &strings[1..] {
        while !s.starts_with(prefix) {
            prefix = &prefix[..prefix.len() - 1];
        }
    }
    prefix
}
