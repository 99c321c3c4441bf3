//! Line-editor session state machine.
//!
//! A minimal modal editor bound to one file path: every input line that is
//! not a meta-command is appended verbatim to the buffer; the filesystem is
//! only touched on `/save`. `/exit` closes unconditionally — unsaved
//! changes are reported and dropped, which is the teaching point.

use crate::core::commands::CommandOutput;
use crate::core::filesystem::FileSystem;
use crate::core::parser::{Flags, Invocation, ParsedCommand};

/// Request to open an editor session, produced by the `nano` handler.
#[derive(Clone, Debug)]
pub struct EditorRequest {
    /// Absolute path the session is bound to.
    pub path: String,
    /// Preloaded content (empty for a new file).
    pub content: String,
}

/// What a fed input line produced.
pub struct EditorReply {
    pub result: CommandOutput,
    /// The session ends after this line.
    pub close: bool,
    /// Synthetic raw input + parsed command for the observer hook
    /// (`/save` and `/exit` only).
    pub observed: Option<(String, ParsedCommand)>,
}

impl EditorReply {
    fn silent() -> Self {
        Self {
            result: CommandOutput::empty(),
            close: false,
            observed: None,
        }
    }

    fn output(result: CommandOutput) -> Self {
        Self {
            result,
            close: false,
            observed: None,
        }
    }
}

/// An open editing session. At most one exists per shell at a time.
#[derive(Clone, Debug)]
pub struct EditorSession {
    path: String,
    buffer: Vec<String>,
    dirty: bool,
}

impl EditorSession {
    pub fn open(request: &EditorRequest) -> Self {
        let buffer = if request.content.is_empty() {
            Vec::new()
        } else {
            request.content.split('\n').map(|l| l.to_string()).collect()
        };
        Self {
            path: request.path.clone(),
            buffer,
            dirty: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Process one line of input while the session is open.
    pub fn handle_line(&mut self, fs: &mut FileSystem, input: &str) -> EditorReply {
        let display = fs.display_path(&self.path);
        match input.trim() {
            "/help" => EditorReply::output(CommandOutput::text(
                "[nano] Commands: /help /show /save /exit",
            )),
            "/show" => {
                if self.buffer.is_empty() {
                    return EditorReply::output(CommandOutput::text("[nano] (empty buffer)"));
                }
                let listing = self
                    .buffer
                    .iter()
                    .enumerate()
                    .map(|(i, line)| format!("{:>3} {}", i + 1, line))
                    .collect::<Vec<_>>()
                    .join("\n");
                EditorReply::output(CommandOutput::text(listing))
            }
            "/save" => {
                let content = self.buffer.join("\n");
                if let Err(err) = fs.write_file(&self.path, &content, false) {
                    return EditorReply::output(CommandOutput::error(err.to_string()));
                }
                self.dirty = false;
                EditorReply {
                    result: CommandOutput::text(format!("[nano] Saved {}", display)),
                    close: false,
                    observed: Some(self.synthetic("--save", &display)),
                }
            }
            "/exit" => {
                let message = if self.dirty {
                    "[nano] Exit without saving."
                } else {
                    "[nano] Exiting nano."
                };
                EditorReply {
                    result: CommandOutput::text(message),
                    close: true,
                    observed: Some(self.synthetic("--exit", &display)),
                }
            }
            meta if meta.starts_with('/') => EditorReply::output(CommandOutput::error(format!(
                "[nano] Unknown command: {}. Use /help.",
                meta
            ))),
            _ => {
                // Ordinary line: appended verbatim (untrimmed).
                self.buffer.push(input.to_string());
                self.dirty = true;
                EditorReply::silent()
            }
        }
    }

    /// Synthetic command so mission observers see editor events in the
    /// same shape as parsed input.
    fn synthetic(&self, action: &str, display: &str) -> (String, ParsedCommand) {
        let raw = format!("nano {} {}", action, display);
        let parsed = ParsedCommand::Single(Invocation {
            name: "nano".to_string(),
            args: vec![action.to_string(), self.path.clone()],
            flags: Flags::default(),
            raw: raw.clone(),
            redirect: None,
        });
        (raw, parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn fs() -> FileSystem {
        FileSystem::new(config::seed_tree())
    }

    fn open(fs: &FileSystem, path: &str) -> EditorSession {
        let abs = fs.resolve(path);
        let content = fs.read_file(&abs).unwrap_or_default();
        EditorSession::open(&EditorRequest { path: abs, content })
    }

    #[test]
    fn test_open_preloads_existing_content() {
        let fs = fs();
        let session = open(&fs, "documents/notes.txt");
        assert!(!session.is_dirty());
        assert!(!session.buffer.is_empty());
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let fs = fs();
        let session = open(&fs, "fresh.txt");
        assert!(session.buffer.is_empty());
    }

    #[test]
    fn test_lines_append_and_mark_dirty() {
        let mut fs = fs();
        let mut session = open(&fs, "fresh.txt");
        let reply = session.handle_line(&mut fs, "first line");
        assert!(reply.result.output.is_empty());
        assert!(!reply.close);
        assert!(reply.observed.is_none());
        session.handle_line(&mut fs, "  indented kept  ");
        assert!(session.is_dirty());
        assert_eq!(session.buffer, vec!["first line", "  indented kept  "]);
    }

    #[test]
    fn test_show_numbers_lines() {
        let mut fs = fs();
        let mut session = open(&fs, "fresh.txt");
        let reply = session.handle_line(&mut fs, "/show");
        assert_eq!(reply.result.output, "[nano] (empty buffer)");
        session.handle_line(&mut fs, "alpha");
        session.handle_line(&mut fs, "beta");
        let reply = session.handle_line(&mut fs, "/show");
        assert_eq!(reply.result.output, "  1 alpha\n  2 beta");
    }

    #[test]
    fn test_save_writes_and_stays_open() {
        let mut fs = fs();
        let mut session = open(&fs, "fresh.txt");
        session.handle_line(&mut fs, "alpha");
        session.handle_line(&mut fs, "beta");
        let reply = session.handle_line(&mut fs, "/save");
        assert!(!reply.close);
        assert!(!session.is_dirty());
        assert!(reply.result.output.contains("Saved"));
        assert!(reply.observed.is_some());
        assert_eq!(fs.read_file("/home/user/fresh.txt").unwrap(), "alpha\nbeta");
    }

    #[test]
    fn test_save_permission_denied_keeps_session() {
        let mut fs = fs();
        let abs = "/etc/hosts".to_string();
        let content = fs.read_file(&abs).unwrap();
        let mut session = EditorSession::open(&EditorRequest { path: abs, content });
        session.handle_line(&mut fs, "sneaky");
        let reply = session.handle_line(&mut fs, "/save");
        assert!(reply.result.is_error);
        assert!(!reply.close);
        assert!(session.is_dirty());
        assert!(!fs.read_file("/etc/hosts").unwrap().contains("sneaky"));
    }

    #[test]
    fn test_exit_reports_unsaved_changes() {
        let mut fs = fs();
        let mut session = open(&fs, "fresh.txt");
        session.handle_line(&mut fs, "never saved");
        let reply = session.handle_line(&mut fs, "/exit");
        assert!(reply.close);
        assert_eq!(reply.result.output, "[nano] Exit without saving.");
        // Data loss on unsaved exit: the file was never created.
        assert!(fs.node("/home/user/fresh.txt").is_none());
    }

    #[test]
    fn test_exit_clean() {
        let mut fs = fs();
        let mut session = open(&fs, "fresh.txt");
        let reply = session.handle_line(&mut fs, "/exit");
        assert_eq!(reply.result.output, "[nano] Exiting nano.");
        assert!(reply.close);
    }

    #[test]
    fn test_unknown_meta_command() {
        let mut fs = fs();
        let mut session = open(&fs, "fresh.txt");
        let reply = session.handle_line(&mut fs, "/wat");
        assert!(reply.result.is_error);
        assert!(reply.result.output.contains("/wat"));
        assert!(session.buffer.is_empty());
    }
}
