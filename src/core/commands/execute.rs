//! The execution pipeline: one shell session over one world.
//!
//! Routes raw input through the editor session (when one is open), the
//! parser, the dispatcher and pipeline chaining, then applies trailing
//! redirection. Every dispatch returns a [`Dispatch`] record — raw input,
//! parsed command, result — which is the hook mission/progress observers
//! rely on.

use crate::core::commands::{CommandOutput, CommandRegistry, ExecContext};
use crate::core::editor::EditorSession;
use crate::core::filesystem::FileSystem;
use crate::core::parser::{self, Invocation, ParsedCommand, RedirectMode};

/// Record of one executed input line.
#[derive(Clone, Debug)]
pub struct Dispatch {
    pub raw: String,
    pub parsed: ParsedCommand,
    pub result: CommandOutput,
}

/// A shell session: filesystem, registry, input history and the optional
/// line-editor session.
pub struct Shell {
    fs: FileSystem,
    registry: CommandRegistry,
    history: Vec<String>,
    editor: Option<EditorSession>,
}

impl Shell {
    /// Shell over a world with the built-in command sets.
    pub fn new(fs: FileSystem) -> Self {
        Self::with_registry(fs, CommandRegistry::with_defaults())
    }

    /// Shell with a caller-supplied registry.
    pub fn with_registry(fs: FileSystem, registry: CommandRegistry) -> Self {
        Self {
            fs,
            registry,
            history: Vec::new(),
            editor: None,
        }
    }

    pub fn fs(&self) -> &FileSystem {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut FileSystem {
        &mut self.fs
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn in_editor(&self) -> bool {
        self.editor.is_some()
    }

    /// Prompt string for the presentation layer.
    pub fn prompt(&self) -> String {
        if let Some(session) = &self.editor {
            return format!("nano:{}> ", self.fs.display_path(session.path()));
        }
        format!(
            "{}@{}:{}$ ",
            self.fs.username(),
            self.fs.hostname(),
            self.fs.display_path(self.fs.cwd())
        )
    }

    /// Execute one line of input.
    pub fn execute(&mut self, input: &str) -> Dispatch {
        if self.editor.is_some() {
            return self.execute_editor_line(input);
        }

        if input.trim().is_empty() {
            return Dispatch {
                raw: input.to_string(),
                parsed: ParsedCommand::Empty,
                result: CommandOutput::empty(),
            };
        }
        self.history.push(input.to_string());

        let parsed = match parser::parse(input) {
            Ok(parsed) => parsed,
            Err(err) => {
                return Dispatch {
                    raw: input.to_string(),
                    parsed: ParsedCommand::Empty,
                    result: CommandOutput::error(err.to_string()),
                };
            }
        };

        let mut result = match &parsed {
            ParsedCommand::Empty => CommandOutput::empty(),
            ParsedCommand::Single(invocation) => self.run_single(invocation, None),
            ParsedCommand::Pipeline(stages) => self.run_pipeline(stages),
        };

        if let Some(redirect) = trailing_redirect(&parsed) {
            if !result.is_error && result.redirectable {
                result = self.apply_redirect(&redirect.target, redirect.mode, &result.output);
            }
        }

        if !result.is_error {
            if let Some(request) = &result.editor {
                self.editor = Some(EditorSession::open(request));
            }
        }

        Dispatch {
            raw: input.to_string(),
            parsed,
            result,
        }
    }

    fn run_single(&mut self, invocation: &Invocation, stdin: Option<&str>) -> CommandOutput {
        let Some(spec) = self.registry.get(&invocation.name) else {
            return CommandOutput::error(format!(
                "{}: command not found. Type 'help' for available commands.",
                invocation.name
            ));
        };
        let handler = spec.handler;
        let ctx = ExecContext {
            history: &self.history,
            elevated: false,
            registry: &self.registry,
        };
        handler(&mut self.fs, invocation, stdin, &ctx)
    }

    /// Stages run strictly left to right; the first error stops the chain
    /// and becomes the pipeline's result. Later stages never run.
    fn run_pipeline(&mut self, stages: &[Invocation]) -> CommandOutput {
        let mut stdin: Option<String> = None;
        let mut result = CommandOutput::empty();
        for stage in stages {
            result = self.run_single(stage, stdin.as_deref());
            if result.is_error {
                return result;
            }
            stdin = Some(result.output.clone());
        }
        result
    }

    /// Write redirected output through the filesystem. Successful writes
    /// consume the output (nothing is displayed).
    fn apply_redirect(&mut self, target: &str, mode: RedirectMode, output: &str) -> CommandOutput {
        let trimmed = target.trim();
        if trimmed.is_empty() || trimmed.len() > 260 || trimmed.contains('\0') || trimmed.contains('\\')
        {
            return CommandOutput::error("redirection: invalid output path");
        }
        let resolved = self.fs.resolve(trimmed);

        let append = mode == RedirectMode::Append;
        let content = if append {
            format!("\n{}", output)
        } else {
            output.to_string()
        };
        match self.fs.write_file(&resolved, &content, append) {
            Ok(()) => CommandOutput::empty(),
            Err(err) => CommandOutput::error(err.to_string()),
        }
    }

    fn execute_editor_line(&mut self, input: &str) -> Dispatch {
        let mut session = self.editor.take().expect("editor checked by caller");
        let reply = session.handle_line(&mut self.fs, input);
        if !reply.close {
            self.editor = Some(session);
        }
        let (raw, parsed) = reply
            .observed
            .unwrap_or_else(|| (input.to_string(), ParsedCommand::Empty));
        Dispatch {
            raw,
            parsed,
            result: reply.result,
        }
    }
}

fn trailing_redirect(parsed: &ParsedCommand) -> Option<crate::core::parser::Redirect> {
    match parsed {
        ParsedCommand::Single(invocation) => invocation.redirect.clone(),
        ParsedCommand::Pipeline(stages) => stages.last().and_then(|s| s.redirect.clone()),
        ParsedCommand::Empty => None,
    }
}
