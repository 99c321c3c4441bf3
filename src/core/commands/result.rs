//! Command execution result type.

use crate::core::editor::EditorRequest;

/// What a command handler hands back to the execution pipeline.
///
/// `output` is plain text; `is_error` drives caller-side styling;
/// `clear` asks the presentation layer to wipe its scrollback;
/// `redirectable` (true by default) marks output that may be captured by
/// `>`/`>>`; `editor` requests opening a line-editor session.
#[derive(Clone, Debug)]
pub struct CommandOutput {
    pub output: String,
    pub is_error: bool,
    pub is_html: bool,
    pub clear: bool,
    pub redirectable: bool,
    pub editor: Option<EditorRequest>,
}

impl Default for CommandOutput {
    fn default() -> Self {
        Self {
            output: String::new(),
            is_error: false,
            is_html: false,
            clear: false,
            redirectable: true,
            editor: None,
        }
    }
}

impl CommandOutput {
    /// No output, no side effects.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Plain text output.
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    /// Error output.
    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: true,
            ..Self::default()
        }
    }

    /// Request a screen clear.
    pub fn clear_screen() -> Self {
        Self {
            clear: true,
            redirectable: false,
            ..Self::default()
        }
    }
}
