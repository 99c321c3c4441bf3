//! Command-line parser: pipe splitting, redirect extraction, tokenizing
//! and flag decomposition.
//!
//! Three passes, in order:
//!
//! 1. **Pipe split** — scan left to right tracking quote state; `|`
//!    outside quotes is a stage boundary.
//! 2. **Redirect extraction** — on the *final* stage only: the first
//!    unquoted `>` (or `>>`) splits command text from the target path.
//!    This is the single redirect rule: a `>` in a non-final stage is an
//!    ordinary token, a quoted `>` anywhere is literal.
//! 3. **Tokenize** — backslash escapes the next character (suspended
//!    inside single quotes), the two quote kinds are mutually exclusive,
//!    unquoted whitespace separates tokens.

use thiserror::Error;

/// Long options kept as positional arguments instead of being parsed as
/// flags, so search-style commands can pair them with their values.
const PASSTHROUGH_OPTIONS: [&str; 5] = ["-name", "-iname", "-type", "-mtime", "-mmin"];

// =============================================================================
// Parsed shapes
// =============================================================================

/// A fully parsed input line.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedCommand {
    Empty,
    Single(Invocation),
    /// Two or more stages; only the last may carry a redirect.
    Pipeline(Vec<Invocation>),
}

impl ParsedCommand {
    pub fn is_empty(&self) -> bool {
        matches!(self, ParsedCommand::Empty)
    }
}

/// One command plus its decomposed arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
    pub flags: Flags,
    /// The stage text this invocation was parsed from.
    pub raw: String,
    pub redirect: Option<Redirect>,
}

/// Output redirection attached to a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    pub mode: RedirectMode,
    pub target: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectMode {
    Overwrite,
    Append,
}

/// Flag value: bare (`-l`) or assigned (`--name=value`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlagValue {
    Set,
    Value(String),
}

/// Parsed flags, in the order they appeared on the line.
///
/// Order matters: value-taking short options (e.g. `usermod -g`) are
/// paired with their positional values by position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Flags {
    entries: Vec<(String, FlagValue)>,
}

impl Flags {
    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Assigned value of a `--name=value` flag, if present.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.entries.iter().find_map(|(n, v)| match v {
            FlagValue::Value(s) if n == name => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: String, value: FlagValue) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }
}

/// Pipeline syntax errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("syntax error near unexpected token '|'")]
    UnexpectedPipe,
    #[error("syntax error: empty pipeline stage")]
    EmptyPipeStage,
    #[error("syntax error: unexpected end of input after '|'")]
    TrailingPipe,
}

// =============================================================================
// Parser
// =============================================================================

/// Parse a raw input line.
pub fn parse(input: &str) -> Result<ParsedCommand, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(ParsedCommand::Empty);
    }

    let segments = split_pipes(trimmed);
    if segments.len() > 1 {
        for (i, segment) in segments.iter().enumerate() {
            if segment.trim().is_empty() {
                return Err(if i == 0 {
                    ParseError::UnexpectedPipe
                } else if i == segments.len() - 1 {
                    ParseError::TrailingPipe
                } else {
                    ParseError::EmptyPipeStage
                });
            }
        }

        let last = segments.len() - 1;
        let mut stages = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let segment = segment.trim();
            if i == last {
                let (text, redirect) = extract_redirect(segment);
                let Some(mut invocation) = parse_single(&text) else {
                    return Err(ParseError::TrailingPipe);
                };
                invocation.redirect = redirect;
                stages.push(invocation);
            } else {
                let Some(invocation) = parse_single(segment) else {
                    return Err(ParseError::EmptyPipeStage);
                };
                stages.push(invocation);
            }
        }
        return Ok(ParsedCommand::Pipeline(stages));
    }

    let (text, redirect) = extract_redirect(trimmed);
    match parse_single(&text) {
        Some(mut invocation) => {
            invocation.redirect = redirect;
            Ok(ParsedCommand::Single(invocation))
        }
        None => Ok(ParsedCommand::Empty),
    }
}

/// Split on unquoted `|`.
fn split_pipes(input: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for c in input.chars() {
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(c);
            }
            '|' if !in_single && !in_double => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Split command text from a trailing redirect at the first unquoted `>`.
fn extract_redirect(input: &str) -> (String, Option<Redirect>) {
    let mut in_single = false;
    let mut in_double = false;

    let chars: Vec<char> = input.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '>' if !in_single && !in_double => {
                let append = chars.get(i + 1) == Some(&'>');
                let target_start = if append { i + 2 } else { i + 1 };
                let target: String = chars[target_start..].iter().collect();
                let command: String = chars[..i].iter().collect();
                return (
                    command.trim().to_string(),
                    Some(Redirect {
                        mode: if append {
                            RedirectMode::Append
                        } else {
                            RedirectMode::Overwrite
                        },
                        target: target.trim().to_string(),
                    }),
                );
            }
            _ => {}
        }
    }
    (input.to_string(), None)
}

/// Parse one stage: tokenize, then decompose flags and positionals.
fn parse_single(input: &str) -> Option<Invocation> {
    let tokens = tokenize(input);
    let (name, rest) = tokens.split_first()?;

    let mut args = Vec::new();
    let mut flags = Flags::default();

    for token in rest {
        if let Some(long) = token.strip_prefix("--") {
            match long.split_once('=') {
                Some((name, value)) => {
                    flags.insert(name.to_string(), FlagValue::Value(value.to_string()));
                }
                None => flags.insert(long.to_string(), FlagValue::Set),
            }
        } else if PASSTHROUGH_OPTIONS.contains(&token.as_str()) {
            args.push(token.clone());
        } else if is_signed_number(token) {
            args.push(token.clone());
        } else if token.starts_with('-') && token.len() > 1 && !token.starts_with("-/") {
            for c in token[1..].chars() {
                flags.insert(c.to_string(), FlagValue::Set);
            }
        } else {
            args.push(token.clone());
        }
    }

    Some(Invocation {
        name: name.clone(),
        args,
        flags,
        raw: input.to_string(),
        redirect: None,
    })
}

/// `-N` tokens are values (for `find -mtime -3`), not flag clusters.
fn is_signed_number(token: &str) -> bool {
    token
        .strip_prefix('-')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Tokenize honoring backslash escapes and the two quote kinds.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut has_token = false;

    for c in input.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if !in_single => escaped = true,
            '\'' if !in_double => {
                in_single = !in_single;
                has_token = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                has_token = true;
            }
            c if c.is_whitespace() && !in_single && !in_double => {
                if has_token || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            _ => current.push(c),
        }
    }
    if has_token || !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
