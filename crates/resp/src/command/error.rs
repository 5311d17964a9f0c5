//! Command parsing error types

use std::fmt;

/// Kind of command parsing failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorKind {
    EmptyCommand,
    UnknownCommand,
    WrongArity,
    InvalidArgument,
    InvalidFormat,
    SyntaxError,
}

/// Command parsing error
///
/// `Display` renders the full wire error text after the `-` marker, so the
/// dispatcher can reply with `RespValue::error(err.to_string())` directly.
#[derive(Debug, Clone)]
pub struct CommandError {
    kind: CommandErrorKind,
    message: String,
}

impl CommandError {
    pub fn new(kind: CommandErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_command() -> Self {
        Self::new(CommandErrorKind::UnknownCommand, "unknown command")
    }

    pub fn wrong_arity(cmd: &str) -> Self {
        Self::new(
            CommandErrorKind::WrongArity,
            format!("wrong number of arguments for '{}' command", cmd),
        )
    }

    pub fn kind(&self) -> CommandErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERR {}", self.message)
    }
}

impl std::error::Error for CommandError {}
