//! Wire command construction.
//!
//! A camerad request is an ordered list of ASCII tokens joined by single
//! spaces and terminated by `\n`.  There is no further structure: the first
//! token is the command keyword (`open`, `close`, `load`, `mode`,
//! `basename`, `key`, `getp`, `setp`, `expose`, `native`, `POWERON`,
//! `POWEROFF`) and the rest are its arguments.

use std::fmt;

/// A single broadcast unit: the tokens of one request line.
///
/// The terminating newline is appended by [`Command::to_line`], not stored,
/// so `Display` output is usable in log messages without breaking them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    tokens: Vec<String>,
}

impl Command {
    /// Creates a command from its keyword.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            tokens: vec![keyword.into()],
        }
    }

    /// Appends one argument token.  Any `Display`-able value is accepted,
    /// mirroring the controllers' stringly-typed argument handling.
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.tokens.push(value.to_string());
        self
    }

    /// The command keyword (first token).
    pub fn keyword(&self) -> &str {
        &self.tokens[0]
    }

    /// Formats the full request line, newline included, ready to be written
    /// to a controller socket.
    pub fn to_line(&self) -> String {
        let mut line = self.tokens.join(" ");
        line.push('\n');
        line
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
