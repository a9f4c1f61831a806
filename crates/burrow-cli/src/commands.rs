//! Parsing of REPL input lines.
//!
//! Two families exist: dot-prefixed meta-commands and the fixed
//! `insert`/`select` statement grammar. Parse failures carry exactly
//! the text the protocol reports for them.

use burrow_storage::Row;

/// A dot-prefixed meta-command.
pub enum MetaCommand {
    /// Flush, close, terminate.
    Exit,
    /// Print the fixed layout constants.
    Constants,
    /// Print the diagnostic tree dump.
    Btree,
    /// Anything else starting with a dot.
    Unrecognized(String),
}

impl MetaCommand {
    /// Parses a meta-command line (caller has checked the leading dot).
    pub fn parse(input: &str) -> Self {
        match input {
            ".exit" => Self::Exit,
            ".constants" => Self::Constants,
            ".btree" => Self::Btree,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

/// A prepared statement.
pub enum Statement {
    /// `insert <id> <username> <email>`
    Insert(Row),
    /// `select`
    Select,
}

/// Why a line failed to prepare. `message` yields the exact protocol
/// text.
#[derive(Debug)]
pub enum PrepareError {
    NegativeId,
    StringTooLong,
    SyntaxError,
    Unrecognized(String),
}

impl PrepareError {
    /// The protocol line reported for this failure.
    pub fn message(&self) -> String {
        match self {
            Self::NegativeId => "ID must be positive.".to_string(),
            Self::StringTooLong => "String is too long.".to_string(),
            Self::SyntaxError => "Syntax error. Could not parse statement.".to_string(),
            Self::Unrecognized(line) => {
                format!("Unrecognized keyword at start of '{line}'.")
            }
        }
    }
}

impl Statement {
    /// Parses a statement line.
    ///
    /// The insert grammar takes the first three arguments and ignores
    /// trailing tokens. The id is checked for positivity before the
    /// string columns are checked for length.
    pub fn parse(input: &str) -> Result<Self, PrepareError> {
        let mut parts = input.split_whitespace();
        match parts.next() {
            Some("insert") => {
                let id_str = parts.next().ok_or(PrepareError::SyntaxError)?;
                let username = parts.next().ok_or(PrepareError::SyntaxError)?;
                let email = parts.next().ok_or(PrepareError::SyntaxError)?;

                let id: i64 = id_str.parse().map_err(|_| PrepareError::SyntaxError)?;
                if id <= 0 {
                    return Err(PrepareError::NegativeId);
                }
                let id = u32::try_from(id).map_err(|_| PrepareError::SyntaxError)?;

                let row =
                    Row::new(id, username, email).map_err(|_| PrepareError::StringTooLong)?;
                Ok(Self::Insert(row))
            }
            Some("select") => Ok(Self::Select),
            _ => Err(PrepareError::Unrecognized(input.to_string())),
        }
    }
}
