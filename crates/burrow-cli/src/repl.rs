//! The line-oriented read-eval-print loop.
//!
//! The loop writes a `db > ` prompt, reads one line, and dispatches it
//! as a meta-command or statement. It is generic over its input and
//! output streams so sessions can be driven from byte buffers in
//! tests.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::debug;

use burrow_storage::{Table, TableError};
use burrow_storage::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS, ROW_SIZE,
};

use crate::commands::{MetaCommand, Statement};

const PROMPT: &str = "db > ";

/// Runs a session to completion.
///
/// Returns once `.exit` is read or the input stream ends, flushing the
/// table in both cases. A storage fault aborts the session without
/// flushing and surfaces as an error.
pub fn run(mut table: Table, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
    let mut line = String::new();
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        line.clear();
        let bytes_read = input.read_line(&mut line).context("reading input")?;
        if bytes_read == 0 {
            // End of input behaves like `.exit` so piped sessions
            // still flush.
            break;
        }
        let trimmed = line.trim();
        debug!(line = trimmed, "dispatching");

        if trimmed.starts_with('.') {
            match MetaCommand::parse(trimmed) {
                MetaCommand::Exit => break,
                MetaCommand::Constants => print_constants(output)?,
                MetaCommand::Btree => {
                    writeln!(output, "Tree:")?;
                    let dump = table.btree_dump().context("dumping tree")?;
                    write!(output, "{dump}")?;
                }
                MetaCommand::Unrecognized(cmd) => {
                    writeln!(output, "Unrecognized command '{cmd}'")?;
                }
            }
            continue;
        }

        let statement = match Statement::parse(trimmed) {
            Ok(statement) => statement,
            Err(err) => {
                writeln!(output, "{}", err.message())?;
                continue;
            }
        };
        execute(&mut table, &statement, output)?;
    }
    table.close().context("flushing table")?;
    Ok(())
}

/// Executes one prepared statement, writing its result lines.
///
/// Recoverable failures become protocol messages and leave the session
/// running. Unrecoverable ones abort the session after writing
/// whatever reply they carry (the unimplemented internal-node split
/// has one, pager faults do not).
fn execute(table: &mut Table, statement: &Statement, output: &mut impl Write) -> Result<()> {
    match statement {
        Statement::Insert(row) => match table.insert(row) {
            Ok(()) => writeln!(output, "Executed.")?,
            Err(err) => {
                if let Some(reply) = insert_reply(&err) {
                    writeln!(output, "{reply}")?;
                }
                if !err.is_recoverable() {
                    output.flush()?;
                    return Err(err).context("executing insert");
                }
            }
        },
        Statement::Select => {
            for row in table.select().context("executing select")? {
                writeln!(output, "{row}")?;
            }
            writeln!(output, "Executed.")?;
        }
    }
    Ok(())
}

/// Protocol reply for a failed insert, if the failure has one. Pager
/// faults produce no reply line; they only end the session.
fn insert_reply(err: &TableError) -> Option<&'static str> {
    match err {
        TableError::InvalidKey => Some("ID must be positive."),
        TableError::StringTooLong { .. } => Some("String is too long."),
        TableError::DuplicateKey => Some("Error: Duplicate key."),
        TableError::TableFull => Some("Error: Table full."),
        TableError::InternalSplitUnsupported => Some("Need to implement splitting internal node"),
        TableError::Pager(_) => None,
    }
}

fn print_constants(output: &mut impl Write) -> Result<()> {
    writeln!(output, "Constants:")?;
    writeln!(output, "ROW_SIZE: {ROW_SIZE}")?;
    writeln!(output, "COMMON_NODE_HEADER_SIZE: {COMMON_NODE_HEADER_SIZE}")?;
    writeln!(output, "LEAF_NODE_HEADER_SIZE: {LEAF_NODE_HEADER_SIZE}")?;
    writeln!(output, "LEAF_NODE_CELL_SIZE: {LEAF_NODE_CELL_SIZE}")?;
    writeln!(output, "LEAF_NODE_SPACE_FOR_CELLS: {LEAF_NODE_SPACE_FOR_CELLS}")?;
    writeln!(output, "LEAF_NODE_MAX_CELLS: {LEAF_NODE_MAX_CELLS}")?;
    Ok(())
}
