//! Host-table codec: the flat `address hostname` line format.
//!
//! ```text
//! <line> ::= <address> SP <hostname> LF
//! ```
//!
//! Parsing is tolerant. Records that do not have exactly two fields are
//! dropped with a warning, and later records win over earlier ones for the
//! same hostname. Serialization writes one line per entry with a trailing
//! newline; line order carries no meaning.

use std::fmt::Write as _;
use tracing::warn;

use crate::HostTable;

/// Result of parsing a hosts blob
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    /// Entries that parsed cleanly
    pub table: HostTable,
    /// Lines dropped for having the wrong shape
    pub rejected: Vec<String>,
}

/// Parse a hosts blob, keeping the rejected lines.
pub fn parse_with_rejects(blob: &str) -> ParsedTable {
    let mut parsed = ParsedTable::default();

    for line in blob.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(address), Some(hostname), None) => {
                parsed.table.insert(hostname, address);
            }
            _ => {
                warn!(line = %line, "unknown format for hosts line");
                parsed.rejected.push(line.to_string());
            }
        }
    }

    parsed
}

/// Parse a hosts blob into a table.
pub fn parse(blob: &str) -> HostTable {
    parse_with_rejects(blob).table
}

/// Serialize a table into a hosts blob.
#[must_use]
pub fn serialize(table: &HostTable) -> String {
    let mut blob = String::new();
    for entry in table.entries() {
        // Writing to a String cannot fail.
        let _ = writeln!(blob, "{entry}");
    }
    blob
}
