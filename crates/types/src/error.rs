//! Error types for membership document parsing using snafu.
//!
//! Every variant carries the 1-based line number and the verbatim line text
//! of the first malformed record, so a rejected document can be diagnosed
//! from the log line alone.

use std::{num::ParseIntError, str::Utf8Error};

use snafu::Snafu;

/// Result type for membership parsing.
pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// A malformed record in a membership document.
///
/// Parsing stops at the first malformed record. A caller receiving this
/// error must treat the whole document as unusable and keep its previous
/// state.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ParseError {
    /// A `server.` or `version=` record is not valid UTF-8.
    #[snafu(display("unable to parse membership line {line}: {source}\n\t{text:?}"))]
    InvalidUtf8 {
        /// 1-based line number.
        line: usize,
        /// Offending line with invalid sequences replaced, for display.
        text: String,
        /// Offending line, verbatim.
        bytes: Vec<u8>,
        /// Underlying decoding error.
        source: Utf8Error,
    },

    /// The `version=` value is not a base-16 integer.
    #[snafu(display("unable to parse membership line {line}: invalid version: {source}\n\t{text:?}"))]
    InvalidVersion {
        /// 1-based line number.
        line: usize,
        /// Offending line, verbatim.
        text: String,
        /// Underlying integer parse error.
        source: ParseIntError,
    },

    /// A `server.` record did not split into exactly seven fields.
    #[snafu(display("unable to parse membership line {line}: found {found} of 7 fields\n\t{text:?}"))]
    FieldCount {
        /// 1-based line number.
        line: usize,
        /// Offending line, verbatim.
        text: String,
        /// Number of fields actually found.
        found: usize,
    },

    /// A numeric field of a `server.` record is not a number.
    #[snafu(display(
        "unable to parse membership line {line}: invalid {field} {value:?}: {source}\n\t{text:?}"
    ))]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// Offending line, verbatim.
        text: String,
        /// Name of the field that failed.
        field: &'static str,
        /// Raw field value.
        value: String,
        /// Underlying integer parse error.
        source: ParseIntError,
    },

    /// The role of a `server.` record is neither `participant` nor `observer`.
    #[snafu(display("unable to parse membership line {line}: unknown server role {role:?}\n\t{text:?}"))]
    UnknownRole {
        /// 1-based line number.
        line: usize,
        /// Offending line, verbatim.
        text: String,
        /// Raw role value.
        role: String,
    },
}

/// A role name other than `participant` or `observer`.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("unknown server role {role:?}"))]
pub struct UnknownServerRole {
    /// Raw role value.
    pub role: String,
}

impl ParseError {
    /// Returns the 1-based line number of the malformed record.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::InvalidUtf8 { line, .. }
            | Self::InvalidVersion { line, .. }
            | Self::FieldCount { line, .. }
            | Self::InvalidNumber { line, .. }
            | Self::UnknownRole { line, .. } => *line,
        }
    }

    /// Returns the malformed record exactly as it appeared in the input.
    ///
    /// For [`InvalidUtf8`](Self::InvalidUtf8) this is a lossy rendering;
    /// the verbatim bytes are in its `bytes` field.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::InvalidUtf8 { text, .. }
            | Self::InvalidVersion { text, .. }
            | Self::FieldCount { text, .. }
            | Self::InvalidNumber { text, .. }
            | Self::UnknownRole { text, .. } => text,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_cover_every_variant() {
        let errors = [
            ParseError::InvalidUtf8 {
                line: 0,
                text: "server.\u{FFFD}".to_owned(),
                bytes: b"server.\xff".to_vec(),
                source: std::str::from_utf8(b"server.\xff").unwrap_err(),
            },
            ParseError::InvalidVersion {
                line: 1,
                text: "version=zz".to_owned(),
                source: "zz".parse::<i64>().unwrap_err(),
            },
            ParseError::FieldCount { line: 2, text: "server.1=a".to_owned(), found: 2 },
            ParseError::InvalidNumber {
                line: 3,
                text: "server.x=...".to_owned(),
                field: "id",
                value: "x".to_owned(),
                source: "x".parse::<u64>().unwrap_err(),
            },
            ParseError::UnknownRole { line: 4, text: "server.1=...".to_owned(), role: "leader".to_owned() },
        ];

        let lines: Vec<usize> = errors.iter().map(ParseError::line).collect();
        assert_eq!(lines, vec![0, 1, 2, 3, 4]);
        assert_eq!(errors[2].text(), "server.1=a");
    }

    #[test]
    fn test_display_includes_line_and_text() {
        let err = ParseError::FieldCount { line: 7, text: "server.1=a:b".to_owned(), found: 3 };
        let message = err.to_string();
        assert!(message.contains("line 7"));
        assert!(message.contains("found 3 of 7 fields"));
        assert!(message.contains("\"server.1=a:b\""));
    }
}
