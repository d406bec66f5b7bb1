//! Crate-wide error type.
//!
//! Every failure mode of a query is represented here. All of them are fatal
//! to the enclosing query: no error is cached or retried, and each one is
//! reported once, synchronously, with enough context (file, name, candidate
//! lines) to act on.

use std::path::PathBuf;

use smol_str::SmolStr;
use thiserror::Error;

use crate::base::Cursor;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Input text is outside the supported grammar subset.
    #[error("parse error at {cursor}: {message}")]
    Parse { cursor: Cursor, message: String },

    /// A name or target has zero matches in a catalog or binding table.
    #[error("`{name}` not found in {}", file.display())]
    NotFound { name: SmolStr, file: PathBuf },

    /// A name or target has two or more matches.
    #[error("multiple definitions of `{name}` in {}: lines {}", file.display(), format_lines(lines))]
    Ambiguous {
        name: SmolStr,
        file: PathBuf,
        lines: Vec<u32>,
    },

    /// A concrete path lies outside both the workspace root and the
    /// external-repository root.
    #[error("{} is neither under workspace root {} nor under external directory {}",
        path.display(), workspace.display(), external.display())]
    Location {
        path: PathBuf,
        workspace: PathBuf,
        external: PathBuf,
    },

    /// No marker file was found in any ancestor directory.
    #[error("no {markers:?} file found in any ancestor of {}", start.display())]
    MarkerNotFound {
        markers: Vec<String>,
        start: PathBuf,
    },

    /// The external build-tool process failed or produced unusable output.
    #[error("build tool invocation failed: {message}")]
    ToolInvocation { message: String },

    /// A `load()` chain revisited a file that is still being analyzed.
    #[error("load cycle detected while analyzing {}", path.display())]
    LoadCycle { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a parse error at a cursor.
    pub(crate) fn parse(cursor: Cursor, message: impl Into<String>) -> Self {
        Error::Parse {
            cursor,
            message: message.into(),
        }
    }
}

fn format_lines(lines: &[u32]) -> String {
    let parts: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_lists_all_lines() {
        let err = Error::Ambiguous {
            name: SmolStr::new("foo"),
            file: PathBuf::from("/ws/BUILD"),
            lines: vec![3, 9],
        };
        let msg = err.to_string();
        assert!(msg.contains("foo"));
        assert!(msg.contains("3, 9"));
    }

    #[test]
    fn test_parse_message_names_position() {
        let err = Error::parse(Cursor::new(4, 2), "unexpected indent");
        assert_eq!(err.to_string(), "parse error at 4:2: unexpected indent");
    }
}
