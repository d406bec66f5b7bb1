//! Foundation types for the starloc analysis engine.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`Cursor`] - A row/column position in source text
//! - [`Span`] - A half-open cursor range
//! - [`LineIndex`] - Byte-offset to row/column conversion
//!
//! This module has NO dependencies on other starloc modules.

mod span;

pub use span::{Cursor, LineIndex, Span};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};
