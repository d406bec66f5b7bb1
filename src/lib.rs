//! starloc — label resolution and go-to-definition for Bazel build files.
//!
//! The crate answers one question: given a cursor position in a `BUILD`,
//! `.bzl` or `WORKSPACE` file, where is the definition of the thing under
//! the cursor? Everything else exists in service of that query.
//!
//! # Architecture
//!
//! - [`base`]: cursor coordinates, spans, line index.
//! - [`label`]: the `@repository//package:target` label algebra and its
//!   resolution to and from filesystem paths.
//! - [`workspace`]: marker-file discovery for package and workspace roots,
//!   and the external-repository directory obtained from the build tool.
//! - [`syntax`]: lexer and parser for the supported Starlark subset.
//! - [`hir`]: target catalogs, scope-aware binding environments, and the
//!   reference analysis that resolves `load()` chains.
//! - [`ide`]: the [`ide::Analysis`] façade tying it all together.
//!
//! # Query model
//!
//! Queries are stateless: each one re-reads and re-analyzes every file it
//! touches, so results always reflect the filesystem as it is now. The only
//! within-query caches are the external-directory lookup (one build-tool
//! invocation at most) and the extension memo that makes diamond-shaped
//! `load()` graphs cheap and cycles detectable.
//!
//! # Coordinates
//!
//! All positions are a [`base::Cursor`]: 1-based row, 0-based byte column.
//! Spans are half-open.

pub mod base;
pub mod error;
pub mod hir;
pub mod ide;
pub mod label;
pub mod syntax;
pub mod workspace;

pub use base::Cursor;
pub use error::{Error, Result};
pub use ide::{Analysis, NavTarget};
pub use label::Label;
