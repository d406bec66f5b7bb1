//! Lexing and parsing for the Starlark grammar subset.
//!
//! [`parse`] is the whole public surface: text in, [`ast::Module`] out, with
//! every failure reported as [`crate::error::Error::Parse`] carrying the
//! cursor where recognition stopped.

pub mod ast;
pub mod lexer;
mod parser;

use crate::error::Result;

pub use ast::{LeafAt, LeafId, Module};

/// Parse a module. Any lexical or syntactic problem is fatal.
pub fn parse(text: &str) -> Result<Module> {
    let tokens = lexer::tokenize(text)?;
    parser::Parser::new(tokens).parse_module()
}
