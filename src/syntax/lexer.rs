//! Lexer for the Starlark grammar subset.
//!
//! Token recognition is done with [`logos`]; on top of the raw token stream
//! a layer synthesizes the `NEWLINE` / `INDENT` / `DEDENT` structure that
//! the indentation-sensitive grammar needs. Newlines inside brackets and
//! backslash line continuations do not terminate a logical line; comments
//! and blank lines are invisible to the parser.

use logos::{Lexer, Logos};
use smol_str::SmolStr;
use text_size::TextSize;

use crate::base::{Cursor, LineIndex, Span};
use crate::error::{Error, Result};

#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq)]
#[logos(skip r"[ \t\f]+", skip r"#[^\n]*", skip r"\\\r?\n", skip r"\r")]
enum RawTok {
    #[token("def")]
    Def,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("pass")]
    Pass,
    #[token("not")]
    Not,
    #[token("and")]
    And,
    #[token("or")]
    Or,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+")]
    Int,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    #[token("\"\"\"", lex_triple_double)]
    #[token("'''", lex_triple_single)]
    Str,

    #[token("\n")]
    Newline,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,

    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("//=")]
    SlashSlashAssign,
    #[token("%=")]
    PercentAssign,

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("//")]
    SlashSlash,
    #[token("%")]
    Percent,
}

/// Consume the body and closing delimiter of a triple-quoted string.
fn lex_triple(lex: &mut Lexer<RawTok>, delim: &str) -> bool {
    match lex.remainder().find(delim) {
        Some(idx) => {
            lex.bump(idx + delim.len());
            true
        }
        None => false,
    }
}

fn lex_triple_double(lex: &mut Lexer<RawTok>) -> bool {
    lex_triple(lex, "\"\"\"")
}

fn lex_triple_single(lex: &mut Lexer<RawTok>) -> bool {
    lex_triple(lex, "'''")
}

/// A token produced by [`tokenize`], positioned in cursor coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(SmolStr),
    Int(i64),
    Str(String),

    // Synthesized structure
    Newline,
    Indent,
    Dedent,
    Eof,

    // Keywords
    Def,
    If,
    Elif,
    Else,
    For,
    In,
    Return,
    Break,
    Continue,
    Pass,
    Not,
    And,
    Or,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semi,
    Dot,

    // Assignment operators
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    SlashSlashAssign,
    PercentAssign,

    // Binary and comparison operators
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
}

impl TokenKind {
    /// Short description used in parse error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Ident(_) => "identifier",
            TokenKind::Int(_) => "integer literal",
            TokenKind::Str(_) => "string literal",
            TokenKind::Newline => "end of line",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::Eof => "end of file",
            TokenKind::Def => "`def`",
            TokenKind::If => "`if`",
            TokenKind::Elif => "`elif`",
            TokenKind::Else => "`else`",
            TokenKind::For => "`for`",
            TokenKind::In => "`in`",
            TokenKind::Return => "`return`",
            TokenKind::Break => "`break`",
            TokenKind::Continue => "`continue`",
            TokenKind::Pass => "`pass`",
            TokenKind::Not => "`not`",
            TokenKind::And => "`and`",
            TokenKind::Or => "`or`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::Colon => "`:`",
            TokenKind::Semi => "`;`",
            TokenKind::Dot => "`.`",
            TokenKind::Assign => "`=`",
            TokenKind::PlusAssign => "`+=`",
            TokenKind::MinusAssign => "`-=`",
            TokenKind::StarAssign => "`*=`",
            TokenKind::SlashAssign => "`/=`",
            TokenKind::SlashSlashAssign => "`//=`",
            TokenKind::PercentAssign => "`%=`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::Le => "`<=`",
            TokenKind::Ge => "`>=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::StarStar => "`**`",
            TokenKind::Slash => "`/`",
            TokenKind::SlashSlash => "`//`",
            TokenKind::Percent => "`%`",
        }
    }
}

/// Tokenize `text`, synthesizing `NEWLINE`/`INDENT`/`DEDENT` tokens.
///
/// The returned stream always ends with an `Eof` token, preceded by a final
/// `Newline` and the `Dedent`s needed to close every open block.
pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    let index = LineIndex::new(text);
    let mut lexer = RawTok::lexer(text);
    let mut out = Vec::new();
    let mut indents: Vec<u32> = vec![0];
    let mut bracket_depth = 0usize;
    let mut at_line_start = true;
    let mut started = false;
    let mut last_end = Cursor::new(1, 0);

    while let Some(item) = lexer.next() {
        let range = lexer.span();
        let start = index.cursor(TextSize::from(range.start as u32));
        let end = index.cursor(TextSize::from(range.end as u32));

        let raw = item.map_err(|()| Error::parse(start, "unexpected character"))?;

        if raw == RawTok::Newline {
            if bracket_depth == 0 {
                at_line_start = true;
            }
            continue;
        }

        if at_line_start {
            if started {
                out.push(Token {
                    kind: TokenKind::Newline,
                    span: Span::new(last_end, last_end),
                });
            }
            let col = start.col;
            let current = *indents.last().unwrap_or(&0);
            if col > current {
                if !started {
                    return Err(Error::parse(start, "unexpected indent"));
                }
                indents.push(col);
                out.push(Token {
                    kind: TokenKind::Indent,
                    span: Span::new(start, start),
                });
            } else if col < current {
                while col < *indents.last().unwrap_or(&0) {
                    indents.pop();
                    out.push(Token {
                        kind: TokenKind::Dedent,
                        span: Span::new(start, start),
                    });
                }
                if col != *indents.last().unwrap_or(&0) {
                    return Err(Error::parse(
                        start,
                        "unindent does not match any outer indentation level",
                    ));
                }
            }
            at_line_start = false;
        }
        started = true;

        match raw {
            RawTok::LParen | RawTok::LBracket | RawTok::LBrace => bracket_depth += 1,
            RawTok::RParen | RawTok::RBracket | RawTok::RBrace => {
                bracket_depth = bracket_depth.saturating_sub(1);
            }
            _ => {}
        }

        let kind = convert(raw, lexer.slice(), start)?;
        out.push(Token {
            kind,
            span: Span::new(start, end),
        });
        last_end = end;
    }

    if started {
        out.push(Token {
            kind: TokenKind::Newline,
            span: Span::new(last_end, last_end),
        });
    }
    while indents.len() > 1 {
        indents.pop();
        out.push(Token {
            kind: TokenKind::Dedent,
            span: Span::new(last_end, last_end),
        });
    }
    out.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(last_end, last_end),
    });
    Ok(out)
}

fn convert(raw: RawTok, slice: &str, start: Cursor) -> Result<TokenKind> {
    Ok(match raw {
        RawTok::Ident => TokenKind::Ident(SmolStr::new(slice)),
        RawTok::Int => TokenKind::Int(
            slice
                .parse::<i64>()
                .map_err(|_| Error::parse(start, format!("integer literal `{slice}` out of range")))?,
        ),
        RawTok::Str => TokenKind::Str(decode_string(slice)),
        RawTok::Def => TokenKind::Def,
        RawTok::If => TokenKind::If,
        RawTok::Elif => TokenKind::Elif,
        RawTok::Else => TokenKind::Else,
        RawTok::For => TokenKind::For,
        RawTok::In => TokenKind::In,
        RawTok::Return => TokenKind::Return,
        RawTok::Break => TokenKind::Break,
        RawTok::Continue => TokenKind::Continue,
        RawTok::Pass => TokenKind::Pass,
        RawTok::Not => TokenKind::Not,
        RawTok::And => TokenKind::And,
        RawTok::Or => TokenKind::Or,
        RawTok::LParen => TokenKind::LParen,
        RawTok::RParen => TokenKind::RParen,
        RawTok::LBracket => TokenKind::LBracket,
        RawTok::RBracket => TokenKind::RBracket,
        RawTok::LBrace => TokenKind::LBrace,
        RawTok::RBrace => TokenKind::RBrace,
        RawTok::Comma => TokenKind::Comma,
        RawTok::Colon => TokenKind::Colon,
        RawTok::Semi => TokenKind::Semi,
        RawTok::Dot => TokenKind::Dot,
        RawTok::Assign => TokenKind::Assign,
        RawTok::PlusAssign => TokenKind::PlusAssign,
        RawTok::MinusAssign => TokenKind::MinusAssign,
        RawTok::StarAssign => TokenKind::StarAssign,
        RawTok::SlashAssign => TokenKind::SlashAssign,
        RawTok::SlashSlashAssign => TokenKind::SlashSlashAssign,
        RawTok::PercentAssign => TokenKind::PercentAssign,
        RawTok::EqEq => TokenKind::EqEq,
        RawTok::NotEq => TokenKind::NotEq,
        RawTok::Lt => TokenKind::Lt,
        RawTok::Gt => TokenKind::Gt,
        RawTok::Le => TokenKind::Le,
        RawTok::Ge => TokenKind::Ge,
        RawTok::Plus => TokenKind::Plus,
        RawTok::Minus => TokenKind::Minus,
        RawTok::Star => TokenKind::Star,
        RawTok::StarStar => TokenKind::StarStar,
        RawTok::Slash => TokenKind::Slash,
        RawTok::SlashSlash => TokenKind::SlashSlash,
        RawTok::Percent => TokenKind::Percent,
        RawTok::Newline => TokenKind::Newline,
    })
}

/// Strip quotes and decode backslash escapes.
///
/// Unrecognized escapes keep the backslash, matching the tolerant treatment
/// of the source language.
fn decode_string(slice: &str) -> String {
    let body = if (slice.starts_with("\"\"\"") || slice.starts_with("'''")) && slice.len() >= 6 {
        &slice[3..slice.len() - 3]
    } else {
        &slice[1..slice.len() - 1]
    };
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
