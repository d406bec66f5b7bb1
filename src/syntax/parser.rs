//! Recursive-descent parser over the token stream from [`super::lexer`].
//!
//! The grammar is the statement-oriented Starlark subset: `def`, `if`/`elif`/
//! `else`, `for`, `return`, `break`, `continue`, `pass`, assignments
//! (including chained and augmented forms), expression statements, and an
//! expression language with calls, attribute access, subscripts, list/dict
//! literals and list comprehensions. `elif` chains are desugared into nested
//! `if` statements.

use crate::error::{Error, Result};
use crate::syntax::ast::*;
use crate::syntax::lexer::{Token, TokenKind};

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_leaf: LeafId,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            next_leaf: 0,
        }
    }

    pub(crate) fn parse_module(&mut self) -> Result<Module> {
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Module { stmts })
    }

    // ---- token plumbing ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            let tok = self.peek();
            Err(Error::parse(
                tok.span.start,
                format!(
                    "expected {}, found {}",
                    kind.describe(),
                    tok.kind.describe()
                ),
            ))
        }
    }

    fn unexpected<T>(&self, what: &str) -> Result<T> {
        let tok = self.peek();
        Err(Error::parse(
            tok.span.start,
            format!("expected {what}, found {}", tok.kind.describe()),
        ))
    }

    fn fresh_leaf(&mut self) -> LeafId {
        let id = self.next_leaf;
        self.next_leaf += 1;
        id
    }

    fn expect_ident(&mut self) -> Result<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let tok = self.bump();
                Ok(Ident {
                    name,
                    span: tok.span,
                    id: self.fresh_leaf(),
                })
            }
            _ => self.unexpected("identifier"),
        }
    }

    // ---- statements ----

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek_kind() {
            TokenKind::Def => self.parse_def(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            _ => {
                let stmt = self.parse_small_stmt()?;
                // `a = 1; b = 2` on one line is rejected for simplicity.
                if self.at(&TokenKind::Semi) {
                    return self.unexpected("end of line");
                }
                self.expect(&TokenKind::Newline)?;
                Ok(stmt)
            }
        }
    }

    fn parse_small_stmt(&mut self) -> Result<Stmt> {
        let start = self.peek().span;
        match self.peek_kind() {
            TokenKind::Return => {
                self.bump();
                let value = if self.at(&TokenKind::Newline) {
                    None
                } else {
                    Some(self.parse_test_list()?)
                };
                let end = value.as_ref().map_or(start, |v| v.span);
                Ok(Stmt {
                    span: start.cover(end),
                    kind: StmtKind::Return(value),
                })
            }
            TokenKind::Break => {
                self.bump();
                Ok(Stmt {
                    span: start,
                    kind: StmtKind::Break,
                })
            }
            TokenKind::Continue => {
                self.bump();
                Ok(Stmt {
                    span: start,
                    kind: StmtKind::Continue,
                })
            }
            TokenKind::Pass => {
                self.bump();
                Ok(Stmt {
                    span: start,
                    kind: StmtKind::Pass,
                })
            }
            _ => self.parse_assign_or_expr(),
        }
    }

    fn parse_assign_or_expr(&mut self) -> Result<Stmt> {
        let first = self.parse_test_list()?;
        if let Some(op) = self.aug_assign_op() {
            self.bump();
            let value = self.parse_test_list()?;
            let span = first.span.cover(value.span);
            return Ok(Stmt {
                span,
                kind: StmtKind::Assign {
                    targets: vec![first],
                    op: Some(op),
                    value,
                },
            });
        }
        if !self.at(&TokenKind::Assign) {
            return Ok(Stmt {
                span: first.span,
                kind: StmtKind::Expr(first),
            });
        }
        let mut exprs = vec![first];
        while self.eat(&TokenKind::Assign) {
            exprs.push(self.parse_test_list()?);
        }
        let value = exprs.pop().unwrap_or_else(|| unreachable!());
        let span = exprs[0].span.cover(value.span);
        Ok(Stmt {
            span,
            kind: StmtKind::Assign {
                targets: exprs,
                op: None,
                value,
            },
        })
    }

    fn aug_assign_op(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::PlusAssign => Some(BinOp::Add),
            TokenKind::MinusAssign => Some(BinOp::Sub),
            TokenKind::StarAssign => Some(BinOp::Mul),
            TokenKind::SlashAssign => Some(BinOp::Div),
            TokenKind::SlashSlashAssign => Some(BinOp::FloorDiv),
            TokenKind::PercentAssign => Some(BinOp::Mod),
            _ => None,
        }
    }

    fn parse_def(&mut self) -> Result<Stmt> {
        let start = self.expect(&TokenKind::Def)?.span;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_suite()?;
        let end = body.last().map_or(name.span, |s| s.span);
        Ok(Stmt {
            span: start.cover(end),
            kind: StmtKind::Def(DefStmt { name, params, body }),
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        let mut seen_default = false;
        let mut seen_rest = false;
        let mut seen_kw_rest = false;
        while !self.at(&TokenKind::RParen) {
            let at = self.peek().span.start;
            if seen_kw_rest {
                return Err(Error::parse(at, "parameter after **kwargs"));
            }
            let param = if self.eat(&TokenKind::Star) {
                if seen_rest {
                    return Err(Error::parse(at, "multiple *args parameters"));
                }
                if !matches!(self.peek_kind(), TokenKind::Ident(_)) {
                    return Err(Error::parse(at, "bare `*` parameter is not supported"));
                }
                seen_rest = true;
                Param {
                    kind: ParamKind::Rest,
                    name: self.expect_ident()?,
                    default: None,
                }
            } else if self.eat(&TokenKind::StarStar) {
                seen_kw_rest = true;
                Param {
                    kind: ParamKind::KwRest,
                    name: self.expect_ident()?,
                    default: None,
                }
            } else {
                let name = self.expect_ident()?;
                if self.eat(&TokenKind::Assign) {
                    seen_default = true;
                    Param {
                        kind: ParamKind::WithDefault,
                        name,
                        default: Some(self.parse_test()?),
                    }
                } else {
                    if seen_default {
                        return Err(Error::parse(
                            at,
                            "parameter without default follows parameter with default",
                        ));
                    }
                    if seen_rest {
                        return Err(Error::parse(at, "parameter after *args"));
                    }
                    Param {
                        kind: ParamKind::Required,
                        name,
                        default: None,
                    }
                }
            };
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.expect(&TokenKind::If)?.span;
        let test = self.parse_test()?;
        let body = self.parse_suite()?;
        let orelse = if self.at(&TokenKind::Elif) {
            // rewrite `elif ...` as `else: if ...`
            let nested = self.parse_elif()?;
            vec![nested]
        } else if self.eat(&TokenKind::Else) {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        let end = orelse
            .last()
            .or_else(|| body.last())
            .map_or(test.span, |s| s.span);
        Ok(Stmt {
            span: start.cover(end),
            kind: StmtKind::If { test, body, orelse },
        })
    }

    fn parse_elif(&mut self) -> Result<Stmt> {
        let start = self.expect(&TokenKind::Elif)?.span;
        let test = self.parse_test()?;
        let body = self.parse_suite()?;
        let orelse = if self.at(&TokenKind::Elif) {
            vec![self.parse_elif()?]
        } else if self.eat(&TokenKind::Else) {
            self.parse_suite()?
        } else {
            Vec::new()
        };
        let end = orelse
            .last()
            .or_else(|| body.last())
            .map_or(test.span, |s| s.span);
        Ok(Stmt {
            span: start.cover(end),
            kind: StmtKind::If { test, body, orelse },
        })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        let start = self.expect(&TokenKind::For)?.span;
        // `parse_comp_target` stops before `in`, which the comparison
        // parser would otherwise swallow as an operator.
        let target = self.parse_comp_target()?;
        self.expect(&TokenKind::In)?;
        let iter = self.parse_test_list()?;
        let body = self.parse_suite()?;
        let end = body.last().map_or(iter.span, |s| s.span);
        Ok(Stmt {
            span: start.cover(end),
            kind: StmtKind::For { target, iter, body },
        })
    }

    /// `:` followed by either an inline simple statement or an indented block.
    fn parse_suite(&mut self) -> Result<Vec<Stmt>> {
        self.expect(&TokenKind::Colon)?;
        if self.eat(&TokenKind::Newline) {
            self.expect(&TokenKind::Indent)?;
            let mut stmts = Vec::new();
            while !self.eat(&TokenKind::Dedent) {
                stmts.push(self.parse_stmt()?);
            }
            if stmts.is_empty() {
                return self.unexpected("statement");
            }
            Ok(stmts)
        } else {
            let stmt = self.parse_small_stmt()?;
            self.expect(&TokenKind::Newline)?;
            Ok(vec![stmt])
        }
    }

    // ---- expressions ----

    /// `test (',' test)* [',']` — more than one element, or a trailing
    /// comma, yields a tuple.
    fn parse_test_list(&mut self) -> Result<Expr> {
        let first = self.parse_test()?;
        if !self.at(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.test_list_ends() {
                break;
            }
            items.push(self.parse_test()?);
        }
        let span = items[0].span.cover(items.last().map_or(items[0].span, |e| e.span));
        Ok(Expr {
            span,
            kind: ExprKind::Tuple(items),
        })
    }

    fn test_list_ends(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline
                | TokenKind::Assign
                | TokenKind::In
                | TokenKind::Colon
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Eof
        )
    }

    fn parse_test(&mut self) -> Result<Expr> {
        let body = self.parse_or()?;
        if !self.eat(&TokenKind::If) {
            return Ok(body);
        }
        let test = self.parse_or()?;
        self.expect(&TokenKind::Else)?;
        let orelse = self.parse_test()?;
        let span = body.span.cover(orelse.span);
        Ok(Expr {
            span,
            kind: ExprKind::IfExpr {
                body: Box::new(body),
                test: Box::new(test),
                orelse: Box::new(orelse),
            },
        })
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.parse_and()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.parse_not()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.at(&TokenKind::Not) {
            let start = self.bump().span;
            let operand = self.parse_not()?;
            let span = start.cover(operand.span);
            return Ok(Expr {
                span,
                kind: ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_arith()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Ge => BinOp::Ge,
                TokenKind::In => BinOp::In,
                TokenKind::Not => {
                    self.bump();
                    self.expect(&TokenKind::In)?;
                    let rhs = self.parse_arith()?;
                    lhs = binary(BinOp::NotIn, lhs, rhs);
                    continue;
                }
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.parse_arith()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_arith(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.parse_term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::SlashSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.parse_factor()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        let start = self.bump().span;
        let operand = self.parse_factor()?;
        let span = start.cover(operand.span);
        Ok(Expr {
            span,
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_postfix()?;
        if !self.eat(&TokenKind::StarStar) {
            return Ok(base);
        }
        let exp = self.parse_factor()?;
        Ok(binary(BinOp::Pow, base, exp))
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.bump();
                    let args = self.parse_args()?;
                    let close = self.expect(&TokenKind::RParen)?;
                    let span = expr.span.cover(close.span);
                    expr = Expr {
                        span,
                        kind: ExprKind::Call {
                            func: Box::new(expr),
                            args,
                        },
                    };
                }
                TokenKind::LBracket => {
                    self.bump();
                    expr = self.parse_subscript(expr)?;
                }
                TokenKind::Dot => {
                    self.bump();
                    let tok = self.peek().clone();
                    let attr = match tok.kind {
                        TokenKind::Ident(name) => {
                            self.bump();
                            name
                        }
                        _ => return self.unexpected("attribute name"),
                    };
                    let span = expr.span.cover(tok.span);
                    expr = Expr {
                        span,
                        kind: ExprKind::Attr {
                            value: Box::new(expr),
                            attr,
                        },
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>> {
        let mut args = Vec::new();
        while !self.at(&TokenKind::RParen) {
            let arg = if self.eat(&TokenKind::Star) {
                Arg::Star(self.parse_test()?)
            } else if self.eat(&TokenKind::StarStar) {
                Arg::StarStar(self.parse_test()?)
            } else if let TokenKind::Ident(name) = self.peek_kind().clone() {
                if self.tokens[self.pos + 1].kind == TokenKind::Assign {
                    self.bump();
                    self.bump();
                    Arg::Keyword {
                        name,
                        value: self.parse_test()?,
                    }
                } else {
                    Arg::Positional(self.parse_test()?)
                }
            } else {
                Arg::Positional(self.parse_test()?)
            };
            args.push(arg);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    fn parse_subscript(&mut self, value: Expr) -> Result<Expr> {
        let mut lower = None;
        if !self.at(&TokenKind::Colon) {
            let index = self.parse_test()?;
            if !self.at(&TokenKind::Colon) {
                let close = self.expect(&TokenKind::RBracket)?;
                let span = value.span.cover(close.span);
                return Ok(Expr {
                    span,
                    kind: ExprKind::Index {
                        value: Box::new(value),
                        index: Box::new(index),
                    },
                });
            }
            lower = Some(Box::new(index));
        }
        self.expect(&TokenKind::Colon)?;
        let upper = if self.at(&TokenKind::Colon) || self.at(&TokenKind::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_test()?))
        };
        let step = if self.eat(&TokenKind::Colon) && !self.at(&TokenKind::RBracket) {
            Some(Box::new(self.parse_test()?))
        } else {
            None
        };
        let close = self.expect(&TokenKind::RBracket)?;
        let span = value.span.cover(close.span);
        Ok(Expr {
            span,
            kind: ExprKind::Slice {
                value: Box::new(value),
                lower,
                upper,
                step,
            },
        })
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let tok = self.bump();
                let id = self.fresh_leaf();
                Ok(Expr {
                    span: tok.span,
                    kind: ExprKind::Ident(Ident {
                        name,
                        span: tok.span,
                        id,
                    }),
                })
            }
            TokenKind::Int(value) => {
                let tok = self.bump();
                Ok(Expr {
                    span: tok.span,
                    kind: ExprKind::Int(value),
                })
            }
            TokenKind::Str(value) => {
                let tok = self.bump();
                let id = self.fresh_leaf();
                Ok(Expr {
                    span: tok.span,
                    kind: ExprKind::Str(StrLit {
                        value,
                        span: tok.span,
                        id,
                    }),
                })
            }
            TokenKind::LParen => self.parse_paren(),
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_dict(),
            _ => self.unexpected("expression"),
        }
    }

    fn parse_paren(&mut self) -> Result<Expr> {
        let open = self.expect(&TokenKind::LParen)?.span;
        if self.at(&TokenKind::RParen) {
            let close = self.bump().span;
            return Ok(Expr {
                span: open.cover(close),
                kind: ExprKind::Tuple(Vec::new()),
            });
        }
        let first = self.parse_test()?;
        if self.at(&TokenKind::For) {
            return self.unexpected("`)` or `,`");
        }
        if !self.at(&TokenKind::Comma) {
            self.expect(&TokenKind::RParen)?;
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::RParen) {
                break;
            }
            items.push(self.parse_test()?);
        }
        let close = self.expect(&TokenKind::RParen)?.span;
        Ok(Expr {
            span: open.cover(close),
            kind: ExprKind::Tuple(items),
        })
    }

    fn parse_list(&mut self) -> Result<Expr> {
        let open = self.expect(&TokenKind::LBracket)?.span;
        if self.at(&TokenKind::RBracket) {
            let close = self.bump().span;
            return Ok(Expr {
                span: open.cover(close),
                kind: ExprKind::List(Vec::new()),
            });
        }
        let first = self.parse_test()?;
        if self.at(&TokenKind::For) {
            let clauses = self.parse_comp_clauses()?;
            let close = self.expect(&TokenKind::RBracket)?.span;
            return Ok(Expr {
                span: open.cover(close),
                kind: ExprKind::ListComp {
                    elt: Box::new(first),
                    clauses,
                },
            });
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_test()?);
        }
        let close = self.expect(&TokenKind::RBracket)?.span;
        Ok(Expr {
            span: open.cover(close),
            kind: ExprKind::List(items),
        })
    }

    fn parse_comp_clauses(&mut self) -> Result<Vec<CompClause>> {
        let mut clauses = Vec::new();
        loop {
            if self.eat(&TokenKind::For) {
                let target = self.parse_comp_target()?;
                self.expect(&TokenKind::In)?;
                let iter = self.parse_or()?;
                clauses.push(CompClause::For { target, iter });
            } else if self.eat(&TokenKind::If) {
                clauses.push(CompClause::If(self.parse_or()?));
            } else {
                return Ok(clauses);
            }
        }
    }

    /// Comprehension target: `x` or `x, y` (no trailing comma handling
    /// needed before `in`).
    fn parse_comp_target(&mut self) -> Result<Expr> {
        let first = self.parse_postfix()?;
        if !self.at(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::In) {
                break;
            }
            items.push(self.parse_postfix()?);
        }
        let span = items[0].span.cover(items.last().map_or(items[0].span, |e| e.span));
        Ok(Expr {
            span,
            kind: ExprKind::Tuple(items),
        })
    }

    fn parse_dict(&mut self) -> Result<Expr> {
        let open = self.expect(&TokenKind::LBrace)?.span;
        if self.at(&TokenKind::RBrace) {
            let close = self.bump().span;
            return Ok(Expr {
                span: open.cover(close),
                kind: ExprKind::Dict(Vec::new()),
            });
        }
        let mut entries = Vec::new();
        loop {
            let key = self.parse_test()?;
            self.expect(&TokenKind::Colon)?;
            let val = self.parse_test()?;
            if self.at(&TokenKind::For) {
                let tok = self.peek();
                return Err(Error::parse(
                    tok.span.start,
                    "dict comprehensions are not supported",
                ));
            }
            entries.push((key, val));
            if !self.eat(&TokenKind::Comma) || self.at(&TokenKind::RBrace) {
                break;
            }
        }
        let close = self.expect(&TokenKind::RBrace)?.span;
        Ok(Expr {
            span: open.cover(close),
            kind: ExprKind::Dict(entries),
        })
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = lhs.span.cover(rhs.span);
    Expr {
        span,
        kind: ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn single(text: &str) -> StmtKind {
        let module = parse(text).unwrap();
        assert_eq!(module.stmts.len(), 1, "expected one statement");
        module.stmts.into_iter().next().map(|s| s.kind).unwrap()
    }

    #[test]
    fn test_assignment() {
        match single("x = 1") {
            StmtKind::Assign { targets, op, value } => {
                assert_eq!(targets.len(), 1);
                assert!(op.is_none());
                assert!(matches!(value.kind, ExprKind::Int(1)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_chained_assignment() {
        match single("a = b = 1") {
            StmtKind::Assign { targets, op, .. } => {
                assert_eq!(targets.len(), 2);
                assert!(op.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_augmented_assignment() {
        match single("deps += [\"extra\"]") {
            StmtKind::Assign { targets, op, .. } => {
                assert_eq!(targets.len(), 1);
                assert_eq!(op, Some(BinOp::Add));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_def_with_parameters() {
        match single("def impl(ctx, name = \"x\", *args, **kwargs):\n    pass\n") {
            StmtKind::Def(def) => {
                assert_eq!(def.name.name, "impl");
                let kinds: Vec<_> = def.params.iter().map(|p| p.kind).collect();
                assert_eq!(
                    kinds,
                    vec![
                        ParamKind::Required,
                        ParamKind::WithDefault,
                        ParamKind::Rest,
                        ParamKind::KwRest,
                    ]
                );
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_required_after_default_is_rejected() {
        assert!(parse("def f(a = 1, b):\n    pass\n").is_err());
    }

    #[test]
    fn test_bare_star_is_rejected() {
        assert!(parse("def f(a, *, b):\n    pass\n").is_err());
    }

    #[test]
    fn test_elif_desugars_to_nested_if() {
        let kind = single("if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n");
        match kind {
            StmtKind::If { orelse, .. } => {
                assert_eq!(orelse.len(), 1);
                match &orelse[0].kind {
                    StmtKind::If { orelse: inner, .. } => assert_eq!(inner.len(), 1),
                    other => panic!("unexpected: {other:?}"),
                }
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_for_with_tuple_target() {
        match single("for k, v in items:\n    pass\n") {
            StmtKind::For { target, .. } => {
                assert!(matches!(target.kind, ExprKind::Tuple(ref t) if t.len() == 2));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_call_argument_forms() {
        match single("f(1, name = \"x\", *rest, **kw)") {
            StmtKind::Expr(expr) => match expr.kind {
                ExprKind::Call { args, .. } => {
                    assert!(matches!(args[0], Arg::Positional(_)));
                    assert!(matches!(args[1], Arg::Keyword { ref name, .. } if name == "name"));
                    assert!(matches!(args[2], Arg::Star(_)));
                    assert!(matches!(args[3], Arg::StarStar(_)));
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_list_comprehension() {
        match single("[x for x in deps if x]") {
            StmtKind::Expr(expr) => match expr.kind {
                ExprKind::ListComp { clauses, .. } => {
                    assert_eq!(clauses.len(), 2);
                    assert!(matches!(clauses[0], CompClause::For { .. }));
                    assert!(matches!(clauses[1], CompClause::If(_)));
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_dict_comprehension_is_rejected() {
        assert!(parse("{k: v for k in deps}").is_err());
    }

    #[test]
    fn test_trailing_comma_call() {
        assert!(parse("f(\n    \"a\",\n    \"b\",\n)").is_ok());
    }

    #[test]
    fn test_slice_forms() {
        assert!(parse("x = a[1]").is_ok());
        assert!(parse("x = a[1:2]").is_ok());
        assert!(parse("x = a[1:2:3]").is_ok());
        assert!(parse("x = a[:2]").is_ok());
        assert!(parse("x = a[1:]").is_ok());
    }

    #[test]
    fn test_inline_suite() {
        match single("if x: return x\n") {
            StmtKind::If { body, .. } => assert_eq!(body.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_operator_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match single("x = 1 + 2 * 3") {
            StmtKind::Assign { value, .. } => match value.kind {
                ExprKind::Binary { op: BinOp::Add, rhs, .. } => {
                    assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("unexpected: {other:?}"),
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_conditional_expression() {
        match single("x = a if cond else b") {
            StmtKind::Assign { value, .. } => {
                assert!(matches!(value.kind, ExprKind::IfExpr { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_carries_cursor() {
        let err = parse("x = = 1").unwrap_err();
        match err {
            crate::error::Error::Parse { cursor, .. } => {
                assert_eq!(cursor.row, 1);
                assert_eq!(cursor.col, 4);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
