//! Abstract syntax tree for the Starlark grammar subset.
//!
//! Every node carries a [`Span`] in cursor coordinates. The two leaf kinds
//! that queries can land on, identifiers and string literals, additionally
//! carry a [`LeafId`] so analysis results can be attached to them without a
//! second tree walk.

use smol_str::SmolStr;

use crate::base::{Cursor, Span};

/// Stable id of a locatable leaf within one module.
///
/// Assigned densely by the parser in source order; used as the key of the
/// per-file reference map.
pub type LeafId = u32;

#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Def(DefStmt),
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Pass,
    /// `a = b = value`, or `a += value` when `op` is set (single target).
    Assign {
        targets: Vec<Expr>,
        op: Option<BinOp>,
        value: Expr,
    },
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DefStmt {
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub kind: ParamKind,
    pub name: Ident,
    pub default: Option<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Required,
    WithDefault,
    /// `*args`
    Rest,
    /// `**kwargs`
    KwRest,
}

/// An identifier occurrence. Both definitions and uses are `Ident`s.
#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: SmolStr,
    pub span: Span,
    pub id: LeafId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrLit {
    pub value: String,
    pub span: Span,
    pub id: LeafId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Ident(Ident),
    Str(StrLit),
    Int(i64),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    ListComp {
        elt: Box<Expr>,
        clauses: Vec<CompClause>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Arg>,
    },
    /// `value.attr` — the attribute name itself is not a resolvable leaf.
    Attr {
        value: Box<Expr>,
        attr: SmolStr,
    },
    Index {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        value: Box<Expr>,
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    IfExpr {
        body: Box<Expr>,
        test: Box<Expr>,
        orelse: Box<Expr>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum CompClause {
    For { target: Expr, iter: Expr },
    If(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Positional(Expr),
    /// `name = value` — the keyword name is not a resolvable leaf.
    Keyword { name: SmolStr, value: Expr },
    Star(Expr),
    StarStar(Expr),
}

impl Arg {
    pub fn value(&self) -> &Expr {
        match self {
            Arg::Positional(e) | Arg::Star(e) | Arg::StarStar(e) => e,
            Arg::Keyword { value, .. } => value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    NotIn,
}

/// Result of a cursor lookup: the innermost resolvable leaf at a position.
#[derive(Clone, Copy, Debug)]
pub enum LeafAt<'a> {
    Ident(&'a Ident),
    Str(&'a StrLit),
}

impl<'a> LeafAt<'a> {
    pub fn id(&self) -> LeafId {
        match self {
            LeafAt::Ident(i) => i.id,
            LeafAt::Str(s) => s.id,
        }
    }
}

impl Module {
    /// Find the identifier or string literal containing `cursor`, if any.
    ///
    /// Containment is half-open: a cursor sitting just past the last byte of
    /// a leaf misses it.
    pub fn locate(&self, cursor: Cursor) -> Option<LeafAt<'_>> {
        locate_stmts(&self.stmts, cursor)
    }
}

fn locate_stmts(stmts: &[Stmt], cursor: Cursor) -> Option<LeafAt<'_>> {
    stmts.iter().find_map(|s| locate_stmt(s, cursor))
}

fn locate_stmt(stmt: &Stmt, cursor: Cursor) -> Option<LeafAt<'_>> {
    if !stmt.span.contains(cursor) {
        return None;
    }
    match &stmt.kind {
        StmtKind::Def(def) => locate_ident(&def.name, cursor)
            .or_else(|| {
                def.params.iter().find_map(|p| {
                    locate_ident(&p.name, cursor)
                        .or_else(|| p.default.as_ref().and_then(|d| locate_expr(d, cursor)))
                })
            })
            .or_else(|| locate_stmts(&def.body, cursor)),
        StmtKind::If { test, body, orelse } => locate_expr(test, cursor)
            .or_else(|| locate_stmts(body, cursor))
            .or_else(|| locate_stmts(orelse, cursor)),
        StmtKind::For { target, iter, body } => locate_expr(target, cursor)
            .or_else(|| locate_expr(iter, cursor))
            .or_else(|| locate_stmts(body, cursor)),
        StmtKind::Return(value) => value.as_ref().and_then(|v| locate_expr(v, cursor)),
        StmtKind::Break | StmtKind::Continue | StmtKind::Pass => None,
        StmtKind::Assign { targets, value, .. } => targets
            .iter()
            .find_map(|t| locate_expr(t, cursor))
            .or_else(|| locate_expr(value, cursor)),
        StmtKind::Expr(expr) => locate_expr(expr, cursor),
    }
}

fn locate_ident(ident: &Ident, cursor: Cursor) -> Option<LeafAt<'_>> {
    ident.span.contains(cursor).then_some(LeafAt::Ident(ident))
}

fn locate_expr(expr: &Expr, cursor: Cursor) -> Option<LeafAt<'_>> {
    if !expr.span.contains(cursor) {
        return None;
    }
    match &expr.kind {
        ExprKind::Ident(ident) => Some(LeafAt::Ident(ident)),
        ExprKind::Str(lit) => Some(LeafAt::Str(lit)),
        ExprKind::Int(_) => None,
        ExprKind::List(items) | ExprKind::Tuple(items) => {
            items.iter().find_map(|e| locate_expr(e, cursor))
        }
        ExprKind::Dict(entries) => entries
            .iter()
            .find_map(|(k, v)| locate_expr(k, cursor).or_else(|| locate_expr(v, cursor))),
        ExprKind::ListComp { elt, clauses } => locate_expr(elt, cursor).or_else(|| {
            clauses.iter().find_map(|c| match c {
                CompClause::For { target, iter } => {
                    locate_expr(target, cursor).or_else(|| locate_expr(iter, cursor))
                }
                CompClause::If(cond) => locate_expr(cond, cursor),
            })
        }),
        ExprKind::Call { func, args } => locate_expr(func, cursor)
            .or_else(|| args.iter().find_map(|a| locate_expr(a.value(), cursor))),
        ExprKind::Attr { value, .. } => locate_expr(value, cursor),
        ExprKind::Index { value, index } => {
            locate_expr(value, cursor).or_else(|| locate_expr(index, cursor))
        }
        ExprKind::Slice {
            value,
            lower,
            upper,
            step,
        } => locate_expr(value, cursor)
            .or_else(|| lower.as_deref().and_then(|e| locate_expr(e, cursor)))
            .or_else(|| upper.as_deref().and_then(|e| locate_expr(e, cursor)))
            .or_else(|| step.as_deref().and_then(|e| locate_expr(e, cursor))),
        ExprKind::Unary { operand, .. } => locate_expr(operand, cursor),
        ExprKind::Binary { lhs, rhs, .. } => {
            locate_expr(lhs, cursor).or_else(|| locate_expr(rhs, cursor))
        }
        ExprKind::IfExpr { body, test, orelse } => locate_expr(body, cursor)
            .or_else(|| locate_expr(test, cursor))
            .or_else(|| locate_expr(orelse, cursor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn leaf_name(module: &Module, cursor: Cursor) -> Option<String> {
        module.locate(cursor).map(|leaf| match leaf {
            LeafAt::Ident(i) => i.name.to_string(),
            LeafAt::Str(s) => s.value.clone(),
        })
    }

    #[test]
    fn test_locate_ident_in_assignment() {
        let module = parse("abc = other").unwrap();
        assert_eq!(leaf_name(&module, Cursor::new(1, 0)).as_deref(), Some("abc"));
        assert_eq!(leaf_name(&module, Cursor::new(1, 2)).as_deref(), Some("abc"));
        // half-open: just past the identifier misses it
        assert_eq!(leaf_name(&module, Cursor::new(1, 3)), None);
        assert_eq!(leaf_name(&module, Cursor::new(1, 6)).as_deref(), Some("other"));
    }

    #[test]
    fn test_locate_string_in_call() {
        let module = parse("rule(name = \"lib\", deps = [\"//pkg:dep\"])").unwrap();
        assert_eq!(leaf_name(&module, Cursor::new(1, 13)).as_deref(), Some("lib"));
        assert_eq!(
            leaf_name(&module, Cursor::new(1, 28)).as_deref(),
            Some("//pkg:dep")
        );
    }

    #[test]
    fn test_keyword_name_is_not_a_leaf() {
        let module = parse("rule(name = \"lib\")").unwrap();
        // cursor on `name` itself: keyword names are not resolvable
        assert_eq!(leaf_name(&module, Cursor::new(1, 5)), None);
    }

    #[test]
    fn test_attr_name_is_not_a_leaf() {
        let module = parse("x = obj.field").unwrap();
        assert_eq!(leaf_name(&module, Cursor::new(1, 4)).as_deref(), Some("obj"));
        assert_eq!(leaf_name(&module, Cursor::new(1, 9)), None);
    }

    #[test]
    fn test_locate_inside_nested_block() {
        let module = parse("def f(x):\n    if x:\n        return x\n").unwrap();
        assert_eq!(leaf_name(&module, Cursor::new(3, 15)).as_deref(), Some("x"));
    }

    #[test]
    fn test_locate_miss_between_tokens() {
        let module = parse("x = y").unwrap();
        assert_eq!(leaf_name(&module, Cursor::new(1, 2)), None);
    }
}
