//! Scope-aware reference analysis.
//!
//! One [`Analyzer`] lives for one query. It walks a module, maintains the
//! [`Bindings`] chain per the scoping rules (define-on-first-write, function
//! bodies snapshot their enclosing scope, `if`/`for` introduce no scope,
//! comprehensions do), resolves `load()` statements recursively, and leaves
//! behind a [`Reference`] for every identifier leaf and every `load()`
//! string leaf.
//!
//! Extension files are analyzed at most once per query, keyed by resolved
//! path; re-entering a file that is still mid-analysis is a load cycle and
//! fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::base::Cursor;
use crate::error::{Error, Result};
use crate::hir::catalog::TargetCatalog;
use crate::hir::env::{is_builtin, Bindings, Reference};
use crate::label::{self, Label};
use crate::syntax::ast::{
    Arg, CompClause, DefStmt, Expr, ExprKind, Module, Stmt, StmtKind, StrLit,
};
use crate::syntax::{self, LeafId};
use crate::workspace::WorkspaceEnv;

/// Everything a query needs to answer cursor lookups against one file.
#[derive(Debug)]
pub struct FileAnalysis {
    pub module: Module,
    pub label: Label,
    pub refs: FxHashMap<LeafId, Reference>,
}

/// What a loaded extension exports: its global bindings after analysis,
/// plus its catalog for position and duplicate reporting.
struct ExtensionExports {
    label: Label,
    path: PathBuf,
    globals: Bindings,
    catalog: TargetCatalog,
}

enum LoadSlot {
    InProgress,
    Done(Arc<ExtensionExports>),
}

pub struct Analyzer<'a> {
    ws: &'a WorkspaceEnv,
    loaded: FxHashMap<PathBuf, LoadSlot>,
}

/// Per-file context threaded through the walk.
struct FileCtx<'a> {
    label: &'a Label,
    path: &'a Path,
    /// Canonical label string → reference, for eager string resolution.
    targets: &'a FxHashMap<SmolStr, Reference>,
}

/// The label table a file's string literals resolve against: the file's own
/// catalog plus the visibility builtins, keyed by canonical label text.
///
/// Names the catalog holds more than once are left out, so a query on one
/// of them falls through to the strict lookup and reports the ambiguity.
fn label_table(label: &Label, catalog: &TargetCatalog) -> FxHashMap<SmolStr, Reference> {
    let mut table = FxHashMap::default();
    for text in ["//visibility:public", "//visibility:private"] {
        if let Ok(builtin) = Label::parse(text, label) {
            table.insert(SmolStr::new(builtin.to_string()), Reference::Builtin);
        }
    }
    for entry in catalog.entries() {
        if catalog.lines_of(&entry.name).len() != 1 {
            continue;
        }
        table.insert(
            SmolStr::new(label.with_target(entry.name.clone()).to_string()),
            Reference::Defined {
                label: label.clone(),
                cursor: Cursor::new(entry.line, 0),
            },
        );
    }
    table
}

impl<'a> Analyzer<'a> {
    pub fn new(ws: &'a WorkspaceEnv) -> Self {
        Analyzer {
            ws,
            loaded: FxHashMap::default(),
        }
    }

    /// Parse and analyze `text` as the contents of `path`.
    pub fn analyze_source(&mut self, path: &Path, text: &str) -> Result<FileAnalysis> {
        let label = label::resolve_filename(path, self.ws)?;
        debug!(%label, "analyzing source");
        let module = syntax::parse(text)?;
        let targets = label_table(&label, &TargetCatalog::scan(&module));
        let mut globals = Bindings::default();
        let mut refs = FxHashMap::default();
        let ctx = FileCtx {
            label: &label,
            path,
            targets: &targets,
        };
        self.walk_stmts(&module.stmts, &mut globals, &ctx, &mut refs)?;
        Ok(FileAnalysis {
            module,
            label,
            refs,
        })
    }

    // ---- statements ----

    fn walk_stmts(
        &mut self,
        stmts: &[Stmt],
        env: &mut Bindings,
        ctx: &FileCtx<'_>,
        refs: &mut FxHashMap<LeafId, Reference>,
    ) -> Result<()> {
        for stmt in stmts {
            self.walk_stmt(stmt, env, ctx, refs)?;
        }
        Ok(())
    }

    fn walk_stmt(
        &mut self,
        stmt: &Stmt,
        env: &mut Bindings,
        ctx: &FileCtx<'_>,
        refs: &mut FxHashMap<LeafId, Reference>,
    ) -> Result<()> {
        match &stmt.kind {
            StmtKind::Def(def) => self.walk_def(def, env, ctx, refs),
            StmtKind::If { test, body, orelse } => {
                // no new scope
                self.walk_expr(test, env, ctx, refs)?;
                self.walk_stmts(body, env, ctx, refs)?;
                self.walk_stmts(orelse, env, ctx, refs)
            }
            StmtKind::For { target, iter, body } => {
                // no new scope; the target binds before the iterable is
                // read, so `for x in x` resolves the iterable to the target
                self.rebind_target(target, env, ctx, refs)?;
                self.walk_expr(iter, env, ctx, refs)?;
                self.walk_stmts(body, env, ctx, refs)
            }
            StmtKind::Return(value) => match value {
                Some(v) => self.walk_expr(v, env, ctx, refs),
                None => Ok(()),
            },
            StmtKind::Break | StmtKind::Continue | StmtKind::Pass => Ok(()),
            StmtKind::Assign {
                targets,
                op: None,
                value,
            } => {
                // the catalog scan tolerates `a = b = c`; the scope model
                // does not
                if targets.len() > 1 {
                    return Err(Error::parse(
                        stmt.span.start,
                        "chained assignment is not supported",
                    ));
                }
                self.walk_expr(value, env, ctx, refs)?;
                for target in targets {
                    self.bind_target(target, env, ctx, refs)?;
                }
                Ok(())
            }
            StmtKind::Assign {
                targets,
                op: Some(_),
                value,
            } => {
                self.walk_expr(value, env, ctx, refs)?;
                for target in targets {
                    self.walk_aug_target(target, env, ctx, refs)?;
                }
                Ok(())
            }
            StmtKind::Expr(expr) => {
                if let ExprKind::Call { func, args } = &expr.kind {
                    if let ExprKind::Ident(ident) = &func.kind {
                        if ident.name == "load" {
                            refs.insert(ident.id, Reference::Builtin);
                            return self.walk_load(expr.span.start, args, env, ctx, refs);
                        }
                    }
                }
                self.walk_expr(expr, env, ctx, refs)
            }
        }
    }

    fn walk_def(
        &mut self,
        def: &DefStmt,
        env: &mut Bindings,
        ctx: &FileCtx<'_>,
        refs: &mut FxHashMap<LeafId, Reference>,
    ) -> Result<()> {
        // defaults are evaluated in the enclosing scope
        for param in &def.params {
            if let Some(default) = &param.default {
                self.walk_expr(default, env, ctx, refs)?;
            }
        }
        let mut body_env = env.child();
        for param in &def.params {
            let reference = Reference::Defined {
                label: ctx.label.clone(),
                cursor: param.name.span.start,
            };
            refs.insert(param.name.id, reference.clone());
            body_env.insert(param.name.name.clone(), reference);
        }
        self.walk_stmts(&def.body, &mut body_env, ctx, refs)?;
        // the function name becomes visible after its body, so the body
        // snapshot excludes it and self-recursion does not resolve
        let reference = Reference::Defined {
            label: ctx.label.clone(),
            cursor: def.name.span.start,
        };
        refs.insert(def.name.id, reference.clone());
        env.insert(def.name.name.clone(), reference);
        Ok(())
    }

    /// Bind a plain-assignment target. A name binds only the first time it
    /// is written in a file; later writes resolve to that first binding.
    /// The exception is a name imported by `load()`, which a later global
    /// definition replaces. Tuples and lists destructure, anything else is
    /// a read.
    fn bind_target(
        &mut self,
        target: &Expr,
        env: &mut Bindings,
        ctx: &FileCtx<'_>,
        refs: &mut FxHashMap<LeafId, Reference>,
    ) -> Result<()> {
        self.bind_target_inner(target, env, ctx, refs, false)
    }

    /// Bind a `for` or comprehension target, replacing any prior binding.
    fn rebind_target(
        &mut self,
        target: &Expr,
        env: &mut Bindings,
        ctx: &FileCtx<'_>,
        refs: &mut FxHashMap<LeafId, Reference>,
    ) -> Result<()> {
        self.bind_target_inner(target, env, ctx, refs, true)
    }

    fn bind_target_inner(
        &mut self,
        target: &Expr,
        env: &mut Bindings,
        ctx: &FileCtx<'_>,
        refs: &mut FxHashMap<LeafId, Reference>,
        overwrite: bool,
    ) -> Result<()> {
        match &target.kind {
            ExprKind::Ident(ident) => {
                if !overwrite {
                    if let Some(existing) = env.get(&ident.name) {
                        let same_file = matches!(
                            existing,
                            Reference::Defined { label, .. } if *label == *ctx.label
                        );
                        // a load import does not pin the name; the later
                        // global wins
                        if same_file {
                            trace!(name = %ident.name, "rewrite of existing binding");
                            refs.insert(ident.id, existing.clone());
                            return Ok(());
                        }
                    }
                }
                let reference = Reference::Defined {
                    label: ctx.label.clone(),
                    cursor: ident.span.start,
                };
                trace!(name = %ident.name, row = ident.span.start.row, "bind");
                refs.insert(ident.id, reference.clone());
                env.insert(ident.name.clone(), reference);
                Ok(())
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                for item in items {
                    self.bind_target_inner(item, env, ctx, refs, overwrite)?;
                }
                Ok(())
            }
            // `x[0] = v` and `x.f = v` read their base
            _ => self.walk_expr(target, env, ctx, refs),
        }
    }

    /// An augmented assignment reads its target; the name must already be
    /// bound or builtin.
    fn walk_aug_target(
        &mut self,
        target: &Expr,
        env: &mut Bindings,
        ctx: &FileCtx<'_>,
        refs: &mut FxHashMap<LeafId, Reference>,
    ) -> Result<()> {
        if let ExprKind::Ident(ident) = &target.kind {
            if env.get(&ident.name).is_none() && !is_builtin(&ident.name) {
                return Err(Error::NotFound {
                    name: ident.name.clone(),
                    file: ctx.path.to_path_buf(),
                });
            }
        }
        self.walk_expr(target, env, ctx, refs)
    }

    // ---- load() ----

    fn walk_load(
        &mut self,
        at: Cursor,
        args: &[Arg],
        env: &mut Bindings,
        ctx: &FileCtx<'_>,
        refs: &mut FxHashMap<LeafId, Reference>,
    ) -> Result<()> {
        let Some((module_arg, symbols)) = args.split_first() else {
            return Err(Error::parse(at, "load() requires a module argument"));
        };
        let module_lit = match module_arg {
            Arg::Positional(expr) => expect_str_expr(expr, "load() module")?,
            Arg::Keyword { value, .. } => {
                return Err(Error::parse(
                    value.span.start,
                    "load() module must be positional",
                ));
            }
            Arg::Star(expr) | Arg::StarStar(expr) => {
                return Err(Error::parse(
                    expr.span.start,
                    "load() does not accept starred arguments",
                ));
            }
        };
        let module_label = Label::parse(&module_lit.value, ctx.label)?;
        let module_path = label::resolve_label(&module_label, self.ws)?;
        let exports = self.load_extension(&module_path)?;
        refs.insert(
            module_lit.id,
            Reference::Defined {
                label: exports.label.clone(),
                cursor: Cursor::new(1, 0),
            },
        );
        for arg in symbols {
            let (local, lit) = match arg {
                Arg::Positional(expr) => {
                    let lit = expect_str_expr(expr, "load() symbol")?;
                    (SmolStr::new(&lit.value), lit)
                }
                Arg::Keyword { name, value } => {
                    // `alias = "original"` binds the alias locally
                    let lit = expect_str_expr(value, "load() symbol")?;
                    (name.clone(), lit)
                }
                Arg::Star(expr) | Arg::StarStar(expr) => {
                    return Err(Error::parse(
                        expr.span.start,
                        "load() does not accept starred arguments",
                    ));
                }
            };
            let reference = resolve_export(&exports, &lit.value)?;
            trace!(name = %lit.value, as_ = %local, from = %exports.label, "load symbol");
            refs.insert(lit.id, reference.clone());
            env.insert(local, reference);
        }
        Ok(())
    }

    /// Analyze an extension file, at most once per query.
    fn load_extension(&mut self, path: &Path) -> Result<Arc<ExtensionExports>> {
        match self.loaded.get(path) {
            Some(LoadSlot::Done(exports)) => return Ok(exports.clone()),
            Some(LoadSlot::InProgress) => {
                return Err(Error::LoadCycle {
                    path: path.to_path_buf(),
                });
            }
            None => {}
        }
        self.loaded
            .insert(path.to_path_buf(), LoadSlot::InProgress);
        let exports = self.analyze_extension(path)?;
        self.loaded
            .insert(path.to_path_buf(), LoadSlot::Done(exports.clone()));
        Ok(exports)
    }

    fn analyze_extension(&mut self, path: &Path) -> Result<Arc<ExtensionExports>> {
        debug!(path = %path.display(), "loading extension");
        let text = std::fs::read_to_string(path)?;
        let label = label::resolve_filename(path, self.ws)?;
        let module = syntax::parse(&text)?;
        let catalog = TargetCatalog::scan(&module);
        let targets = label_table(&label, &catalog);
        let mut globals = Bindings::default();
        // the extension's own refs are not part of this query's answer
        let mut scratch = FxHashMap::default();
        let ctx = FileCtx {
            label: &label,
            path,
            targets: &targets,
        };
        self.walk_stmts(&module.stmts, &mut globals, &ctx, &mut scratch)?;
        Ok(Arc::new(ExtensionExports {
            label,
            path: path.to_path_buf(),
            globals,
            catalog,
        }))
    }

    // ---- expressions ----

    fn resolve_string(&self, lit: &StrLit, ctx: &FileCtx<'_>) -> Reference {
        if lit.value.is_empty() {
            return Reference::Undefined;
        }
        match Label::parse(&lit.value, ctx.label) {
            Ok(parsed) => ctx
                .targets
                .get(parsed.to_string().as_str())
                .cloned()
                .unwrap_or(Reference::Undefined),
            Err(_) => Reference::Undefined,
        }
    }

    fn walk_expr(
        &mut self,
        expr: &Expr,
        env: &mut Bindings,
        ctx: &FileCtx<'_>,
        refs: &mut FxHashMap<LeafId, Reference>,
    ) -> Result<()> {
        match &expr.kind {
            ExprKind::Ident(ident) => {
                let reference = match env.get(&ident.name) {
                    Some(r) => r.clone(),
                    None if is_builtin(&ident.name) => Reference::Builtin,
                    None => Reference::Undefined,
                };
                trace!(name = %ident.name, ?reference, "read");
                refs.insert(ident.id, reference);
                Ok(())
            }
            // string literals resolve eagerly against the file's own label
            // table; a miss is Undefined, and the strict cross-package
            // lookup happens only when a query lands on the literal
            ExprKind::Str(lit) => {
                let reference = self.resolve_string(lit, ctx);
                refs.insert(lit.id, reference);
                Ok(())
            }
            ExprKind::Int(_) => Ok(()),
            ExprKind::List(items) | ExprKind::Tuple(items) => {
                for item in items {
                    self.walk_expr(item, env, ctx, refs)?;
                }
                Ok(())
            }
            ExprKind::Dict(entries) => {
                for (key, value) in entries {
                    self.walk_expr(key, env, ctx, refs)?;
                    self.walk_expr(value, env, ctx, refs)?;
                }
                Ok(())
            }
            ExprKind::ListComp { elt, clauses } => {
                let mut comp_env = env.child();
                for clause in clauses {
                    match clause {
                        CompClause::For { target, iter } => {
                            self.walk_expr(iter, &mut comp_env, ctx, refs)?;
                            self.rebind_target(target, &mut comp_env, ctx, refs)?;
                        }
                        CompClause::If(cond) => {
                            self.walk_expr(cond, &mut comp_env, ctx, refs)?;
                        }
                    }
                }
                self.walk_expr(elt, &mut comp_env, ctx, refs)
            }
            ExprKind::Call { func, args } => {
                self.walk_expr(func, env, ctx, refs)?;
                for arg in args {
                    self.walk_expr(arg.value(), env, ctx, refs)?;
                }
                Ok(())
            }
            ExprKind::Attr { value, .. } => self.walk_expr(value, env, ctx, refs),
            ExprKind::Index { value, index } => {
                self.walk_expr(value, env, ctx, refs)?;
                self.walk_expr(index, env, ctx, refs)
            }
            ExprKind::Slice {
                value,
                lower,
                upper,
                step,
            } => {
                self.walk_expr(value, env, ctx, refs)?;
                for part in [lower, upper, step].into_iter().flatten() {
                    self.walk_expr(part, env, ctx, refs)?;
                }
                Ok(())
            }
            ExprKind::Unary { operand, .. } => self.walk_expr(operand, env, ctx, refs),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.walk_expr(lhs, env, ctx, refs)?;
                self.walk_expr(rhs, env, ctx, refs)
            }
            ExprKind::IfExpr { body, test, orelse } => {
                self.walk_expr(test, env, ctx, refs)?;
                self.walk_expr(body, env, ctx, refs)?;
                self.walk_expr(orelse, env, ctx, refs)
            }
        }
    }
}

/// Resolve one exported name of an extension.
///
/// Duplicate top-level definitions are ambiguous before anything else.
/// Otherwise the extension's globals win (they carry through transitive
/// loads), with the catalog as a positional fallback.
fn resolve_export(exports: &ExtensionExports, name: &str) -> Result<Reference> {
    let lines = exports.catalog.lines_of(name);
    if lines.len() > 1 {
        return Err(Error::Ambiguous {
            name: SmolStr::new(name),
            file: exports.path.clone(),
            lines,
        });
    }
    if let Some(reference) = exports.globals.get(name) {
        return Ok(reference.clone());
    }
    match lines.first() {
        Some(line) => Ok(Reference::Defined {
            label: exports.label.clone(),
            cursor: Cursor::new(*line, 0),
        }),
        None => Err(Error::NotFound {
            name: SmolStr::new(name),
            file: exports.path.clone(),
        }),
    }
}

fn expect_str_expr<'e>(expr: &'e Expr, what: &str) -> Result<&'e StrLit> {
    match &expr.kind {
        ExprKind::Str(lit) => Ok(lit),
        _ => Err(Error::parse(
            expr.span.start,
            format!("{what} must be a string literal"),
        )),
    }
}
