//! Per-file catalog of definable names.
//!
//! The catalog is a flat scan of a module's top-level statements for the
//! three shapes that introduce a named target or symbol: a rule call with a
//! `name = "..."` keyword, a plain single-target assignment, and a `def`.
//! Scanning is tolerant (anything else is skipped without comment) but
//! lookup is strict: zero matches and duplicate matches are both fatal.

use std::path::Path;

use smol_str::SmolStr;

use crate::error::{Error, Result};
use crate::syntax::ast::{Arg, Expr, ExprKind, Module, Stmt, StmtKind};

/// One catalog row: a name and the 1-based line of the statement that
/// introduced it. Duplicates are kept; lookup reports them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: SmolStr,
    pub line: u32,
}

#[derive(Clone, Debug, Default)]
pub struct TargetCatalog {
    entries: Vec<CatalogEntry>,
}

impl TargetCatalog {
    /// Collect entries from the top level of `module`.
    pub fn scan(module: &Module) -> TargetCatalog {
        let mut entries = Vec::new();
        for stmt in &module.stmts {
            if let Some(name) = definable_name(stmt) {
                entries.push(CatalogEntry {
                    name,
                    line: stmt.span.start.row,
                });
            }
        }
        TargetCatalog { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Lines of every entry named `name`, in source order.
    pub fn lines_of(&self, name: &str) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|e| e.name == name)
            .map(|e| e.line)
            .collect()
    }

    /// The line of the unique entry named `name`.
    ///
    /// `file` is only used to report failures: no match is [`Error::NotFound`],
    /// several are [`Error::Ambiguous`] with every candidate line.
    pub fn lookup(&self, name: &str, file: &Path) -> Result<u32> {
        let lines = self.lines_of(name);
        match lines.as_slice() {
            [] => Err(Error::NotFound {
                name: SmolStr::new(name),
                file: file.to_path_buf(),
            }),
            [line] => Ok(*line),
            _ => Err(Error::Ambiguous {
                name: SmolStr::new(name),
                file: file.to_path_buf(),
                lines,
            }),
        }
    }
}

fn definable_name(stmt: &Stmt) -> Option<SmolStr> {
    match &stmt.kind {
        StmtKind::Def(def) => Some(def.name.name.clone()),
        StmtKind::Assign {
            targets,
            op: None,
            ..
        } => match targets.as_slice() {
            [Expr {
                kind: ExprKind::Ident(ident),
                ..
            }] => Some(ident.name.clone()),
            _ => None,
        },
        StmtKind::Expr(Expr {
            kind: ExprKind::Call { func, args },
            ..
        }) => {
            // only rule-style calls: a bare callee with exactly one
            // name = "..." keyword
            if !matches!(func.kind, ExprKind::Ident(_)) {
                return None;
            }
            let mut names = args.iter().filter_map(|arg| match arg {
                Arg::Keyword { name, value } if name == "name" => Some(value),
                _ => None,
            });
            let value = names.next()?;
            if names.next().is_some() {
                return None;
            }
            match &value.kind {
                ExprKind::Str(lit) => Some(SmolStr::new(&lit.value)),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use std::path::PathBuf;

    fn catalog(text: &str) -> TargetCatalog {
        TargetCatalog::scan(&parse(text).unwrap())
    }

    #[test]
    fn test_scan_rule_call() {
        let cat = catalog("cc_library(\n    name = \"util\",\n    srcs = [\"util.cc\"],\n)\n");
        assert_eq!(
            cat.entries(),
            &[CatalogEntry {
                name: SmolStr::new("util"),
                line: 1,
            }]
        );
    }

    #[test]
    fn test_scan_assignment_and_def() {
        let cat = catalog("SRCS = [\"a.cc\"]\n\ndef helper():\n    pass\n");
        let names: Vec<_> = cat.entries().iter().map(|e| (e.name.as_str(), e.line)).collect();
        assert_eq!(names, vec![("SRCS", 1), ("helper", 3)]);
    }

    #[test]
    fn test_scan_all_three_shapes() {
        let cat = catalog("my_rule(name = \"foo\")\nBAR = 1\ndef baz(): pass\n");
        let entries: Vec<_> = cat
            .entries()
            .iter()
            .map(|e| (e.line, e.name.as_str()))
            .collect();
        assert_eq!(entries, vec![(1, "foo"), (2, "BAR"), (3, "baz")]);
    }

    #[test]
    fn test_scan_skips_odd_shapes() {
        // chained assignment, attribute call, call without name=, non-string name
        let cat = catalog(
            "a = b = 1\nnative.cc_library(name = \"x\")\nprint(\"hi\")\nrule(name = n)\n",
        );
        assert!(cat.entries().is_empty());
    }

    #[test]
    fn test_scan_skips_repeated_name_keyword() {
        let cat = catalog("genrule(name = \"a\", name = \"b\")\n");
        assert!(cat.entries().is_empty());
    }

    #[test]
    fn test_scan_keeps_duplicates() {
        let cat = catalog("x = 1\nx = 2\n");
        assert_eq!(cat.lines_of("x"), vec![1, 2]);
    }

    #[test]
    fn test_lookup_unique() {
        let cat = catalog("cc_library(name = \"util\")\n");
        let line = cat.lookup("util", &PathBuf::from("/ws/BUILD")).unwrap();
        assert_eq!(line, 1);
    }

    #[test]
    fn test_lookup_missing_is_fatal() {
        let cat = catalog("x = 1\n");
        let err = cat.lookup("y", &PathBuf::from("/ws/BUILD")).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref name, .. } if name == "y"));
    }

    #[test]
    fn test_lookup_duplicate_is_fatal() {
        let cat = catalog("x = 1\nx = 2\nx = 3\n");
        let err = cat.lookup("x", &PathBuf::from("/ws/BUILD")).unwrap_err();
        match err {
            Error::Ambiguous { lines, .. } => assert_eq!(lines, vec![1, 2, 3]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_multiline_rule_reports_first_line() {
        let cat = catalog("\n\ncc_binary(\n    name = \"app\",\n)\n");
        assert_eq!(cat.entries()[0].line, 3);
    }
}
