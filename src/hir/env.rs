//! Name bindings and the fixed builtin universe.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::Cursor;
use crate::label::Label;

/// What a name or label refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum Reference {
    /// Defined in a workspace file: the file's label and the definition
    /// cursor within it.
    Defined { label: Label, cursor: Cursor },
    /// Part of the builtin universe; has no navigable definition.
    Builtin,
    /// Nothing known. Queries answer "no result", never an error.
    Undefined,
}

/// A scope: name bindings plus an immutable chain of enclosing scopes.
///
/// Entering a scope snapshots the enclosing one behind an `Arc`, so writes
/// in the enclosing scope after the snapshot are invisible inside — a
/// function body sees the globals as they were at its `def` site.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    local: FxHashMap<SmolStr, Reference>,
    parent: Option<Arc<Bindings>>,
}

impl Bindings {
    pub fn insert(&mut self, name: SmolStr, reference: Reference) {
        self.local.insert(name, reference);
    }

    /// Innermost binding of `name`, walking the scope chain outward.
    pub fn get(&self, name: &str) -> Option<&Reference> {
        let mut scope = self;
        loop {
            if let Some(reference) = scope.local.get(name) {
                return Some(reference);
            }
            scope = scope.parent.as_deref()?;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// A fresh scope whose parent is a snapshot of `self`.
    pub fn child(&self) -> Bindings {
        Bindings {
            local: FxHashMap::default(),
            parent: Some(Arc::new(self.clone())),
        }
    }
}

/// Names available everywhere without definition or load.
///
/// The universe is the fixed set of rule names, functions, providers and
/// constants that build files may reference freely.
const BUILTINS: &[&str] = &[
    "CcInfo",
    "False",
    "Label",
    "None",
    "OutputGroupInfo",
    "True",
    "any",
    "apple_common",
    "aspect",
    "attr",
    "cc_binary",
    "cc_common",
    "cc_library",
    "cc_test",
    "depset",
    "dir",
    "fail",
    "hasattr",
    "len",
    "print",
    "provider",
    "rule",
    "str",
    "struct",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.binary_search(&name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defined(row: u32) -> Reference {
        Reference::Defined {
            label: Label::new("", "pkg", "defs.bzl"),
            cursor: Cursor::new(row, 0),
        }
    }

    #[test]
    fn test_builtins_are_sorted() {
        let mut sorted = BUILTINS.to_vec();
        sorted.sort_unstable();
        assert_eq!(BUILTINS, sorted.as_slice());
    }

    #[test]
    fn test_is_builtin() {
        assert!(is_builtin("cc_library"));
        assert!(is_builtin("True"));
        assert!(!is_builtin("glob_everything"));
    }

    #[test]
    fn test_innermost_binding_wins() {
        let mut outer = Bindings::default();
        outer.insert(SmolStr::new("x"), defined(1));
        let mut inner = outer.child();
        inner.insert(SmolStr::new("x"), defined(5));
        assert_eq!(inner.get("x"), Some(&defined(5)));
        assert_eq!(outer.get("x"), Some(&defined(1)));
    }

    #[test]
    fn test_child_sees_snapshot_not_later_writes() {
        let mut outer = Bindings::default();
        outer.insert(SmolStr::new("early"), defined(1));
        let inner = outer.child();
        outer.insert(SmolStr::new("late"), defined(9));
        assert!(inner.contains("early"));
        assert!(!inner.contains("late"));
    }

}
