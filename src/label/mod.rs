//! Label algebra — parsing, canonicalizing, and resolving build labels.
//!
//! A label is the three-part identifier `@repository//package:target`. Any
//! part may be omitted in source text; omitted parts are inherited from the
//! *location* (the label of the file the text was found in) and an empty
//! target is filled in by canonicalization. Parsing performs no lexical
//! validation of the parts: it only splits the text on `@`, `//` and `:`.

use std::path::{Path, PathBuf};

use smol_str::SmolStr;

use crate::error::{Error, Result};
use crate::workspace::{self, WorkspaceEnv};

/// A three-part build label `@repository//package:target`.
///
/// Invariant: at least one part is non-empty.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Label {
    pub repository: SmolStr,
    pub package: SmolStr,
    pub target: SmolStr,
}

impl Label {
    /// Construct a label from explicit parts.
    ///
    /// # Panics
    /// Panics if all three parts are empty; a label must name something.
    pub fn new(
        repository: impl Into<SmolStr>,
        package: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
    ) -> Self {
        let label = Self {
            repository: repository.into(),
            package: package.into(),
            target: target.into(),
        };
        assert!(
            !label.repository.is_empty() || !label.package.is_empty() || !label.target.is_empty(),
            "a label must have at least one non-empty part"
        );
        label
    }

    /// Parse `text` as a label relative to `location`.
    ///
    /// `location` is the label of the file the text was read in; its parts
    /// are inherited by label forms that omit them:
    ///
    /// - `@repo//pkg:tgt`, `@repo//pkg`, `@repo`: repository explicit
    /// - `//pkg:tgt`, `//pkg`: repository inherited
    /// - `:tgt` or bare `tgt`: repository and package inherited
    ///
    /// The result is canonicalized. Parsing an empty string is an error.
    pub fn parse(text: &str, location: &Label) -> Result<Label> {
        if text.is_empty() {
            return Err(Error::parse(
                crate::base::Cursor::default(),
                "label must not be empty",
            ));
        }
        let label = if let Some(rest) = text.strip_prefix('@') {
            parse_repository(rest)
        } else if let Some(rest) = text.strip_prefix("//") {
            let mut label = parse_package(rest);
            label.repository = location.repository.clone();
            label
        } else if let Some(rest) = text.strip_prefix(':') {
            Label {
                repository: location.repository.clone(),
                package: location.package.clone(),
                target: SmolStr::new(rest),
            }
        } else {
            Label {
                repository: location.repository.clone(),
                package: location.package.clone(),
                target: SmolStr::new(text),
            }
        };
        Ok(label.canonicalize())
    }

    /// Fill in an empty target: `basename(package)` if the package is
    /// non-empty, else the repository name. Idempotent.
    pub fn canonicalize(mut self) -> Label {
        if self.target.is_empty() {
            if !self.package.is_empty() {
                let base = self.package.rsplit('/').next().unwrap_or(&self.package);
                self.target = SmolStr::new(base);
            } else if !self.repository.is_empty() {
                self.target = self.repository.clone();
            }
        }
        self
    }

    /// A copy of this label with a different target part.
    pub fn with_target(&self, target: impl Into<SmolStr>) -> Label {
        Label {
            repository: self.repository.clone(),
            package: self.package.clone(),
            target: target.into(),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "@{}//{}:{}",
            self.repository, self.package, self.target
        )
    }
}

/// Parse the part after `@`: `repo`, `repo//pkg` or `repo//pkg:tgt`.
fn parse_repository(text: &str) -> Label {
    match text.find("//") {
        None => Label {
            repository: SmolStr::new(text),
            package: SmolStr::default(),
            target: SmolStr::default(),
        },
        Some(idx) => {
            let mut label = parse_package(&text[idx + 2..]);
            label.repository = SmolStr::new(&text[..idx]);
            label
        }
    }
}

/// Parse the part after `//`: `pkg` or `pkg:tgt`.
fn parse_package(text: &str) -> Label {
    match text.find(':') {
        None => Label {
            repository: SmolStr::default(),
            package: SmolStr::new(text),
            target: SmolStr::default(),
        },
        Some(idx) => Label {
            repository: SmolStr::default(),
            package: SmolStr::new(&text[..idx]),
            target: SmolStr::new(&text[idx + 1..]),
        },
    }
}

/// Resolve a label to a filesystem path.
///
/// The root is the workspace root for main-repository labels, or
/// `<external dir>/<repository>` for external ones; the result is
/// `root/package/target`. Assumes `label.target` names a file.
pub fn resolve_label(label: &Label, ws: &WorkspaceEnv) -> Result<PathBuf> {
    let root = if label.repository.is_empty() {
        ws.root().to_path_buf()
    } else {
        ws.external_dir()?.join(label.repository.as_str())
    };
    let mut path = root;
    if !label.package.is_empty() {
        path.push(label.package.as_str());
    }
    path.push(label.target.as_str());
    Ok(path)
}

/// The directory a label's package refers to (`root/package`).
pub fn resolve_package_dir(label: &Label, ws: &WorkspaceEnv) -> Result<PathBuf> {
    let root = if label.repository.is_empty() {
        ws.root().to_path_buf()
    } else {
        ws.external_dir()?.join(label.repository.as_str())
    };
    if label.package.is_empty() {
        Ok(root)
    } else {
        Ok(root.join(label.package.as_str()))
    }
}

/// Derive the label of a file from its filesystem path (inverse resolution).
///
/// For paths under the workspace root, the package is the path from the
/// nearest enclosing package root to the workspace root, and the target is
/// the path relative to the package root. For paths under the external
/// directory, the leading `<repo>/` segment becomes the repository and the
/// same rules apply beneath it. A path under neither root is fatal.
pub fn resolve_filename(path: &Path, ws: &WorkspaceEnv) -> Result<Label> {
    if path.starts_with(ws.root()) {
        return resolve_in_root(path, ws.root(), SmolStr::default());
    }
    let external = ws.external_dir()?;
    if let Ok(rest) = path.strip_prefix(external) {
        let repository = rest
            .components()
            .next()
            .and_then(|c| c.as_os_str().to_str())
            .map(SmolStr::new)
            .unwrap_or_default();
        if !repository.is_empty() {
            let repo_root = external.join(repository.as_str());
            return resolve_in_root(path, &repo_root, repository);
        }
    }
    Err(Error::Location {
        path: path.to_path_buf(),
        workspace: ws.root().to_path_buf(),
        external: external.to_path_buf(),
    })
}

fn resolve_in_root(path: &Path, root: &Path, repository: SmolStr) -> Result<Label> {
    let package_root = workspace::find_package_root(path)?;
    let package = relative_slash_path(&package_root, root)?;
    let target = relative_slash_path(path, &package_root)?;
    Ok(Label {
        repository,
        package,
        target,
    })
}

/// `path` relative to `base`, joined with forward slashes.
fn relative_slash_path(path: &Path, base: &Path) -> Result<SmolStr> {
    let rel = path.strip_prefix(base).map_err(|_| Error::Location {
        path: path.to_path_buf(),
        workspace: base.to_path_buf(),
        external: base.to_path_buf(),
    })?;
    let parts: Vec<&str> = rel
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    Ok(SmolStr::new(parts.join("/")))
}
