//! Query façade: cursor-in-file in, navigation target out.
//!
//! [`Analysis`] is a small configuration holder; each query builds its own
//! [`WorkspaceEnv`] and [`Analyzer`], so nothing is cached across queries
//! and edits between queries are always observed.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::base::Cursor;
use crate::error::Result;
use crate::hir::{Analyzer, Reference, TargetCatalog};
use crate::label::{self, Label};
use crate::syntax::{self, LeafAt};
use crate::workspace::{self, WorkspaceEnv};

/// Where a definition lives: a file and a cursor within it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavTarget {
    pub path: PathBuf,
    pub cursor: Cursor,
}

/// Entry point for definition queries.
///
/// ```no_run
/// use starloc::base::Cursor;
/// use starloc::ide::Analysis;
///
/// let analysis = Analysis::new();
/// let text = std::fs::read_to_string("BUILD")?;
/// let hit = analysis.find_definition_at("BUILD".as_ref(), &text, Cursor::new(3, 12))?;
/// # Ok::<(), starloc::error::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct Analysis {
    build_tool: String,
    workspace_root: Option<PathBuf>,
    external_dir: Option<PathBuf>,
}

impl Default for Analysis {
    fn default() -> Self {
        Analysis {
            build_tool: "bazel".to_string(),
            workspace_root: None,
            external_dir: None,
        }
    }
}

impl Analysis {
    pub fn new() -> Self {
        Analysis::default()
    }

    /// Use a different build tool binary for `info` queries.
    pub fn with_build_tool(mut self, tool: impl Into<String>) -> Self {
        self.build_tool = tool.into();
        self
    }

    /// Pin the workspace root instead of discovering it per query.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Pin the external-repository directory, bypassing the build tool.
    pub fn with_external_dir(mut self, external: impl Into<PathBuf>) -> Self {
        self.external_dir = Some(external.into());
        self
    }

    fn workspace_env(&self, path: &Path) -> Result<WorkspaceEnv> {
        let root = match &self.workspace_root {
            Some(root) => root.clone(),
            None => workspace::find_workspace_root(path)?,
        };
        let ws = WorkspaceEnv::new(root, self.build_tool.clone());
        Ok(match &self.external_dir {
            Some(external) => ws.with_external_dir(external.clone()),
            None => ws,
        })
    }

    /// Find the definition of whatever `cursor` points at in `text`.
    ///
    /// `text` stands in for the on-disk contents of `path` (it may be an
    /// unsaved editor buffer); every other file involved is read from disk.
    ///
    /// `Ok(None)` means the cursor is not on anything resolvable, or what
    /// it is on is a builtin or an undefined name. Errors are reserved for
    /// broken input and broken lookups.
    pub fn find_definition_at(
        &self,
        path: &Path,
        text: &str,
        cursor: Cursor,
    ) -> Result<Option<NavTarget>> {
        let ws = self.workspace_env(path)?;
        let mut analyzer = Analyzer::new(&ws);
        let analysis = analyzer.analyze_source(path, text)?;
        let Some(leaf) = analysis.module.locate(cursor) else {
            debug!(%cursor, "nothing at cursor");
            return Ok(None);
        };
        match leaf {
            LeafAt::Ident(_) => match analysis.refs.get(&leaf.id()) {
                Some(Reference::Defined { label, cursor }) => Ok(Some(NavTarget {
                    path: label::resolve_label(label, &ws)?,
                    cursor: *cursor,
                })),
                _ => Ok(None),
            },
            LeafAt::Str(lit) => match analysis.refs.get(&leaf.id()) {
                // same-file targets and load() strings were resolved eagerly
                Some(Reference::Defined { label, cursor }) => Ok(Some(NavTarget {
                    path: label::resolve_label(label, &ws)?,
                    cursor: *cursor,
                })),
                Some(Reference::Builtin) => Ok(None),
                _ => {
                    if lit.value.is_empty() {
                        return Ok(None);
                    }
                    // anything else goes through the strict catalog lookup
                    // of the label's own package
                    let target = Label::parse(&lit.value, &analysis.label)?;
                    self.lookup_target(&target, &ws)
                }
            },
        }
    }

    /// Resolve a target label against the catalog of its package's build
    /// file. Missing and duplicate targets are fatal.
    fn lookup_target(&self, target: &Label, ws: &WorkspaceEnv) -> Result<Option<NavTarget>> {
        let package_dir = label::resolve_package_dir(target, ws)?;
        let build_file = workspace::find_build_file(&package_dir)?;
        debug!(%target, build_file = %build_file.display(), "target lookup");
        let text = std::fs::read_to_string(&build_file)?;
        let module = syntax::parse(&text)?;
        let catalog = TargetCatalog::scan(&module);
        let line = catalog.lookup(&target.target, &build_file)?;
        Ok(Some(NavTarget {
            path: build_file,
            cursor: Cursor::new(line, 0),
        }))
    }

    /// The canonical `@repo//pkg:target` form of the label under `cursor`,
    /// if the cursor is on a string literal.
    pub fn canonical_label_at(
        &self,
        path: &Path,
        text: &str,
        cursor: Cursor,
    ) -> Result<Option<String>> {
        let ws = self.workspace_env(path)?;
        let location = label::resolve_filename(path, &ws)?;
        let module = syntax::parse(text)?;
        match module.locate(cursor) {
            Some(LeafAt::Str(lit)) if !lit.value.is_empty() => {
                Ok(Some(Label::parse(&lit.value, &location)?.to_string()))
            }
            _ => Ok(None),
        }
    }
}
