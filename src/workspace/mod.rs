//! Workspace and package boundary discovery.
//!
//! Bazel-style workspaces are delimited by marker files: `WORKSPACE` /
//! `WORKSPACE.bazel` at the workspace root, `BUILD` / `BUILD.bazel` at each
//! package root. External repositories live under
//! `<output base>/external/<repo>/...`, where the output base is obtained by
//! invoking the build tool itself.
//!
//! All discovery is per query; nothing found here is cached across queries.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// Marker files that delimit a package.
pub const BUILD_MARKERS: &[&str] = &["BUILD", "BUILD.bazel"];

/// Marker files that delimit a workspace.
pub const WORKSPACE_MARKERS: &[&str] = &["WORKSPACE", "WORKSPACE.bazel"];

/// Walk ancestor directories of `path` looking for any of `markers`.
///
/// Starts at `path` itself if it is a directory, otherwise at its containing
/// directory. Returns the first directory that contains one of the marker
/// files; checks every marker name at each level before moving up.
pub fn find_marker(path: &Path, markers: &[&str]) -> Result<PathBuf> {
    let mut dir = if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"))
    };

    loop {
        for marker in markers {
            if dir.join(marker).exists() {
                return Ok(dir);
            }
        }
        if !dir.pop() {
            return Err(Error::MarkerNotFound {
                markers: markers.iter().map(|m| m.to_string()).collect(),
                start: path.to_path_buf(),
            });
        }
    }
}

/// Find the package root: the nearest ancestor directory with a build file.
pub fn find_package_root(path: &Path) -> Result<PathBuf> {
    find_marker(path, BUILD_MARKERS)
}

/// Find the workspace root: the nearest ancestor directory with a workspace file.
pub fn find_workspace_root(path: &Path) -> Result<PathBuf> {
    find_marker(path, WORKSPACE_MARKERS)
}

/// The build file (`BUILD` or `BUILD.bazel`) inside a package directory.
pub fn find_build_file(package_dir: &Path) -> Result<PathBuf> {
    for marker in BUILD_MARKERS {
        let candidate = package_dir.join(marker);
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(Error::MarkerNotFound {
        markers: BUILD_MARKERS.iter().map(|m| m.to_string()).collect(),
        start: package_dir.to_path_buf(),
    })
}

/// Per-query workspace context.
///
/// Holds the workspace root, the build tool used for `info` queries, and the
/// external-repository directory. The external directory requires a blocking
/// subprocess invocation, so it is resolved lazily and at most once per
/// query; it is never cached across queries.
#[derive(Debug)]
pub struct WorkspaceEnv {
    root: PathBuf,
    build_tool: String,
    external: OnceCell<PathBuf>,
}

impl WorkspaceEnv {
    /// Create a workspace context rooted at `root`, querying `build_tool`
    /// for configuration values when needed.
    pub fn new(root: impl Into<PathBuf>, build_tool: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            build_tool: build_tool.into(),
            external: OnceCell::new(),
        }
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pre-set the external directory, bypassing the build-tool invocation.
    ///
    /// Useful for embedders that already know the output base, and for tests
    /// that must not spawn the build tool.
    pub fn with_external_dir(self, external: impl Into<PathBuf>) -> Self {
        let _ = self.external.set(external.into());
        self
    }

    /// The directory holding external repositories: `<output base>/external`.
    ///
    /// Invokes `<tool> info output_base` on first use. A failing or
    /// malformed invocation is fatal to the query; there is no retry.
    pub fn external_dir(&self) -> Result<&Path> {
        if let Some(path) = self.external.get() {
            return Ok(path);
        }
        let external = output_base(&self.build_tool, &self.root)?.join("external");
        debug!(external = %external.display(), "resolved external directory");
        Ok(self.external.get_or_init(|| external))
    }
}

/// Ask the build tool for its output base directory.
///
/// Runs `<tool> info output_base` in the workspace root and expects exactly
/// one line of stdout: the absolute output-base path.
fn output_base(tool: &str, workspace_root: &Path) -> Result<PathBuf> {
    debug!(tool, root = %workspace_root.display(), "querying output base");
    let output = Command::new(tool)
        .args(["info", "output_base"])
        .current_dir(workspace_root)
        .stderr(Stdio::null())
        .output()
        .map_err(|e| Error::ToolInvocation {
            message: format!("could not run `{tool} info output_base`: {e}"),
        })?;

    if !output.status.success() {
        return Err(Error::ToolInvocation {
            message: format!("`{tool} info output_base` exited with {}", output.status),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return Err(Error::ToolInvocation {
            message: format!("`{tool} info output_base` produced no output"),
        });
    }
    Ok(PathBuf::from(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_marker_walks_ancestors() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("WORKSPACE"), "").unwrap();
        fs::create_dir_all(root.join("a/b/c")).unwrap();

        let found = find_workspace_root(&root.join("a/b/c")).unwrap();
        assert_eq!(found, root);
    }

    #[test]
    fn test_find_marker_from_file_path() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/BUILD.bazel"), "").unwrap();
        fs::write(root.join("pkg/lib.bzl"), "").unwrap();

        let found = find_package_root(&root.join("pkg/lib.bzl")).unwrap();
        assert_eq!(found, root.join("pkg"));
    }

    #[test]
    fn test_find_marker_prefers_nearest() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("BUILD"), "").unwrap();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/BUILD"), "").unwrap();

        let found = find_package_root(&root.join("sub")).unwrap();
        assert_eq!(found, root.join("sub"));
    }

    #[test]
    fn test_find_marker_checks_all_names_per_level() {
        // BUILD.bazel in the near directory must win over BUILD further up.
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("BUILD"), "").unwrap();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/BUILD.bazel"), "").unwrap();

        let found = find_package_root(&root.join("sub")).unwrap();
        assert_eq!(found, root.join("sub"));
    }

    #[test]
    fn test_find_marker_missing_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let err = find_workspace_root(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::MarkerNotFound { .. }));
    }

    #[test]
    fn test_find_build_file_picks_existing_name() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("BUILD.bazel"), "").unwrap();

        let found = find_build_file(tmp.path()).unwrap();
        assert_eq!(found, tmp.path().join("BUILD.bazel"));
    }

    #[test]
    fn test_external_dir_injection_skips_tool() {
        let env = WorkspaceEnv::new("/ws", "definitely-not-a-real-tool")
            .with_external_dir("/out/external");
        assert_eq!(env.external_dir().unwrap(), Path::new("/out/external"));
    }

    #[test]
    fn test_tool_invocation_failure_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let env = WorkspaceEnv::new(tmp.path(), "starloc-no-such-tool");
        let err = env.external_dir().unwrap_err();
        assert!(matches!(err, Error::ToolInvocation { .. }));
    }
}
