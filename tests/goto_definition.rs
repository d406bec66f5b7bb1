//! End-to-end definition queries over on-disk workspaces.

use std::fs;
use std::path::Path;

use rstest::rstest;
use starloc::base::Cursor;
use starloc::error::Error;
use starloc::ide::{Analysis, NavTarget};

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// A workspace with an injected external directory, so no query ever has
/// to shell out to a build tool.
fn workspace() -> (tempfile::TempDir, Analysis) {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "WORKSPACE", "");
    let external = dir.path().join("output_base/external");
    fs::create_dir_all(&external).unwrap();
    let analysis = Analysis::new()
        .with_workspace_root(dir.path())
        .with_external_dir(external);
    (dir, analysis)
}

fn query(analysis: &Analysis, root: &Path, rel: &str, cursor: Cursor) -> Option<NavTarget> {
    let path = root.join(rel);
    let text = fs::read_to_string(&path).unwrap();
    analysis.find_definition_at(&path, &text, cursor).unwrap()
}

fn query_err(analysis: &Analysis, root: &Path, rel: &str, cursor: Cursor) -> Error {
    let path = root.join(rel);
    let text = fs::read_to_string(&path).unwrap();
    analysis
        .find_definition_at(&path, &text, cursor)
        .unwrap_err()
}

#[test]
fn test_cross_package_target() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "lib/BUILD",
        "cc_library(\n    name = \"util\",\n    srcs = [\"util.cc\"],\n)\n",
    );
    write(
        dir.path(),
        "app/BUILD",
        "cc_binary(\n    name = \"app\",\n    deps = [\"//lib:util\"],\n)\n",
    );
    let hit = query(&analysis, dir.path(), "app/BUILD", Cursor::new(3, 14)).unwrap();
    assert_eq!(hit.path, dir.path().join("lib/BUILD"));
    assert_eq!(hit.cursor, Cursor::new(1, 0));
}

#[test]
fn test_same_package_colon_target() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "lib/BUILD",
        "cc_library(\n    name = \"util\",\n)\n\ncc_test(\n    name = \"util_test\",\n    deps = [\":util\"],\n)\n",
    );
    let hit = query(&analysis, dir.path(), "lib/BUILD", Cursor::new(7, 14)).unwrap();
    assert_eq!(hit.path, dir.path().join("lib/BUILD"));
    assert_eq!(hit.cursor, Cursor::new(1, 0));
}

#[test]
fn test_target_name_resolves_to_its_own_rule() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "lib/BUILD",
        "cc_library(\n    name = \"util\",\n)\n",
    );
    let hit = query(&analysis, dir.path(), "lib/BUILD", Cursor::new(2, 13)).unwrap();
    assert_eq!(hit.path, dir.path().join("lib/BUILD"));
    assert_eq!(hit.cursor, Cursor::new(1, 0));
}

#[test]
fn test_external_repository_target() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "output_base/external/dep/sub/BUILD",
        "cc_library(\n    name = \"tgt\",\n)\n",
    );
    write(
        dir.path(),
        "app/BUILD",
        "cc_binary(\n    name = \"app\",\n    deps = [\"@dep//sub:tgt\"],\n)\n",
    );
    let hit = query(&analysis, dir.path(), "app/BUILD", Cursor::new(3, 15)).unwrap();
    assert_eq!(
        hit.path,
        dir.path().join("output_base/external/dep/sub/BUILD")
    );
    assert_eq!(hit.cursor, Cursor::new(1, 0));
}

#[test]
fn test_visibility_label_is_builtin() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "lib/BUILD",
        "cc_library(\n    name = \"util\",\n    visibility = [\"//visibility:public\"],\n)\n",
    );
    assert_eq!(
        query(&analysis, dir.path(), "lib/BUILD", Cursor::new(3, 20)),
        None
    );
}

#[test]
fn test_builtin_rule_name_has_no_definition() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "lib/BUILD",
        "cc_library(\n    name = \"util\",\n)\n",
    );
    assert_eq!(
        query(&analysis, dir.path(), "lib/BUILD", Cursor::new(1, 2)),
        None
    );
}

#[test]
fn test_cursor_on_nothing() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "lib/BUILD",
        "cc_library(\n    name = \"util\",\n)\n",
    );
    assert_eq!(
        query(&analysis, dir.path(), "lib/BUILD", Cursor::new(1, 40)),
        None
    );
}

#[test]
fn test_missing_target_is_fatal() {
    let (dir, analysis) = workspace();
    write(dir.path(), "lib/BUILD", "cc_library(\n    name = \"util\",\n)\n");
    write(
        dir.path(),
        "app/BUILD",
        "cc_binary(\n    name = \"app\",\n    deps = [\"//lib:nope\"],\n)\n",
    );
    let err = query_err(&analysis, dir.path(), "app/BUILD", Cursor::new(3, 14));
    assert!(matches!(err, Error::NotFound { ref name, .. } if name == "nope"));
}

#[test]
fn test_duplicate_target_is_fatal() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "lib/BUILD",
        "cc_library(\n    name = \"dup\",\n)\n\ncc_library(\n    name = \"dup\",\n)\n",
    );
    write(
        dir.path(),
        "app/BUILD",
        "cc_binary(\n    name = \"app\",\n    deps = [\"//lib:dup\"],\n)\n",
    );
    let err = query_err(&analysis, dir.path(), "app/BUILD", Cursor::new(3, 14));
    match err {
        Error::Ambiguous { lines, .. } => assert_eq!(lines, vec![1, 5]),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_macro_use_resolves_through_load() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "pkg/BUILD",
        "load(\"//pkg:rules.bzl\", \"my_macro\")\nmy_macro(name = \"x\")\n",
    );
    write(
        dir.path(),
        "pkg/rules.bzl",
        "def my_macro(name):\n    pass\n",
    );
    let hit = query(&analysis, dir.path(), "pkg/BUILD", Cursor::new(2, 3)).unwrap();
    assert_eq!(hit.path, dir.path().join("pkg/rules.bzl"));
    assert_eq!(hit.cursor, Cursor::new(1, 4));
}

#[test]
fn test_load_symbol_string_resolves() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "pkg/BUILD",
        "load(\"//pkg:rules.bzl\", \"my_macro\")\n",
    );
    write(
        dir.path(),
        "pkg/rules.bzl",
        "def my_macro(name):\n    pass\n",
    );
    let hit = query(&analysis, dir.path(), "pkg/BUILD", Cursor::new(1, 27)).unwrap();
    assert_eq!(hit.path, dir.path().join("pkg/rules.bzl"));
    assert_eq!(hit.cursor, Cursor::new(1, 4));
}

#[test]
fn test_load_module_string_resolves_to_file_start() {
    let (dir, analysis) = workspace();
    write(
        dir.path(),
        "pkg/BUILD",
        "load(\"//pkg:rules.bzl\", \"my_macro\")\n",
    );
    write(dir.path(), "pkg/rules.bzl", "my_macro = 1\n");
    let hit = query(&analysis, dir.path(), "pkg/BUILD", Cursor::new(1, 8)).unwrap();
    assert_eq!(hit.path, dir.path().join("pkg/rules.bzl"));
    assert_eq!(hit.cursor, Cursor::new(1, 0));
}

#[test]
fn test_chained_assignment_skipped_by_catalog_fatal_in_scope_model() {
    let (dir, analysis) = workspace();
    // referenced as a target, the chain is silently absent from the catalog
    write(
        dir.path(),
        "lib/BUILD",
        "a = b = 1\ncc_library(\n    name = \"util\",\n)\n",
    );
    write(
        dir.path(),
        "app/BUILD",
        "cc_binary(\n    name = \"app\",\n    deps = [\"//lib:a\"],\n)\n",
    );
    let err = query_err(&analysis, dir.path(), "app/BUILD", Cursor::new(3, 14));
    assert!(matches!(err, Error::NotFound { ref name, .. } if name == "a"));
    // analyzed as source, the same statement is fatal
    let err = query_err(&analysis, dir.path(), "lib/BUILD", Cursor::new(1, 0));
    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn test_workspace_root_is_discovered_from_the_file() {
    let (dir, _) = workspace();
    write(
        dir.path(),
        "lib/BUILD",
        "cc_library(\n    name = \"util\",\n)\n",
    );
    let analysis =
        Analysis::new().with_external_dir(dir.path().join("output_base/external"));
    let hit = query(&analysis, dir.path(), "lib/BUILD", Cursor::new(2, 13)).unwrap();
    assert_eq!(hit.path, dir.path().join("lib/BUILD"));
}

#[rstest]
#[case("@myrepo//some/pkg:tgt", "@myrepo//some/pkg:tgt")]
#[case("@myrepo//some/pkg", "@myrepo//some/pkg:pkg")]
#[case("@myrepo", "@myrepo//:myrepo")]
#[case("//my/app:tgt", "@//my/app:tgt")]
#[case("//my/app", "@//my/app:app")]
#[case(":tgt", "@//my/app:tgt")]
#[case("tgt", "@//my/app:tgt")]
fn test_canonical_label_at(#[case] written: &str, #[case] canonical: &str) {
    let (dir, analysis) = workspace();
    write(dir.path(), "my/app/BUILD", "");
    let path = dir.path().join("my/app/BUILD");
    let text = format!("x = \"{written}\"\n");
    let got = analysis
        .canonical_label_at(&path, &text, Cursor::new(1, 6))
        .unwrap();
    assert_eq!(got.as_deref(), Some(canonical));
}

#[test]
fn test_canonical_label_at_ident_is_none() {
    let (dir, analysis) = workspace();
    write(dir.path(), "my/app/BUILD", "");
    let path = dir.path().join("my/app/BUILD");
    let got = analysis
        .canonical_label_at(&path, "x = y\n", Cursor::new(1, 4))
        .unwrap();
    assert_eq!(got, None);
}
