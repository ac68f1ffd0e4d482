//! Package tree discovery, relocation, and index regeneration against a
//! real directory layout.

use assert_fs::prelude::*;
use predicates::prelude::*;
use updater_core::{
    tree::{self, Relocation},
    PackageName, TreeError,
};

fn write_package(root: &assert_fs::TempDir, name: &str, version: &str) {
    root.child(format!("pkgs/{name}/pkg.yaml"))
        .write_str(&format!("packages:\n  - name: {name}@{version}\n"))
        .expect("write pkg.yaml");
    let (owner, rest) = name.split_once('/').expect("slash");
    let repo = rest.split('/').next().expect("repo");
    root.child(format!("pkgs/{name}/registry.yaml"))
        .write_str(&format!(
            "packages:\n  - type: github_release\n    repo_owner: {owner}\n    repo_name: {repo}\n    asset: {repo}.tar.gz\n"
        ))
        .expect("write registry.yaml");
}

// ---------------------------------------------------------------------------
// 1. Discovery
// ---------------------------------------------------------------------------

#[test]
fn discovers_nested_packages_in_sorted_order() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_package(&root, "zeta/tool", "v1.0.0");
    write_package(&root, "alpha/cli", "v0.1.0");
    write_package(&root, "kubernetes/kubernetes/kubectl", "v1.29.0");
    root.child("pkgs/alpha/README.md").write_str("not a package").expect("write");

    let names = tree::discover_at(root.path()).expect("discover");
    assert_eq!(
        names,
        vec![
            PackageName::from("alpha/cli"),
            PackageName::from("kubernetes/kubernetes/kubectl"),
            PackageName::from("zeta/tool"),
        ]
    );
}

#[test]
fn discovery_matches_file_name_not_content() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("pkgs/a/b/pkg.yaml").write_str("").expect("write");
    root.child("pkgs/a/c/pkg.yml").write_str("packages: []").expect("write");

    let names = tree::discover_at(root.path()).expect("discover");
    assert_eq!(names, vec![PackageName::from("a/b")]);
}

// ---------------------------------------------------------------------------
// 2. Relocation
// ---------------------------------------------------------------------------

#[test]
fn relocate_moves_directory_and_rewrites_references() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_package(&root, "old-owner/tool", "v1.0.0");

    let relocation = tree::relocate_at(
        root.path(),
        &PackageName::from("old-owner/tool"),
        &PackageName::from("new-owner/tool"),
    )
    .expect("relocate");

    assert_eq!(
        relocation,
        Relocation {
            removed: vec![
                "pkgs/old-owner/tool/pkg.yaml".into(),
                "pkgs/old-owner/tool/registry.yaml".into(),
            ],
            added: vec![
                "pkgs/new-owner/tool/pkg.yaml".into(),
                "pkgs/new-owner/tool/registry.yaml".into(),
            ],
        }
    );

    root.child("pkgs/old-owner").assert(predicate::path::missing());
    root.child("pkgs/new-owner/tool/pkg.yaml")
        .assert("packages:\n  - name: new-owner/tool@v1.0.0\n");
    root.child("pkgs/new-owner/tool/registry.yaml")
        .assert(predicate::str::contains("repo_owner: new-owner"));
    root.child("pkgs/new-owner/tool/registry.yaml")
        .assert(predicate::str::contains("repo_name: tool"));
}

#[test]
fn relocate_keeps_sibling_packages_of_old_owner() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_package(&root, "old/one", "v1.0.0");
    write_package(&root, "old/two", "v1.0.0");

    tree::relocate_at(
        root.path(),
        &PackageName::from("old/one"),
        &PackageName::from("new/one"),
    )
    .expect("relocate");

    root.child("pkgs/old/two/pkg.yaml").assert(predicate::path::exists());
    root.child("pkgs/old/one").assert(predicate::path::missing());
}

#[test]
fn relocate_leaves_nested_packages_in_place() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_package(&root, "old/tool", "v1.0.0");
    write_package(&root, "old/tool/plugin", "v0.3.0");
    root.child("pkgs/old/tool/docs/README.md")
        .write_str("notes\n")
        .expect("write readme");

    let relocation = tree::relocate_at(
        root.path(),
        &PackageName::from("old/tool"),
        &PackageName::from("new/tool"),
    )
    .expect("relocate");

    assert_eq!(
        relocation.added,
        vec![
            std::path::PathBuf::from("pkgs/new/tool/docs/README.md"),
            "pkgs/new/tool/pkg.yaml".into(),
            "pkgs/new/tool/registry.yaml".into(),
        ]
    );
    root.child("pkgs/old/tool/pkg.yaml").assert(predicate::path::missing());
    root.child("pkgs/old/tool/docs").assert(predicate::path::missing());
    root.child("pkgs/old/tool/plugin/pkg.yaml")
        .assert("packages:\n  - name: old/tool/plugin@v0.3.0\n");
    root.child("pkgs/new/tool/plugin").assert(predicate::path::missing());

    // The nested package follows on its own without clobbering its parent.
    tree::relocate_at(
        root.path(),
        &PackageName::from("old/tool/plugin"),
        &PackageName::from("new/tool/plugin"),
    )
    .expect("relocate nested");
    root.child("pkgs/old").assert(predicate::path::missing());
    root.child("pkgs/new/tool/pkg.yaml")
        .assert("packages:\n  - name: new/tool@v1.0.0\n");
    root.child("pkgs/new/tool/plugin/pkg.yaml")
        .assert("packages:\n  - name: new/tool/plugin@v0.3.0\n");

    let names = tree::discover_at(root.path()).expect("discover");
    assert_eq!(
        names,
        vec![PackageName::from("new/tool"), PackageName::from("new/tool/plugin")]
    );
}

#[test]
fn relocate_refuses_to_overwrite() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_package(&root, "old/tool", "v1.0.0");
    write_package(&root, "new/tool", "v2.0.0");

    let err = tree::relocate_at(
        root.path(),
        &PackageName::from("old/tool"),
        &PackageName::from("new/tool"),
    )
    .unwrap_err();
    assert!(matches!(err, TreeError::AlreadyExists(_)), "got: {err}");
    root.child("pkgs/old/tool/pkg.yaml").assert(predicate::path::exists());
}

#[test]
fn relocate_missing_source_is_not_found() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let err = tree::relocate_at(
        root.path(),
        &PackageName::from("ghost/tool"),
        &PackageName::from("new/tool"),
    )
    .unwrap_err();
    assert!(matches!(err, TreeError::NotFound(_)), "got: {err}");
}

// ---------------------------------------------------------------------------
// 3. Index regeneration
// ---------------------------------------------------------------------------

#[test]
fn regenerate_index_concatenates_package_registries() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_package(&root, "b/two", "v1.0.0");
    write_package(&root, "a/one", "v1.0.0");

    let path = tree::regenerate_index_at(root.path()).expect("regenerate");
    assert_eq!(path, root.path().join("registry.yaml"));

    let index = std::fs::read_to_string(&path).expect("read index");
    assert!(index.starts_with("# yaml-language-server:"));
    let one = index.find("repo_owner: a").expect("a/one entry");
    let two = index.find("repo_owner: b").expect("b/two entry");
    assert!(one < two, "entries must follow sorted tree order:\n{index}");
}

#[test]
fn regenerate_index_reports_broken_registry_file() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("pkgs/a/b/registry.yaml")
        .write_str("packages: [unclosed")
        .expect("write");

    let err = tree::regenerate_index_at(root.path()).unwrap_err();
    assert!(matches!(err, TreeError::Yaml { .. }), "got: {err}");
    assert!(err.to_string().contains("registry.yaml"));
}
