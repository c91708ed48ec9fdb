use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use realm_core::{tree, ArtifactEntry, ArtifactKind, Artifacts};

fn realm(dir: &TempDir, rel: &str, config: Option<&str>) {
    let base = if rel.is_empty() {
        dir.child("package.json")
    } else {
        dir.child(format!("{rel}/package.json"))
    };
    base.write_str(r#"{"name": "r"}"#).unwrap();
    if let Some(config) = config {
        let path = if rel.is_empty() {
            ".realm/config.json".to_string()
        } else {
            format!("{rel}/.realm/config.json")
        };
        dir.child(path).write_str(config).unwrap();
    }
}

fn paths(entries: &[ArtifactEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.path.to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn dir_and_file_split_top_level_entries() {
    let temp = TempDir::new().unwrap();
    realm(&temp, "", None);
    temp.child("src/index.js").touch().unwrap();
    temp.child("README.md").touch().unwrap();

    let artifacts = Artifacts::load(temp.path()).unwrap();
    assert_eq!(paths(&artifacts.get("dir").unwrap()), ["src"]);
    assert_eq!(
        paths(&artifacts.get("file").unwrap()),
        ["README.md", "package.json"]
    );
}

#[test]
fn configured_group_honors_exclusions() {
    let temp = TempDir::new().unwrap();
    realm(&temp, "", Some(r#"{"artifacts": {"scripts": ["bin/*.sh", "!bin/skip.sh"]}}"#));
    temp.child("bin/a.sh").touch().unwrap();
    temp.child("bin/skip.sh").touch().unwrap();
    temp.child("bin/notes.txt").touch().unwrap();

    let scripts = Artifacts::load(temp.path()).unwrap().get("scripts").unwrap();
    assert_eq!(
        scripts,
        [ArtifactEntry {
            path: PathBuf::from("bin/a.sh"),
            kind: ArtifactKind::File,
        }]
    );
}

#[test]
fn common_leaves_out_entries_claimed_by_groups() {
    let temp = TempDir::new().unwrap();
    realm(&temp, "", Some(r#"{"artifacts": {"docs": ["docs"]}}"#));
    temp.child("docs/guide.md").touch().unwrap();
    temp.child("src/main.js").touch().unwrap();

    let artifacts = Artifacts::load(temp.path()).unwrap();
    let common = paths(&artifacts.get("common").unwrap());
    assert_eq!(common, [".realm", "package.json", "src"]);
    assert_eq!(paths(&artifacts.get("docs").unwrap()), ["docs"]);
}

#[test]
fn dotted_group_delegates_to_nested_realm() {
    let temp = TempDir::new().unwrap();
    realm(&temp, "", None);
    realm(&temp, "packages/ui", Some(r#"{"artifacts": {"assets": ["img/*.png"]}}"#));
    temp.child("packages/ui/img/logo.png").touch().unwrap();
    temp.child("packages/ui/img/logo.svg").touch().unwrap();

    let artifacts = Artifacts::load(temp.path()).unwrap();
    assert_eq!(
        paths(&artifacts.get("packages.ui.assets").unwrap()),
        ["packages/ui/img/logo.png"]
    );
}

#[test]
fn dotted_group_falls_back_to_plain_path() {
    let temp = TempDir::new().unwrap();
    realm(&temp, "", None);
    temp.child("src/lib/util.js").touch().unwrap();

    let artifacts = Artifacts::load(temp.path()).unwrap();
    assert_eq!(
        artifacts.get("src.lib").unwrap(),
        [ArtifactEntry {
            path: Path::new("src").join("lib"),
            kind: ArtifactKind::Dir,
        }]
    );
    assert!(artifacts.get("src.missing").unwrap().is_empty());
}

#[test]
fn copy_tree_skips_excluded_subtrees() {
    let src = TempDir::new().unwrap();
    src.child("keep/a.txt").write_str("a").unwrap();
    src.child("node_modules/dep/index.js").touch().unwrap();
    let dst = TempDir::new().unwrap();

    let copied = tree::copy_tree(src.path(), dst.path(), |rel| rel.starts_with("node_modules")).unwrap();

    assert_eq!(copied, 1);
    dst.child("keep/a.txt").assert("a");
    dst.child("node_modules").assert(predicate::path::missing());
}

#[test]
fn copy_entries_copies_only_named_entries() {
    let src = TempDir::new().unwrap();
    src.child("package.json").write_str("{}").unwrap();
    src.child("lib/x.js").touch().unwrap();
    src.child("test/x.test.js").touch().unwrap();
    let dst = TempDir::new().unwrap();

    tree::copy_entries(
        src.path(),
        dst.path(),
        &[PathBuf::from("package.json"), PathBuf::from("lib")],
    )
    .unwrap();

    dst.child("package.json").assert(predicate::path::is_file());
    dst.child("lib/x.js").assert(predicate::path::is_file());
    dst.child("test").assert(predicate::path::missing());
}
