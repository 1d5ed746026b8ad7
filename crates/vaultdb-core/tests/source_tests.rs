use std::fs;

use tempfile::TempDir;
use vaultdb_core::source::FsVault;
use vaultdb_core::traits::DocumentSource;

fn vault() -> (TempDir, FsVault) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("projects")).unwrap();
    fs::create_dir_all(root.join(".obsidian")).unwrap();
    fs::write(root.join("inbox.md"), "hello\n\nworld").unwrap();
    fs::write(root.join("projects/plan.MD"), "plan").unwrap();
    fs::write(root.join("projects/data.csv"), "a,b").unwrap();
    fs::write(root.join(".obsidian/workspace.md"), "hidden").unwrap();
    let vault = FsVault::new(root, vec!["md".to_string()]);
    (tmp, vault)
}

#[tokio::test]
async fn list_walks_markdown_and_skips_hidden() {
    let (_tmp, vault) = vault();
    let ids = vault.list().await.expect("list");
    assert_eq!(ids, vec!["inbox.md".to_string(), "projects/plan.MD".to_string()]);
}

#[tokio::test]
async fn read_returns_content_or_not_found() {
    let (_tmp, vault) = vault();
    assert_eq!(vault.read("inbox.md").await.expect("read"), "hello\n\nworld");
    let err = vault.read("gone.md").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn ids_cannot_escape_the_root() {
    let (_tmp, vault) = vault();
    assert!(vault.read("../etc/passwd").await.unwrap_err().is_not_found());
    assert!(vault.read("/etc/passwd").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn invalid_utf8_is_read_lossily() {
    let (tmp, vault) = vault();
    fs::write(tmp.path().join("bin.md"), [b'o', b'k', 0xff]).unwrap();
    let text = vault.read("bin.md").await.expect("read");
    assert!(text.starts_with("ok"));
}

#[tokio::test]
async fn missing_root_fails_the_listing() {
    let tmp = TempDir::new().unwrap();
    let vault = FsVault::new(tmp.path().join("typo"), vec!["md".to_string()]);
    let err = vault.list().await.unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[tokio::test]
async fn file_as_root_fails_the_listing() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("note.md"), "x").unwrap();
    let vault = FsVault::new(tmp.path().join("note.md"), vec!["md".to_string()]);
    assert!(vault.list().await.is_err());
}
