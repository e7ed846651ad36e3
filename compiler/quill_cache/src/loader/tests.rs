#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;

use super::{FileLoader, MemoryLoader, SourceHandle, TemplateLoader};

#[test]
fn memory_loader_bumps_revisions() {
    let loader = MemoryLoader::new().with("a.ftl", "one");
    let source = loader.find_source("a.ftl").unwrap().unwrap();
    let first = loader.last_modified(&source).unwrap();
    assert_eq!(loader.read_source(&source).unwrap(), "one");

    loader.put("a.ftl", "two");
    let second = loader.last_modified(&source).unwrap();
    assert!(second > first);
    assert_eq!(loader.read_source(&source).unwrap(), "two");
}

#[test]
fn memory_loader_missing_and_removed() {
    let loader = MemoryLoader::new().with("a.ftl", "x");
    assert_eq!(loader.find_source("b.ftl").unwrap(), None);
    let source = loader.find_source("a.ftl").unwrap().unwrap();
    assert!(loader.remove("a.ftl"));
    assert!(loader.read_source(&source).is_err());
    assert!(loader.last_modified(&source).is_err());
}

#[test]
fn file_loader_reads_under_its_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("mail")).unwrap();
    std::fs::write(dir.path().join("mail/welcome.ftl"), "Hi ${name}").unwrap();

    let loader = FileLoader::new(dir.path());
    let source = loader.find_source("mail/welcome.ftl").unwrap().unwrap();
    assert_eq!(source, SourceHandle::new("mail/welcome.ftl"));
    assert_eq!(loader.read_source(&source).unwrap(), "Hi ${name}");
    assert!(loader.last_modified(&source).is_ok());

    assert_eq!(loader.find_source("mail/missing.ftl").unwrap(), None);
    assert_eq!(loader.find_source("mail").unwrap(), None);
}

#[test]
fn file_loader_never_leaves_its_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("templates");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(dir.path().join("secret.ftl"), "no").unwrap();

    let loader = FileLoader::new(&root);
    assert_eq!(loader.find_source("../secret.ftl").unwrap(), None);
    assert_eq!(loader.find_source("/etc/passwd").unwrap(), None);
    assert!(loader
        .read_source(&SourceHandle::new("../secret.ftl"))
        .is_err());
}
