use super::*;
use tempfile::TempDir;

#[test]
fn staging_copies_under_basename() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let source = temp_dir.path().join("notes.txt");
    std::fs::write(&source, "first").expect("should write source");

    let store = UploadStore::new(temp_dir.path().join("uploaded_docs"));
    let staged = store.stage(&source).expect("should stage file");

    assert_eq!(staged, store.dir().join("notes.txt"));
    assert_eq!(
        std::fs::read_to_string(&staged).expect("should read staged file"),
        "first"
    );
    assert_eq!(store.list().expect("should list"), vec!["notes.txt"]);
}

#[test]
fn staging_same_name_overwrites() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let a = temp_dir.path().join("a");
    let b = temp_dir.path().join("b");
    std::fs::create_dir_all(&a).expect("should create dir a");
    std::fs::create_dir_all(&b).expect("should create dir b");
    std::fs::write(a.join("doc.md"), "old").expect("should write");
    std::fs::write(b.join("doc.md"), "new").expect("should write");

    let store = UploadStore::new(temp_dir.path().join("uploads"));
    store.stage(&a.join("doc.md")).expect("should stage first");
    let staged = store.stage(&b.join("doc.md")).expect("should stage second");

    assert_eq!(
        std::fs::read_to_string(staged).expect("should read"),
        "new"
    );
    assert_eq!(store.list().expect("should list").len(), 1);
}

#[test]
fn staging_a_staged_file_is_a_no_op() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = UploadStore::new(temp_dir.path());
    let path = temp_dir.path().join("inplace.txt");
    std::fs::write(&path, "content").expect("should write");

    let staged = store.stage(&path).expect("should stage");

    assert_eq!(
        std::fs::read_to_string(staged).expect("should read"),
        "content"
    );
}

#[test]
fn missing_source_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = UploadStore::new(temp_dir.path().join("uploads"));

    assert!(matches!(
        store.stage(&temp_dir.path().join("ghost.pdf")),
        Err(DocQaError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn clear_removes_everything() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let source = temp_dir.path().join("x.txt");
    std::fs::write(&source, "x").expect("should write");
    let store = UploadStore::new(temp_dir.path().join("uploads"));
    store.stage(&source).expect("should stage");

    store.clear().await.expect("should clear");

    assert!(!store.dir().exists());
    assert!(store.list().expect("should list").is_empty());
    store.clear().await.expect("clearing twice is fine");
}
