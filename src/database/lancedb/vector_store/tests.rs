use super::*;
use tempfile::TempDir;

fn record(content: &str, source: &str, vector: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        id: uuid::Uuid::new_v4().to_string(),
        vector,
        content: content.to_string(),
        source: source.to_string(),
        metadata: format!(r#"{{"source":"{source}"}}"#),
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

async fn open_store(dimension: usize) -> (VectorStore, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = VectorStore::open(&temp_dir.path().join("vector_store"), dimension)
        .await
        .expect("should open vector store");
    (store, temp_dir)
}

#[tokio::test]
async fn new_store_is_empty() {
    let (store, _temp_dir) = open_store(3).await;

    assert_eq!(store.table_name, TABLE_NAME);
    assert_eq!(store.vector_dimension(), 3);
    assert_eq!(store.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn insert_and_count_by_source() {
    let (mut store, _temp_dir) = open_store(3).await;

    store
        .insert(&[
            record("alpha", "a.txt", vec![1.0, 0.0, 0.0]),
            record("beta", "a.txt", vec![0.0, 1.0, 0.0]),
            record("gamma", "o'brien.md", vec![0.0, 0.0, 1.0]),
        ])
        .await
        .expect("should insert");

    assert_eq!(store.count().await.expect("should count"), 3);
    assert_eq!(store.count_source("a.txt").await.expect("count"), 2);
    assert_eq!(store.count_source("o'brien.md").await.expect("count"), 1);
    assert_eq!(store.count_source("missing.pdf").await.expect("count"), 0);
}

#[tokio::test]
async fn empty_insert_is_a_no_op() {
    let (mut store, _temp_dir) = open_store(3).await;

    store.insert(&[]).await.expect("should accept empty insert");

    assert_eq!(store.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn search_orders_by_distance() {
    let (mut store, _temp_dir) = open_store(3).await;
    store
        .insert(&[
            record("far", "x.txt", vec![0.0, 0.0, 1.0]),
            record("exact", "x.txt", vec![1.0, 0.0, 0.0]),
            record("close", "x.txt", vec![0.9, 0.1, 0.0]),
        ])
        .await
        .expect("should insert");

    let rows = store
        .search(&[1.0, 0.0, 0.0], 2)
        .await
        .expect("should search");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].content, "exact");
    assert_eq!(rows[1].content, "close");
    let first = rows[0].distance.expect("distance is reported");
    let second = rows[1].distance.expect("distance is reported");
    assert!(first <= second);
    assert!(first.abs() < 1e-6);
}

#[tokio::test]
async fn sample_is_bounded() {
    let (mut store, _temp_dir) = open_store(3).await;
    let records: Vec<_> = (0..5)
        .map(|i| record(&format!("row {i}"), "many.txt", vec![i as f32, 0.0, 1.0]))
        .collect();
    store.insert(&records).await.expect("should insert");

    let sample = store.sample(3).await.expect("should sample");

    assert_eq!(sample.len(), 3);
    assert!(sample.iter().all(|row| row.source == "many.txt"));
    assert!(sample.iter().all(|row| row.distance.is_none()));
}

#[tokio::test]
async fn empty_table_adopts_new_dimension() {
    let (mut store, _temp_dir) = open_store(768).await;

    store
        .insert(&[record("small", "s.txt", vec![0.5, 0.5])])
        .await
        .expect("empty table should be recreated");

    assert_eq!(store.vector_dimension(), 2);
    assert_eq!(store.count().await.expect("should count"), 1);
}

#[tokio::test]
async fn populated_table_rejects_other_dimension() {
    let (mut store, _temp_dir) = open_store(3).await;
    store
        .insert(&[record("three", "t.txt", vec![1.0, 2.0, 3.0])])
        .await
        .expect("should insert");

    let result = store.insert(&[record("two", "t.txt", vec![1.0, 2.0])]).await;

    assert!(matches!(result, Err(DocQaError::Index(_))));
    assert_eq!(store.count().await.expect("should count"), 1);
}

#[tokio::test]
async fn mixed_dimensions_in_one_batch_are_rejected() {
    let (mut store, _temp_dir) = open_store(2).await;

    let result = store
        .insert(&[
            record("a", "m.txt", vec![1.0, 2.0]),
            record("b", "m.txt", vec![1.0, 2.0, 3.0]),
        ])
        .await;

    assert!(matches!(result, Err(DocQaError::Index(_))));
}

#[tokio::test]
async fn reopening_keeps_existing_dimension() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("vector_store");
    {
        let mut store = VectorStore::open(&path, 768).await.expect("should open");
        store
            .insert(&[record("persisted", "p.txt", vec![1.0, 0.0])])
            .await
            .expect("should insert");
    }

    let store = VectorStore::open(&path, 768).await.expect("should reopen");

    assert_eq!(store.vector_dimension(), 2);
    assert_eq!(store.count().await.expect("should count"), 1);
}
