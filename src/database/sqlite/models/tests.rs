use super::*;

#[test]
fn new_ingested_file_conversion() {
    let new_file = NewIngestedFile::new("report.pdf", 12);

    assert_eq!(new_file.filename, "report.pdf");
    assert_eq!(new_file.chunk_count, 12);
}

#[test]
fn ingested_file_display() {
    let file = IngestedFile {
        id: 1,
        filename: "notes.md".to_string(),
        chunk_count: 3,
        ingested_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .expect("valid timestamp"),
    };

    assert_eq!(file.to_string(), "notes.md (3 chunks, 2024-05-01 12:30:00)");
}
