use criterion::{Criterion, criterion_group, criterion_main};
use doc_qa::embeddings::{ChunkingConfig, RecursiveSplitter};
use doc_qa::loader::load_document;
use std::fmt::Write as _;
use std::hint::black_box;

fn sample_markdown() -> String {
    let mut doc = String::new();
    for section in 0..40 {
        let _ = writeln!(doc, "# Section {section}\n");
        for paragraph in 0..6 {
            let _ = writeln!(
                doc,
                "Paragraph {paragraph} of section {section}. LangChain composes prompts, \
                 retrievers and models into chains. Vector stores index embeddings so that \
                 similar passages can be found quickly. Each answer cites its sources.\n"
            );
        }
    }
    doc
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = sample_markdown();
    let splitter = RecursiveSplitter::new(&ChunkingConfig::default());

    c.bench_function("split_text", |b| {
        b.iter(|| splitter.split_text(black_box(&text)))
    });

    let dir = tempfile::TempDir::new().expect("can create temp dir");
    let path = dir.path().join("guide.md");
    std::fs::write(&path, &text).expect("can write sample document");

    c.bench_function("load_and_chunk_markdown", |b| {
        b.iter(|| {
            let document = load_document(black_box(&path)).expect("can load sample document");
            splitter.chunk_segments(&document.segments)
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
