use super::estimate_token_count as estimate_token_count_impl;
use super::*;
use crate::loader::SOURCE_KEY;

fn splitter(chunk_size: usize, chunk_overlap: usize) -> RecursiveSplitter {
    RecursiveSplitter::new(&ChunkingConfig {
        chunk_size,
        chunk_overlap,
    })
}

fn segment(content: &str, source: &str) -> Segment {
    let mut metadata = Metadata::new();
    metadata.insert(SOURCE_KEY.to_string(), source.to_string());
    Segment {
        content: content.to_string(),
        metadata,
    }
}

#[test]
fn estimate_token_count() {
    assert_eq!(estimate_token_count_impl("hello world"), 2);
    assert_eq!(estimate_token_count_impl("This is a test."), 5);
    assert_eq!(estimate_token_count_impl(""), 0);
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks = RecursiveSplitter::default()
        .split_text("  LangChain enables building apps powered by LLMs.\n");

    assert_eq!(chunks, vec!["LangChain enables building apps powered by LLMs."]);
}

#[test]
fn empty_text_yields_no_chunks() {
    assert!(RecursiveSplitter::default().split_text("").is_empty());
    assert!(RecursiveSplitter::default().split_text(" \n\n ").is_empty());
}

#[test]
fn paragraphs_are_preferred_boundaries() {
    let chunks = splitter(8, 0).split_text("aa aa\n\nbb bb\n\ncc cc");

    assert_eq!(chunks, vec!["aa aa", "bb bb", "cc cc"]);
}

#[test]
fn sentences_split_before_words() {
    let chunks = splitter(10, 0).split_text("One. Two. Three.");

    assert_eq!(chunks, vec!["One. Two.", "Three."]);
}

#[test]
fn overlap_windows_share_context() {
    let chunks = splitter(4, 1).split_text("abcdefghij");

    assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
}

#[test]
fn overlap_is_clamped_below_chunk_size() {
    let chunks = splitter(3, 9).split_text("abcd");

    assert_eq!(chunks, vec!["abc", "bcd"]);
}

#[test]
fn multibyte_characters_count_once() {
    let text = "a🙂b🙂c🙂";
    let chunks = splitter(3, 0).split_text(text);

    assert_eq!(chunks.concat(), text);
    assert!(chunks.iter().all(|c| c.chars().count() <= 3));
}

#[test]
fn chunks_respect_size_limit() {
    let text = "Advanced usage involves understanding complex concepts. ".repeat(60)
        + "\n\n"
        + &"Another paragraph with different words in it.\n".repeat(30);
    let chunks = RecursiveSplitter::default().split_text(&text);

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.chars().count() <= 500));
    assert!(chunks.iter().all(|c| !c.trim().is_empty()));
}

#[test]
fn chunking_is_deterministic() {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(80);
    let splitter = splitter(120, 20);

    assert_eq!(splitter.split_text(&text), splitter.split_text(&text));
}

#[test]
fn segment_metadata_propagates_to_chunks() {
    let mut first = segment(&"alpha beta gamma. ".repeat(10), "notes.txt");
    first
        .metadata
        .insert("page".to_string(), "1".to_string());
    let second = segment("delta epsilon", "notes.txt");

    let chunks = splitter(60, 10).chunk_segments(&[first, second]);

    assert!(chunks.len() > 2);
    for (index, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.source(), Some("notes.txt"));
        assert_eq!(
            chunk.metadata.get(CHUNK_INDEX_KEY),
            Some(&index.to_string())
        );
    }

    let last = chunks.last().expect("chunks are not empty");
    assert_eq!(last.content, "delta epsilon");
    assert!(!last.metadata.contains_key("page"));
    assert_eq!(chunks[0].metadata.get("page"), Some(&"1".to_string()));
}
