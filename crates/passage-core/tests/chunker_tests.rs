use passage_core::chunker::{normalize_text, MIN_CHUNK_CHARS};
use passage_core::types::SourceDocument;
use passage_core::{Chunker, Error};

fn numbered_words(n: usize) -> String {
    (0..n).map(|i| format!("word{i:03}")).collect::<Vec<_>>().join(" ")
}

#[test]
fn rejects_overlap_not_smaller_than_size() {
    assert!(matches!(Chunker::new(10, 10), Err(Error::InvalidConfig(_))));
    assert!(matches!(Chunker::new(5, 8), Err(Error::InvalidConfig(_))));
    assert!(Chunker::new(10, 9).is_ok());
}

#[test]
fn window_count_is_ceiling_of_words_over_stride() {
    let chunker = Chunker::new(10, 3).expect("chunker");
    assert_eq!((chunker.chunk_size(), chunker.chunk_overlap()), (10, 3));
    assert_eq!(chunker.stride(), 7);
    assert_eq!(chunker.window_count(0), 0);
    assert_eq!(chunker.window_count(7), 1);
    assert_eq!(chunker.window_count(8), 2);
    assert_eq!(chunker.window_count(25), 4);
}

#[test]
fn short_tail_window_is_dropped_without_consuming_an_id() {
    // 25 words, stride 7: windows start at 0, 7, 14, 21. The last holds 4 words (< 50 chars).
    let chunker = Chunker::new(10, 3).expect("chunker");
    let chunks = chunker.chunk(&numbered_words(25), "doc");

    assert_eq!(chunks.len(), 3);
    let ids: Vec<u64> = chunks.iter().map(|c| c.chunk_id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    for c in &chunks {
        assert!(c.text.trim().chars().count() > MIN_CHUNK_CHARS);
        assert_eq!(c.source, "doc");
        assert_eq!(c.word_count, 10);
    }
    assert_eq!(chunks[1].start_word, 7);
    assert_eq!(chunks[1].text.split_whitespace().next(), Some("word007"));
}

#[test]
fn clipped_window_keeps_pre_clip_bounds() {
    let text = vec!["photosynthesis"; 12].join(" ");
    let chunker = Chunker::new(10, 2).expect("chunker");
    let chunks = chunker.chunk(&text, "plants.txt");

    assert_eq!(chunks.len(), 2);
    let tail = &chunks[1];
    assert_eq!(tail.start_word, 8);
    assert_eq!(tail.end_word, 18);
    assert_eq!(tail.word_count, 4);
}

#[test]
fn consecutive_windows_share_overlap_words() {
    let chunker = Chunker::new(10, 3).expect("chunker");
    let chunks = chunker.chunk(&numbered_words(30), "doc");
    let first: Vec<&str> = chunks[0].text.split_whitespace().collect();
    let second: Vec<&str> = chunks[1].text.split_whitespace().collect();
    assert_eq!(&first[7..], &second[..3]);
}

#[test]
fn text_below_threshold_yields_nothing() {
    let chunker = Chunker::new(300, 50).expect("chunker");
    assert!(chunker.chunk("too short to keep", "doc").is_empty());
    assert!(chunker.chunk("", "doc").is_empty());
}

#[test]
fn chunk_documents_numbers_across_the_run() {
    let chunker = Chunker::new(10, 3).expect("chunker");
    let docs = vec![
        SourceDocument::new("a.txt", numbered_words(25)),
        SourceDocument::new("b.txt", "tiny"),
        SourceDocument::new("c.txt", numbered_words(14)),
    ];
    let chunks = chunker.chunk_documents(&docs);

    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.chunk_id, i as u64);
    }
    assert_eq!(chunks.iter().filter(|c| c.source == "a.txt").count(), 3);
    assert!(chunks.iter().all(|c| c.source != "b.txt"));
    assert_eq!(chunks.last().map(|c| c.source.as_str()), Some("c.txt"));
}

#[test]
fn normalize_strips_symbols_and_short_lines() {
    let raw = "Page 3\n\nPlants   convert <b>light</b> into energy!\n  ~~~~~~~~~~~~~~~~  \nChlorophyll absorbs red & blue light.";
    let cleaned = normalize_text(raw);
    assert_eq!(
        cleaned,
        "Plants convert blightb into energy! Chlorophyll absorbs red blue light."
    );
}
