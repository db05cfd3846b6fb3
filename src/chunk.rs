//! Sentence-boundary text chunker with word-aligned overlap.
//!
//! Splits cleaned document text into ordered chunks that respect a soft
//! maximum size `max_chars`. Splitting happens on sentence terminators
//! (`.`, `!`, `?` followed by whitespace) to keep semantic units intact,
//! and each chunk after the first is seeded with the trailing
//! `overlap_chars` of its predecessor so that meaning is preserved across
//! chunk boundaries.
//!
//! # Algorithm
//!
//! 1. Text no longer than `max_chars` is emitted as a single chunk.
//! 2. Otherwise the text is split into sentences and sentences are
//!    accumulated greedily; when the next sentence would push the running
//!    chunk past `max_chars`, the chunk is closed and the next one starts
//!    from the closed chunk's word-aligned tail.
//! 3. A single sentence longer than `max_chars` is emitted whole as its
//!    own chunk; the size bound governs closing decisions, it never
//!    truncates a sentence.
//!
//! Output order is significant (it becomes the chunk index) and stable
//! for a given input.

/// Normalize extracted text before chunking.
///
/// Collapses runs of spaces/tabs to a single space, strips control
/// characters, and collapses runs of three or more newlines down to two.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut space_run = false;
    let mut newline_run = 0u32;

    for c in text.chars() {
        let c = match c {
            '\t' | '\r' => ' ',
            '\n' => '\n',
            c if c.is_control() => continue,
            c => c,
        };
        if c == '\n' {
            newline_run += 1;
            space_run = false;
            if newline_run <= 2 {
                out.push('\n');
            }
        } else if c == ' ' {
            newline_run = 0;
            if !space_run {
                out.push(' ');
            }
            space_run = true;
        } else {
            newline_run = 0;
            space_run = false;
            out.push(c);
        }
    }

    out.trim().to_string()
}

/// Split cleaned text into ordered chunk texts.
///
/// # Guarantees
///
/// - Text of `max_chars` characters or fewer yields exactly one chunk
///   equal to the trimmed input.
/// - Every chunk is at most `max_chars` characters long, except a chunk
///   holding a single sentence that alone exceeds `max_chars`.
/// - Adjacent chunks share a word-aligned overlap of at most
///   `overlap_chars` characters (absent around oversized-sentence
///   chunks, and when the closed chunk's tail holds no word boundary).
/// - Empty or whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        let sentence_len = char_len(sentence);

        // Oversized sentences are never truncated; they become their own
        // chunk with no overlap seeding on either side.
        if sentence_len > max_chars {
            if !current.trim().is_empty() {
                chunks.push(current.trim().to_string());
            }
            current.clear();
            chunks.push(sentence.to_string());
            continue;
        }

        if !current.is_empty() && char_len(&current) + 1 + sentence_len > max_chars {
            let closed = std::mem::take(&mut current).trim().to_string();
            let seed = overlap_tail(&closed, overlap_chars);
            chunks.push(closed);
            // Keep the seed only if the sentence still fits behind it,
            // otherwise the size bound would be violated.
            if !seed.is_empty() && char_len(&seed) + 1 + sentence_len <= max_chars {
                current = seed;
            }
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on sentence terminators (`.`, `!`, `?`) followed by whitespace.
/// Terminators stay attached to their sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut after_terminator = false;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() && after_terminator {
            let sentence = text[start..i].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = i + c.len_utf8();
            after_terminator = false;
        } else {
            after_terminator = matches!(c, '.' | '!' | '?');
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// The trailing `overlap_chars` characters of a closed chunk, advanced to
/// the next word boundary so the following chunk never starts mid-word.
/// A tail with no word boundary yields no overlap at all.
fn overlap_tail(chunk: &str, overlap_chars: usize) -> String {
    if overlap_chars == 0 {
        return String::new();
    }
    let total = char_len(chunk);
    if total <= overlap_chars {
        return chunk.to_string();
    }

    let skip = total - overlap_chars;
    let start = chunk
        .char_indices()
        .nth(skip)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let tail = &chunk[start..];

    match tail.find(' ') {
        Some(pos) => tail[pos + 1..].trim_start().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(n: usize, words_per: usize) -> String {
        (0..n)
            .map(|i| {
                let words: Vec<String> =
                    (0..words_per).map(|w| format!("word{i}x{w}")).collect();
                format!("{}.", words.join(" "))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn short_text_single_chunk() {
        let chunks = chunk_text("  Hello there. Short text.  ", 1000, 100);
        assert_eq!(chunks, vec!["Hello there. Short text.".to_string()]);
    }

    #[test]
    fn empty_text_no_chunks() {
        assert!(chunk_text("", 1000, 100).is_empty());
        assert!(chunk_text("   \n ", 1000, 100).is_empty());
    }

    #[test]
    fn chunks_respect_size_bound() {
        let text = sentences(60, 12);
        let chunks = chunk_text(&text, 300, 50);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(
                c.chars().count() <= 300,
                "chunk exceeds bound: {} chars",
                c.chars().count()
            );
        }
    }

    #[test]
    fn oversized_sentence_emitted_whole() {
        let long_words: Vec<String> = (0..80).map(|i| format!("token{i}")).collect();
        let oversized = format!("{}.", long_words.join(" "));
        let text = format!("Lead sentence here. {} Trailing sentence here.", oversized);
        let chunks = chunk_text(&text, 100, 20);

        let hit = chunks
            .iter()
            .find(|c| c.chars().count() > 100)
            .expect("oversized sentence should survive as one chunk");
        assert_eq!(hit.as_str(), oversized);
    }

    #[test]
    fn adjacent_chunks_share_word_aligned_overlap() {
        let text = sentences(40, 10);
        let overlap = 60;
        let chunks = chunk_text(&text, 300, overlap);
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            // The next chunk opens with a tail of the previous one.
            let lead: &str = next.split(". ").next().unwrap();
            let shared = lead.split(' ').next().unwrap();
            assert!(
                prev.contains(shared),
                "no shared text between {:?} and {:?}",
                prev,
                next
            );
            // Overlap is word-aligned: never starts mid-word.
            let first_word = next.split(' ').next().unwrap();
            assert!(prev.contains(first_word) || !prev.contains(&format!(" {}", first_word)));
        }
    }

    #[test]
    fn overlap_tail_is_bounded_and_word_aligned() {
        let chunk = "alpha beta gamma delta epsilon zeta";
        let tail = overlap_tail(chunk, 15);
        assert!(tail.chars().count() <= 15);
        assert!(chunk.ends_with(&tail));
        // Starts on a word boundary.
        assert!(chunk.contains(&format!(" {}", tail.split(' ').next().unwrap())));
    }

    #[test]
    fn overlap_tail_short_chunk_returned_whole() {
        assert_eq!(overlap_tail("short", 100), "short");
    }

    #[test]
    fn overlap_tail_without_word_boundary_is_empty() {
        // The trailing 12 characters fall inside one long word, so there
        // is no boundary to trim forward to.
        let chunk = format!("head {}.", "w".repeat(30));
        assert_eq!(overlap_tail(&chunk, 12), "");
    }

    #[test]
    fn no_overlap_seed_when_tail_has_no_word_boundary() {
        let long_word = "w".repeat(30);
        let text = format!(
            "Start here {long_word}. Second sentence arrives now. Third one ends the text."
        );
        let chunks = chunk_text(&text, 60, 12);
        assert_eq!(chunks.len(), 2);
        // The successor starts at the next sentence, never mid-word.
        assert!(chunks[1].starts_with("Second sentence"));
    }

    #[test]
    fn deterministic_output() {
        let text = sentences(25, 8);
        assert_eq!(chunk_text(&text, 200, 40), chunk_text(&text, 200, 40));
    }

    #[test]
    fn split_sentences_keeps_terminators() {
        let parts = split_sentences("One here. Two there! Three now? Four");
        assert_eq!(parts, vec!["One here.", "Two there!", "Three now?", "Four"]);
    }

    #[test]
    fn split_sentences_handles_runs_of_terminators() {
        let parts = split_sentences("Really?! Yes. Sure...");
        assert_eq!(parts, vec!["Really?!", "Yes.", "Sure..."]);
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("a   b\t\tc"), "a b c");
    }

    #[test]
    fn clean_text_strips_control_chars() {
        assert_eq!(clean_text("a\u{0000}b\u{0007}c"), "abc");
    }

    #[test]
    fn clean_text_collapses_newline_runs() {
        assert_eq!(clean_text("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_text("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn multibyte_text_survives() {
        let text = "Ingeniería de datos y señales. ".repeat(60);
        let chunks = chunk_text(&text, 200, 50);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.is_char_boundary(0));
            assert!(!c.is_empty());
        }
    }
}
