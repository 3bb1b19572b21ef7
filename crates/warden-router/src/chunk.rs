//! Outbound message splitting.
//!
//! Chat transports cap message size. Long agent replies are split at
//! natural boundaries so code blocks and paragraphs survive mostly intact:
//! paragraph breaks first, then single newlines, then a hard cut at the
//! nearest char boundary. Every chunk is valid UTF-8.

/// Split `text` into chunks of at most `limit` bytes.
///
/// Separator newlines at a split point are dropped rather than carried
/// into either chunk. Empty input yields no chunks.
#[must_use]
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text.trim_end_matches('\n');

    while !remaining.is_empty() {
        if remaining.len() <= limit {
            chunks.push(remaining.to_string());
            break;
        }

        let cut = split_point(remaining, limit);
        let (head, tail) = remaining.split_at(cut);
        let head = head.trim_end_matches('\n');
        if !head.is_empty() {
            chunks.push(head.to_string());
        }
        remaining = tail.trim_start_matches('\n');
    }

    chunks
}

/// Pick where to cut so the head stays within `limit` bytes.
///
/// Always returns a char boundary greater than zero, so the caller makes
/// progress even when a single char is wider than the limit.
fn split_point(text: &str, limit: usize) -> usize {
    let hard = text.floor_char_boundary(limit);
    if hard == 0 {
        // The first char alone exceeds the limit; emit it whole.
        return text
            .char_indices()
            .nth(1)
            .map_or(text.len(), |(idx, _)| idx);
    }

    let window = &text[..hard];
    for delimiter in ["\n\n", "\n"] {
        if let Some(pos) = window.rfind(delimiter)
            && pos > 0
        {
            return pos;
        }
    }
    hard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_text("hello", 100), vec!["hello"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("\n\n", 100).is_empty());
    }

    #[test]
    fn splits_at_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(50), "b".repeat(50));
        let chunks = chunk_text(&text, 60);
        assert_eq!(chunks, vec!["a".repeat(50), "b".repeat(50)]);
    }

    #[test]
    fn falls_back_to_single_newline() {
        let text = format!("{}\n{}", "a".repeat(50), "b".repeat(50));
        let chunks = chunk_text(&text, 60);
        assert_eq!(chunks, vec!["a".repeat(50), "b".repeat(50)]);
    }

    #[test]
    fn hard_cuts_unbroken_text() {
        let text = "x".repeat(250);
        let chunks = chunk_text(&text, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[1].len(), 100);
        assert_eq!(chunks[2].len(), 50);
    }

    #[test]
    fn never_splits_inside_a_char() {
        // Each of these is 3 bytes; a 10-byte limit lands mid-char.
        let text = "好".repeat(20);
        let chunks = chunk_text(&text, 10);
        for chunk in &chunks {
            assert!(chunk.len() <= 10);
            assert!(!chunk.is_empty());
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn oversized_single_char_still_makes_progress() {
        let text = "好好";
        let chunks = chunk_text(text, 1);
        assert_eq!(chunks, vec!["好", "好"]);
    }

    #[test]
    fn prefers_latest_boundary_within_window() {
        let text = "one\ntwo\nthree-is-long";
        // Window of 12 bytes covers both newlines; the later one wins.
        let chunks = chunk_text(text, 12);
        assert_eq!(chunks[0], "one\ntwo");
    }
}
