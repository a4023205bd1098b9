//! Line-aware message chunking for Discord.
//!
//! Discord limits message content to 2000 characters. Replies are split at
//! line boundaries; limits are counted in characters, never bytes, so a
//! split never lands inside a multi-byte character.

/// Split `text` into segments of at most `limit` characters, breaking only
/// at newlines.
///
/// Paragraphs (lines) are joined greedily with a single `\n`. A paragraph
/// longer than `limit` on its own is emitted as one oversized segment; use
/// [`split_oversized`] to enforce a hard bound. Joining the result with
/// `\n` reproduces `text` exactly.
pub fn chunk_paragraphs(text: &str, limit: usize) -> Vec<String> {
    if char_len(text) <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Option<String> = None;
    let mut current_len = 0;

    for paragraph in text.split('\n') {
        let paragraph_len = char_len(paragraph);

        if let Some(segment) = current.as_mut()
            && current_len + 1 + paragraph_len <= limit
        {
            segment.push('\n');
            segment.push_str(paragraph);
            current_len += 1 + paragraph_len;
            continue;
        }

        if let Some(closed) = current.replace(paragraph.to_string()) {
            chunks.push(closed);
        }
        current_len = paragraph_len;
    }

    if let Some(last) = current {
        chunks.push(last);
    }
    chunks
}

/// Hard-split a segment into pieces of at most `limit` characters.
pub fn split_oversized(segment: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if char_len(segment) <= limit {
        return vec![segment.to_string()];
    }

    let chars: Vec<char> = segment.chars().collect();
    chars
        .chunks(limit)
        .map(|piece| piece.iter().collect())
        .collect()
}

/// Segments ready for delivery: line-aware chunks, oversized ones hard-split,
/// blank ones dropped (Discord rejects empty messages).
pub fn delivery_segments(text: &str, limit: usize) -> Vec<String> {
    chunk_paragraphs(text, limit)
        .into_iter()
        .flat_map(|segment| split_oversized(&segment, limit))
        .filter(|segment| !segment.trim().is_empty())
        .collect()
}

/// The trailing `limit` characters of `text`, shown while a reply streams.
pub fn live_window(text: &str, limit: usize) -> &str {
    let total = char_len(text);
    if total <= limit {
        return text;
    }
    text.char_indices()
        .nth(total - limit)
        .map_or(text, |(start, _)| &text[start..])
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_no_split() {
        assert_eq!(chunk_paragraphs("Hello, world!", 100), vec!["Hello, world!"]);
    }

    #[test]
    fn test_exact_limit() {
        let text = "a".repeat(100);
        assert_eq!(chunk_paragraphs(&text, 100), vec![text]);
    }

    #[test]
    fn test_split_at_line_boundary() {
        let text = format!("{}\n{}", "a".repeat(50), "b".repeat(50));
        let chunks = chunk_paragraphs(&text, 60);
        assert_eq!(chunks, vec!["a".repeat(50), "b".repeat(50)]);
    }

    #[test]
    fn test_greedy_packing() {
        let text = "aaa\nbbb\nccc\nddd";
        // "aaa\nbbb" is 7 chars; adding "\nccc" would make 11.
        let chunks = chunk_paragraphs(text, 8);
        assert_eq!(chunks, vec!["aaa\nbbb", "ccc\nddd"]);
    }

    #[test]
    fn test_join_round_trip() {
        let text = "first line\n\nsecond paragraph here\n\n\nthird\nfourth line is longer\n";
        for limit in [22, 25, 30, 40] {
            let chunks = chunk_paragraphs(text, limit);
            assert!(chunks.iter().all(|c| c.chars().count() <= limit), "limit {limit}");
            assert_eq!(chunks.join("\n"), text, "limit {limit}");
        }
    }

    #[test]
    fn test_paragraph_exactly_at_limit_after_split() {
        let text = format!("{}\n{}", "a".repeat(10), "b".repeat(10));
        let chunks = chunk_paragraphs(&text, 10);
        assert_eq!(chunks, vec!["a".repeat(10), "b".repeat(10)]);
    }

    #[test]
    fn test_oversized_paragraph_kept_whole() {
        let text = format!("short\n{}\ntail", "x".repeat(30));
        let chunks = chunk_paragraphs(&text, 10);
        assert_eq!(chunks, vec!["short".to_string(), "x".repeat(30), "tail".to_string()]);
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_limit_counts_characters_not_bytes() {
        // 10 two-byte characters fit a limit of 10.
        let text = "é".repeat(10);
        assert_eq!(chunk_paragraphs(&text, 10).len(), 1);
    }

    #[test]
    fn test_split_oversized_hard_cut() {
        let pieces = split_oversized(&"x".repeat(250), 100);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].len(), 100);
        assert_eq!(pieces[2].len(), 50);
    }

    #[test]
    fn test_delivery_segments_respect_limit() {
        let text = format!("intro\n{}\noutro", "y".repeat(25));
        let segments = delivery_segments(&text, 10);
        assert!(segments.iter().all(|s| s.chars().count() <= 10));
        assert_eq!(segments.concat().replace('\n', ""), text.replace('\n', ""));
    }

    #[test]
    fn test_delivery_segments_drop_blank() {
        let text = format!("{}\n\n{}", "a".repeat(10), "b".repeat(10));
        let segments = delivery_segments(&text, 10);
        assert_eq!(segments, vec!["a".repeat(10), "b".repeat(10)]);
    }

    #[test]
    fn test_live_window_short_text_unchanged() {
        assert_eq!(live_window("hello", 10), "hello");
    }

    #[test]
    fn test_live_window_keeps_tail() {
        let text = format!("{}{}", "a".repeat(5), "b".repeat(10));
        assert_eq!(live_window(&text, 10), "b".repeat(10));
    }

    #[test]
    fn test_live_window_multibyte() {
        let text = "αβγδε";
        assert_eq!(live_window(text, 2), "δε");
    }
}
