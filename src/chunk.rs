//! Paragraph-boundary text splitter.
//!
//! Splits extracted document text into pieces that respect an approximate
//! `max_tokens` budget. Splitting occurs on paragraph boundaries (`\n\n`)
//! to preserve semantic coherence; a single oversized paragraph is hard-split
//! at word boundaries. The exact budget is a tunable, not load-bearing.

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split text into bounded pieces. Returns an empty vec for blank input,
/// which ingestion treats as a skippable source.
pub fn split_text(text: &str, max_tokens: usize) -> Vec<String> {
    let max_chars = max_tokens * CHARS_PER_TOKEN;

    if text.trim().is_empty() {
        return Vec::new();
    }

    let paragraphs: Vec<&str> = text.split("\n\n").collect();
    let mut pieces = Vec::new();
    let mut current_buf = String::new();

    for para in paragraphs {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        // If adding this paragraph would exceed max, flush current buffer
        let would_be = if current_buf.is_empty() {
            trimmed.len()
        } else {
            current_buf.len() + 2 + trimmed.len() // +2 for \n\n separator
        };

        if would_be > max_chars && !current_buf.is_empty() {
            pieces.push(std::mem::take(&mut current_buf));
        }

        // A single paragraph over the budget is hard-split on its own
        if trimmed.len() > max_chars {
            if !current_buf.is_empty() {
                pieces.push(std::mem::take(&mut current_buf));
            }
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let split_at = floor_char_boundary(remaining, remaining.len().min(max_chars));
                // Prefer a newline or space boundary
                let actual_split = if split_at < remaining.len() {
                    remaining[..split_at]
                        .rfind('\n')
                        .or_else(|| remaining[..split_at].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(split_at)
                } else {
                    split_at
                };
                pieces.push(remaining[..actual_split].trim().to_string());
                remaining = &remaining[actual_split..];
            }
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() {
        pieces.push(current_buf);
    }

    pieces.retain(|p| !p.is_empty());
    pieces
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_piece() {
        let pieces = split_text("Hello, world!", 800);
        assert_eq!(pieces, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(split_text("", 800).is_empty());
        assert!(split_text("   \n\n  ", 800).is_empty());
    }

    #[test]
    fn test_paragraphs_merged_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let pieces = split_text(text, 800);
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].contains("First paragraph."));
        assert!(pieces[0].contains("Third paragraph."));
    }

    #[test]
    fn test_paragraphs_split_over_limit() {
        // max_tokens=5 => 20 chars
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let pieces = split_text(text, 5);
        assert!(pieces.len() > 1);
        for p in &pieces {
            assert!(!p.is_empty());
        }
    }

    #[test]
    fn test_order_preserved() {
        let text = (0..30)
            .map(|i| format!("Paragraph number {}.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let pieces = split_text(&text, 10);
        let joined = pieces.join(" ");
        let first = joined.find("number 0").unwrap();
        let last = joined.find("number 29").unwrap();
        assert!(first < last);
    }

    #[test]
    fn test_oversized_paragraph_hard_split() {
        let text = "word ".repeat(100);
        let pieces = split_text(&text, 10); // 40 chars
        assert!(pieces.len() > 1);
        for p in &pieces {
            assert!(p.len() <= 40, "piece too long: {}", p.len());
        }
    }

    #[test]
    fn test_multibyte_hard_split_stays_on_boundary() {
        let text = "æøå".repeat(50);
        let pieces = split_text(&text, 10);
        assert!(!pieces.is_empty());
    }
}
