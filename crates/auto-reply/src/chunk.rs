//! Split composed replies into provider-sized messages.

use parley_common::Error as CommonError;

use crate::Result;

/// Characters that end a sentence. All single-byte, so `idx + 1` is always
/// a char boundary after a match.
pub const SENTENCE_TERMINATORS: [char; 3] = ['.', '?', '!'];

/// Split `text` into ordered chunks of roughly `max_len` characters.
///
/// Each cut lands just after a sentence terminator: the last one inside the
/// `max_len` window if there is one, otherwise the first one after it. With
/// no terminator left, the rest of the text becomes one oversized chunk. Text
/// is never dropped: joining the chunks yields `text`.
///
/// Text that fits (including the empty string) comes back as a single chunk.
pub fn split(text: &str, max_len: usize) -> Result<Vec<String>> {
    if max_len == 0 {
        return Err(CommonError::invalid_argument("max_len", "must be greater than zero").into());
    }

    if window_end(text, max_len).is_none() {
        return Ok(vec![text.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let remaining = &text[start..];
        let Some(end) = window_end(remaining, max_len) else {
            chunks.push(remaining.to_string());
            break;
        };

        let cut = match remaining[..end].rfind(SENTENCE_TERMINATORS) {
            Some(idx) => idx + 1,
            None => remaining[end..]
                .find(SENTENCE_TERMINATORS)
                .map_or(remaining.len(), |idx| end + idx + 1),
        };

        chunks.push(remaining[..cut].to_string());
        start += cut;
    }

    Ok(chunks)
}

/// Byte offset just past the first `max_len` characters of `text`, or `None`
/// when the whole of `text` fits.
fn window_end(text: &str, max_len: usize) -> Option<usize> {
    text.char_indices().nth(max_len).map(|(idx, _)| idx)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn ends_with_terminator(chunk: &str) -> bool {
        chunk.ends_with(SENTENCE_TERMINATORS)
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split("hello", 100).unwrap(), vec!["hello"]);
    }

    #[test]
    fn exact_fit_is_one_chunk() {
        let text = "a".repeat(160);
        assert_eq!(split(&text, 160).unwrap(), vec![text]);
    }

    #[test]
    fn empty_text_is_one_empty_chunk() {
        assert_eq!(split("", 10).unwrap(), vec![String::new()]);
    }

    #[test]
    fn zero_max_is_invalid_argument() {
        let err = split("hello", 0).unwrap_err();
        assert!(err.to_string().contains("max_len"), "{err}");
    }

    #[test]
    fn cuts_after_last_terminator_in_window() {
        let chunks = split("One. Two? Three! Four", 10).unwrap();
        assert_eq!(chunks, vec!["One. Two?", " Three!", " Four"]);
    }

    #[test]
    fn extends_past_window_to_next_terminator() {
        let chunks = split("abcdefghij. tail", 4).unwrap();
        assert_eq!(chunks, vec!["abcdefghij.", " tail"]);
    }

    #[test]
    fn no_terminator_yields_one_oversized_chunk() {
        let text = "x".repeat(50);
        assert_eq!(split(&text, 10).unwrap(), vec![text]);
    }

    #[test]
    fn periods_every_150_chars() {
        let text: String = (0..500)
            .map(|i| if i % 150 == 149 { '.' } else { 'A' })
            .collect();
        let chunks = split(&text, 160).unwrap();

        assert!(chunks.len() >= 3, "{} chunks", chunks.len());
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(ends_with_terminator(chunk));
            assert!(chunk.chars().count() <= 160);
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn multibyte_text_within_limit_is_one_chunk() {
        let text = "Привет мир. ".repeat(8);
        assert_eq!(text.chars().count(), 96);
        assert!(text.len() > 160);
        assert_eq!(split(&text, 160).unwrap(), vec![text]);
    }

    #[test]
    fn multibyte_window_counts_characters() {
        let chunks = split("Ça va. Très bien!", 8).unwrap();
        assert_eq!(chunks, vec!["Ça va.", " Très bien!"]);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = format!("{}é. {}", "é".repeat(10), "ü".repeat(10));
        let chunks = split(&text, 7).unwrap();
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn deterministic() {
        let text = "First sentence here. Second one follows! Third? ".repeat(20);
        assert_eq!(split(&text, 64).unwrap(), split(&text, 64).unwrap());
    }

    #[rstest]
    #[case("", 1)]
    #[case("no terminators at all in this sentence", 5)]
    #[case("a.b.c.d.e.f.g.h.", 1)]
    #[case("Hello there. How are you? I'm fine! Thanks.", 10)]
    #[case("Trailing text without end. Then more words that keep going", 20)]
    #[case("...!!!???", 2)]
    #[case("ünïcödé sentence. ёщё одно предложение! 終わり。", 9)]
    #[case("Привет мир. Как дела? Всё хорошо!", 40)]
    fn lossless_and_bounded(#[case] text: &str, #[case] max_len: usize) {
        let chunks = split(text, max_len).unwrap();
        assert_eq!(chunks.concat(), text);

        for chunk in &chunks {
            if chunk.chars().count() > max_len {
                // Oversized only when the window held no terminator.
                let window: String = chunk.chars().take(max_len).collect();
                assert!(
                    !window.contains(SENTENCE_TERMINATORS),
                    "chunk {chunk:?} exceeds {max_len} despite a terminator in its window"
                );
            }
        }
    }
}
