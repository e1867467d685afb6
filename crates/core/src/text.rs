//! Reply text shaping: whitespace normalization and sentence-aware
//! splitting of overlong model output into widget-sized chunks.

/// Collapse runs of three or more newlines into a blank line and trim the
/// ends. Model output tends to arrive with decorative vertical whitespace.
pub fn normalize_whitespace(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut newline_run = 0usize;

    for ch in raw.replace("\r\n", "\n").chars() {
        if ch == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                output.push(ch);
            }
        } else {
            newline_run = 0;
            output.push(ch);
        }
    }

    output.trim().to_string()
}

/// Split a reply into chunks of at most `limit` characters, preferring
/// sentence boundaries and falling back to word boundaries. A single word
/// longer than the limit is hard-cut; everything shorter never splits
/// mid-word.
pub fn split_reply(raw: &str, limit: usize) -> Vec<String> {
    let clean = normalize_whitespace(raw);
    if clean.is_empty() {
        return Vec::new();
    }
    if char_len(&clean) <= limit {
        return vec![clean];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences(&clean) {
        let sentence_len = char_len(&sentence);

        if sentence_len > limit {
            flush(&mut chunks, &mut current);
            push_words(&sentence, limit, &mut chunks, &mut current);
            continue;
        }

        if !current.is_empty() && char_len(&current) + 1 + sentence_len > limit {
            flush(&mut chunks, &mut current);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&sentence);
    }

    flush(&mut chunks, &mut current);
    chunks
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

/// Cut after `.`, `!`, `?` or a newline. Good enough for chat prose; a
/// decimal number may split early, which only costs an extra chunk break.
fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();

    for ch in text.chars() {
        if ch == '\n' {
            let trimmed = buf.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
            buf.clear();
            continue;
        }
        buf.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = buf.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
            buf.clear();
        }
    }

    let trimmed = buf.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    out
}

fn push_words(sentence: &str, limit: usize, chunks: &mut Vec<String>, current: &mut String) {
    for word in sentence.split_whitespace() {
        if char_len(word) > limit {
            flush(chunks, current);
            let mut piece = String::new();
            for ch in word.chars() {
                if char_len(&piece) == limit {
                    chunks.push(piece.clone());
                    piece.clear();
                }
                piece.push(ch);
            }
            if !piece.is_empty() {
                chunks.push(piece);
            }
            continue;
        }

        if !current.is_empty() && char_len(current) + 1 + char_len(word) > limit {
            flush(chunks, current);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    flush(chunks, current);
}

#[cfg(test)]
mod tests {
    use super::{normalize_whitespace, split_reply};

    #[test]
    fn excess_vertical_whitespace_is_collapsed() {
        let raw = "Olá!\n\n\n\nTudo bem?\n\n- item";
        assert_eq!(normalize_whitespace(raw), "Olá!\n\nTudo bem?\n\n- item");
    }

    #[test]
    fn short_replies_come_back_as_a_single_chunk() {
        let chunks = split_reply("Tudo certo! Posso ajudar em algo mais?", 600);
        assert_eq!(chunks, vec!["Tudo certo! Posso ajudar em algo mais?".to_string()]);
    }

    #[test]
    fn long_replies_split_at_sentence_boundaries() {
        let reply = "Primeira frase sobre o produto. Segunda frase com mais detalhes. \
                     Terceira frase encerrando o assunto.";
        let chunks = split_reply(reply, 70);

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 70, "chunk over the limit: {chunk}");
            assert!(!chunk.starts_with(' ') && !chunk.ends_with(' '));
        }
        assert!(chunks[0].ends_with('.'));
        assert_eq!(chunks.join(" "), reply.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn oversized_sentence_falls_back_to_word_boundaries() {
        let reply = "palavra ".repeat(40);
        let chunks = split_reply(&reply, 30);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 30);
            assert!(chunk.split_whitespace().all(|word| word == "palavra"), "mid-word cut");
        }
    }

    #[test]
    fn a_single_word_over_the_limit_is_hard_cut() {
        let chunks = split_reply("a".repeat(25).as_str(), 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn utf8_text_counts_characters_not_bytes() {
        let reply = "ação são né João. ".repeat(10);
        for chunk in split_reply(&reply, 40) {
            assert!(chunk.chars().count() <= 40);
        }
    }
}
