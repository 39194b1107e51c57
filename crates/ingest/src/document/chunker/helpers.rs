//! Text splitting utilities used by the chunking strategies.

/// Character count (not bytes) -- size limits are specified in characters.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Extract the last `n` characters of `text`.
pub(crate) fn tail_chars(text: &str, n: usize) -> &str {
    let len = char_len(text);
    if len <= n {
        return text;
    }
    let (idx, _) = text.char_indices().nth(len - n).expect("index in range");
    &text[idx..]
}

/// Split `text` into pieces of at most `budget` characters, trying each
/// separator in order. A piece that still exceeds the budget after splitting
/// on a separator is re-split with the remaining (harder) separators; the
/// empty-string separator forces a plain character split. Adjacent pieces are
/// greedily re-merged (rejoined with the separator) up to the budget, so
/// separators are only consumed at piece boundaries.
pub(crate) fn split_recursive(text: &str, budget: usize, separators: &[String]) -> Vec<String> {
    if char_len(text) <= budget {
        let trimmed = text.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    let Some((sep, harder)) = separators.split_first() else {
        return hard_split(text, budget);
    };
    if sep.is_empty() {
        return hard_split(text, budget);
    }

    let mut fragments = Vec::new();
    for piece in text.split(sep.as_str()) {
        if piece.trim().is_empty() {
            continue;
        }
        if char_len(piece) <= budget {
            fragments.push(piece.to_string());
        } else {
            fragments.extend(split_recursive(piece, budget, harder));
        }
    }

    merge_fragments(fragments, sep, budget)
}

/// Split into pieces of exactly `budget` characters (last one may be short),
/// respecting char boundaries.
pub(crate) fn hard_split(text: &str, budget: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(budget.max(1))
        .map(|c| c.iter().collect::<String>())
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Greedily merge adjacent fragments back together (rejoined with `sep`)
/// while the combined length stays within the budget.
fn merge_fragments(fragments: Vec<String>, sep: &str, budget: usize) -> Vec<String> {
    let sep_len = char_len(sep);
    let mut merged: Vec<String> = Vec::with_capacity(fragments.len());
    let mut buf = String::new();

    for frag in fragments {
        if buf.is_empty() {
            buf = frag;
        } else if char_len(&buf) + sep_len + char_len(&frag) <= budget {
            buf.push_str(sep);
            buf.push_str(&frag);
        } else {
            merged.push(std::mem::take(&mut buf));
            buf = frag;
        }
    }
    if !buf.is_empty() {
        merged.push(buf);
    }
    merged
}
