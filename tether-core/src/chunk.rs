// ABOUTME: Outbound message splitting for platforms with a per-message length cap
// ABOUTME: Prefixes the assistant identity once, then slices into fixed-size chunks

/// Prefix that marks a message as written by the assistant
pub fn assistant_prefix(assistant_name: &str) -> String {
    format!("**{}:** ", assistant_name)
}

/// Split `text` into consecutive slices of exactly `max_len` characters.
///
/// Lengths are counted in `char`s so a slice never cuts a code point. The
/// final slice may be shorter. Text within the limit comes back as a single
/// chunk, including empty text. A `max_len` of zero is treated as one.
pub fn split_fixed(text: &str, max_len: usize) -> Vec<&str> {
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_len {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);

    chunks
}

/// Apply the assistant prefix to the whole text, then split.
///
/// The prefix is not repeated on later chunks.
pub fn prefixed_chunks(assistant_name: &str, text: &str, max_len: usize) -> Vec<String> {
    let prefixed = format!("{}{}", assistant_prefix(assistant_name), text);
    split_fixed(&prefixed, max_len)
        .into_iter()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
