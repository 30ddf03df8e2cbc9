use std::{future::Future, pin::Pin};

/// Boxed future returned by the capability traits.
///
/// The traits stay object-safe so the worker can hold `Arc<dyn ...>` handles
/// and swap the AWS-backed implementations for in-memory ones.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Returns the longest prefix of `text` that fits in `max` bytes without
/// splitting a character.
pub fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }

    let end = (0..=max)
        .rev()
        .find(|&idx| text.is_char_boundary(idx))
        .unwrap_or(0);
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("", 3), "");

        // Multi-byte characters count once each.
        assert_eq!(truncate_chars("ñandú", 4), "ñand");
    }

    #[test]
    fn test_truncate_bytes() {
        assert_eq!(truncate_bytes("hello", 3), "hel");
        assert_eq!(truncate_bytes("hello", 10), "hello");

        // "é" is two bytes; never cut through it.
        assert_eq!(truncate_bytes("résumé", 2), "r");
        assert_eq!(truncate_bytes("résumé", 3), "ré");
        assert_eq!(truncate_bytes("日本語", 7), "日本");
    }
}
