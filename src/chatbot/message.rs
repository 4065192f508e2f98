//! Inbound message type and outbound reply shaping.

/// Maximum characters Discord accepts in one message.
pub const MAX_REPLY_CHARS: usize = 2000;

/// A message received from the gateway, reduced to what the engine needs.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub message_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub author_is_bot: bool,
    /// The bot itself is in the mention list.
    pub mentions_bot: bool,
    /// `@everyone` or `@here`.
    pub mentions_everyone: bool,
    pub content: String,
}

/// Cut `text` to at most `max_chars` characters, never splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Shape provider output for sending: cut to the transport limit, and use
/// `filler` when there is nothing worth sending.
pub fn prepare_reply(text: &str, filler: &str) -> String {
    if text.trim().is_empty() {
        return truncate_chars(filler, MAX_REPLY_CHARS).to_string();
    }
    truncate_chars(text, MAX_REPLY_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_reply_cut_to_exact_limit() {
        let long = "x".repeat(2500);
        let reply = prepare_reply(&long, "filler");
        assert_eq!(reply.chars().count(), MAX_REPLY_CHARS);
    }

    #[test]
    fn test_short_reply_untouched() {
        assert_eq!(prepare_reply("hello love", "filler"), "hello love");
        let exact = "y".repeat(MAX_REPLY_CHARS);
        assert_eq!(prepare_reply(&exact, "filler"), exact);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let hearts = "💗".repeat(2100);
        let reply = prepare_reply(&hearts, "filler");
        assert_eq!(reply.chars().count(), MAX_REPLY_CHARS);
        assert!(reply.chars().all(|c| c == '💗'));
    }

    #[test]
    fn test_empty_reply_uses_filler() {
        assert_eq!(prepare_reply("", "Hehe, Mona's here, love."), "Hehe, Mona's here, love.");
        assert_eq!(prepare_reply("  \n ", "filler"), "filler");
    }

    #[test]
    fn test_truncate_chars_short_input() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}
