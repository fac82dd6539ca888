//! Group-chat addressing: @-mentions of the bot and replies to it.

use verdant_core::update::{BotIdentity, ChatKind, InboundMessage};

fn is_username_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Byte spans of `@bot_username` mentions, matched case-insensitively and
/// only on whole usernames.
pub fn find_bot_mention_spans(text: &str, bot_username: &str) -> Vec<(usize, usize)> {
    let bot_username = bot_username.trim_start_matches('@');
    if bot_username.is_empty() {
        return Vec::new();
    }

    let mut spans = Vec::new();
    for (at_idx, ch) in text.char_indices() {
        if ch != '@' {
            continue;
        }
        if text[..at_idx].chars().next_back().is_some_and(is_username_char) {
            continue;
        }

        let start = at_idx + 1;
        let end = text[start..]
            .char_indices()
            .find(|(_, c)| !is_username_char(*c))
            .map_or(text.len(), |(i, _)| start + i);
        if end > start && text[start..end].eq_ignore_ascii_case(bot_username) {
            spans.push((at_idx, end));
        }
    }
    spans
}

/// Remove bot mentions and collapse whitespace. `None` if nothing is left.
pub fn strip_bot_mentions(text: &str, bot_username: &str) -> Option<String> {
    let mut kept = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end) in find_bot_mention_spans(text, bot_username) {
        kept.push_str(&text[cursor..start]);
        cursor = end;
    }
    kept.push_str(&text[cursor..]);

    let normalized = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    (!normalized.is_empty()).then_some(normalized)
}

/// Whether a message is addressed to the bot.
///
/// Private chats always are. In groups the bot must be @-mentioned or the
/// message must reply to one of the bot's messages.
pub fn is_addressed_to_bot(message: &InboundMessage, bot: &BotIdentity) -> bool {
    match message.chat_kind {
        ChatKind::Private => true,
        ChatKind::Group | ChatKind::Supergroup => {
            message.reply_to_user_id == Some(bot.id)
                || message
                    .text
                    .as_deref()
                    .is_some_and(|t| !find_bot_mention_spans(t, &bot.username).is_empty())
        }
        ChatKind::Channel => false,
    }
}
