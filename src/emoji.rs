use std::fmt;

use async_trait::async_trait;

use crate::platform::{ChatClient, CustomEmoji};

/// An emoji that can be attached to a message as a reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedEmoji {
    Unicode(String),
    Custom(CustomEmoji),
}

impl fmt::Display for ResolvedEmoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedEmoji::Unicode(s) => write!(f, "{}", s),
            ResolvedEmoji::Custom(e) if e.animated => write!(f, "<a:{}:{}>", e.name, e.id),
            ResolvedEmoji::Custom(e) => write!(f, "<:{}:{}>", e.name, e.id),
        }
    }
}

/// One strategy for turning a configured emoji name into something reactable.
#[async_trait]
pub trait EmojiResolver: Send + Sync {
    fn kind(&self) -> &'static str;

    async fn resolve(&self, client: &dyn ChatClient, name: &str) -> Option<ResolvedEmoji>;
}

/// Standard Unicode emoji, looked up by gemoji shortcode (`smile`, `thumbsup`, ...).
pub struct UnicodeShortcode;

#[async_trait]
impl EmojiResolver for UnicodeShortcode {
    fn kind(&self) -> &'static str {
        "unicode"
    }

    async fn resolve(&self, _client: &dyn ChatClient, name: &str) -> Option<ResolvedEmoji> {
        emojis::get_by_shortcode(name).map(|e| ResolvedEmoji::Unicode(e.as_str().to_string()))
    }
}

/// Custom emoji from any guild visible to the client. Exact, case-sensitive name match.
pub struct GuildCustomEmoji;

#[async_trait]
impl EmojiResolver for GuildCustomEmoji {
    fn kind(&self) -> &'static str {
        "custom"
    }

    async fn resolve(&self, client: &dyn ChatClient, name: &str) -> Option<ResolvedEmoji> {
        client
            .custom_emojis()
            .await
            .into_iter()
            .find(|e| e.name == name)
            .map(ResolvedEmoji::Custom)
    }
}

/// Resolvers in the order they are tried.
pub fn default_resolvers() -> Vec<Box<dyn EmojiResolver>> {
    vec![Box::new(UnicodeShortcode), Box::new(GuildCustomEmoji)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{IncomingMessage, ReactionError};

    struct EmojiList(Vec<CustomEmoji>);

    #[async_trait]
    impl ChatClient for EmojiList {
        fn current_user_id(&self) -> Option<String> {
            None
        }

        async fn custom_emojis(&self) -> Vec<CustomEmoji> {
            self.0.clone()
        }

        async fn add_reaction(
            &self,
            _message: &IncomingMessage,
            _emoji: &ResolvedEmoji,
        ) -> Result<(), ReactionError> {
            Ok(())
        }
    }

    fn custom(id: u64, name: &str) -> CustomEmoji {
        CustomEmoji {
            id,
            name: name.to_string(),
            animated: false,
        }
    }

    #[tokio::test]
    async fn test_shortcode_resolves_to_unicode() {
        let client = EmojiList(vec![]);
        let resolved = UnicodeShortcode.resolve(&client, "smile").await;
        assert_eq!(resolved, Some(ResolvedEmoji::Unicode("\u{1f604}".to_string())));
    }

    #[tokio::test]
    async fn test_shortcode_requires_bare_name() {
        let client = EmojiList(vec![]);
        assert_eq!(UnicodeShortcode.resolve(&client, ":smile:").await, None);
        assert_eq!(UnicodeShortcode.resolve(&client, "pepehands").await, None);
    }

    #[tokio::test]
    async fn test_custom_emoji_exact_match() {
        let client = EmojiList(vec![custom(1, "PepeHands"), custom(2, "pepehands")]);
        let resolved = GuildCustomEmoji.resolve(&client, "pepehands").await;
        assert_eq!(resolved, Some(ResolvedEmoji::Custom(custom(2, "pepehands"))));
    }

    #[tokio::test]
    async fn test_custom_emoji_is_case_sensitive() {
        let client = EmojiList(vec![custom(1, "PepeHands")]);
        assert_eq!(GuildCustomEmoji.resolve(&client, "pepehands").await, None);
    }

    #[tokio::test]
    async fn test_custom_emoji_first_match_wins() {
        let client = EmojiList(vec![custom(7, "kekw"), custom(8, "kekw")]);
        let resolved = GuildCustomEmoji.resolve(&client, "kekw").await;
        assert_eq!(resolved, Some(ResolvedEmoji::Custom(custom(7, "kekw"))));
    }

    #[test]
    fn test_display() {
        let mut animated = custom(42, "party");
        assert_eq!(ResolvedEmoji::Custom(animated.clone()).to_string(), "<:party:42>");
        animated.animated = true;
        assert_eq!(ResolvedEmoji::Custom(animated).to_string(), "<a:party:42>");
    }

    #[test]
    fn test_default_order() {
        let kinds: Vec<_> = default_resolvers().iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, ["unicode", "custom"]);
    }
}
