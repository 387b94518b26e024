use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::emoji::{self, EmojiResolver, ResolvedEmoji};
use crate::platform::{BotIdentity, ChatClient, EventHooks, IncomingMessage, ReactionError};

/// Reacts to every guild message in the configured channel.
pub struct ReactBot {
    config: Config,
    resolvers: Vec<Box<dyn EmojiResolver>>,
}

impl ReactBot {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            resolvers: emoji::default_resolvers(),
        }
    }

    /// React to `message` with `emoji_name`, trying each resolver in order.
    /// Returns whether a reaction was applied.
    pub async fn react(
        &self,
        client: &dyn ChatClient,
        message: &IncomingMessage,
        emoji_name: &str,
    ) -> Result<bool> {
        for resolver in &self.resolvers {
            let Some(emoji) = resolver.resolve(client, emoji_name).await else {
                continue;
            };
            if try_react(client, message, &emoji).await? {
                debug!(
                    "Reacted to message {} with {} emoji {}",
                    message.message_id,
                    resolver.kind(),
                    emoji
                );
                return Ok(true);
            }
        }

        warn!("Invalid emoji '{}'.", emoji_name);
        Ok(false)
    }
}

/// Request-level failures become `Ok(false)`; anything else is propagated.
async fn try_react(
    client: &dyn ChatClient,
    message: &IncomingMessage,
    emoji: &ResolvedEmoji,
) -> Result<bool> {
    match client.add_reaction(message, emoji).await {
        Ok(()) => Ok(true),
        Err(e @ (ReactionError::Rejected(_) | ReactionError::InvalidArgument(_))) => {
            debug!("Reaction {} on message {} failed: {}", emoji, message.message_id, e);
            Ok(false)
        }
        Err(ReactionError::Client(e)) => Err(e),
    }
}

#[async_trait]
impl EventHooks for ReactBot {
    async fn on_ready(&self, identity: &BotIdentity) {
        info!(
            "{} logged in as {} ({})",
            self.config.name, identity.tag, identity.id
        );
    }

    async fn on_resumed(&self) {
        info!("{} resumed.", self.config.name);
    }

    async fn on_message(&self, client: &dyn ChatClient, message: &IncomingMessage) -> Result<()> {
        if client.current_user_id().as_deref() == Some(message.author_id.as_str()) {
            return Ok(());
        }

        // No guild means a direct message; there is no channel to compare against.
        if message.guild_id.is_none() {
            return Ok(());
        }

        if message.channel_id != self.config.channel_id {
            return Ok(());
        }

        debug!(
            "Message {} from {} ({}) in target channel",
            message.message_id, message.author_name, message.author_id
        );
        self.react(client, message, &self.config.emoji).await?;
        Ok(())
    }
}
