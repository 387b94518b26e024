use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{
    ChannelId, Client, Context, EmojiId, EventHandler, GatewayIntents, Message, MessageId,
    ReactionType, Ready, ResumedEvent,
};
use tracing::{error, info};

use crate::emoji::ResolvedEmoji;
use crate::platform::{
    BotIdentity, ChatClient, CustomEmoji, EventHooks, IncomingMessage, ReactionError,
};

/// Connect to Discord and dispatch events to `hooks` until the client stops.
pub async fn run<H: EventHooks + 'static>(token: &str, hooks: H) -> Result<()> {
    // Guilds, guild messages and guild emojis; enough to keep the emoji cache live.
    let intents = GatewayIntents::non_privileged();

    let mut client = Client::builder(token, intents)
        .event_handler(DiscordHandler { hooks })
        .await
        .context("Failed to create Discord client")?;

    info!("Starting Discord client...");
    client
        .start()
        .await
        .context("Discord client stopped with an error")?;

    Ok(())
}

struct DiscordHandler<H> {
    hooks: H,
}

#[async_trait]
impl<H: EventHooks + 'static> EventHandler for DiscordHandler<H> {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let identity = BotIdentity {
            id: ready.user.id.to_string(),
            tag: ready.user.tag(),
        };
        self.hooks.on_ready(&identity).await;
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        self.hooks.on_resumed().await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let incoming = IncomingMessage {
            message_id: msg.id.to_string(),
            author_id: msg.author.id.to_string(),
            author_name: msg.author.name.clone(),
            channel_id: msg.channel_id.to_string(),
            guild_id: msg.guild_id.map(|id| id.to_string()),
        };

        let client = DiscordClient { ctx: &ctx };
        if let Err(e) = self.hooks.on_message(&client, &incoming).await {
            error!(
                "Failed to handle message {} in channel {}: {:#}",
                incoming.message_id, incoming.channel_id, e
            );
        }
    }
}

/// [`ChatClient`] backed by serenity's cache and HTTP client for one event.
struct DiscordClient<'a> {
    ctx: &'a Context,
}

#[async_trait]
impl ChatClient for DiscordClient<'_> {
    fn current_user_id(&self) -> Option<String> {
        Some(self.ctx.cache.current_user().id.to_string())
    }

    async fn custom_emojis(&self) -> Vec<CustomEmoji> {
        let cache = &self.ctx.cache;
        cache
            .guilds()
            .into_iter()
            .filter_map(|guild_id| cache.guild(guild_id))
            .flat_map(|guild| {
                guild
                    .emojis
                    .values()
                    .map(|e| CustomEmoji {
                        id: e.id.get(),
                        name: e.name.clone(),
                        animated: e.animated,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    async fn add_reaction(
        &self,
        message: &IncomingMessage,
        emoji: &ResolvedEmoji,
    ) -> Result<(), ReactionError> {
        let channel_id = ChannelId::new(snowflake("channel", &message.channel_id)?);
        let message_id = MessageId::new(snowflake("message", &message.message_id)?);
        let reaction = reaction_type(emoji)?;

        self.ctx
            .http
            .create_reaction(channel_id, message_id, &reaction)
            .await
            .map_err(|e| match e {
                serenity::Error::Http(e) => ReactionError::Rejected(e.to_string()),
                serenity::Error::Model(e) => ReactionError::InvalidArgument(e.to_string()),
                other => ReactionError::Client(other.into()),
            })
    }
}

fn snowflake(kind: &str, raw: &str) -> Result<u64, ReactionError> {
    match raw.parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(ReactionError::InvalidArgument(format!(
            "{} id {:?} is not a snowflake",
            kind, raw
        ))),
    }
}

fn reaction_type(emoji: &ResolvedEmoji) -> Result<ReactionType, ReactionError> {
    match emoji {
        ResolvedEmoji::Unicode(s) if s.is_empty() => Err(ReactionError::InvalidArgument(
            "empty unicode emoji".to_string(),
        )),
        ResolvedEmoji::Unicode(s) => Ok(ReactionType::Unicode(s.clone())),
        ResolvedEmoji::Custom(e) if e.id == 0 => Err(ReactionError::InvalidArgument(format!(
            "custom emoji {:?} has no id",
            e.name
        ))),
        ResolvedEmoji::Custom(e) => Ok(ReactionType::Custom {
            animated: e.animated,
            id: EmojiId::new(e.id),
            name: Some(e.name.clone()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_parsing() {
        assert_eq!(snowflake("channel", "100").unwrap(), 100);
        for bad in ["", "0", "abc", "-1", "18446744073709551616"] {
            assert!(matches!(
                snowflake("channel", bad),
                Err(ReactionError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_unicode_reaction_type() {
        let reaction = reaction_type(&ResolvedEmoji::Unicode("\u{1f604}".to_string())).unwrap();
        assert_eq!(reaction, ReactionType::Unicode("\u{1f604}".to_string()));
    }

    #[test]
    fn test_custom_reaction_type() {
        let reaction = reaction_type(&ResolvedEmoji::Custom(CustomEmoji {
            id: 123456789,
            name: "pepehands".to_string(),
            animated: true,
        }))
        .unwrap();
        assert_eq!(
            reaction,
            ReactionType::Custom {
                animated: true,
                id: EmojiId::new(123456789),
                name: Some("pepehands".to_string()),
            }
        );
    }

    #[test]
    fn test_invalid_reaction_arguments() {
        assert!(matches!(
            reaction_type(&ResolvedEmoji::Unicode(String::new())),
            Err(ReactionError::InvalidArgument(_))
        ));
        assert!(matches!(
            reaction_type(&ResolvedEmoji::Custom(CustomEmoji {
                id: 0,
                name: "zero".to_string(),
                animated: false,
            })),
            Err(ReactionError::InvalidArgument(_))
        ));
    }
}
