pub mod discord;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::emoji::ResolvedEmoji;

/// A message received from the chat platform
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message_id: String,
    pub author_id: String,
    /// Display name of the author, only used for logging
    pub author_name: String,
    pub channel_id: String,
    /// `None` for direct/private messages
    pub guild_id: Option<String>,
}

/// Identity of the connected bot account, as reported on ready
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub id: String,
    pub tag: String,
}

/// A guild-specific emoji visible to the connected client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEmoji {
    pub id: u64,
    pub name: String,
    pub animated: bool,
}

#[derive(Debug, Error)]
pub enum ReactionError {
    /// The service rejected the request.
    #[error("reaction rejected: {0}")]
    Rejected(String),
    /// The reaction or its target could not be expressed as a request.
    #[error("invalid reaction argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Client(#[from] anyhow::Error),
}

/// Operations the bot needs from the live client.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Id of the connected account, if the session is established.
    fn current_user_id(&self) -> Option<String>;

    /// Every custom emoji in every guild the client can currently see.
    async fn custom_emojis(&self) -> Vec<CustomEmoji>;

    async fn add_reaction(
        &self,
        message: &IncomingMessage,
        emoji: &ResolvedEmoji,
    ) -> Result<(), ReactionError>;
}

/// Event callbacks, injected into a platform adapter at startup.
#[async_trait]
pub trait EventHooks: Send + Sync {
    async fn on_ready(&self, identity: &BotIdentity);

    async fn on_resumed(&self);

    async fn on_message(&self, client: &dyn ChatClient, message: &IncomingMessage) -> Result<()>;
}
