//! Discord client using serenity's HTTP API.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::CreateMessage;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, MessageId};
use tracing::warn;

use crate::chatbot::engine::ChatTransport;
use crate::chatbot::message::InboundMessage;

/// Discord API client.
pub struct DiscordClient {
    http: Arc<Http>,
}

impl DiscordClient {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatTransport for DiscordClient {
    async fn send_typing(&self, channel_id: u64) -> Result<(), String> {
        ChannelId::new(channel_id)
            .broadcast_typing(&*self.http)
            .await
            .map_err(|e| {
                let msg = format!("Failed to send typing: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn reply(&self, to: &InboundMessage, text: &str) -> Result<(), String> {
        let channel_id = ChannelId::new(to.channel_id);
        let builder = CreateMessage::new()
            .content(text)
            .reference_message((channel_id, MessageId::new(to.message_id)));

        channel_id
            .send_message(&*self.http, builder)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to send reply: {e}");
                warn!("{}", msg);
                msg
            })
    }
}

/// Reduce a gateway message to what the engine needs.
pub fn to_inbound(msg: &Message, bot_user_id: u64) -> InboundMessage {
    InboundMessage {
        message_id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        author_id: msg.author.id.get(),
        author_name: msg.author.name.clone(),
        author_is_bot: msg.author.bot,
        mentions_bot: bot_user_id != 0 && msg.mentions.iter().any(|u| u.id.get() == bot_user_id),
        mentions_everyone: msg.mention_everyone,
        content: msg.content.clone(),
    }
}
