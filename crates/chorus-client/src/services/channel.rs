//! Channel service
//!
//! Message, typing, and invite operations. Responses are routed through the cache the
//! same way gateway dispatches are, so both paths converge on one instance per id.

use chorus_core::{Channel, EntityRef, FactoryContext, Invite, InviteOptions, Message, Snowflake};
use chorus_gateway::events::cache_sync;
use chorus_gateway::GatewayEventType;
use chorus_rest::{routes, FileAttachment, RestRequest};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::Client;
use crate::error::{ClientError, ClientResult};

/// Most messages one fetch may return
pub const MAX_FETCH_LIMIT: u8 = 100;

/// Content of a new message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateMessage {
    pub content: Option<String>,
    pub tts: bool,
    pub files: Vec<FileAttachment>,
}

impl CreateMessage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A plain text message
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::new().content(content)
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn tts(mut self, tts: bool) -> Self {
        self.tts = tts;
        self
    }

    #[must_use]
    pub fn file(mut self, file: FileAttachment) -> Self {
        self.files.push(file);
        self
    }

    fn is_empty(&self) -> bool {
        self.content.as_deref().unwrap_or_default().is_empty() && self.files.is_empty()
    }

    fn body(&self) -> Value {
        let mut body = json!({ "tts": self.tts });
        if let Some(content) = &self.content {
            body["content"] = json!(content);
        }
        body
    }
}

/// Which page of a channel's history to fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub around: Option<Snowflake>,
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
    /// 1 to 100, server default 50
    pub limit: Option<u8>,
}

impl MessageQuery {
    #[must_use]
    pub fn latest(limit: u8) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn before(mut self, id: Snowflake) -> Self {
        self.before = Some(id);
        self
    }

    #[must_use]
    pub fn after(mut self, id: Snowflake) -> Self {
        self.after = Some(id);
        self
    }

    #[must_use]
    pub fn around(mut self, id: Snowflake) -> Self {
        self.around = Some(id);
        self
    }

    fn validate(&self) -> ClientResult<()> {
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_FETCH_LIMIT {
                return Err(ClientError::invalid_argument(format!(
                    "limit must be between 1 and {MAX_FETCH_LIMIT}, got {limit}"
                )));
            }
        }
        let anchors = [self.around, self.before, self.after]
            .iter()
            .filter(|anchor| anchor.is_some())
            .count();
        if anchors > 1 {
            return Err(ClientError::invalid_argument(
                "only one of around, before and after may be set",
            ));
        }
        Ok(())
    }
}

/// Channel service
pub struct ChannelService<'a> {
    client: &'a Client,
}

impl<'a> ChannelService<'a> {
    /// Create a new ChannelService
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetch a channel and cache it
    #[instrument(skip(self))]
    pub async fn fetch_channel(&self, channel_id: Snowflake) -> ClientResult<EntityRef<Channel>> {
        let route = self
            .client
            .rest()
            .route(&routes::GET_CHANNEL, &[&channel_id])?;
        let channel = self
            .client
            .rest()
            .request_entity(
                RestRequest::new(route),
                &self.client.cache().channels,
                &FactoryContext::default(),
            )
            .await?;
        Ok(channel)
    }

    /// Send a message
    #[instrument(skip(self, message), fields(files = message.files.len()))]
    pub async fn send_message(
        &self,
        channel_id: Snowflake,
        message: CreateMessage,
    ) -> ClientResult<EntityRef<Message>> {
        self.ensure_text(channel_id)?;
        if message.is_empty() {
            return Err(ClientError::invalid_argument(
                "a message needs content or a file",
            ));
        }

        let route = self
            .client
            .rest()
            .route(&routes::CREATE_MESSAGE, &[&channel_id])?;
        let mut request = RestRequest::new(route).json(message.body());
        for file in message.files {
            request = request.file(file);
        }

        let raw = self.client.rest().request(request).await?;
        let ctx = FactoryContext::default();
        let cache = self.client.cache();
        cache_sync::apply(cache, GatewayEventType::MessageCreate.as_str(), &raw, &ctx)?;
        let message = cache.messages.factory(&raw, &ctx)?;

        debug!(message_id = %message.read().id, "Message sent");
        Ok(message)
    }

    /// Fetch a page of messages, newest first
    #[instrument(skip(self))]
    pub async fn fetch_messages(
        &self,
        channel_id: Snowflake,
        query: MessageQuery,
    ) -> ClientResult<Vec<EntityRef<Message>>> {
        self.ensure_text(channel_id)?;
        query.validate()?;

        let route = self
            .client
            .rest()
            .route(&routes::GET_CHANNEL_MESSAGES, &[&channel_id])?;
        let mut request = RestRequest::new(route);
        if let Some(limit) = query.limit {
            request = request.query("limit", limit);
        }
        if let Some(around) = query.around {
            request = request.query("around", around);
        }
        if let Some(before) = query.before {
            request = request.query("before", before);
        }
        if let Some(after) = query.after {
            request = request.query("after", after);
        }

        let messages = self
            .client
            .rest()
            .request_entities(
                request,
                &self.client.cache().messages,
                &FactoryContext::default(),
            )
            .await?;
        debug!(count = messages.len(), "Messages fetched");
        Ok(messages)
    }

    /// Show the typing indicator for a few seconds
    #[instrument(skip(self))]
    pub async fn trigger_typing(&self, channel_id: Snowflake) -> ClientResult<()> {
        self.ensure_text(channel_id)?;
        let route = self
            .client
            .rest()
            .route(&routes::TRIGGER_TYPING, &[&channel_id])?;
        self.client.rest().request(RestRequest::new(route)).await?;
        Ok(())
    }

    /// Create an invite to a channel
    #[instrument(skip(self))]
    pub async fn create_invite(
        &self,
        channel_id: Snowflake,
        options: InviteOptions,
    ) -> ClientResult<Invite> {
        let route = self
            .client
            .rest()
            .route(&routes::CREATE_CHANNEL_INVITE, &[&channel_id])?;
        let body = serde_json::to_value(&options).map_err(|e| {
            ClientError::invalid_argument(format!("invalid invite options: {e}"))
        })?;
        let raw = self
            .client
            .rest()
            .request(RestRequest::new(route).json(body))
            .await?;
        Ok(Invite::from_raw(&raw)?)
    }

    /// Reject channels that are cached and carry no messages
    ///
    /// Uncached channels are left for the server to judge.
    fn ensure_text(&self, channel_id: Snowflake) -> ClientResult<()> {
        match self.client.cache().channels.get(channel_id) {
            Some(channel) if !channel.read().is_text_based() => {
                Err(ClientError::NotTextBased(channel_id))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_message_body() {
        let message = CreateMessage::text("hello").tts(true);
        assert_eq!(message.body(), json!({"content": "hello", "tts": true}));
        assert!(!message.is_empty());

        assert!(CreateMessage::new().is_empty());
        assert!(CreateMessage::text("").is_empty());
        assert!(!CreateMessage::new()
            .file(FileAttachment::new("a.txt", b"a".to_vec()))
            .is_empty());
    }

    #[test]
    fn test_message_query_validation() {
        assert!(MessageQuery::latest(50).validate().is_ok());
        assert!(MessageQuery::latest(0).validate().is_err());
        assert!(MessageQuery::latest(101).validate().is_err());
        assert!(MessageQuery::default()
            .before(Snowflake::new(1))
            .after(Snowflake::new(2))
            .validate()
            .is_err());
    }
}
