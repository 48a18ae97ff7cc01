//! Message entity - represents a chat message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::Fields;
use super::{Entity, FactoryContext};
use crate::error::ModelError;
use crate::value_objects::Snowflake;

/// File attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub author_id: Option<Snowflake>,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub edited_timestamp: Option<DateTime<Utc>>,
    pub tts: bool,
    pub pinned: bool,
    pub mention_everyone: bool,
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Check if message has been edited
    #[inline]
    pub fn is_edited(&self) -> bool {
        self.edited_timestamp.is_some()
    }

    /// Get a truncated preview of the message (for logs)
    pub fn preview(&self, max_len: usize) -> &str {
        if self.content.len() <= max_len {
            &self.content
        } else {
            let mut end = max_len;
            while !self.content.is_char_boundary(end) {
                end -= 1;
            }
            &self.content[..end]
        }
    }
}

impl Entity for Message {
    const KIND: &'static str = "message";

    fn id(&self) -> Snowflake {
        self.id
    }

    fn from_raw(raw: &Value, _ctx: &FactoryContext) -> Result<Self, ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        Ok(Self {
            id: fields.required("id")?,
            channel_id: fields.required("channel_id")?,
            guild_id: fields.optional("guild_id")?,
            author_id: fields.nested_id("author")?,
            content: fields.or_default("content")?,
            timestamp: fields.optional("timestamp")?,
            edited_timestamp: fields.optional("edited_timestamp")?,
            tts: fields.or_default("tts")?,
            pinned: fields.or_default("pinned")?,
            mention_everyone: fields.or_default("mention_everyone")?,
            attachments: fields.or_default("attachments")?,
        })
    }

    fn patch(&mut self, raw: &Value) -> Result<(), ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        fields.patch(&mut self.content, "content")?;
        fields.patch_nullable(&mut self.edited_timestamp, "edited_timestamp")?;
        fields.patch(&mut self.pinned, "pinned")?;
        fields.patch(&mut self.mention_everyone, "mention_everyone")?;
        fields.patch(&mut self.attachments, "attachments")?;
        Ok(())
    }
}
