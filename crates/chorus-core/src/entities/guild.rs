//! Guild entity - represents a server

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::fields::Fields;
use super::{Entity, FactoryContext};
use crate::error::ModelError;
use crate::value_objects::Snowflake;

/// Guild (server) entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<Snowflake>,
    pub member_count: Option<u64>,
    pub large: bool,
    /// Set while an outage hides the guild's data
    pub unavailable: bool,
    pub joined_at: Option<DateTime<Utc>>,
    /// Shard that received this guild
    pub shard_id: Option<u32>,
}

impl Guild {
    /// Check if a user is the guild owner
    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == Some(user_id)
    }

    /// Get the guild icon path if set
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|hash| format!("/icons/{}/{}.png", self.id, hash))
    }

    /// Check if the guild is reachable
    #[inline]
    pub fn is_available(&self) -> bool {
        !self.unavailable
    }
}

impl Entity for Guild {
    const KIND: &'static str = "guild";

    fn id(&self) -> Snowflake {
        self.id
    }

    fn from_raw(raw: &Value, ctx: &FactoryContext) -> Result<Self, ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        Ok(Self {
            id: fields.required("id")?,
            // Unavailable guilds only carry `id` and `unavailable`
            name: fields.or_default("name")?,
            icon: fields.optional("icon")?,
            description: fields.optional("description")?,
            owner_id: fields.optional("owner_id")?,
            member_count: fields.optional("member_count")?,
            large: fields.or_default("large")?,
            unavailable: fields.or_default("unavailable")?,
            joined_at: fields.optional("joined_at")?,
            shard_id: ctx.shard_id,
        })
    }

    fn patch(&mut self, raw: &Value) -> Result<(), ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        fields.patch(&mut self.name, "name")?;
        fields.patch_nullable(&mut self.icon, "icon")?;
        fields.patch_nullable(&mut self.description, "description")?;
        fields.patch_nullable(&mut self.owner_id, "owner_id")?;
        fields.patch_nullable(&mut self.member_count, "member_count")?;
        fields.patch(&mut self.large, "large")?;
        fields.patch(&mut self.unavailable, "unavailable")?;
        fields.patch_nullable(&mut self.joined_at, "joined_at")?;
        Ok(())
    }
}
