//! User entity - represents a platform user

use serde::Serialize;
use serde_json::Value;

use super::fields::Fields;
use super::{Entity, FactoryContext};
use crate::error::ModelError;
use crate::value_objects::Snowflake;

/// User entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    pub discriminator: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub bot: bool,
    pub system: bool,
}

impl User {
    /// Get the full tag: username#discriminator
    pub fn tag(&self) -> String {
        format!("{}#{}", self.username, self.discriminator)
    }

    /// Name shown in the client: global name when set, username otherwise
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }

    /// Mention markup for this user
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Get avatar path or default avatar path
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => format!("/avatars/{}/{}.png", self.id, hash),
            None => format!("/embed/avatars/{}.png", self.default_avatar_index()),
        }
    }

    /// Get default avatar index (0-4) based on discriminator
    fn default_avatar_index(&self) -> u8 {
        (self.discriminator.parse::<u16>().unwrap_or(0) % 5) as u8
    }

    /// Check if user is a bot account
    #[inline]
    pub fn is_bot(&self) -> bool {
        self.bot
    }
}

impl Entity for User {
    const KIND: &'static str = "user";

    fn id(&self) -> Snowflake {
        self.id
    }

    fn from_raw(raw: &Value, _ctx: &FactoryContext) -> Result<Self, ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        Ok(Self {
            id: fields.required("id")?,
            username: fields.required("username")?,
            discriminator: fields
                .optional("discriminator")?
                .unwrap_or_else(|| "0".to_string()),
            global_name: fields.optional("global_name")?,
            avatar: fields.optional("avatar")?,
            bot: fields.or_default("bot")?,
            system: fields.or_default("system")?,
        })
    }

    fn patch(&mut self, raw: &Value) -> Result<(), ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        fields.patch(&mut self.username, "username")?;
        fields.patch(&mut self.discriminator, "discriminator")?;
        fields.patch_nullable(&mut self.global_name, "global_name")?;
        fields.patch_nullable(&mut self.avatar, "avatar")?;
        fields.patch(&mut self.bot, "bot")?;
        Ok(())
    }
}
