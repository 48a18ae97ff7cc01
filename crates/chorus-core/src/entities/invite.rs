//! Invite - a code that lets users join a guild through one of its channels

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::Fields;
use crate::error::ModelError;
use crate::value_objects::Snowflake;

/// Base URL of shareable invite links
pub const INVITE_URL: &str = "https://discord.gg";

/// Invite
///
/// Invites are returned by REST calls but never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invite {
    pub code: String,
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub inviter_id: Option<Snowflake>,
    pub uses: u32,
    /// 0 means unlimited
    pub max_uses: u32,
    /// Lifetime in seconds, 0 means never expires
    pub max_age: u32,
    pub temporary: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Invite {
    const KIND: &'static str = "invite";

    /// Build an invite from a raw payload
    pub fn from_raw(raw: &Value) -> Result<Self, ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        let guild_id = fields
            .nested_id("guild")?
            .or(fields.optional("guild_id")?);
        let channel_id = fields
            .nested_id("channel")?
            .or(fields.optional("channel_id")?);

        Ok(Self {
            code: fields.required("code")?,
            guild_id,
            channel_id,
            inviter_id: fields.nested_id("inviter")?,
            uses: fields.or_default("uses")?,
            max_uses: fields.or_default("max_uses")?,
            max_age: fields.or_default("max_age")?,
            temporary: fields.or_default("temporary")?,
            created_at: fields.optional("created_at")?,
        })
    }

    /// When the invite stops working, if it expires at all
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.max_age == 0 {
            return None;
        }
        self.created_at
            .map(|created| created + Duration::seconds(i64::from(self.max_age)))
    }

    /// Check if invite is expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| now > expires_at)
    }

    /// Check if invite has reached max uses
    pub fn is_exhausted(&self) -> bool {
        self.max_uses > 0 && self.uses >= self.max_uses
    }

    /// Get remaining uses (None if unlimited)
    pub fn remaining_uses(&self) -> Option<u32> {
        (self.max_uses > 0).then(|| self.max_uses.saturating_sub(self.uses))
    }

    /// Get the full invite URL
    pub fn url(&self) -> String {
        format!("{INVITE_URL}/{}", self.code)
    }
}

/// Options for creating a channel invite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_uses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary: Option<bool>,
    /// Do not reuse a similar existing invite
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw() -> Value {
        json!({
            "code": "abc123",
            "guild": {"id": "100", "name": "Guild"},
            "channel": {"id": "200", "name": "general", "type": 0},
            "inviter": {"id": "300", "username": "alice"},
            "uses": 2,
            "max_uses": 3,
            "max_age": 3600,
            "temporary": false,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    #[test]
    fn test_invite_from_raw() {
        let invite = Invite::from_raw(&raw()).unwrap();
        assert_eq!(invite.code, "abc123");
        assert_eq!(invite.guild_id, Some(Snowflake::new(100)));
        assert_eq!(invite.channel_id, Some(Snowflake::new(200)));
        assert_eq!(invite.inviter_id, Some(Snowflake::new(300)));
        assert_eq!(invite.url(), "https://discord.gg/abc123");
    }

    #[test]
    fn test_invite_expiration() {
        let invite = Invite::from_raw(&raw()).unwrap();
        let created = invite.created_at.unwrap();
        assert_eq!(invite.expires_at(), Some(created + Duration::hours(1)));
        assert!(!invite.is_expired(created + Duration::minutes(59)));
        assert!(invite.is_expired(created + Duration::minutes(61)));

        let permanent = Invite::from_raw(&json!({"code": "x", "max_age": 0})).unwrap();
        assert_eq!(permanent.expires_at(), None);
    }

    #[test]
    fn test_invite_uses() {
        let mut invite = Invite::from_raw(&raw()).unwrap();
        assert_eq!(invite.remaining_uses(), Some(1));
        assert!(!invite.is_exhausted());

        invite.uses = 3;
        assert!(invite.is_exhausted());

        invite.max_uses = 0;
        assert_eq!(invite.remaining_uses(), None);
        assert!(!invite.is_exhausted());
    }

    #[test]
    fn test_missing_code() {
        let err = Invite::from_raw(&json!({"uses": 1})).unwrap_err();
        assert!(matches!(err, ModelError::MissingField { field: "code", .. }));
    }

    #[test]
    fn test_options_skip_unset() {
        let options = InviteOptions {
            max_age: Some(0),
            ..InviteOptions::default()
        };
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({"max_age": 0}));
    }
}
