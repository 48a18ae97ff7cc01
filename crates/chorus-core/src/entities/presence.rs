//! Presence entity - another user's status as last reported

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use super::fields::Fields;
use super::{Entity, FactoryContext};
use crate::error::ModelError;
use crate::value_objects::{Activity, Snowflake, Status};

/// Presence entity, keyed by user ID
///
/// A user has one status across the platform, so a presence is shared by every guild it
/// was reported in and only leaves the cache with the last of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presence {
    pub user_id: Snowflake,
    /// Guilds that reported this presence
    pub guild_ids: BTreeSet<Snowflake>,
    pub status: Status,
    pub activity: Option<Activity>,
}

impl Presence {
    /// Check if the user is shown as online in any form
    #[inline]
    pub fn is_online(&self) -> bool {
        self.status.is_visible()
    }

    /// Check if the presence was reported in a guild
    #[inline]
    pub fn in_guild(&self, guild_id: Snowflake) -> bool {
        self.guild_ids.contains(&guild_id)
    }

    /// Drop a guild; returns true when that was the last guild holding the presence
    pub fn forget_guild(&mut self, guild_id: Snowflake) -> bool {
        self.guild_ids.remove(&guild_id) && self.guild_ids.is_empty()
    }

    fn raw_activity(fields: &Fields<'_>) -> Result<Option<Option<Activity>>, ModelError> {
        if let Some(activities) = fields.optional::<Vec<Activity>>("activities")? {
            return Ok(Some(activities.into_iter().next()));
        }
        // Older payloads carry a single `game`
        match fields.optional::<Activity>("game")? {
            Some(game) => Ok(Some(Some(game))),
            None => Ok(None),
        }
    }
}

impl Entity for Presence {
    const KIND: &'static str = "presence";

    fn id(&self) -> Snowflake {
        self.user_id
    }

    fn id_of(raw: &Value) -> Result<Snowflake, ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        fields.nested_id("user")?.ok_or(ModelError::MissingField {
            kind: Self::KIND,
            field: "user",
        })
    }

    fn from_raw(raw: &Value, _ctx: &FactoryContext) -> Result<Self, ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        Ok(Self {
            user_id: Self::id_of(raw)?,
            guild_ids: fields.optional::<Snowflake>("guild_id")?.into_iter().collect(),
            status: fields.optional("status")?.unwrap_or(Status::Offline),
            activity: Self::raw_activity(&fields)?.flatten(),
        })
    }

    fn patch(&mut self, raw: &Value) -> Result<(), ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        if let Some(guild_id) = fields.optional::<Snowflake>("guild_id")? {
            self.guild_ids.insert(guild_id);
        }
        fields.patch(&mut self.status, "status")?;
        if let Some(activity) = Self::raw_activity(&fields)? {
            self.activity = activity;
        }
        Ok(())
    }
}
