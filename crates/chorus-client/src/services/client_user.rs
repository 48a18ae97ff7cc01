//! Client user - presence and profile of the logged-in account

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chorus_core::{
    Activity, ActivityType, Channel, ClientPresence, Entity, EntityRef, FactoryContext,
    PresenceUpdate, Snowflake, Status, User,
};
use chorus_gateway::PresenceUpdatePayload;
use chorus_rest::{routes, RestRequest};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::client::Client;
use crate::error::{ClientError, ClientResult};

/// One invitee of a group DM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDmRecipient {
    pub user_id: Snowflake,
    /// OAuth2 access token granted by the user
    pub access_token: String,
    /// Nickname in the group; defaults to the cached username
    pub nick: Option<String>,
}

impl GroupDmRecipient {
    #[must_use]
    pub fn new(user_id: Snowflake, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            access_token: access_token.into(),
            nick: None,
        }
    }

    #[must_use]
    pub fn nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self
    }
}

/// Operations on the logged-in user
pub struct ClientUser<'a> {
    client: &'a Client,
}

impl<'a> ClientUser<'a> {
    /// Create a new ClientUser
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// The cached user object, once READY arrived
    pub fn get(&self) -> Option<EntityRef<User>> {
        self.client.current_user()
    }

    /// Current presence
    pub fn presence(&self) -> ClientPresence {
        self.client.context().presence_snapshot()
    }

    /// Merge `update` into the client presence and announce it
    ///
    /// The status update goes to `shard_id`, or to every shard when `None`. Shards that
    /// identify later use the merged presence, and the cached presence of the client user
    /// follows it. An unknown shard is rejected before anything changes.
    #[instrument(skip(self))]
    pub async fn set_presence(
        &self,
        update: PresenceUpdate,
        shard_id: Option<u32>,
    ) -> ClientResult<ClientPresence> {
        if update.is_empty() {
            return Err(ClientError::invalid_argument("presence update can not be empty"));
        }
        if let Some(shard_id) = shard_id {
            self.client.gateway().check_shard(shard_id)?;
        }

        let presence = {
            let mut presence = self.client.context().presence().write();
            presence.merge(update);
            presence.clone()
        };
        self.cache_own_presence(&presence)?;

        let payload = PresenceUpdatePayload::from(&presence);
        let shards = self
            .client
            .gateway()
            .update_presence(&payload, shard_id)
            .await?;

        info!(status = %presence.status, shards = shards, "Presence updated");
        Ok(presence)
    }

    /// Patch the client user's entry in the presence store, once READY named the user
    fn cache_own_presence(&self, presence: &ClientPresence) -> ClientResult<()> {
        let cache = self.client.cache();
        let Some(user_id) = cache.current_user_id() else {
            return Ok(());
        };

        let raw = json!({
            "user": { "id": user_id },
            "status": presence.status,
            "activities": presence.activity.iter().collect::<Vec<_>>(),
        });
        cache.presences.factory(&raw, &FactoryContext::default())?;
        Ok(())
    }

    /// Set the status, keeping everything else
    pub async fn set_status(
        &self,
        status: Status,
        shard_id: Option<u32>,
    ) -> ClientResult<ClientPresence> {
        self.set_presence(PresenceUpdate::new().status(status), shard_id)
            .await
    }

    /// Set the activity by name and type
    pub async fn set_activity(
        &self,
        name: impl Into<String>,
        kind: ActivityType,
        shard_id: Option<u32>,
    ) -> ClientResult<ClientPresence> {
        let activity = Activity::new(name, kind);
        self.set_presence(PresenceUpdate::new().activity(Some(activity)), shard_id)
            .await
    }

    /// Set a "Playing" activity, or "Streaming" when a stream URL is given
    pub async fn set_game(
        &self,
        name: impl Into<String>,
        stream_url: Option<&str>,
        shard_id: Option<u32>,
    ) -> ClientResult<ClientPresence> {
        let activity = match stream_url.filter(|url| !url.is_empty()) {
            Some(url) => Activity::streaming(name, url),
            None => Activity::playing(name),
        };
        self.set_presence(PresenceUpdate::new().activity(Some(activity)), shard_id)
            .await
    }

    /// Remove the activity
    pub async fn clear_activity(&self, shard_id: Option<u32>) -> ClientResult<ClientPresence> {
        self.set_presence(PresenceUpdate::new().activity(None), shard_id)
            .await
    }

    /// Change the username
    #[instrument(skip(self))]
    pub async fn set_username(&self, username: &str) -> ClientResult<EntityRef<User>> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ClientError::invalid_argument("username can not be empty"));
        }

        let user = self.modify(json!({ "username": username })).await?;
        info!(username = %username, "Username changed");
        Ok(user)
    }

    /// Change the avatar; `None` removes it
    ///
    /// The image is sent as a base64 data URI. PNG, JPEG, GIF and WebP are accepted.
    #[instrument(skip(self, image))]
    pub async fn set_avatar(&self, image: Option<&[u8]>) -> ClientResult<EntityRef<User>> {
        let avatar = image.map(data_uri).transpose()?;
        let user = self.modify(json!({ "avatar": avatar })).await?;
        info!(removed = avatar.is_none(), "Avatar changed");
        Ok(user)
    }

    /// Create a group DM with users who granted an OAuth2 access token
    #[instrument(skip(self, recipients), fields(recipients = recipients.len()))]
    pub async fn create_group_dm(
        &self,
        recipients: &[GroupDmRecipient],
    ) -> ClientResult<EntityRef<Channel>> {
        if recipients.is_empty() {
            return Err(ClientError::invalid_argument("a group DM needs at least one recipient"));
        }

        let cache = self.client.cache();
        let mut access_tokens = Vec::with_capacity(recipients.len());
        let mut nicks = HashMap::with_capacity(recipients.len());
        for recipient in recipients {
            let nick = match &recipient.nick {
                Some(nick) => nick.clone(),
                None => cache
                    .users
                    .get(recipient.user_id)
                    .map(|user| user.read().username.clone())
                    .ok_or_else(|| {
                        ClientError::invalid_argument(format!(
                            "user {} is not cached and has no nick",
                            recipient.user_id
                        ))
                    })?,
            };
            access_tokens.push(recipient.access_token.clone());
            nicks.insert(recipient.user_id.to_string(), nick);
        }

        let route = self.client.rest().route(&routes::CREATE_DM, &[])?;
        let request = RestRequest::new(route)
            .json(json!({ "access_tokens": access_tokens, "nicks": nicks }));
        let channel = self
            .client
            .rest()
            .request_entity(request, &cache.channels, &FactoryContext::default())
            .await?;

        info!(channel_id = %channel.read().id(), "Group DM created");
        Ok(channel)
    }

    /// PATCH the current user and cache the result
    async fn modify(&self, body: Value) -> ClientResult<EntityRef<User>> {
        let route = self.client.rest().route(&routes::MODIFY_CURRENT_USER, &[])?;
        let user = self
            .client
            .rest()
            .request_entity(
                RestRequest::new(route).json(body),
                &self.client.cache().users,
                &FactoryContext::default(),
            )
            .await?;
        Ok(user)
    }
}

/// Encode an image as `data:{mime};base64,{data}`
fn data_uri(image: &[u8]) -> ClientResult<String> {
    let mime = image_mime(image)
        .ok_or_else(|| ClientError::invalid_argument("avatar must be a PNG, JPEG, GIF or WebP image"))?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(image)))
}

/// Sniff the image type from its magic bytes
fn image_mime(image: &[u8]) -> Option<&'static str> {
    match image {
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}
