//! Test fixtures
//!
//! Raw platform payloads, shaped like the JSON the REST API and the gateway send.

use serde_json::{json, Value};

/// Id of the user every test client logs in as
pub const BOT_USER_ID: u64 = 7;

/// A user object
pub fn user(id: u64, username: &str) -> Value {
    json!({
        "id": id.to_string(),
        "username": username,
        "discriminator": "0",
        "avatar": null,
        "bot": false
    })
}

/// The logged-in bot user
pub fn bot_user() -> Value {
    let mut user = user(BOT_USER_ID, "chorus-bot");
    user["bot"] = json!(true);
    user
}

/// A guild text channel
pub fn text_channel(id: u64, guild_id: u64, name: &str) -> Value {
    json!({
        "id": id.to_string(),
        "type": 0,
        "guild_id": guild_id.to_string(),
        "name": name,
        "position": 0,
        "topic": null,
        "nsfw": false,
        "last_message_id": null
    })
}

/// A guild voice channel
pub fn voice_channel(id: u64, guild_id: u64, name: &str) -> Value {
    json!({
        "id": id.to_string(),
        "type": 2,
        "guild_id": guild_id.to_string(),
        "name": name,
        "position": 1,
        "bitrate": 64000,
        "user_limit": 0
    })
}

/// A group DM with the given recipients
pub fn group_dm(id: u64, owner_id: u64, recipients: &[Value]) -> Value {
    json!({
        "id": id.to_string(),
        "type": 3,
        "owner_id": owner_id.to_string(),
        "name": null,
        "icon": null,
        "recipients": recipients,
        "last_message_id": null
    })
}

/// A message written by `author`
pub fn message(id: u64, channel_id: u64, author: &Value, content: &str) -> Value {
    json!({
        "id": id.to_string(),
        "channel_id": channel_id.to_string(),
        "author": author,
        "content": content,
        "timestamp": "2024-05-01T12:00:00.000000+00:00",
        "edited_timestamp": null,
        "tts": false,
        "pinned": false,
        "mention_everyone": false,
        "attachments": []
    })
}

/// A guild as sent in GUILD_CREATE, with its channels
pub fn guild_create(id: u64, name: &str, channels: &[Value]) -> Value {
    json!({
        "id": id.to_string(),
        "name": name,
        "icon": null,
        "owner_id": BOT_USER_ID.to_string(),
        "member_count": 2,
        "large": false,
        "unavailable": false,
        "joined_at": "2024-01-01T00:00:00.000000+00:00",
        "channels": channels,
        "members": [],
        "presences": []
    })
}

/// A READY payload for one shard
pub fn ready(session_id: &str, shard: [u32; 2]) -> Value {
    json!({
        "v": 10,
        "session_id": session_id,
        "resume_gateway_url": "memory://resume",
        "user": bot_user(),
        "guilds": [],
        "shard": shard
    })
}

/// An invite to a channel
pub fn invite(code: &str, guild_id: u64, channel_id: u64, max_uses: u32) -> Value {
    json!({
        "code": code,
        "guild": {"id": guild_id.to_string(), "name": "Guild"},
        "channel": {"id": channel_id.to_string(), "name": "general", "type": 0},
        "inviter": bot_user(),
        "uses": 0,
        "max_uses": max_uses,
        "max_age": 3600,
        "temporary": false,
        "created_at": "2024-05-01T12:00:00.000000+00:00"
    })
}

/// A 1x1 PNG header, enough for type sniffing
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
