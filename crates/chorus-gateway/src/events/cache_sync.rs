//! Dispatch events applied to the entity cache
//!
//! Every entity goes through its store's factory, so objects fetched over REST and
//! objects announced by the gateway converge on the same handle.

use chorus_core::{Cache, Entity, FactoryContext, ModelError, Snowflake};
use serde::Deserialize;
use serde_json::Value;

use super::GatewayEventType;

/// Apply one dispatch to the cache
///
/// Unknown events are ignored. Channels of unknown types are skipped, not errors.
pub fn apply(
    cache: &Cache,
    event: &str,
    data: &Value,
    ctx: &FactoryContext,
) -> Result<(), ModelError> {
    let Some(kind) = GatewayEventType::from_name(event) else {
        tracing::trace!(event = %event, "No cache handler for event");
        return Ok(());
    };

    match kind {
        GatewayEventType::Ready => ready(cache, data, ctx),
        GatewayEventType::GuildCreate => guild_create(cache, data, ctx),
        GatewayEventType::GuildUpdate => cache.guilds.factory(data, ctx).map(drop),
        GatewayEventType::GuildDelete => guild_delete(cache, data, ctx),
        GatewayEventType::ChannelCreate | GatewayEventType::ChannelUpdate => {
            upsert_channel(cache, data, ctx)
        }
        GatewayEventType::ChannelDelete => {
            cache.channels.delete(id_field(data, "channel", "id")?);
            Ok(())
        }
        GatewayEventType::MessageCreate => message_create(cache, data, ctx),
        GatewayEventType::MessageUpdate => message_update(cache, data, ctx),
        GatewayEventType::MessageDelete => {
            cache.messages.delete(id_field(data, "message", "id")?);
            Ok(())
        }
        GatewayEventType::MessageDeleteBulk => {
            for raw in array(data, "ids") {
                cache.messages.delete(snowflake(raw, "message", "ids")?);
            }
            Ok(())
        }
        GatewayEventType::GuildMemberAdd => member_count_change(cache, data, ctx, true),
        GatewayEventType::GuildMemberRemove => member_count_change(cache, data, ctx, false),
        GatewayEventType::GuildMembersChunk => members_chunk(cache, data, ctx),
        GatewayEventType::PresenceUpdate => presence_update(cache, data, ctx),
        GatewayEventType::UserUpdate => cache.users.factory(data, ctx).map(drop),
        GatewayEventType::Resumed | GatewayEventType::TypingStart => Ok(()),
    }
}

fn ready(cache: &Cache, data: &Value, ctx: &FactoryContext) -> Result<(), ModelError> {
    let user = data
        .get("user")
        .ok_or(ModelError::MissingField { kind: "ready", field: "user" })?;
    let me = cache.users.factory(user, ctx)?;
    let id = me.read().id;
    cache.set_current_user_id(id);

    // Guilds arrive as unavailable stubs; GUILD_CREATE fills them in
    for guild in array(data, "guilds") {
        cache.guilds.factory(guild, ctx)?;
    }
    for channel in array(data, "private_channels") {
        upsert_channel(cache, channel, ctx)?;
    }
    Ok(())
}

fn guild_create(cache: &Cache, data: &Value, ctx: &FactoryContext) -> Result<(), ModelError> {
    let guild = cache.guilds.factory(data, ctx)?;
    let guild_id = guild.read().id;

    for channel in array(data, "channels") {
        upsert_channel(cache, &with_guild_id(channel, guild_id), ctx)?;
    }
    for member in array(data, "members") {
        if let Some(user) = member.get("user") {
            cache.users.factory(user, ctx)?;
        }
    }
    for presence in array(data, "presences") {
        cache.presences.factory(&with_guild_id(presence, guild_id), ctx)?;
    }

    tracing::debug!(guild_id = %guild_id, channels = cache.channels.len(), "Guild cached");
    Ok(())
}

fn guild_delete(cache: &Cache, data: &Value, ctx: &FactoryContext) -> Result<(), ModelError> {
    if data.get("unavailable").and_then(Value::as_bool) == Some(true) {
        // Outage: keep the guild, mark it unavailable
        cache.guilds.factory(data, ctx)?;
    } else {
        cache.remove_guild(id_field(data, "guild", "id")?);
    }
    Ok(())
}

fn upsert_channel(cache: &Cache, data: &Value, ctx: &FactoryContext) -> Result<(), ModelError> {
    match cache.channels.factory(data, ctx) {
        Ok(_) => {}
        Err(ModelError::UnknownChannelType(code)) => {
            tracing::debug!(channel_type = code, "Skipping channel of unknown type");
            return Ok(());
        }
        Err(e) => return Err(e),
    }
    for recipient in array(data, "recipients") {
        cache.users.factory(recipient, ctx)?;
    }
    Ok(())
}

fn message_create(cache: &Cache, data: &Value, ctx: &FactoryContext) -> Result<(), ModelError> {
    let message = cache.messages.factory(data, ctx)?;
    let (message_id, channel_id) = {
        let message = message.read();
        (message.id, message.channel_id)
    };

    if let Some(author) = data.get("author") {
        cache.users.factory(author, ctx)?;
    }
    if let Some(channel) = cache.channels.get(channel_id) {
        if let Some(text) = channel.write().as_text_mut() {
            text.set_last_message_id(message_id);
        }
    }
    Ok(())
}

fn message_update(cache: &Cache, data: &Value, ctx: &FactoryContext) -> Result<(), ModelError> {
    let id = <chorus_core::Message as Entity>::id_of(data)?;
    // Partial updates can only patch a message we already hold
    if cache.messages.has(id) || data.get("author").is_some() {
        cache.messages.factory(data, ctx)?;
    }
    Ok(())
}

fn member_count_change(
    cache: &Cache,
    data: &Value,
    ctx: &FactoryContext,
    joined: bool,
) -> Result<(), ModelError> {
    if let Some(user) = data.get("user").filter(|_| joined) {
        cache.users.factory(user, ctx)?;
    }

    let guild_id = id_field(data, "member", "guild_id")?;
    if let Some(guild) = cache.guilds.get(guild_id) {
        let mut guild = guild.write();
        if let Some(count) = guild.member_count.as_mut() {
            *count = if joined { *count + 1 } else { count.saturating_sub(1) };
        }
    }
    Ok(())
}

fn members_chunk(cache: &Cache, data: &Value, ctx: &FactoryContext) -> Result<(), ModelError> {
    let guild_id = id_field(data, "members_chunk", "guild_id")?;
    for member in array(data, "members") {
        if let Some(user) = member.get("user") {
            cache.users.factory(user, ctx)?;
        }
    }
    for presence in array(data, "presences") {
        cache.presences.factory(&with_guild_id(presence, guild_id), ctx)?;
    }
    Ok(())
}

fn presence_update(cache: &Cache, data: &Value, ctx: &FactoryContext) -> Result<(), ModelError> {
    cache.presences.factory(data, ctx)?;

    // Full user objects ride along when a username changed
    if let Some(user) = data.get("user").filter(|u| u.get("username").is_some()) {
        cache.users.factory(user, ctx)?;
    }
    Ok(())
}

fn array<'a>(data: &'a Value, field: &str) -> impl Iterator<Item = &'a Value> {
    data.get(field).and_then(Value::as_array).into_iter().flatten()
}

fn with_guild_id(raw: &Value, guild_id: Snowflake) -> Value {
    let mut raw = raw.clone();
    if let Value::Object(map) = &mut raw {
        map.entry("guild_id")
            .or_insert_with(|| Value::String(guild_id.to_string()));
    }
    raw
}

fn id_field(data: &Value, kind: &'static str, field: &'static str) -> Result<Snowflake, ModelError> {
    let raw = data.get(field).ok_or(ModelError::MissingField { kind, field })?;
    snowflake(raw, kind, field)
}

fn snowflake(raw: &Value, kind: &'static str, field: &'static str) -> Result<Snowflake, ModelError> {
    Snowflake::deserialize(raw).map_err(|source| ModelError::InvalidField { kind, field, source })
}
