//! Endpoint route table
//!
//! Verbs are data: any of these can be changed through `RestConfig::method_overrides`.

use crate::route::{Method, RouteSpec};

// =========================================================================
// Gateway
// =========================================================================
pub const GET_GATEWAY_BOT: RouteSpec = RouteSpec::new("get_gateway_bot", Method::Get, "/gateway/bot");

// =========================================================================
// Channels
// =========================================================================
pub const GET_CHANNEL: RouteSpec = RouteSpec::new("get_channel", Method::Get, "/channels/{}");
pub const MODIFY_CHANNEL: RouteSpec = RouteSpec::new("modify_channel", Method::Patch, "/channels/{}");
pub const DELETE_CHANNEL: RouteSpec = RouteSpec::new("delete_channel", Method::Delete, "/channels/{}");
pub const TRIGGER_TYPING: RouteSpec =
    RouteSpec::new("trigger_typing", Method::Post, "/channels/{}/typing");

// The legacy client sent GET here; the platform documents POST.
pub const CREATE_CHANNEL_INVITE: RouteSpec =
    RouteSpec::new("create_channel_invite", Method::Post, "/channels/{}/invites");
pub const GET_CHANNEL_INVITES: RouteSpec =
    RouteSpec::new("get_channel_invites", Method::Get, "/channels/{}/invites");

pub const ADD_GROUP_DM_RECIPIENT: RouteSpec =
    RouteSpec::new("add_group_dm_recipient", Method::Put, "/channels/{}/recipients/{}");
pub const REMOVE_GROUP_DM_RECIPIENT: RouteSpec =
    RouteSpec::new("remove_group_dm_recipient", Method::Delete, "/channels/{}/recipients/{}");

// =========================================================================
// Messages
// =========================================================================
pub const GET_CHANNEL_MESSAGES: RouteSpec =
    RouteSpec::new("get_channel_messages", Method::Get, "/channels/{}/messages");
pub const GET_CHANNEL_MESSAGE: RouteSpec =
    RouteSpec::new("get_channel_message", Method::Get, "/channels/{}/messages/{}");
pub const CREATE_MESSAGE: RouteSpec =
    RouteSpec::new("create_message", Method::Post, "/channels/{}/messages");
pub const EDIT_MESSAGE: RouteSpec =
    RouteSpec::new("edit_message", Method::Patch, "/channels/{}/messages/{}");
pub const DELETE_MESSAGE: RouteSpec =
    RouteSpec::new("delete_message", Method::Delete, "/channels/{}/messages/{}");
pub const BULK_DELETE_MESSAGES: RouteSpec =
    RouteSpec::new("bulk_delete_messages", Method::Post, "/channels/{}/messages/bulk-delete");
pub const GET_PINNED_MESSAGES: RouteSpec =
    RouteSpec::new("get_pinned_messages", Method::Get, "/channels/{}/pins");
pub const PIN_MESSAGE: RouteSpec = RouteSpec::new("pin_message", Method::Put, "/channels/{}/pins/{}");
pub const UNPIN_MESSAGE: RouteSpec =
    RouteSpec::new("unpin_message", Method::Delete, "/channels/{}/pins/{}");

// =========================================================================
// Users
// =========================================================================
pub const GET_CURRENT_USER: RouteSpec = RouteSpec::new("get_current_user", Method::Get, "/users/@me");
pub const MODIFY_CURRENT_USER: RouteSpec =
    RouteSpec::new("modify_current_user", Method::Patch, "/users/@me");
pub const GET_USER: RouteSpec = RouteSpec::new("get_user", Method::Get, "/users/{}");
pub const CREATE_DM: RouteSpec = RouteSpec::new("create_dm", Method::Post, "/users/@me/channels");

// =========================================================================
// Guilds
// =========================================================================
pub const GET_GUILD: RouteSpec = RouteSpec::new("get_guild", Method::Get, "/guilds/{}");
pub const GET_GUILD_CHANNELS: RouteSpec =
    RouteSpec::new("get_guild_channels", Method::Get, "/guilds/{}/channels");
pub const LEAVE_GUILD: RouteSpec =
    RouteSpec::new("leave_guild", Method::Delete, "/users/@me/guilds/{}");

/// Every known route, for lookups by name
pub const ALL: &[RouteSpec] = &[
    GET_GATEWAY_BOT,
    GET_CHANNEL,
    MODIFY_CHANNEL,
    DELETE_CHANNEL,
    TRIGGER_TYPING,
    CREATE_CHANNEL_INVITE,
    GET_CHANNEL_INVITES,
    ADD_GROUP_DM_RECIPIENT,
    REMOVE_GROUP_DM_RECIPIENT,
    GET_CHANNEL_MESSAGES,
    GET_CHANNEL_MESSAGE,
    CREATE_MESSAGE,
    EDIT_MESSAGE,
    DELETE_MESSAGE,
    BULK_DELETE_MESSAGES,
    GET_PINNED_MESSAGES,
    PIN_MESSAGE,
    UNPIN_MESSAGE,
    GET_CURRENT_USER,
    MODIFY_CURRENT_USER,
    GET_USER,
    CREATE_DM,
    GET_GUILD,
    GET_GUILD_CHANNELS,
    LEAVE_GUILD,
];

/// Look up a route by name
#[must_use]
pub fn by_name(name: &str) -> Option<&'static RouteSpec> {
    ALL.iter().find(|spec| spec.name == name)
}
