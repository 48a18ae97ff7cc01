//! Dispatch names the cache understands
//!
//! Anything else in a dispatch's `t` field is still forwarded to listeners; it just
//! leaves the cache untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! dispatch_names {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)+) => {
        /// Dispatch event names
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum GatewayEventType {
            $($(#[$doc])* #[serde(rename = $name)] $variant,)+
        }

        impl GatewayEventType {
            /// Every known dispatch, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Wire name, as sent in `t`
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Look up a wire name
            #[must_use]
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

dispatch_names! {
    /// First dispatch of an identified session
    Ready => "READY",
    Resumed => "RESUMED",

    /// A guild became available, or the client joined one
    GuildCreate => "GUILD_CREATE",
    GuildUpdate => "GUILD_UPDATE",
    /// An outage when `unavailable` is set, otherwise the client left
    GuildDelete => "GUILD_DELETE",

    ChannelCreate => "CHANNEL_CREATE",
    ChannelUpdate => "CHANNEL_UPDATE",
    ChannelDelete => "CHANNEL_DELETE",

    MessageCreate => "MESSAGE_CREATE",
    /// May be partial
    MessageUpdate => "MESSAGE_UPDATE",
    MessageDelete => "MESSAGE_DELETE",
    MessageDeleteBulk => "MESSAGE_DELETE_BULK",

    GuildMemberAdd => "GUILD_MEMBER_ADD",
    GuildMemberRemove => "GUILD_MEMBER_REMOVE",
    /// Answer to op 8
    GuildMembersChunk => "GUILD_MEMBERS_CHUNK",

    PresenceUpdate => "PRESENCE_UPDATE",
    TypingStart => "TYPING_START",
    /// The client user changed
    UserUpdate => "USER_UPDATE",
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
