//! Channel entity - a closed set of channel variants
//!
//! Text capabilities (`TextBased`) are shared by guild text channels, DMs, and group DMs.

use serde::Serialize;
use serde_json::Value;

use super::fields::Fields;
use super::{Entity, FactoryContext};
use crate::error::ModelError;
use crate::value_objects::Snowflake;

/// Channel type codes as sent by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ChannelType {
    /// Guild text channel
    GuildText = 0,
    /// Direct message between two users
    Dm = 1,
    /// Guild voice channel
    GuildVoice = 2,
    /// Direct message between several users
    GroupDm = 3,
    /// Guild category for organizing channels
    GuildCategory = 4,
    /// Guild announcement channel (text-based)
    GuildAnnouncement = 5,
}

impl ChannelType {
    /// Create a `ChannelType` from the raw type code
    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::GuildText),
            1 => Some(Self::Dm),
            2 => Some(Self::GuildVoice),
            3 => Some(Self::GroupDm),
            4 => Some(Self::GuildCategory),
            5 => Some(Self::GuildAnnouncement),
            _ => None,
        }
    }

    /// Get the raw type code
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Capabilities shared by channels that hold messages
pub trait TextBased {
    /// ID of the channel
    fn channel_id(&self) -> Snowflake;

    /// Last message seen in the channel
    fn last_message_id(&self) -> Option<Snowflake>;

    /// Record a newer message
    fn set_last_message_id(&mut self, id: Snowflake);
}

/// Guild text or announcement channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChannel {
    pub id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub name: String,
    pub topic: Option<String>,
    pub position: i32,
    pub parent_id: Option<Snowflake>,
    pub nsfw: bool,
    pub announcement: bool,
    pub last_message_id: Option<Snowflake>,
}

/// One-to-one direct message channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DmChannel {
    pub id: Snowflake,
    pub recipients: Vec<Snowflake>,
    pub last_message_id: Option<Snowflake>,
}

/// Group direct message channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDmChannel {
    pub id: Snowflake,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub owner_id: Option<Snowflake>,
    pub recipients: Vec<Snowflake>,
    pub last_message_id: Option<Snowflake>,
}

/// Guild voice channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceChannel {
    pub id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub name: String,
    pub position: i32,
    pub parent_id: Option<Snowflake>,
    pub bitrate: u32,
    pub user_limit: u32,
}

/// Guild category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryChannel {
    pub id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub name: String,
    pub position: i32,
}

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Channel {
    Text(TextChannel),
    Dm(DmChannel),
    GroupDm(GroupDmChannel),
    Voice(VoiceChannel),
    Category(CategoryChannel),
}

impl Channel {
    /// Get the type code of this channel
    #[must_use]
    pub fn kind(&self) -> ChannelType {
        match self {
            Self::Text(c) if c.announcement => ChannelType::GuildAnnouncement,
            Self::Text(_) => ChannelType::GuildText,
            Self::Dm(_) => ChannelType::Dm,
            Self::GroupDm(_) => ChannelType::GroupDm,
            Self::Voice(_) => ChannelType::GuildVoice,
            Self::Category(_) => ChannelType::GuildCategory,
        }
    }

    /// Guild this channel belongs to, if any
    #[must_use]
    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::Text(c) => c.guild_id,
            Self::Voice(c) => c.guild_id,
            Self::Category(c) => c.guild_id,
            Self::Dm(_) | Self::GroupDm(_) => None,
        }
    }

    /// Record the guild that delivered this channel
    pub fn set_guild_id(&mut self, guild_id: Snowflake) {
        match self {
            Self::Text(c) => c.guild_id = Some(guild_id),
            Self::Voice(c) => c.guild_id = Some(guild_id),
            Self::Category(c) => c.guild_id = Some(guild_id),
            Self::Dm(_) | Self::GroupDm(_) => {}
        }
    }

    /// Get display name (channel name or fallback for DMs)
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Text(c) => &c.name,
            Self::Voice(c) => &c.name,
            Self::Category(c) => &c.name,
            Self::GroupDm(c) => c.name.as_deref().unwrap_or("Group DM"),
            Self::Dm(_) => "Direct Message",
        }
    }

    /// Check if this channel holds messages
    #[inline]
    #[must_use]
    pub fn is_text_based(&self) -> bool {
        self.as_text().is_some()
    }

    /// Check if this is a guild channel
    #[inline]
    #[must_use]
    pub fn is_guild_channel(&self) -> bool {
        self.guild_id().is_some()
    }

    /// Text capabilities, if the variant has them
    #[must_use]
    pub fn as_text(&self) -> Option<&dyn TextBased> {
        match self {
            Self::Text(c) => Some(c),
            Self::Dm(c) => Some(c),
            Self::GroupDm(c) => Some(c),
            Self::Voice(_) | Self::Category(_) => None,
        }
    }

    /// Mutable text capabilities, if the variant has them
    pub fn as_text_mut(&mut self) -> Option<&mut dyn TextBased> {
        match self {
            Self::Text(c) => Some(c),
            Self::Dm(c) => Some(c),
            Self::GroupDm(c) => Some(c),
            Self::Voice(_) | Self::Category(_) => None,
        }
    }

    fn raw_kind(fields: &Fields<'_>) -> Result<ChannelType, ModelError> {
        let code: u64 = fields.required("type")?;
        ChannelType::from_code(code).ok_or(ModelError::UnknownChannelType(code))
    }
}

impl Entity for Channel {
    const KIND: &'static str = "channel";

    fn id(&self) -> Snowflake {
        match self {
            Self::Text(c) => c.id,
            Self::Dm(c) => c.id,
            Self::GroupDm(c) => c.id,
            Self::Voice(c) => c.id,
            Self::Category(c) => c.id,
        }
    }

    fn from_raw(raw: &Value, _ctx: &FactoryContext) -> Result<Self, ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;
        let id = fields.required("id")?;

        let channel = match Self::raw_kind(&fields)? {
            kind @ (ChannelType::GuildText | ChannelType::GuildAnnouncement) => {
                Self::Text(TextChannel {
                    id,
                    guild_id: fields.optional("guild_id")?,
                    name: fields.or_default("name")?,
                    topic: fields.optional("topic")?,
                    position: fields.or_default("position")?,
                    parent_id: fields.optional("parent_id")?,
                    nsfw: fields.or_default("nsfw")?,
                    announcement: kind == ChannelType::GuildAnnouncement,
                    last_message_id: fields.optional("last_message_id")?,
                })
            }
            ChannelType::Dm => Self::Dm(DmChannel {
                id,
                recipients: fields.nested_ids("recipients")?.unwrap_or_default(),
                last_message_id: fields.optional("last_message_id")?,
            }),
            ChannelType::GroupDm => Self::GroupDm(GroupDmChannel {
                id,
                name: fields.optional("name")?,
                icon: fields.optional("icon")?,
                owner_id: fields.optional("owner_id")?,
                recipients: fields.nested_ids("recipients")?.unwrap_or_default(),
                last_message_id: fields.optional("last_message_id")?,
            }),
            ChannelType::GuildVoice => Self::Voice(VoiceChannel {
                id,
                guild_id: fields.optional("guild_id")?,
                name: fields.or_default("name")?,
                position: fields.or_default("position")?,
                parent_id: fields.optional("parent_id")?,
                bitrate: fields.or_default("bitrate")?,
                user_limit: fields.or_default("user_limit")?,
            }),
            ChannelType::GuildCategory => Self::Category(CategoryChannel {
                id,
                guild_id: fields.optional("guild_id")?,
                name: fields.or_default("name")?,
                position: fields.or_default("position")?,
            }),
        };

        Ok(channel)
    }

    fn patch(&mut self, raw: &Value) -> Result<(), ModelError> {
        let fields = Fields::new(raw, Self::KIND)?;

        // A type change (e.g. text converted to announcement) replaces the variant
        if raw.get("type").is_some() {
            let kind = Self::raw_kind(&fields)?;
            if kind != self.kind() {
                let guild_id = self.guild_id();
                *self = Self::from_raw(raw, &FactoryContext::default())?;
                if let (None, Some(guild_id)) = (self.guild_id(), guild_id) {
                    self.set_guild_id(guild_id);
                }
                return Ok(());
            }
        }

        match self {
            Self::Text(c) => {
                fields.patch(&mut c.name, "name")?;
                fields.patch_nullable(&mut c.topic, "topic")?;
                fields.patch(&mut c.position, "position")?;
                fields.patch_nullable(&mut c.parent_id, "parent_id")?;
                fields.patch(&mut c.nsfw, "nsfw")?;
                fields.patch_nullable(&mut c.last_message_id, "last_message_id")?;
            }
            Self::Dm(c) => {
                if let Some(recipients) = fields.nested_ids("recipients")? {
                    c.recipients = recipients;
                }
                fields.patch_nullable(&mut c.last_message_id, "last_message_id")?;
            }
            Self::GroupDm(c) => {
                fields.patch_nullable(&mut c.name, "name")?;
                fields.patch_nullable(&mut c.icon, "icon")?;
                fields.patch_nullable(&mut c.owner_id, "owner_id")?;
                if let Some(recipients) = fields.nested_ids("recipients")? {
                    c.recipients = recipients;
                }
                fields.patch_nullable(&mut c.last_message_id, "last_message_id")?;
            }
            Self::Voice(c) => {
                fields.patch(&mut c.name, "name")?;
                fields.patch(&mut c.position, "position")?;
                fields.patch_nullable(&mut c.parent_id, "parent_id")?;
                fields.patch(&mut c.bitrate, "bitrate")?;
                fields.patch(&mut c.user_limit, "user_limit")?;
            }
            Self::Category(c) => {
                fields.patch(&mut c.name, "name")?;
                fields.patch(&mut c.position, "position")?;
            }
        }

        Ok(())
    }
}

macro_rules! impl_text_based {
    ($($ty:ty),+) => {
        $(
            impl TextBased for $ty {
                fn channel_id(&self) -> Snowflake {
                    self.id
                }

                fn last_message_id(&self) -> Option<Snowflake> {
                    self.last_message_id
                }

                fn set_last_message_id(&mut self, id: Snowflake) {
                    // Out-of-order deliveries never move the marker backwards
                    if self.last_message_id.is_none_or(|last| last < id) {
                        self.last_message_id = Some(id);
                    }
                }
            }
        )+
    };
}

impl_text_based!(TextChannel, DmChannel, GroupDmChannel);
