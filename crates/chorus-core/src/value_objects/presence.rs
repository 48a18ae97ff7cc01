//! Presence value objects
//!
//! Status, activity, and the client's own presence state with merge semantics.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Online status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Online and active
    #[default]
    Online,
    /// Away from keyboard
    Idle,
    /// Do not disturb
    Dnd,
    /// Connected but shown as offline (client only)
    Invisible,
    /// Offline
    Offline,
}

impl Status {
    /// Check if this status should be visible to others
    #[must_use]
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Offline | Self::Invisible)
    }

    /// Get the wire name of this status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Invisible => "invisible",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "idle" => Ok(Self::Idle),
            "dnd" => Ok(Self::Dnd),
            "invisible" => Ok(Self::Invisible),
            "offline" => Ok(Self::Offline),
            _ => Err(format!("Invalid status: {s}")),
        }
    }
}

/// Activity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ActivityType {
    #[default]
    Playing = 0,
    Streaming = 1,
    Listening = 2,
    Watching = 3,
    Custom = 4,
    Competing = 5,
}

impl ActivityType {
    /// Create an `ActivityType` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Playing),
            1 => Some(Self::Streaming),
            2 => Some(Self::Listening),
            3 => Some(Self::Watching),
            4 => Some(Self::Custom),
            5 => Some(Self::Competing),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Serialize for ActivityType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ActivityType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid activity type: {value}")))
    }
}

/// An activity shown next to the user's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ActivityType,
    /// Stream URL, only meaningful for `Streaming`
    #[serde(default)]
    pub url: Option<String>,
}

impl Activity {
    /// Create an activity of the given type
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ActivityType) -> Self {
        Self {
            name: name.into(),
            kind,
            url: None,
        }
    }

    /// "Playing {name}"
    #[must_use]
    pub fn playing(name: impl Into<String>) -> Self {
        Self::new(name, ActivityType::Playing)
    }

    /// "Streaming {name}" with a stream URL
    #[must_use]
    pub fn streaming(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActivityType::Streaming,
            url: Some(url.into()),
        }
    }

    /// "Listening to {name}"
    #[must_use]
    pub fn listening(name: impl Into<String>) -> Self {
        Self::new(name, ActivityType::Listening)
    }

    /// "Watching {name}"
    #[must_use]
    pub fn watching(name: impl Into<String>) -> Self {
        Self::new(name, ActivityType::Watching)
    }
}

/// The client's own presence
///
/// Every shard announces this presence when it identifies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientPresence {
    pub afk: bool,
    /// Unix time (milliseconds) since when the client has been idle
    pub since: Option<i64>,
    pub status: Status,
    pub activity: Option<Activity>,
}

impl ClientPresence {
    /// Apply an update; fields the update leaves out keep their current values
    pub fn merge(&mut self, update: PresenceUpdate) {
        if let Some(afk) = update.afk {
            self.afk = afk;
        }
        if let Some(since) = update.since {
            self.since = since;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(activity) = update.activity {
            self.activity = activity;
        }
    }
}

/// A partial presence change
///
/// `None` means "keep the current value". For nullable fields, `Some(None)` clears them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresenceUpdate {
    pub afk: Option<bool>,
    pub since: Option<Option<i64>>,
    pub status: Option<Status>,
    pub activity: Option<Option<Activity>>,
}

impl PresenceUpdate {
    /// Create an empty update
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AFK flag
    #[must_use]
    pub fn afk(mut self, afk: bool) -> Self {
        self.afk = Some(afk);
        self
    }

    /// Set or clear the idle-since timestamp
    #[must_use]
    pub fn since(mut self, since: Option<i64>) -> Self {
        self.since = Some(since);
        self
    }

    /// Set the status
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Set or clear the activity
    #[must_use]
    pub fn activity(mut self, activity: Option<Activity>) -> Self {
        self.activity = Some(activity);
        self
    }

    /// Check if the update changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.afk.is_none() && self.since.is_none() && self.status.is_none() && self.activity.is_none()
    }
}
