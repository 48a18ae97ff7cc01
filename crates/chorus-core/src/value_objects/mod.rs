//! Value objects - immutable types that represent domain concepts

mod presence;
mod snowflake;

pub use presence::{Activity, ActivityType, ClientPresence, PresenceUpdate, Status};
pub use snowflake::{Snowflake, SnowflakeParseError};
