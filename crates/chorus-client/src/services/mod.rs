//! Operations exposed by the client
//!
//! Each service borrows the client and goes through its dispatcher, gateway, and cache.

pub mod channel;
pub mod client_user;

pub use channel::{ChannelService, CreateMessage, MessageQuery, MAX_FETCH_LIMIT};
pub use client_user::{ClientUser, GroupDmRecipient};
