//! # chorus-client
//!
//! Client facade tying the REST dispatcher, the gateway manager, and the entity cache
//! together behind one explicit context.

pub mod client;
pub mod context;
pub mod error;
pub mod services;

// Re-export commonly used types at crate root
pub use client::{Client, ClientBuilder};
pub use context::ClientContext;
pub use error::{ClientError, ClientResult};
pub use services::{ChannelService, ClientUser, CreateMessage, GroupDmRecipient, MessageQuery};

pub use chorus_common::ClientConfig;
pub use chorus_gateway::{DispatchEvent, EventStream, GatewayEvent};
