//! Gateway protocol definitions
//!
//! Op codes, close codes, payloads, and the frame envelope.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::{CloseAction, CloseCode, NORMAL_CLOSE};
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{
    HelloPayload, IdentifyPayload, IdentifyProperties, PresenceUpdatePayload, ReadyPayload,
    RequestGuildMembersPayload, ResumePayload,
};
