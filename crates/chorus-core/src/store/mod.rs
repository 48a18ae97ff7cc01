//! Entity storage - typed stores and the shared cache

mod cache;
mod store;

pub use cache::{Cache, DEFAULT_MESSAGE_LIMIT};
pub use store::{EntityRef, Store};
