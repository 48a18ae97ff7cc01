//! # chorus-rest
//!
//! REST layer: route templates, per-route and global rate limiting, the HTTP transport
//! seam, and the dispatcher that feeds responses into the entity store.

pub mod dispatcher;
pub mod error;
pub mod ratelimit;
pub mod request;
pub mod route;
pub mod routes;
pub mod transport;

// Re-export commonly used types at crate root
pub use dispatcher::RestDispatcher;
pub use error::{ApiErrorBody, RestError};
pub use ratelimit::{Bucket, RateLimitHeaders, RateLimiter};
pub use request::RestRequest;
pub use route::{Method, Route, RouteSpec, RouteTable};
pub use transport::{
    FileAttachment, HttpBody, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
    TransportError,
};
