//! HTTP transport seam
//!
//! The dispatcher only talks to [`HttpTransport`]; production uses reqwest.

mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::route::Method;

/// File sent as a multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub name: String,
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

impl FileAttachment {
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            content_type: None,
        }
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Empty,
    Json(Value),
    /// `payload_json` part plus `files[n]` parts
    Multipart {
        payload_json: Option<Value>,
        files: Vec<FileAttachment>,
    },
}

/// A fully resolved HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub body: HttpBody,
    /// Sent as `X-Audit-Log-Reason`
    pub reason: Option<String>,
}

/// A received HTTP response
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Look up a header (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure to get any response at all
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Failed to build request: {0}")]
    Build(String),

    #[error("HTTP transport error: {0}")]
    Other(String),
}

/// Executes HTTP requests
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
