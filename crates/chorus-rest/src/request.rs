//! Outbound REST request description

use serde_json::Value;

use crate::route::Route;
use crate::transport::{FileAttachment, HttpBody};

/// A request for the dispatcher
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub route: Route,
    pub body: Option<Value>,
    pub files: Vec<FileAttachment>,
    pub query: Vec<(String, String)>,
    /// Audit-log reason
    pub reason: Option<String>,
}

impl RestRequest {
    #[must_use]
    pub fn new(route: Route) -> Self {
        Self {
            route,
            body: None,
            files: Vec::new(),
            query: Vec::new(),
            reason: None,
        }
    }

    /// Attach a JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a file; the request becomes multipart
    #[must_use]
    pub fn file(mut self, file: FileAttachment) -> Self {
        self.files.push(file);
        self
    }

    /// Append a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Set the audit-log reason
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub(crate) fn http_body(&self) -> HttpBody {
        if !self.files.is_empty() {
            HttpBody::Multipart {
                payload_json: self.body.clone(),
                files: self.files.clone(),
            }
        } else if let Some(body) = &self.body {
            HttpBody::Json(body.clone())
        } else {
            HttpBody::Empty
        }
    }
}
