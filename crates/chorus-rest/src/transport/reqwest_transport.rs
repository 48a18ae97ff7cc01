//! reqwest-backed transport

use async_trait::async_trait;
use chorus_common::RestConfig;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};

use super::{HttpBody, HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::route::Method;

/// Production transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client that authenticates every request with `token`
    pub fn new(config: &RestConfig, token: &str) -> Result<Self, TransportError> {
        let mut auth = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|e| TransportError::Build(format!("invalid token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { client })
    }

    fn multipart(payload_json: Option<&serde_json::Value>, files: &[super::FileAttachment]) -> Result<Form, TransportError> {
        let mut form = Form::new();
        if let Some(payload) = payload_json {
            form = form.text("payload_json", payload.to_string());
        }
        for (i, file) in files.iter().enumerate() {
            let mut part = Part::bytes(file.data.clone()).file_name(file.name.clone());
            if let Some(content_type) = &file.content_type {
                part = part
                    .mime_str(content_type)
                    .map_err(|e| TransportError::Build(e.to_string()))?;
            }
            form = form.part(format!("files[{i}]"), part);
        }
        Ok(form)
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_builder() {
        TransportError::Build(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone());

        if let Some(reason) = &request.reason {
            let encoded: String = url::form_urlencoded::byte_serialize(reason.as_bytes()).collect();
            builder = builder.header("X-Audit-Log-Reason", encoded);
        }

        builder = match &request.body {
            HttpBody::Empty => builder,
            HttpBody::Json(value) => builder.json(value),
            HttpBody::Multipart {
                payload_json,
                files,
            } => builder.multipart(Self::multipart(payload_json.as_ref(), files)?),
        };

        let response = builder.send().await.map_err(|e| map_error(&e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_error(&e))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
