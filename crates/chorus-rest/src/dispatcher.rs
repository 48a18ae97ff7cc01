//! REST dispatcher - rate-limited, retrying request execution

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chorus_common::{Backoff, RestConfig};
use chorus_core::{Entity, EntityRef, FactoryContext, Store};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ApiErrorBody, RestError};
use crate::ratelimit::{RateLimitHeaders, RateLimiter};
use crate::request::RestRequest;
use crate::route::{Route, RouteSpec, RouteTable};
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};

/// Delay used when a 429 names none
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Executes REST requests against the platform API
pub struct RestDispatcher {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    routes: RouteTable,
    limiter: RateLimiter,
    backoff: Backoff,
    max_rate_limit_retries: u32,
    max_server_retries: u32,
    closed: AtomicBool,
    /// Read-held by every request in flight; `drain` takes the write side
    inflight: RwLock<()>,
}

impl RestDispatcher {
    /// Create a dispatcher over any transport
    pub fn new(config: &RestConfig, transport: Arc<dyn HttpTransport>) -> Result<Self, RestError> {
        Url::parse(&config.api_url)
            .map_err(|e| RestError::InvalidRequest(format!("invalid API URL {}: {e}", config.api_url)))?;

        Ok(Self {
            transport,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            routes: RouteTable::new(&config.method_overrides)?,
            limiter: RateLimiter::new(),
            backoff: Backoff::new(
                Duration::from_millis(config.retry_base_delay_ms),
                Duration::from_millis(config.retry_max_delay_ms),
            ),
            max_rate_limit_retries: config.max_rate_limit_retries,
            max_server_retries: config.max_server_retries,
            closed: AtomicBool::new(false),
            inflight: RwLock::new(()),
        })
    }

    /// Create a dispatcher backed by reqwest
    pub fn with_reqwest(config: &RestConfig, token: &str) -> Result<Self, RestError> {
        let transport = ReqwestTransport::new(config, token).map_err(|source| RestError::Transport {
            route: "client setup".to_string(),
            source,
            attempts: 0,
        })?;
        Self::new(config, Arc::new(transport))
    }

    /// Build a route with configured verb overrides applied
    pub fn route(&self, spec: &RouteSpec, params: &[&dyn fmt::Display]) -> Result<Route, RestError> {
        self.routes.route(spec, params)
    }

    /// Rate-limit state, for inspection
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Check if `drain` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Execute a request and decode its JSON body (`Null` for empty bodies)
    pub async fn request(&self, request: RestRequest) -> Result<Value, RestError> {
        if self.is_closed() {
            return Err(RestError::ShuttingDown);
        }
        let _inflight = self.inflight.read().await;
        // drain may have won the race for the lock
        if self.is_closed() {
            return Err(RestError::ShuttingDown);
        }

        let http = self.http_request(&request)?;
        let route = request.route.to_string();
        let key = request.route.bucket_key();
        let bucket = self.limiter.bucket(&key);

        // Held for the whole exchange, retries included: one request per bucket in flight
        let mut bucket = bucket.lock().await;

        let mut attempts = 0u32;
        let mut rate_limited = 0u32;
        let mut server_failures = 0u32;

        loop {
            self.limiter.wait_global().await;
            while let Some(wait) = bucket.wait_time(Instant::now()) {
                debug!(bucket = %key, wait_ms = wait.as_millis() as u64, "Bucket exhausted, waiting");
                tokio::time::sleep(wait).await;
            }
            // Global limits take priority over a route wait that just ended
            self.limiter.wait_global().await;

            bucket.consume();
            attempts += 1;

            let response = match self.transport.execute(&http).await {
                Ok(response) => response,
                Err(source) => {
                    if server_failures >= self.max_server_retries {
                        return Err(RestError::Transport {
                            route,
                            source,
                            attempts,
                        });
                    }
                    let delay = self.backoff.delay_for_attempt(server_failures);
                    server_failures += 1;
                    warn!(
                        route = %route,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %source,
                        "Transport failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let headers = RateLimitHeaders::parse(&response);
            bucket.update(&headers, Instant::now());

            match response.status {
                200..=299 => {
                    debug!(route = %route, status = response.status, attempts, "Request succeeded");
                    if response.status == 204 || response.body.is_empty() {
                        return Ok(Value::Null);
                    }
                    return serde_json::from_slice(&response.body).map_err(|source| {
                        RestError::Decode {
                            route,
                            source,
                            attempts,
                        }
                    });
                }
                429 => {
                    let retry_after = headers.retry_after.unwrap_or(DEFAULT_RETRY_AFTER);
                    if headers.global {
                        self.limiter.close_global(retry_after);
                    } else {
                        bucket.exhaust_for(retry_after, Instant::now());
                    }

                    if rate_limited >= self.max_rate_limit_retries {
                        return Err(RestError::RateLimited {
                            route,
                            retry_after,
                            global: headers.global,
                            attempts,
                        });
                    }
                    rate_limited += 1;
                    warn!(
                        route = %route,
                        bucket = %key,
                        global = headers.global,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                }
                status @ 400..=499 => {
                    let body = ApiErrorBody::parse(&response.body);
                    debug!(route = %route, status, error = %body, "Request rejected");
                    return Err(RestError::Permanent {
                        route,
                        status,
                        body,
                        attempts,
                    });
                }
                status => {
                    if server_failures >= self.max_server_retries {
                        return Err(RestError::Server {
                            route,
                            status,
                            attempts,
                        });
                    }
                    let delay = self.backoff.delay_for_attempt(server_failures);
                    server_failures += 1;
                    warn!(
                        route = %route,
                        status,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Server error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Execute a request and route the entity in the response through `store`
    pub async fn request_entity<T: Entity>(
        &self,
        request: RestRequest,
        store: &Store<T>,
        ctx: &FactoryContext,
    ) -> Result<EntityRef<T>, RestError> {
        let value = self.request(request).await?;
        Ok(store.factory(&value, ctx)?)
    }

    /// Execute a request and route every entity of the response array through `store`
    pub async fn request_entities<T: Entity>(
        &self,
        request: RestRequest,
        store: &Store<T>,
        ctx: &FactoryContext,
    ) -> Result<Vec<EntityRef<T>>, RestError> {
        let route = request.route.to_string();
        let value = self.request(request).await?;
        let Value::Array(items) = value else {
            return Err(RestError::UnexpectedShape {
                route,
                expected: "an array",
            });
        };

        items
            .iter()
            .map(|item| store.factory(item, ctx).map_err(RestError::from))
            .collect()
    }

    /// Refuse new requests and wait for in-flight ones to finish
    pub async fn drain(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _all = self.inflight.write().await;
        info!("REST dispatcher drained");
    }

    fn http_request(&self, request: &RestRequest) -> Result<HttpRequest, RestError> {
        let mut url = Url::parse(&format!("{}{}", self.api_url, request.route.path))
            .map_err(|e| RestError::InvalidRequest(format!("invalid URL for {}: {e}", request.route)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        Ok(HttpRequest {
            method: request.route.method,
            url,
            body: request.http_body(),
            reason: request.reason.clone(),
        })
    }
}

impl fmt::Debug for RestDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestDispatcher")
            .field("api_url", &self.api_url)
            .field("buckets", &self.limiter.bucket_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
