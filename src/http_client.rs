// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::HttpSettings;
use crate::errors::NetworkError;
use crate::session::Session;
use crate::types::{is_json_content_type, RequestBody, RequestData};

/// Maximum response body size (10MB) to prevent memory exhaustion
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

const DEFAULT_POOL_MAX_IDLE_TIMEOUT: u64 = 90;

/// Captured headers that must never be replayed verbatim
const DROPPED_HEADERS: &[&str] = &["content-length", "host"];

/// Replays captured requests under a given session
pub struct HttpClient {
    /// `None` once the client has been closed
    client: RwLock<Option<Client>>,
    timeout: Duration,
    max_retries: u32,
    max_body_size: usize,
    sent: AtomicU64,
}

impl HttpClient {
    pub fn new(timeout_secs: u64, max_retries: u32) -> Result<Self> {
        Self::from_config(&HttpSettings {
            request_timeout_secs: timeout_secs,
            max_retries,
            ..HttpSettings::default()
        })
    }

    pub fn from_config(settings: &HttpSettings) -> Result<Self> {
        if settings.accept_invalid_certs {
            warn!("========================================");
            warn!("WARNING: INSECURE MODE ENABLED!");
            warn!("Certificate validation is DISABLED!");
            warn!("Replayed requests are vulnerable to MITM attacks.");
            warn!("========================================");
        }

        // Replays observe redirects instead of following them unless configured
        let redirect = if settings.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(settings.max_redirects)
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .redirect(redirect)
            .user_agent(concat!("lonkero-authz/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(DEFAULT_POOL_MAX_IDLE_TIMEOUT))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client: RwLock::new(Some(client)),
            timeout: Duration::from_secs(settings.request_timeout_secs),
            max_retries: settings.max_retries,
            max_body_size: MAX_BODY_SIZE,
            sent: AtomicU64::new(0),
        })
    }

    /// Replay `request` with the credentials held by `session`.
    ///
    /// HTTP error statuses are ordinary responses; only transport failures
    /// are returned as errors. On success the session refreshes itself from
    /// the response headers.
    pub async fn send<S: Session + ?Sized>(
        &self,
        request: &RequestData,
        session: &mut S,
    ) -> Result<HttpResponse, NetworkError> {
        let client = self.client.read().clone().ok_or(NetworkError::ClientClosed)?;

        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            NetworkError::InvalidRequest {
                url: request.url.clone(),
                reason: e.to_string(),
            }
        })?;

        let merged = merge_headers(&request.headers, session.auth_headers());
        let body = encode_body(request.body.as_ref(), merged.get("content-type").map(String::as_str));
        let headers = build_header_map(&merged, body.default_content_type, &request.url)?;

        let mut attempts = 0;

        loop {
            let started = Instant::now();
            let mut builder = client
                .request(method.clone(), &request.url)
                .headers(headers.clone());
            if let Some(ref bytes) = body.bytes {
                builder = builder.body(bytes.clone());
            }

            match builder.send().await {
                Ok(response) => {
                    let status_code = response.status().as_u16();
                    let response_headers = response.headers().clone();

                    // Read body with size limit
                    let body_bytes = response.bytes().await.unwrap_or_default();
                    let body = if body_bytes.len() > self.max_body_size {
                        String::from_utf8_lossy(&body_bytes[..self.max_body_size]).to_string()
                    } else {
                        String::from_utf8_lossy(&body_bytes).to_string()
                    };

                    session.refresh_from_headers(&response_headers);
                    self.sent.fetch_add(1, Ordering::Relaxed);

                    let mut headers_map = HashMap::with_capacity(response_headers.len());
                    for (k, v) in response_headers.iter() {
                        if let Ok(value_str) = v.to_str() {
                            headers_map.insert(k.as_str().to_string(), value_str.to_string());
                        }
                    }

                    return Ok(HttpResponse {
                        status_code,
                        body,
                        headers: headers_map,
                        duration_ms: started.elapsed().as_millis() as u64,
                    });
                }
                Err(e) => {
                    let error = NetworkError::classify(&e, &request.url, self.timeout);
                    attempts += 1;
                    if !error.is_retryable() || attempts > self.max_retries {
                        return Err(error);
                    }
                    debug!(
                        "[HttpClient] {} {} failed ({}), retry {}/{}",
                        request.method, request.url, error, attempts, self.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(100 * attempts as u64)).await;
                }
            }
        }
    }

    /// Number of requests that received a response
    pub fn send_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Release the connection pool. Later sends fail with `ClientClosed`.
    pub fn close(&self) {
        if self.client.write().take().is_some() {
            debug!("[HttpClient] Closed after {} request(s)", self.send_count());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.client.read().is_none()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("closed", &self.is_closed())
            .field("sent", &self.send_count())
            .finish()
    }
}

/// Captured headers with the session's headers layered on top.
/// Keys are lower-cased so the session wins regardless of capture casing.
fn merge_headers(
    captured: &HashMap<String, String>,
    session_headers: Vec<(String, String)>,
) -> HashMap<String, String> {
    let mut merged: HashMap<String, String> = captured
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .filter(|(k, _)| !DROPPED_HEADERS.contains(&k.as_str()))
        .collect();

    for (name, value) in session_headers {
        merged.insert(name.to_lowercase(), value);
    }

    merged
}

struct EncodedBody {
    bytes: Option<Vec<u8>>,
    /// Used only when the captured request carried no content type
    default_content_type: Option<&'static str>,
}

fn encode_body(body: Option<&RequestBody>, content_type: Option<&str>) -> EncodedBody {
    let json_like = content_type.is_some_and(is_json_content_type);

    match body {
        None => EncodedBody {
            bytes: None,
            default_content_type: None,
        },
        Some(RequestBody::Json(value)) => EncodedBody {
            bytes: Some(value.to_string().into_bytes()),
            default_content_type: Some("application/json"),
        },
        Some(RequestBody::Form(fields)) => EncodedBody {
            bytes: Some(RequestBody::encode_form(fields).into_bytes()),
            default_content_type: Some("application/x-www-form-urlencoded"),
        },
        Some(RequestBody::Text(text)) if json_like => {
            let bytes = match serde_json::from_str::<serde_json::Value>(text) {
                Ok(value) => value.to_string().into_bytes(),
                Err(e) => {
                    debug!("[HttpClient] JSON body did not parse ({}), sending raw", e);
                    text.clone().into_bytes()
                }
            };
            EncodedBody {
                bytes: Some(bytes),
                default_content_type: None,
            }
        }
        Some(RequestBody::Text(text)) => EncodedBody {
            bytes: Some(text.clone().into_bytes()),
            default_content_type: None,
        },
    }
}

fn build_header_map(
    merged: &HashMap<String, String>,
    default_content_type: Option<&'static str>,
    url: &str,
) -> Result<HeaderMap, NetworkError> {
    let invalid = |reason: String| NetworkError::InvalidRequest {
        url: url.to_string(),
        reason,
    };

    let mut headers = HeaderMap::with_capacity(merged.len() + 1);
    for (name, value) in merged {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        headers.insert(name, value);
    }

    if let Some(content_type) = default_content_type {
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }

    Ok(headers)
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
    pub duration_ms: u64,
}

impl HttpResponse {
    pub fn contains(&self, pattern: &str) -> bool {
        self.body.contains(pattern)
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_lowercase()).cloned()
    }
}
