// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Captured Sessions
//!
//! The engine never interprets credentials itself. A [`Session`] only has to
//! say which headers to attach to a request and how to refresh itself from a
//! response. [`AuthSession`] is the cookie / bearer / CSRF holder used by the
//! capture pipeline; callers may plug in their own implementation.

use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::types::Identity;

/// Opaque credential holder for one identity
pub trait Session: Send + Sync + std::fmt::Debug {
    /// Headers to merge over a replayed request, names lower-cased
    fn auth_headers(&self) -> Vec<(String, String)>;

    /// Update held credentials from a response (rotated cookies, CSRF tokens)
    fn refresh_from_headers(&mut self, headers: &HeaderMap);
}

/// Cookie and token based session captured from the browser
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Cookies (name -> value)
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    /// Authorization header value (e.g., "Bearer xxx")
    #[serde(default)]
    pub auth_header: Option<String>,
    /// CSRF token if detected
    #[serde(default)]
    pub csrf_token: Option<String>,
    /// Any other header the session depends on (API keys, tenant ids)
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_auth_header(mut self, value: &str) -> Self {
        self.auth_header = Some(value.to_string());
        self
    }

    pub fn with_csrf_token(mut self, token: &str) -> Self {
        self.csrf_token = Some(token.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.extra_headers
            .insert(name.to_lowercase(), value.to_string());
        self
    }

    /// Build a session from the credentials carried by a captured request
    pub fn from_request_headers(headers: &HashMap<String, String>) -> Self {
        let mut session = Self::new();

        for (name, value) in headers {
            match name.to_lowercase().as_str() {
                "cookie" => {
                    for pair in value.split(';') {
                        if let Some((k, v)) = pair.trim().split_once('=') {
                            session.cookies.insert(k.trim().to_string(), v.trim().to_string());
                        }
                    }
                }
                "authorization" => session.auth_header = Some(value.clone()),
                "x-csrf-token" | "x-xsrf-token" => session.csrf_token = Some(value.clone()),
                _ => {}
            }
        }

        session
    }

    /// Get cookie header string for HTTP requests
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            None
        } else {
            Some(
                self.cookies
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        }
    }

    /// Check if we have any auth credentials
    pub fn has_credentials(&self) -> bool {
        !self.cookies.is_empty() || self.auth_header.is_some()
    }

    fn apply_set_cookie(&mut self, raw: &str) {
        let mut parts = raw.split(';');
        let Some((name, value)) = parts.next().and_then(|p| p.trim().split_once('=')) else {
            return;
        };
        let name = name.trim();
        let value = value.trim();

        let expired = parts.any(|attr| {
            attr.trim()
                .split_once('=')
                .is_some_and(|(k, v)| k.trim().eq_ignore_ascii_case("max-age") && v.trim() == "0")
        });

        if expired || value.is_empty() {
            debug!("[Session] Cookie '{}' cleared by server", name);
            self.cookies.remove(name);
        } else {
            self.cookies.insert(name.to_string(), value.to_string());
        }
    }
}

impl Session for AuthSession {
    fn auth_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        if let Some(cookie) = self.cookie_header() {
            headers.push(("cookie".to_string(), cookie));
        }

        if let Some(ref auth) = self.auth_header {
            headers.push(("authorization".to_string(), auth.clone()));
        }

        if let Some(ref csrf) = self.csrf_token {
            headers.push(("x-csrf-token".to_string(), csrf.clone()));
        }

        for (name, value) in &self.extra_headers {
            headers.push((name.to_lowercase(), value.clone()));
        }

        headers
    }

    fn refresh_from_headers(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            if let Ok(raw) = value.to_str() {
                self.apply_set_cookie(raw);
            }
        }

        if let Some(token) = headers
            .get("x-csrf-token")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            self.csrf_token = Some(token.to_string());
        }
    }
}

/// Sessions keyed by identity; the latest capture for an identity wins
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<Identity, Box<dyn Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identity: Identity, session: Box<dyn Session>) {
        self.sessions.insert(identity, session);
    }

    pub fn get_mut(&mut self, identity: &Identity) -> Option<&mut Box<dyn Session>> {
        self.sessions.get_mut(identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.sessions.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_auth_headers_are_lowercase() {
        let session = AuthSession::new()
            .with_cookie("sid", "abc")
            .with_cookie("theme", "dark")
            .with_auth_header("Bearer t0k3n")
            .with_header("X-Tenant", "acme");

        let headers = session.auth_headers();
        assert!(headers.contains(&("cookie".to_string(), "sid=abc; theme=dark".to_string())));
        assert!(headers.contains(&("authorization".to_string(), "Bearer t0k3n".to_string())));
        assert!(headers.contains(&("x-tenant".to_string(), "acme".to_string())));
    }

    #[test]
    fn test_from_request_headers() {
        let mut captured = HashMap::new();
        captured.insert("Cookie".to_string(), "sid=abc; lang=fi".to_string());
        captured.insert("authorization".to_string(), "Bearer xyz".to_string());
        captured.insert("x-xsrf-token".to_string(), "csrf-1".to_string());
        captured.insert("accept".to_string(), "*/*".to_string());

        let session = AuthSession::from_request_headers(&captured);
        assert_eq!(session.cookies.get("sid").map(String::as_str), Some("abc"));
        assert_eq!(session.cookies.get("lang").map(String::as_str), Some("fi"));
        assert_eq!(session.auth_header.as_deref(), Some("Bearer xyz"));
        assert_eq!(session.csrf_token.as_deref(), Some("csrf-1"));
        assert!(session.has_credentials());
    }

    #[test]
    fn test_refresh_rotates_and_clears_cookies() {
        let mut session = AuthSession::new()
            .with_cookie("sid", "old")
            .with_cookie("tracking", "1");

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("sid=new; Path=/; HttpOnly"));
        headers.append(SET_COOKIE, HeaderValue::from_static("tracking=; Max-Age=0"));
        headers.insert("x-csrf-token", HeaderValue::from_static("csrf-2"));

        session.refresh_from_headers(&headers);

        assert_eq!(session.cookies.get("sid").map(String::as_str), Some("new"));
        assert!(!session.cookies.contains_key("tracking"));
        assert_eq!(session.csrf_token.as_deref(), Some("csrf-2"));
    }

    #[test]
    fn test_session_store_latest_wins() {
        let mut store = SessionStore::new();
        let alice = Identity::new("alice", "viewer");

        store.insert(alice.clone(), Box::new(AuthSession::new().with_cookie("sid", "1")));
        store.insert(alice.clone(), Box::new(AuthSession::new().with_cookie("sid", "2")));

        assert_eq!(store.len(), 1);
        let headers = store.get_mut(&alice).map(|s| s.auth_headers()).unwrap_or_default();
        assert_eq!(headers, vec![("cookie".to_string(), "sid=2".to_string())]);
        assert!(!store.contains(&Identity::new("alice", "admin")));
    }
}
