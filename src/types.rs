// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request-level data model shared by the authorization engine.
//!
//! Everything here arrives pre-structured from the capture pipeline: the
//! resource extractor decides where identifiers live, this crate only moves
//! them around.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where inside a request a resource identifier physically sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPart {
    Url,
    Body,
    Headers,
}

impl std::fmt::Display for RequestPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestPart::Url => write!(f, "url"),
            RequestPart::Body => write!(f, "body"),
            RequestPart::Headers => write!(f, "headers"),
        }
    }
}

/// A resource identifier found in an observed request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceLocator {
    /// The identifier value as it appears in the request
    pub id: String,
    /// Resource type assigned by the extractor (e.g. "invoice", "project")
    pub type_name: String,
    /// Request part holding the identifier
    pub request_part: RequestPart,
}

impl ResourceLocator {
    pub fn new(id: &str, type_name: &str, request_part: RequestPart) -> Self {
        Self {
            id: id.to_string(),
            type_name: type_name.to_string(),
            request_part,
        }
    }

    pub fn in_url(id: &str, type_name: &str) -> Self {
        Self::new(id, type_name, RequestPart::Url)
    }

    pub fn in_body(id: &str, type_name: &str) -> Self {
        Self::new(id, type_name, RequestPart::Body)
    }
}

/// Captured request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RequestBody {
    /// Raw textual body, replayed byte-for-byte
    Text(String),
    /// Parsed `application/x-www-form-urlencoded` fields, in wire order
    Form(Vec<(String, String)>),
    /// Parsed JSON document
    Json(serde_json::Value),
}

impl RequestBody {
    /// Serialize form fields the way a browser would submit them
    pub fn encode_form(fields: &[(String, String)]) -> String {
        fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse an urlencoded form body back into ordered fields
    pub fn decode_form(encoded: &str) -> Result<Vec<(String, String)>, String> {
        if encoded.is_empty() {
            return Ok(Vec::new());
        }

        encoded
            .split('&')
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let key = urlencoding::decode(key).map_err(|e| e.to_string())?;
                let value = urlencoding::decode(value).map_err(|e| e.to_string())?;
                Ok((key.into_owned(), value.into_owned()))
            })
            .collect()
    }
}

/// Method + URL pair identifying an action
///
/// Used as the storage key for templates and as the unit of test scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionKey {
    pub method: String,
    pub url: String,
}

impl ActionKey {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            url: url.to_string(),
        }
    }
}

impl std::fmt::Display for ActionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A username acting under one role
///
/// The same username observed with two roles is two identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub role: String,
}

impl Identity {
    pub fn new(name: &str, role: &str) -> Self {
        Self {
            name: name.to_string(),
            role: role.to_string(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.role)
    }
}

/// An observed HTTP request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
    pub method: String,

    /// Absolute URL
    pub url: String,

    /// Header map, keys lower-cased by convention
    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default)]
    pub body: Option<RequestBody>,

    /// Page that redirected to this request, if any
    #[serde(default)]
    pub redirect_from: Option<String>,

    /// Location this request redirected to, if any
    #[serde(default)]
    pub redirect_to: Option<String>,

    /// Whether the request was issued from an iframe
    #[serde(default)]
    pub is_iframe: bool,
}

impl RequestData {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            url: url.to_string(),
            headers: HashMap::new(),
            body: None,
            redirect_from: None,
            redirect_to: None,
            is_iframe: false,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn action_key(&self) -> ActionKey {
        ActionKey::new(&self.method, &self.url)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Whether a content type carries JSON (`application/json`, `+json` suffixes, ...)
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.ends_with("/json") || essence.ends_with("+json")
}
