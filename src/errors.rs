// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Authorization Tester Error Types
 * Error handling for test planning, request mutation and delivery
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

use crate::types::RequestPart;

/// Top-level error for the authorization engine
#[derive(Error, Debug)]
pub enum AuthzError {
    /// Transport failures
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Template registry / mutation failures
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors raised by the template registry and request mutation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The planner referenced an action that was never registered.
    /// This is an internal inconsistency, never a transient condition.
    #[error("No template registered for action {action}")]
    TemplateNotFound { action: String },

    #[error("Template for {action} has no locator of resource type '{type_name}'")]
    ResourceTypeNotFound { action: String, type_name: String },

    /// Substitution is not implemented for this request part
    #[error("Resource substitution in request {part} is not implemented")]
    UnsupportedLocation { part: RequestPart },
}

/// Transport-level errors with detailed classification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Connection timeout after {timeout:?} to {url}")]
    ConnectionTimeout { url: String, timeout: Duration },

    #[error("DNS resolution failed for {host}: {reason}")]
    DnsResolutionFailed { host: String, reason: String },

    #[error("TLS handshake failed for {host}: {reason}")]
    TlsHandshakeFailed { host: String, reason: String },

    #[error("Connection refused for {url}")]
    ConnectionRefused { url: String },

    #[error("Connection reset by peer for {url}")]
    ConnectionReset { url: String },

    #[error("Too many redirects for {url}")]
    TooManyRedirects { url: String },

    #[error("Invalid request to {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    /// The client was shut down before the request was sent
    #[error("HTTP client is closed")]
    ClientClosed,

    #[error("Network error: {0}")]
    Other(String),
}

impl NetworkError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::ConnectionTimeout { .. } => true,
            NetworkError::ConnectionReset { .. } => true,
            NetworkError::DnsResolutionFailed { .. } => false,
            NetworkError::TlsHandshakeFailed { .. } => false,
            NetworkError::ConnectionRefused { .. } => false,
            NetworkError::TooManyRedirects { .. } => false,
            NetworkError::InvalidRequest { .. } => false,
            NetworkError::ClientClosed => false,
            NetworkError::Other(_) => false,
        }
    }

    /// Classify a reqwest error into our taxonomy
    ///
    /// reqwest does not expose DNS or TLS failures as distinct kinds, so the
    /// source chain is inspected for them.
    pub fn classify(err: &reqwest::Error, url: &str, timeout: Duration) -> Self {
        let chain = source_chain(err).to_lowercase();
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| url.to_string());

        if err.is_timeout() {
            NetworkError::ConnectionTimeout {
                url: url.to_string(),
                timeout,
            }
        } else if err.is_redirect() {
            NetworkError::TooManyRedirects {
                url: url.to_string(),
            }
        } else if err.is_builder() {
            NetworkError::InvalidRequest {
                url: url.to_string(),
                reason: chain,
            }
        } else if chain.contains("dns error") || chain.contains("failed to lookup address") {
            NetworkError::DnsResolutionFailed { host, reason: chain }
        } else if chain.contains("certificate") || chain.contains("tls") || chain.contains("ssl") {
            NetworkError::TlsHandshakeFailed { host, reason: chain }
        } else if chain.contains("connection reset") || chain.contains("broken pipe") {
            NetworkError::ConnectionReset {
                url: url.to_string(),
            }
        } else if err.is_connect() {
            NetworkError::ConnectionRefused {
                url: url.to_string(),
            }
        } else {
            NetworkError::Other(chain)
        }
    }
}

fn source_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Result type for authorization engine operations
pub type AuthzResult<T> = Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_retryable() {
        assert!(NetworkError::ConnectionTimeout {
            url: "https://app.example.com".to_string(),
            timeout: Duration::from_secs(30),
        }
        .is_retryable());
        assert!(NetworkError::ConnectionReset {
            url: "https://app.example.com".to_string(),
        }
        .is_retryable());
        assert!(!NetworkError::ConnectionRefused {
            url: "https://app.example.com".to_string(),
        }
        .is_retryable());
        assert!(!NetworkError::ClientClosed.is_retryable());
    }

    #[test]
    fn test_template_error_converts_into_authz_error() {
        let err: AuthzError = TemplateError::TemplateNotFound {
            action: "GET https://app.example.com/a".to_string(),
        }
        .into();

        assert!(matches!(err, AuthzError::Template(TemplateError::TemplateNotFound { .. })));
        assert_eq!(
            err.to_string(),
            "Template error: No template registered for action GET https://app.example.com/a"
        );
    }

    #[test]
    fn test_unsupported_location_message() {
        let err = TemplateError::UnsupportedLocation {
            part: RequestPart::Headers,
        };
        assert_eq!(
            err.to_string(),
            "Resource substitution in request headers is not implemented"
        );
    }
}
