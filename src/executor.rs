// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Test Executor
//!
//! Turns a [`PlannedTest`] into one network call: template lookup, resource
//! substitution, session lookup, send. Everything that can go wrong on the
//! way is captured in the returned [`TestResult`], except a missing template
//! which means planner and registry disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::errors::TemplateError;
use crate::http_client::{HttpClient, HttpResponse};
use crate::planner::{AttackVariant, PlannedTest};
use crate::session::SessionStore;
use crate::sink::Finding;
use crate::templates::TemplateRegistry;
use crate::types::{ActionKey, Identity, RequestPart};

/// Result of access attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessResult {
    /// Access granted (2xx response)
    Granted,
    /// Access denied (401/403)
    Denied,
    /// Redirect occurred
    Redirect(String),
    /// Any other status
    Error(u16),
}

impl AccessResult {
    pub fn from_response(response: &HttpResponse) -> Self {
        match response.status_code {
            200..=299 => AccessResult::Granted,
            401 | 403 => AccessResult::Denied,
            300..=399 => AccessResult::Redirect(response.header("location").unwrap_or_default()),
            code => AccessResult::Error(code),
        }
    }
}

impl std::fmt::Display for AccessResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessResult::Granted => write!(f, "GRANTED"),
            AccessResult::Denied => write!(f, "DENIED"),
            AccessResult::Redirect(loc) => write!(f, "REDIRECT({})", loc),
            AccessResult::Error(code) => write!(f, "ERROR({})", code),
        }
    }
}

/// What happened when a planned test was executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    /// The request was sent and a response came back
    Completed {
        status_code: u16,
        access: AccessResult,
        content_length: usize,
    },
    /// Transport failure, the request may not have reached the target
    NetworkFailure { error: String },
    /// No captured credentials for the test's user; nothing was sent
    SessionMissing,
    /// The template has no locator of the test's resource type
    ResourceTypeMissing { type_name: String },
    /// Substitution in this request part is not implemented
    UnsupportedLocation { part: RequestPart },
}

impl TestOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TestOutcome::Completed { .. } => "completed",
            TestOutcome::NetworkFailure { .. } => "network_failure",
            TestOutcome::SessionMissing => "session_missing",
            TestOutcome::ResourceTypeMissing { .. } => "resource_type_missing",
            TestOutcome::UnsupportedLocation { .. } => "unsupported_location",
        }
    }
}

/// Record of one executed (or skipped) test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub user: Identity,
    pub resource_id: Option<String>,
    pub type_name: Option<String>,
    pub action: ActionKey,
    pub variant: AttackVariant,
    pub outcome: TestOutcome,
    pub executed_at: DateTime<Utc>,
}

impl TestResult {
    fn new(test: &PlannedTest, outcome: TestOutcome) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user: test.user.clone(),
            resource_id: test.resource_id.clone(),
            type_name: test.type_name.clone(),
            action: test.action.clone(),
            variant: test.variant,
            outcome,
            executed_at: Utc::now(),
        }
    }

    /// Whether a request actually went out and came back
    pub fn was_sent(&self) -> bool {
        matches!(self.outcome, TestOutcome::Completed { .. })
    }

    /// The substituted identity was granted access
    pub fn is_escalation_candidate(&self) -> bool {
        matches!(
            self.outcome,
            TestOutcome::Completed {
                access: AccessResult::Granted,
                ..
            }
        )
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.outcome {
            TestOutcome::Completed { status_code, .. } => Some(status_code),
            _ => None,
        }
    }

    /// Flatten into the record handed to findings sinks
    pub fn to_finding(&self) -> Finding {
        Finding {
            id: self.id.clone(),
            user: self.user.to_string(),
            resource_id: self.resource_id.clone(),
            action: self.action.to_string(),
            variant: self.variant.as_str().to_string(),
            type_name: self.type_name.clone(),
            status_code: self.status_code(),
            outcome: self.outcome.label().to_string(),
            candidate: self.is_escalation_candidate(),
            discovered_at: self.executed_at,
        }
    }
}

pub struct TestExecutor {
    http_client: Arc<HttpClient>,
}

impl TestExecutor {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }

    pub fn http_client(&self) -> &Arc<HttpClient> {
        &self.http_client
    }

    /// Execute one planned test.
    ///
    /// Only an unknown action is returned as an error; every other failure
    /// is part of the result.
    pub async fn execute(
        &self,
        test: &PlannedTest,
        templates: &TemplateRegistry,
        sessions: &mut SessionStore,
    ) -> Result<TestResult, TemplateError> {
        let template = templates.template(&test.action)?;

        let request = match template
            .mutate_for_resource(test.resource_id.as_deref(), test.type_name.as_deref())
        {
            Ok(request) => request,
            Err(TemplateError::ResourceTypeNotFound { type_name, .. }) => {
                warn!(
                    "[Executor] Could not mutate {} for {}: no '{}' locator",
                    test.action, test.user, type_name
                );
                return Ok(TestResult::new(test, TestOutcome::ResourceTypeMissing { type_name }));
            }
            Err(TemplateError::UnsupportedLocation { part }) => {
                error!(
                    "[Executor] Resource substitution in {} is not implemented, {} {} not tested",
                    part, test.variant, test.action
                );
                return Ok(TestResult::new(test, TestOutcome::UnsupportedLocation { part }));
            }
            Err(e @ TemplateError::TemplateNotFound { .. }) => return Err(e),
        };

        let Some(session) = sessions.get_mut(&test.user) else {
            warn!(
                "[Executor] No session captured for {}, skipping {} {}",
                test.user, test.variant, test.action
            );
            return Ok(TestResult::new(test, TestOutcome::SessionMissing));
        };

        let outcome = match self.http_client.send(&request, &mut **session).await {
            Ok(response) => {
                let access = AccessResult::from_response(&response);
                debug!(
                    "[Executor] {} as {} ({}) -> {} {}",
                    request.url, test.user, test.variant, response.status_code, access
                );
                TestOutcome::Completed {
                    status_code: response.status_code,
                    access,
                    content_length: response.body.len(),
                }
            }
            Err(e) => {
                warn!("[Executor] {} {} as {} failed: {}", request.method, request.url, test.user, e);
                TestOutcome::NetworkFailure {
                    error: e.to_string(),
                }
            }
        };

        Ok(TestResult::new(test, outcome))
    }
}
