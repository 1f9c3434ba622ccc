// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Authorization Tester
 * Incremental horizontal / vertical privilege escalation probing
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::access_graph::AccessGraph;
use crate::config::AuthzConfig;
use crate::errors::AuthzResult;
use crate::executor::{TestExecutor, TestResult};
use crate::http_client::HttpClient;
use crate::planner::TestPlanner;
use crate::session::{Session, SessionStore};
use crate::sink::{FindingsSink, WebhookConfig, WebhookSink};
use crate::templates::{RequestTemplate, TemplateRegistry};
use crate::types::{Identity, RequestData, ResourceLocator};

/// Owns the whole replay pipeline for one capture session.
///
/// Each observed request is fed through [`AuthzTester::ingest`], which plans
/// and runs every test the new observation makes possible.
pub struct AuthzTester {
    planner: TestPlanner,
    executor: TestExecutor,
    sessions: SessionStore,
    findings: Vec<TestResult>,
    sink: Option<Arc<dyn FindingsSink>>,
}

impl AuthzTester {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self {
            planner: TestPlanner::new(),
            executor: TestExecutor::new(http_client),
            sessions: SessionStore::new(),
            findings: Vec::new(),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn FindingsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the HTTP client and, when a webhook is configured, its sink
    pub fn from_config(config: &AuthzConfig) -> Result<Self> {
        let http_client = Arc::new(HttpClient::from_config(&config.http)?);
        let mut tester = Self::new(http_client);

        if let Some(webhook) = WebhookConfig::from_reporting(&config.reporting) {
            info!("[Authz] Forwarding findings to {}", webhook.url);
            let sink = WebhookSink::new(webhook, config.reporting.webhook_timeout_secs)?;
            tester = tester.with_sink(Arc::new(sink));
        }

        Ok(tester)
    }

    /// Feed one observed request.
    ///
    /// Never fails for empty locators, unknown resource types or missing
    /// sessions. An error means the planner referenced an action the
    /// registry does not know; the instance should not be used afterwards.
    pub async fn ingest(
        &mut self,
        username: &str,
        role: &str,
        request: RequestData,
        resource_locators: Vec<ResourceLocator>,
        session: Option<Box<dyn Session>>,
    ) -> AuthzResult<()> {
        let action = request.action_key();
        let identity = Identity::new(username, role);
        let is_new_identity = !self.planner.graph().has_identity(&identity);

        let resources: Vec<(String, String)> = if resource_locators.is_empty() {
            vec![(String::new(), String::new())]
        } else {
            resource_locators
                .iter()
                .map(|locator| (locator.type_name.clone(), locator.id.clone()))
                .collect()
        };

        self.planner
            .templates_mut()
            .add(action.clone(), RequestTemplate::new(request, resource_locators));

        if let Some(session) = session {
            self.sessions.insert(identity.clone(), session);
        }

        let graph = self.planner.graph_mut();
        graph.register_identity(&identity);
        for (type_name, resource_id) in resources.iter().filter(|(t, id)| !t.is_empty() && !id.is_empty()) {
            graph.record(&identity, type_name, resource_id);
        }

        let planned = self
            .planner
            .schedule_from_ingest(&identity, &resources, &action, is_new_identity);

        if is_new_identity {
            info!("[Authz] New identity {} via {}", identity, action);
        }

        let mut executed = 0;
        for test in &planned {
            let result = self
                .executor
                .execute(test, self.planner.templates(), &mut self.sessions)
                .await?;

            if let Some(ref sink) = self.sink {
                if let Err(e) = sink.report(&result.to_finding()).await {
                    warn!("[Authz] Sink '{}' failed to accept finding: {:#}", sink.name(), e);
                }
            }

            if result.is_escalation_candidate() {
                info!(
                    "[Authz] {} got {} on {} ({})",
                    result.user,
                    result.outcome.label(),
                    result.action,
                    result.variant
                );
            }

            if result.was_sent() {
                executed += 1;
            }
            self.findings.push(result);
        }

        debug!(
            "[Authz] Ingested {} as {}: {} planned, {} sent, {} total results",
            action,
            identity,
            planned.len(),
            executed,
            self.findings.len()
        );

        Ok(())
    }

    /// Every result produced so far, in execution order
    pub fn findings(&self) -> &[TestResult] {
        &self.findings
    }

    pub fn graph(&self) -> &AccessGraph {
        self.planner.graph()
    }

    pub fn templates(&self) -> &TemplateRegistry {
        self.planner.templates()
    }

    /// Number of distinct test signatures planned so far
    pub fn planned_count(&self) -> usize {
        self.planner.scheduled_count()
    }

    pub fn http_client(&self) -> &Arc<HttpClient> {
        self.executor.http_client()
    }

    pub fn has_session(&self, identity: &Identity) -> bool {
        self.sessions.contains(identity)
    }

    /// Release network resources. Safe to call more than once.
    ///
    /// A client still shared with other owners is left open; it is released
    /// when its last owner shuts down or drops it.
    pub fn shutdown(&self) {
        let client = self.executor.http_client();
        if Arc::strong_count(client) == 1 {
            client.close();
        } else {
            debug!(
                "[Authz] HTTP client shared by {} owners, leaving it open",
                Arc::strong_count(client)
            );
        }
        info!(
            "[Authz] Shutdown: {} result(s), {} request(s) sent",
            self.findings.len(),
            self.executor.http_client().send_count()
        );
    }
}
