// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Authorization Tester Library
 * Incremental access-control testing engine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod access_graph;
pub mod bus;
pub mod config;
pub mod errors;
pub mod executor;
pub mod http_client;
pub mod planner;
pub mod session;
pub mod sink;
pub mod templates;
pub mod tester;
pub mod types;

pub use access_graph::AccessGraph;
pub use bus::{run_tester, run_tester_until, ObservationBus, ObservedRequest, Subscription};
pub use config::AuthzConfig;
pub use errors::{AuthzError, AuthzResult, NetworkError, TemplateError};
pub use executor::{AccessResult, TestExecutor, TestOutcome, TestResult};
pub use http_client::{HttpClient, HttpResponse};
pub use planner::{AttackVariant, PlannedTest, TestPlanner};
pub use session::{AuthSession, Session, SessionStore};
pub use sink::{Finding, FindingsSink, NoopSink, WebhookConfig, WebhookSink};
pub use templates::{RequestTemplate, TemplateRegistry};
pub use tester::AuthzTester;
pub use types::{ActionKey, Identity, RequestBody, RequestData, RequestPart, ResourceLocator};
