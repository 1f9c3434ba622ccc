// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Test Planner
//!
//! Turns every new observation into the set of authorization tests it makes
//! possible, and nothing more. Three rules run in order:
//!
//! 1. **New action** - every other known identity replays the new action
//!    as-is.
//! 2. **New resource on an old action** - every other action already seen
//!    for the same resource type is replayed by every other identity with the
//!    new resource id swapped in.
//! 3. **New identity** - a first-time identity replays every known action
//!    against every pre-existing resource of the types that action uses.
//!
//! Every test has a signature `(variant, user, action, type)`. The ledger
//! holds every signature ever scheduled; a signature is claimed by the first
//! rule that reaches it and is never planned again.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::access_graph::AccessGraph;
use crate::templates::TemplateRegistry;
use crate::types::{ActionKey, Identity};

/// Kind of privilege escalation a test checks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackVariant {
    /// Same-role identity replays another identity's action
    HorizontalUser,
    /// Different-role identity replays another identity's action
    VerticalUser,
    /// New identity hits a resource its role was already seen on
    HorizontalResource,
    /// New identity hits a resource its role was never seen on
    VerticalResource,
}

impl AttackVariant {
    /// Variant for rules 1 and 2: decided by role match between the
    /// substituted identity and the identity that acted
    pub fn for_user_swap(substituted_role: &str, acting_role: &str) -> Self {
        if substituted_role == acting_role {
            AttackVariant::HorizontalUser
        } else {
            AttackVariant::VerticalUser
        }
    }

    /// Variant for rule 3: decided by whether the new role was seen on the resource
    pub fn for_resource_swap(role_seen_on_resource: bool) -> Self {
        if role_seen_on_resource {
            AttackVariant::HorizontalResource
        } else {
            AttackVariant::VerticalResource
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(
            self,
            AttackVariant::VerticalUser | AttackVariant::VerticalResource
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttackVariant::HorizontalUser => "horizontal_user",
            AttackVariant::VerticalUser => "vertical_user",
            AttackVariant::HorizontalResource => "horizontal_resource",
            AttackVariant::VerticalResource => "vertical_resource",
        }
    }
}

impl std::fmt::Display for AttackVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttackVariant::HorizontalUser => write!(f, "Horizontal-User"),
            AttackVariant::VerticalUser => write!(f, "Vertical-User"),
            AttackVariant::HorizontalResource => write!(f, "Horizontal-Resource"),
            AttackVariant::VerticalResource => write!(f, "Vertical-Resource"),
        }
    }
}

/// A test scheduled for execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTest {
    /// Identity whose session replays the action
    pub user: Identity,
    /// Resource id to substitute, `None` to replay unchanged
    pub resource_id: Option<String>,
    pub action: ActionKey,
    /// Resource type of `resource_id`
    pub type_name: Option<String>,
    pub variant: AttackVariant,
}

impl PlannedTest {
    pub fn signature(&self) -> TestSignature {
        TestSignature {
            variant: self.variant,
            user: self.user.clone(),
            action: self.action.clone(),
            type_name: self.type_name.clone().unwrap_or_default(),
        }
    }
}

/// Deduplication key of a planned test
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestSignature {
    pub variant: AttackVariant,
    pub user: Identity,
    pub action: ActionKey,
    /// Empty when the test carries no resource substitution
    pub type_name: String,
}

#[derive(Debug, Default)]
pub struct TestPlanner {
    graph: AccessGraph,
    templates: TemplateRegistry,
    ledger: HashSet<TestSignature>,
}

impl TestPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &AccessGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AccessGraph {
        &mut self.graph
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.templates
    }

    /// Number of signatures claimed so far
    pub fn scheduled_count(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_scheduled(&self, signature: &TestSignature) -> bool {
        self.ledger.contains(signature)
    }

    /// Plan the tests made possible by one ingest.
    ///
    /// Must be called after the observation has been recorded into the graph
    /// and its template registered. `new_resources` holds the `(type, id)`
    /// pairs of the observation; an empty pair stands for "no resource".
    pub fn schedule_from_ingest(
        &mut self,
        new_identity: &Identity,
        new_resources: &[(String, String)],
        new_action: &ActionKey,
        is_new_identity: bool,
    ) -> Vec<PlannedTest> {
        let mut planned = Vec::new();
        let new_role = new_identity.role.as_str();

        // Rule 1: new action
        for other in self.graph.other_identities(new_identity) {
            let test = PlannedTest {
                user: other.clone(),
                resource_id: None,
                action: new_action.clone(),
                type_name: None,
                variant: AttackVariant::for_user_swap(&other.role, new_role),
            };
            Self::claim(&mut self.ledger, &mut planned, test);
        }

        // Rule 2: new resource on an old action
        for (type_name, resource_id) in new_resources {
            if type_name.is_empty() || resource_id.is_empty() {
                continue;
            }
            for action in self.templates.actions_for_type(type_name) {
                if action == new_action {
                    continue;
                }
                for other in self.graph.other_identities(new_identity) {
                    let test = PlannedTest {
                        user: other.clone(),
                        resource_id: Some(resource_id.clone()),
                        action: action.clone(),
                        type_name: Some(type_name.clone()),
                        variant: AttackVariant::for_user_swap(&other.role, new_role),
                    };
                    Self::claim(&mut self.ledger, &mut planned, test);
                }
            }
        }

        // Rule 3: new identity, including the action that introduced it
        if is_new_identity {
            for (action, template) in self.templates.iter() {
                for type_name in template.resource_types() {
                    let introduced: BTreeSet<&str> = new_resources
                        .iter()
                        .filter(|(t, _)| t == type_name)
                        .map(|(_, id)| id.as_str())
                        .collect();

                    for resource_id in self.graph.resources_of_type(type_name) {
                        if introduced.contains(resource_id.as_str()) {
                            continue;
                        }
                        let role_seen = self
                            .graph
                            .roles_of_resource(type_name, &resource_id)
                            .is_some_and(|roles| roles.contains(new_role));
                        let test = PlannedTest {
                            user: new_identity.clone(),
                            resource_id: Some(resource_id),
                            action: action.clone(),
                            type_name: Some(type_name.to_string()),
                            variant: AttackVariant::for_resource_swap(role_seen),
                        };
                        Self::claim(&mut self.ledger, &mut planned, test);
                    }
                }
            }
        }

        debug!(
            "[Planner] {} via {}: {} new test(s), {} signature(s) claimed",
            new_identity,
            new_action,
            planned.len(),
            self.ledger.len()
        );

        planned
    }

    fn claim(
        ledger: &mut HashSet<TestSignature>,
        planned: &mut Vec<PlannedTest>,
        test: PlannedTest,
    ) {
        if ledger.insert(test.signature()) {
            planned.push(test);
        }
    }
}
