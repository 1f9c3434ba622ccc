// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Access Graph
//!
//! In-memory model of which identity has touched which resource, and which
//! roles have been observed on each concrete resource. Both maps only grow;
//! nothing is ever removed for the lifetime of a tester.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::Identity;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessGraph {
    /// Known identities in first-seen order
    identities: Vec<Identity>,
    /// identity -> resource type -> resource ids
    resources_by_identity: HashMap<Identity, BTreeMap<String, BTreeSet<String>>>,
    /// resource type -> resource id -> roles seen touching it
    roles_by_resource: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl AccessGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an identity known without attaching any resource to it
    pub fn register_identity(&mut self, identity: &Identity) {
        if !self.resources_by_identity.contains_key(identity) {
            self.identities.push(identity.clone());
            self.resources_by_identity
                .insert(identity.clone(), BTreeMap::new());
        }
    }

    /// Record that `identity` touched `resource_id` of `type_name`.
    /// Re-recording the same fact is a no-op.
    pub fn record(&mut self, identity: &Identity, type_name: &str, resource_id: &str) {
        self.register_identity(identity);

        if let Some(types) = self.resources_by_identity.get_mut(identity) {
            types
                .entry(type_name.to_string())
                .or_default()
                .insert(resource_id.to_string());
        }

        self.roles_by_resource
            .entry(type_name.to_string())
            .or_default()
            .entry(resource_id.to_string())
            .or_default()
            .insert(identity.role.clone());
    }

    pub fn has_identity(&self, identity: &Identity) -> bool {
        self.resources_by_identity.contains_key(identity)
    }

    /// Every known identity except `identity`, in first-seen order
    pub fn other_identities<'a>(
        &'a self,
        identity: &'a Identity,
    ) -> impl Iterator<Item = &'a Identity> + 'a {
        self.identities.iter().filter(move |known| *known != identity)
    }

    /// Union of resource ids of a type across all identities
    pub fn resources_of_type(&self, type_name: &str) -> BTreeSet<String> {
        self.roles_by_resource
            .get(type_name)
            .map(|ids| ids.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn roles_of_resource(&self, type_name: &str, resource_id: &str) -> Option<&BTreeSet<String>> {
        self.roles_by_resource.get(type_name)?.get(resource_id)
    }

    /// Resources of a type touched by one identity
    pub fn resources_of(&self, identity: &Identity, type_name: &str) -> Option<&BTreeSet<String>> {
        self.resources_by_identity.get(identity)?.get(type_name)
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.identities.iter()
    }
}
