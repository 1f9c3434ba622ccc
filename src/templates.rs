// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request Templates
//!
//! One canonical request is kept per action (method + URL). A template knows
//! where its resource identifiers sit and can produce a copy of itself with
//! a different identifier swapped in:
//!
//! - URL: first occurrence of the old id in the path, then the query; scheme
//!   and authority are never rewritten
//! - BODY: textual bodies are replaced in place; in form and JSON bodies the
//!   first value equal to the old id is rewritten and every other field and
//!   key survives untouched
//! - HEADERS: not supported, fails with [`TemplateError::UnsupportedLocation`]

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use crate::errors::TemplateError;
use crate::types::{ActionKey, RequestBody, RequestData, RequestPart, ResourceLocator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTemplate {
    pub request: RequestData,
    pub resource_locators: Vec<ResourceLocator>,
}

impl RequestTemplate {
    pub fn new(request: RequestData, resource_locators: Vec<ResourceLocator>) -> Self {
        Self {
            request,
            resource_locators,
        }
    }

    /// First locator of the given resource type
    pub fn locator_for_type(&self, type_name: &str) -> Option<&ResourceLocator> {
        self.resource_locators
            .iter()
            .find(|locator| locator.type_name == type_name)
    }

    pub fn references_type(&self, type_name: &str) -> bool {
        self.locator_for_type(type_name).is_some()
    }

    /// Distinct resource types referenced by this template, in locator order
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for locator in &self.resource_locators {
            if !locator.type_name.is_empty() && !types.contains(&locator.type_name.as_str()) {
                types.push(&locator.type_name);
            }
        }
        types
    }

    /// Produce the request with `target_id` substituted for the template's
    /// identifier of `type_name`.
    ///
    /// An absent or empty target/type yields an unmodified copy.
    pub fn mutate_for_resource(
        &self,
        target_id: Option<&str>,
        type_name: Option<&str>,
    ) -> Result<RequestData, TemplateError> {
        let (Some(target_id), Some(type_name)) = (
            target_id.filter(|id| !id.is_empty()),
            type_name.filter(|t| !t.is_empty()),
        ) else {
            return Ok(self.request.clone());
        };

        let locator = self.locator_for_type(type_name).ok_or_else(|| {
            TemplateError::ResourceTypeNotFound {
                action: self.request.action_key().to_string(),
                type_name: type_name.to_string(),
            }
        })?;

        let mut request = self.request.clone();

        match locator.request_part {
            RequestPart::Url => {
                if locator.id.is_empty() {
                    return Ok(request);
                }
                request.url = substitute_in_url(&request.url, &locator.id, target_id);
            }
            RequestPart::Body => {
                if locator.id.is_empty() {
                    return Ok(request);
                }
                request.body = request
                    .body
                    .take()
                    .map(|body| substitute_in_body(body, &locator.id, target_id));
            }
            RequestPart::Headers => {
                return Err(TemplateError::UnsupportedLocation {
                    part: RequestPart::Headers,
                });
            }
        }

        debug!(
            "[Templates] {} {} -> {} ({})",
            type_name, locator.id, target_id, locator.request_part
        );

        Ok(request)
    }
}

/// Swap `old_id` inside the path, or failing that the query.
///
/// URLs that do not parse are returned unchanged.
fn substitute_in_url(raw: &str, old_id: &str, new_id: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        debug!("[Templates] Unparseable URL left as is: {}", raw);
        return raw.to_string();
    };

    if url.path().contains(old_id) {
        let path = url.path().replacen(old_id, new_id, 1);
        url.set_path(&path);
        return url.to_string();
    }

    if let Some(query) = url.query().filter(|q| q.contains(old_id)) {
        let query = query.replacen(old_id, new_id, 1);
        url.set_query(Some(&query));
        return url.to_string();
    }

    debug!("[Templates] {} not found in path or query of {}", old_id, raw);
    raw.to_string()
}

fn substitute_in_body(body: RequestBody, old_id: &str, new_id: &str) -> RequestBody {
    match body {
        RequestBody::Text(text) => RequestBody::Text(text.replacen(old_id, new_id, 1)),
        RequestBody::Form(mut fields) => {
            let slot = fields
                .iter()
                .position(|(_, value)| value == old_id)
                .or_else(|| fields.iter().position(|(_, value)| value.contains(old_id)));
            if let Some(index) = slot {
                let value = &mut fields[index].1;
                *value = value.replacen(old_id, new_id, 1);
            }
            RequestBody::Form(fields)
        }
        RequestBody::Json(mut value) => {
            if !replace_json_leaf(&mut value, old_id, new_id) {
                replace_within_json_string(&mut value, old_id, new_id);
            }
            RequestBody::Json(value)
        }
    }
}

/// Rewrite the first leaf equal to `old_id`. Numbers keep their type when
/// `new_id` is itself a number.
fn replace_json_leaf(value: &mut Value, old_id: &str, new_id: &str) -> bool {
    if matches!(value, Value::Number(n) if n.to_string() == old_id) {
        *value = match serde_json::from_str::<Number>(new_id) {
            Ok(number) => Value::Number(number),
            Err(_) => Value::String(new_id.to_string()),
        };
        return true;
    }

    match value {
        Value::String(s) if s == old_id => {
            *s = new_id.to_string();
            true
        }
        Value::Array(items) => items
            .iter_mut()
            .any(|item| replace_json_leaf(item, old_id, new_id)),
        Value::Object(map) => map
            .values_mut()
            .any(|item| replace_json_leaf(item, old_id, new_id)),
        _ => false,
    }
}

fn replace_within_json_string(value: &mut Value, old_id: &str, new_id: &str) -> bool {
    match value {
        Value::String(s) if s.contains(old_id) => {
            *s = s.replacen(old_id, new_id, 1);
            true
        }
        Value::Array(items) => items
            .iter_mut()
            .any(|item| replace_within_json_string(item, old_id, new_id)),
        Value::Object(map) => map
            .values_mut()
            .any(|item| replace_within_json_string(item, old_id, new_id)),
        _ => false,
    }
}

/// Stores the latest template for every observed action
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    /// Actions in first-registration order
    order: Vec<ActionKey>,
    templates: HashMap<ActionKey, RequestTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template; a later template for the same action replaces the earlier one
    pub fn add(&mut self, action: ActionKey, template: RequestTemplate) {
        if self.templates.insert(action.clone(), template).is_none() {
            self.order.push(action);
        }
    }

    pub fn template(&self, action: &ActionKey) -> Result<&RequestTemplate, TemplateError> {
        self.templates
            .get(action)
            .ok_or_else(|| TemplateError::TemplateNotFound {
                action: action.to_string(),
            })
    }

    pub fn contains(&self, action: &ActionKey) -> bool {
        self.templates.contains_key(action)
    }

    /// All registered actions with their templates, in first-registration order
    pub fn iter(&self) -> impl Iterator<Item = (&ActionKey, &RequestTemplate)> {
        self.order
            .iter()
            .filter_map(move |action| self.templates.get(action).map(|t| (action, t)))
    }

    /// Actions whose template references `type_name`
    pub fn actions_for_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = &'a ActionKey> + 'a {
        self.iter()
            .filter(move |(_, template)| template.references_type(type_name))
            .map(|(action, _)| action)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
