// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain ⇄ event mapping.
//!
//! The configuration authoritatively maps each domain to one event id or an
//! array of them; routing needs the inverse (event id → domains). Both views
//! are kept consistent: updates are applied as per-domain diffs against the
//! previous configuration, never as a full rebuild.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{info, warn};

/// The domain → events configuration and its derived event → domains inverse.
#[derive(Debug, Clone, Default)]
pub struct DomainEventMap {
    config: Map<String, Value>,
    event_map: HashMap<String, Vec<String>>,
}

impl DomainEventMap {
    /// Build from the `MQTT.domainEventMap` configuration object.
    pub fn from_config(value: &Value) -> Self {
        let mut map = Self::default();
        if let Value::Object(entries) = value {
            map.config = entries.clone();
            for (domain, entry) in entries {
                for event_id in entry_event_ids(entry) {
                    map.add_reference(&event_id, domain);
                }
            }
        } else if !value.is_null() {
            warn!("domainEventMap is not an object, starting empty");
        }
        map
    }

    /// Domains subscribed to an event id.
    pub fn domains_for(&self, event_id: &str) -> Vec<String> {
        self.event_map.get(event_id).cloned().unwrap_or_default()
    }

    pub fn has_domain(&self, domain: &str) -> bool {
        self.config.contains_key(domain)
    }

    pub fn event_ids(&self) -> Vec<String> {
        self.event_map.keys().cloned().collect()
    }

    /// Apply a new domain → events configuration as a per-domain diff.
    ///
    /// Domains absent from the new map keep their current entries; domains
    /// present only in the new map are ignored; adding or removing domains
    /// dynamically is not supported.
    pub fn apply_update(&mut self, new_map: &Value) {
        let Value::Object(new_entries) = new_map else {
            warn!("ignoring non-object domainEventMap update");
            return;
        };

        for domain in new_entries.keys() {
            if !self.config.contains_key(domain) {
                warn!(domain, "dynamic domain add not supported, entry ignored");
            }
        }

        let domains: Vec<String> = self.config.keys().cloned().collect();
        for domain in domains {
            let Some(new_entry) = new_entries.get(&domain) else {
                info!(domain, "domain not found in new mapping");
                continue;
            };
            let current_entry = self.config.get(&domain).cloned().unwrap_or(Value::Null);
            if current_entry == *new_entry {
                continue;
            }
            info!(domain, "domain-event mapping changed");

            for event_id in entry_event_ids(&current_entry) {
                self.remove_reference(&event_id, &domain);
            }
            for event_id in entry_event_ids(new_entry) {
                self.add_reference(&event_id, &domain);
            }
            self.config.insert(domain, new_entry.clone());
        }
    }

    fn add_reference(&mut self, event_id: &str, domain: &str) {
        let domains = self.event_map.entry(event_id.to_string()).or_default();
        if !domains.iter().any(|d| d == domain) {
            domains.push(domain.to_string());
        }
    }

    fn remove_reference(&mut self, event_id: &str, domain: &str) {
        if let Some(domains) = self.event_map.get_mut(event_id) {
            domains.retain(|d| d != domain);
            if domains.is_empty() {
                self.event_map.remove(event_id);
            }
        }
    }

    /// The two views describe the same relation. Cheap enough for tests and
    /// debug assertions.
    pub fn is_inverse_consistent(&self) -> bool {
        let mut expected: HashMap<String, Vec<String>> = HashMap::new();
        for (domain, entry) in &self.config {
            for event_id in entry_event_ids(entry) {
                let domains = expected.entry(event_id).or_default();
                if !domains.iter().any(|d| d == domain) {
                    domains.push(domain.clone());
                }
            }
        }
        if expected.len() != self.event_map.len() {
            return false;
        }
        expected.iter().all(|(event_id, domains)| {
            self.event_map.get(event_id).is_some_and(|actual| {
                let mut a = actual.clone();
                let mut b = domains.clone();
                a.sort();
                b.sort();
                a == b
            })
        })
    }
}

/// Event ids named by a domain entry: a scalar string or an array of them.
fn entry_event_ids(entry: &Value) -> Vec<String> {
    match entry {
        Value::String(event_id) => vec![event_id.clone()],
        Value::Array(items) => {
            items.iter().filter_map(Value::as_str).map(str::to_string).collect()
        }
        Value::Null => Vec::new(),
        other => {
            warn!(?other, "unsupported domain entry shape");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "domain_map_tests.rs"]
mod tests;
