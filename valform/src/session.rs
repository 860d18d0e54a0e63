//! Form sessions: one bound form and its field registry.

use std::collections::HashMap;

use formdom::{Document, NodeId};
use serde::Serialize;

use crate::config::{FormConfig, ReconcilePolicy};
use crate::discovery::{self, Discovery};
use crate::field::{FieldRecord, FieldSet};
use crate::reflect::Target;

/// Notification sent after every committed evaluation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedEvent {
    pub form_id: String,
    pub field: FieldRecord,
}

/// State of one bound form.
#[derive(Debug)]
pub struct FormSession {
    pub form_id: String,
    /// The bound `<form>` element.
    pub form: NodeId,
    pub config: FormConfig,
    pub fields: FieldSet,
    /// Name to display label of every field.
    pub field_names: HashMap<String, String>,
    elements: HashMap<String, Vec<NodeId>>,
    watched: HashMap<NodeId, String>,
    generations: HashMap<String, u64>,
}

impl FormSession {
    pub fn new(config: FormConfig, form: NodeId, discovery: Discovery) -> Self {
        let mut session = Self {
            form_id: config.form_id.clone(),
            form,
            config,
            fields: FieldSet::new(),
            field_names: HashMap::new(),
            elements: HashMap::new(),
            watched: HashMap::new(),
            generations: HashMap::new(),
        };
        session.install(discovery.fields, discovery.elements);
        session
    }

    /// Merge a fresh scan into the registry according to the session's
    /// reconcile policy.
    pub fn reconcile(&mut self, discovery: Discovery) {
        let old = std::mem::take(&mut self.fields);
        let before = old.len();
        let merged = reconcile(old, discovery.fields, self.config.reconcile);
        log::debug!(
            "[session] form '{}' reconciled: {} -> {} field(s)",
            self.form_id,
            before,
            merged.len()
        );
        self.install(merged, discovery.elements);
    }

    fn install(&mut self, fields: FieldSet, mut elements: HashMap<String, Vec<NodeId>>) {
        elements.retain(|name, _| fields.contains(name));
        self.generations.retain(|name, _| fields.contains(name));
        self.watched = elements
            .iter()
            .flat_map(|(name, nodes)| nodes.iter().map(move |n| (*n, name.clone())))
            .collect();
        self.elements = elements;
        self.fields = fields;
        self.field_names = self.fields.display_names();
    }

    /// Name of the field `node` belongs to, if it is watched.
    pub fn field_for(&self, node: NodeId) -> Option<&str> {
        self.watched.get(&node).map(String::as_str)
    }

    pub fn members(&self, name: &str) -> &[NodeId] {
        self.elements.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn target<'a>(&'a self, doc: &Document, name: &'a str) -> Option<Target<'a>> {
        let record = self.fields.get(name)?;
        Some(Target {
            name,
            kind: record.kind,
            members: self.members(name),
            scope: discovery::scope_root(doc, self.form, &self.config),
        })
    }

    /// Start a new evaluation of `name`; older evaluations become stale.
    pub fn next_ticket(&mut self, name: &str) -> u64 {
        let ticket = self.generations.entry(name.to_string()).or_default();
        *ticket += 1;
        *ticket
    }

    /// Whether `ticket` belongs to the latest evaluation of `name`.
    pub fn is_current(&self, name: &str, ticket: u64) -> bool {
        self.generations.get(name) == Some(&ticket)
    }
}

/// Merge a fresh scan (`new`) into the existing registry (`old`).
///
/// Records present in both keep their accumulated state. Result order follows
/// the new scan.
pub fn reconcile(mut old: FieldSet, new: FieldSet, policy: ReconcilePolicy) -> FieldSet {
    let grow = match policy {
        ReconcilePolicy::SetDifference => true,
        ReconcilePolicy::GrowOnly => new.len() > old.len(),
    };

    new.into_iter()
        .filter_map(|fresh| match old.remove(&fresh.name) {
            Some(existing) => Some(existing),
            None if grow => Some(fresh),
            None => None,
        })
        .collect()
}
