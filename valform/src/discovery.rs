//! Field discovery: scanning the document for validatable elements.

use std::collections::HashMap;

use formdom::{Document, Node, NodeId};

use crate::config::{DiscoveryScope, FormConfig};
use crate::field::{FieldKind, FieldRecord, FieldSet};
use crate::value::FieldValue;

pub const RULES_ATTR: &str = "val-rules";
pub const DISPLAY_ATTR: &str = "val-display";
pub const ALLOW_EMPTY_ATTR: &str = "val-allow-empty";
pub const WITH_ATTR: &str = "val-with";

/// Result of one scan.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub fields: FieldSet,
    /// Elements backing each field. The rule-carrying element comes first,
    /// followed by the other elements sharing its name.
    pub elements: HashMap<String, Vec<NodeId>>,
}

/// Root node searched for fields of a session bound to `form`.
pub fn scope_root(doc: &Document, form: NodeId, config: &FormConfig) -> NodeId {
    match config.scope {
        DiscoveryScope::Form => form,
        DiscoveryScope::Document => doc.root(),
    }
}

fn has_rules(node: &Node) -> bool {
    node.name().is_some_and(|n| !n.is_empty())
        && node.data(RULES_ATTR).is_some_and(|r| !r.trim().is_empty())
}

/// Scan for elements carrying a non-empty rule attribute and a name.
///
/// Elements sharing a name collapse into one record built from the first of
/// them. Values are resolved from the current document state.
pub fn discover(doc: &Document, form: NodeId, config: &FormConfig) -> Discovery {
    let scope = scope_root(doc, form, config);
    let mut discovery = Discovery::default();

    for id in doc.find_all(scope, has_rules) {
        let Some(node) = doc.node(id) else {
            continue;
        };
        let Some(name) = node.name() else {
            continue;
        };
        if discovery.fields.contains(name) {
            continue;
        }

        let kind = FieldKind::from_input_type(&node.input_type());
        let mut record = FieldRecord::new(name, kind)
            .with_rules(node.data(RULES_ATTR).unwrap_or_default())
            .with_allow_empty(node.data(ALLOW_EMPTY_ATTR).is_some());
        if let Some(display) = node.data(DISPLAY_ATTR).filter(|d| !d.is_empty()) {
            record.display = display.to_string();
        }
        record.with = node
            .data(WITH_ATTR)
            .filter(|w| !w.is_empty())
            .map(str::to_string);

        let mut members = vec![id];
        members.extend(doc.find_by_name(scope, name).into_iter().filter(|m| *m != id));

        let (value, checked) = read_value(doc, kind, &members);
        record.value = value;
        record.checked = checked;

        discovery.elements.insert(record.name.clone(), members);
        discovery.fields.insert(record);
    }

    if discovery.fields.is_empty() {
        log::warn!("[discovery] no validatable fields found for form '{}'", config.form_id);
    } else {
        log::debug!(
            "[discovery] form '{}': {} field(s) found",
            config.form_id,
            discovery.fields.len()
        );
    }
    discovery
}

/// Current value of a field from its elements.
///
/// Checkbox groups yield the values of checked members in member order,
/// radio groups the value of the checked member. `checked` is set for groups
/// only.
pub fn read_value(doc: &Document, kind: FieldKind, members: &[NodeId]) -> (FieldValue, Option<bool>) {
    let mut nodes = members.iter().filter_map(|id| doc.node(*id));
    match kind {
        FieldKind::Scalar => {
            let value = nodes
                .next()
                .map(|n| FieldValue::Text(n.value.clone()))
                .unwrap_or_default();
            (value, None)
        }
        FieldKind::Checkbox => {
            let values: Vec<String> = nodes.filter(|n| n.checked).map(|n| n.value.clone()).collect();
            let checked = !values.is_empty();
            (FieldValue::List(values), Some(checked))
        }
        FieldKind::Radio => match nodes.find(|n| n.checked) {
            Some(n) => (FieldValue::Text(n.value.clone()), Some(true)),
            None => (FieldValue::Text(String::new()), Some(false)),
        },
    }
}
