//! Reflecting validity into the document: state classes and error elements.

use formdom::{Document, Element, MAX_DEPTH, NodeId};

use crate::config::FormConfig;
use crate::field::FieldKind;

/// Class identifying the error element of field `name`.
///
/// Characters other than ASCII letters, digits, spaces and `,.?!` are removed.
pub fn error_marker(name: &str) -> String {
    let clean: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | ',' | '.' | '?' | '!'))
        .collect();
    format!("{clean}_error")
}

/// The elements backing one field, borrowed from the session.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub name: &'a str,
    pub kind: FieldKind,
    pub members: &'a [NodeId],
    /// Subtree holding the field and its error element.
    pub scope: NodeId,
}

impl Target<'_> {
    fn primary(&self) -> Option<NodeId> {
        self.members.first().copied()
    }
}

/// Remove the field's error element and both state classes.
pub fn clear(doc: &mut Document, config: &FormConfig, target: Target<'_>) {
    for error in doc.find_by_class(target.scope, &error_marker(target.name)) {
        doc.discard(error);
    }
    for member in target.members {
        doc.remove_class(*member, &config.validation_error_class);
        doc.remove_class(*member, &config.validation_valid_class);
    }
}

pub fn show_valid(doc: &mut Document, config: &FormConfig, target: Target<'_>) {
    for member in target.members {
        doc.add_class(*member, &config.validation_valid_class);
    }
}

/// Mark the field invalid and insert an error element carrying `message`.
pub fn show_invalid(doc: &mut Document, config: &FormConfig, target: Target<'_>, message: &str) {
    for member in target.members {
        doc.add_class(*member, &config.validation_error_class);
    }

    let Some(anchor) = error_anchor(doc, config, target) else {
        return;
    };
    let error = Element::new(config.error_element.as_str())
        .class(config.validation_error_class.as_str())
        .class(error_marker(target.name))
        .text(message);
    let id = doc.create_element(error);
    if !doc.insert_after(id, anchor) {
        log::warn!("[reflect] could not place error element for '{}'", target.name);
    }
}

/// The element the error element is inserted after.
fn error_anchor(doc: &Document, config: &FormConfig, target: Target<'_>) -> Option<NodeId> {
    let primary = target.primary()?;

    if let Some(class) = config.append_after.as_deref() {
        let found = find_append_target(doc, primary, class);
        if found.is_none() {
            log::warn!(
                "[reflect] no element with class '{}' around field '{}', error not shown",
                class,
                target.name
            );
        }
        return found;
    }

    if target.kind.is_group() {
        return doc.parent(primary).or(Some(primary));
    }
    Some(primary)
}

/// Walk up from `field`: at each level check the siblings, then the parent,
/// for `class`. Stops at the enclosing form.
fn find_append_target(doc: &Document, field: NodeId, class: &str) -> Option<NodeId> {
    let mut current = field;
    for _ in 0..MAX_DEPTH {
        if let Some(sibling) = doc
            .siblings(current)
            .into_iter()
            .find(|s| doc.has_class(*s, class))
        {
            return Some(sibling);
        }

        let parent = doc.parent(current)?;
        if doc.has_class(parent, class) {
            return Some(parent);
        }
        if doc.node(parent).is_some_and(|n| n.is_form()) {
            return None;
        }
        current = parent;
    }
    log::warn!("[reflect] append-after walk stopped at depth limit {MAX_DEPTH}");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_marker_strips_symbols() {
        assert_eq!(error_marker("email"), "email_error");
        assert_eq!(error_marker("items[]"), "items_error");
        assert_eq!(error_marker("first-name"), "firstname_error");
        assert_eq!(error_marker("a b,c.d?e!"), "a b,c.d?e!_error");
    }

    fn doc() -> Document {
        Document::new(
            Element::form("f").child(
                Element::div().class("row").children([
                    Element::div().class("wrap").child(Element::text_input("email").id("email")),
                    Element::div().class("hint").id("hint"),
                ]),
            ),
        )
    }

    #[test]
    fn test_append_target_sibling_then_parent() {
        let doc = doc();
        let email = doc.get_element_by_id("email").unwrap();
        let hint = doc.get_element_by_id("hint").unwrap();

        assert_eq!(find_append_target(&doc, email, "hint"), Some(hint));
        let wrap = doc.parent(email).unwrap();
        assert_eq!(find_append_target(&doc, email, "wrap"), Some(wrap));
        assert_eq!(find_append_target(&doc, email, "missing"), None);
    }
}
