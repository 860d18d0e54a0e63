#![allow(dead_code)]

use formdom::{Document, Element, NodeId};
use simplelog::{Config, LevelFilter, TestLogger};
use valform::{Engine, FormConfig};

pub fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

/// `<form id="signup">` with an email, a password pair and a terms checkbox.
pub fn signup_form() -> Element {
    Element::form("signup").children([
        Element::div().class("row").id("email-row").children([
            Element::text_input("email")
                .id("email")
                .data("val-rules", "required|valid_email")
                .data("val-display", "Email"),
            Element::new("span").class("hint").id("email-hint"),
        ]),
        Element::text_input("password")
            .id("password")
            .data("val-rules", "required|min_length[8]")
            .data("val-display", "Password")
            .data("val-with", "confirm"),
        Element::text_input("confirm")
            .id("confirm")
            .data("val-rules", "required|matches[password]")
            .data("val-display", "Confirm password"),
        Element::div().id("terms-wrap").children([
            Element::checkbox("terms", "yes")
                .id("terms-yes")
                .data("val-rules", "required"),
            Element::checkbox("terms", "later").id("terms-later"),
        ]),
    ])
}

pub fn engine_with(form: Element) -> Engine {
    init_logger();
    let doc = Document::new(Element::new("body").child(form)).shared();
    Engine::new(doc)
}

/// Engine bound to [`signup_form`].
pub fn signup_engine() -> Engine {
    let engine = engine_with(signup_form());
    engine.init(FormConfig::new("signup")).unwrap();
    engine
}

pub fn node(engine: &Engine, id: &str) -> NodeId {
    let doc = engine.document().read().unwrap();
    doc.get_element_by_id(id).unwrap()
}

/// Set an element's value as a user would.
pub fn type_into(engine: &Engine, id: &str, value: &str) -> NodeId {
    let mut doc = engine.document().write().unwrap();
    let node = doc.get_element_by_id(id).unwrap();
    doc.set_value(node, value);
    node
}

pub fn check(engine: &Engine, id: &str, checked: bool) -> NodeId {
    let mut doc = engine.document().write().unwrap();
    let node = doc.get_element_by_id(id).unwrap();
    doc.set_checked(node, checked);
    node
}

pub fn has_class(engine: &Engine, id: &str, class: &str) -> bool {
    let doc = engine.document().read().unwrap();
    let node = doc.get_element_by_id(id).unwrap();
    doc.has_class(node, class)
}

/// Text of the error elements currently shown for `field`.
pub fn error_texts(engine: &Engine, field: &str) -> Vec<String> {
    let doc = engine.document().read().unwrap();
    doc.find_by_class(doc.root(), &format!("{field}_error"))
        .into_iter()
        .filter_map(|n| doc.text(n).map(str::to_string))
        .collect()
}

/// The element right after `id` among its siblings.
pub fn next_sibling(engine: &Engine, id: &str) -> Option<NodeId> {
    let doc = engine.document().read().unwrap();
    let node = doc.get_element_by_id(id)?;
    let parent = doc.parent(node)?;
    let children = doc.node(parent)?.children();
    let pos = children.iter().position(|c| *c == node)?;
    children.get(pos + 1).copied()
}
