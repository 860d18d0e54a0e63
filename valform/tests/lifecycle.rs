mod common;

use common::*;
use formdom::{DomEvent, Element};
use valform::error::{ConfigError, LookupError};
use valform::{
    Dispatched, DiscoveryScope, EngineError, FieldKind, FieldValue, FormConfig, ReconcilePolicy,
    SubmitOutcome, Validity,
};

// ============================================================================
// Binding
// ============================================================================

#[test]
fn test_init_discovers_fields() {
    let engine = signup_engine();
    let fields = engine.fields("signup").unwrap();
    assert_eq!(
        fields.names().collect::<Vec<_>>(),
        vec!["email", "password", "confirm", "terms"]
    );

    let email = fields.get("email").unwrap();
    assert_eq!(email.display, "Email");
    assert_eq!(email.rules.len(), 2);
    assert_eq!(email.valid, Validity::Unknown);
    assert!(!email.visited);

    let password = fields.get("password").unwrap();
    assert_eq!(password.with.as_deref(), Some("confirm"));

    let terms = fields.get("terms").unwrap();
    assert_eq!(terms.kind, FieldKind::Checkbox);
    assert_eq!(terms.checked, Some(false));
    assert_eq!(terms.value, FieldValue::List(Vec::new()));
}

#[test]
fn test_init_rejects_bad_config() {
    let engine = engine_with(signup_form());

    assert!(matches!(
        engine.init(FormConfig::new("  ")),
        Err(EngineError::Config(ConfigError::MissingFormId))
    ));
    assert!(matches!(
        engine.init(FormConfig::new("email")),
        Err(EngineError::Config(ConfigError::FormNotFound(id))) if id == "email"
    ));
    assert!(matches!(
        engine.init_json(r#"{ "formId": "signup", "dateFormat": "YYYY/mm/dd" }"#),
        Err(EngineError::Config(ConfigError::Json(_)))
    ));

    engine.init(FormConfig::new("signup")).unwrap();
    assert!(matches!(
        engine.init(FormConfig::new("signup")),
        Err(EngineError::Config(ConfigError::AlreadyBound(_)))
    ));
}

#[test]
fn test_fields_without_rules_are_ignored() {
    let engine = engine_with(Element::form("f").children([
        Element::text_input("plain"),
        Element::text_input("blank").data("val-rules", "  "),
        Element::new("textarea").data("val-rules", "required"),
        Element::text_input("kept").data("val-rules", "required"),
    ]));
    engine.init(FormConfig::new("f")).unwrap();
    let fields = engine.fields("f").unwrap();
    assert_eq!(fields.names().collect::<Vec<_>>(), vec!["kept"]);
}

#[test]
fn test_form_scope_and_document_scope() {
    let engine = engine_with(Element::div().children([
        Element::form("a").child(Element::text_input("inside").data("val-rules", "required")),
        Element::text_input("outside").data("val-rules", "required"),
    ]));
    engine.init(FormConfig::new("a")).unwrap();
    assert_eq!(engine.fields("a").unwrap().len(), 1);

    let engine = engine_with(Element::div().children([
        Element::form("a").child(Element::text_input("inside").data("val-rules", "required")),
        Element::text_input("outside").data("val-rules", "required"),
    ]));
    engine
        .init(FormConfig::new("a").with_scope(DiscoveryScope::Document))
        .unwrap();
    assert_eq!(engine.fields("a").unwrap().len(), 2);
}

#[tokio::test]
async fn test_multiple_forms_are_independent() {
    let engine = engine_with(Element::div().children([
        Element::form("one").child(Element::text_input("name").id("name-1").data("val-rules", "required")),
        Element::form("two").child(Element::text_input("name").id("name-2").data("val-rules", "required")),
    ]));
    engine.init(FormConfig::new("one")).unwrap();
    engine.init(FormConfig::new("two")).unwrap();
    assert_eq!(engine.form_ids(), vec!["one", "two"]);

    type_into(&engine, "name-1", "filled");
    assert!(engine.validate_form("one").await.unwrap());
    assert!(!engine.validate_form("two").await.unwrap());

    // Each form shows its own error element only
    assert_eq!(error_texts(&engine, "name").len(), 1);
    assert!(next_sibling(&engine, "name-1").is_none());
    assert!(next_sibling(&engine, "name-2").is_some());
}

#[tokio::test]
async fn test_teardown_stops_watching() {
    let engine = signup_engine();
    let email = node(&engine, "email");
    assert!(engine.teardown("signup"));
    assert!(!engine.teardown("signup"));
    assert!(!engine.is_bound("signup"));

    assert_eq!(engine.handle_change(email).await.unwrap(), None);
    let err = engine.validate_form("signup").await.unwrap_err();
    assert!(matches!(err, EngineError::Lookup(LookupError::UnknownForm(_))));
    assert!(err.is_lookup());
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_change_on_group_member() {
    let engine = signup_engine();
    let later = check(&engine, "terms-later", true);

    // The member without rules still belongs to the group
    assert_eq!(
        engine.dispatch(DomEvent::Change { target: later }).await.unwrap(),
        Dispatched::Validated(true)
    );
    let terms = engine.field("signup", "terms").unwrap();
    assert_eq!(terms.checked, Some(true));
    assert_eq!(terms.value, FieldValue::List(vec!["later".to_string()]));

    let later = check(&engine, "terms-later", false);
    assert_eq!(
        engine.dispatch(DomEvent::Change { target: later }).await.unwrap(),
        Dispatched::Validated(false)
    );
    assert_eq!(
        engine.field("signup", "terms").unwrap().error.as_deref(),
        Some("The terms field is required.")
    );
}

#[tokio::test]
async fn test_radio_group_value() {
    let engine = engine_with(Element::form("f").children([
        Element::radio("plan", "free").id("free").data("val-rules", "required"),
        Element::radio("plan", "pro").id("pro"),
    ]));
    engine.init(FormConfig::new("f")).unwrap();

    assert!(!engine.validate_form("f").await.unwrap());
    let pro = check(&engine, "pro", true);
    assert_eq!(engine.handle_change(pro).await.unwrap(), Some(true));
    assert_eq!(engine.field("f", "plan").unwrap().value, FieldValue::from("pro"));
}

#[tokio::test]
async fn test_unwatched_events_are_ignored() {
    let engine = engine_with(Element::div().children([
        Element::form("bound").child(Element::text_input("x").data("val-rules", "required")),
        Element::form("other").child(Element::text_input("y").id("y")),
    ]));
    engine.init(FormConfig::new("bound")).unwrap();
    let y = node(&engine, "y");
    let other = node(&engine, "other");

    assert_eq!(engine.dispatch(DomEvent::Change { target: y }).await.unwrap(), Dispatched::Ignored);
    assert_eq!(engine.dispatch(DomEvent::Submit { form: other }).await.unwrap(), Dispatched::Ignored);
    assert_eq!(engine.dispatch(DomEvent::Mutated { form: other }).await.unwrap(), Dispatched::Ignored);
}

#[tokio::test]
async fn test_validated_events() {
    let engine = signup_engine();
    let mut events = engine.subscribe();

    type_into(&engine, "email", "ada@example.com");
    engine.partial_validation("signup", "email").await.unwrap();

    let event = events.try_recv().unwrap();
    assert_eq!(event.form_id, "signup");
    assert_eq!(event.field.name, "email");
    assert_eq!(event.field.valid, Validity::Valid);
}

// ============================================================================
// Submission
// ============================================================================

#[tokio::test]
async fn test_submit_blocked_then_submitted() {
    let engine = signup_engine();
    let form = node(&engine, "signup");

    type_into(&engine, "email", "ada@example.com");
    let outcome = engine.dispatch(DomEvent::Submit { form }).await.unwrap();
    let Dispatched::Submit(SubmitOutcome::Blocked(result)) = outcome else {
        panic!("expected blocked submission, got {outcome:?}");
    };
    assert_eq!(result.invalid_fields(), vec!["password", "confirm", "terms"]);
    assert_eq!(result.first_error().map(|e| e.display.as_str()), Some("Password"));
    assert!(engine.document().read().unwrap().submissions().is_empty());

    type_into(&engine, "password", "correct horse");
    type_into(&engine, "confirm", "correct horse");
    check(&engine, "terms-yes", true);

    let outcome = engine.handle_submit("signup").await.unwrap();
    assert!(outcome.is_submitted());
    assert_eq!(engine.document().read().unwrap().submissions(), &[form]);
}

#[tokio::test]
async fn test_submit_blocked_by_cross_field_rule() {
    let engine = engine_with(Element::form("trip").children([
        Element::text_input("end")
            .id("end")
            .data("val-rules", "required|date_greater_than[start]"),
        Element::text_input("start").id("start").data("val-rules", "required|valid_date"),
    ]));
    engine.init(FormConfig::new("trip")).unwrap();
    // Values typed without any change event
    type_into(&engine, "start", "10/10/2020");
    type_into(&engine, "end", "01/01/2020");

    let outcome = engine.handle_submit("trip").await.unwrap();
    let SubmitOutcome::Blocked(result) = outcome else {
        panic!("expected blocked submission, got {outcome:?}");
    };
    assert_eq!(result.invalid_fields(), vec!["end"]);
    assert!(engine.document().read().unwrap().submissions().is_empty());
}

#[tokio::test]
async fn test_validate_form_report() {
    let engine = signup_engine();
    let report = engine.validate_form_report("signup").await.unwrap();
    assert!(report.is_invalid());
    assert_eq!(report.errors().len(), 4);
    assert_eq!(report.errors()[0].message, "The Email field is required.");
}

// ============================================================================
// Re-scan
// ============================================================================

fn add_field(engine: &valform::Engine, name: &str) {
    let mut doc = engine.document().write().unwrap();
    let form = doc.get_element_by_id("signup").unwrap();
    let input = doc.create_element(
        Element::text_input(name)
            .id(name)
            .data("val-rules", "required"),
    );
    doc.append_child(form, input);
}

fn remove_field(engine: &valform::Engine, id: &str) {
    let mut doc = engine.document().write().unwrap();
    let node = doc.get_element_by_id(id).unwrap();
    doc.remove(node);
}

#[tokio::test]
async fn test_resync_keeps_state_and_adds_fields() {
    let engine = signup_engine();
    type_into(&engine, "email", "ada@example.com");
    engine.partial_validation("signup", "email").await.unwrap();

    add_field(&engine, "phone");
    let form = node(&engine, "signup");
    assert_eq!(
        engine.dispatch(DomEvent::Mutated { form }).await.unwrap(),
        Dispatched::Resynced(1)
    );

    let fields = engine.fields("signup").unwrap();
    assert!(fields.contains("phone"));
    let email = fields.get("email").unwrap();
    assert!(email.visited);
    assert!(email.is_valid());

    // The new element is watched
    let phone = node(&engine, "phone");
    assert_eq!(engine.handle_change(phone).await.unwrap(), Some(false));
}

#[tokio::test]
async fn test_resync_drops_removed_fields() {
    let engine = signup_engine();
    let email = node(&engine, "email");
    remove_field(&engine, "email-row");
    engine.resync("signup").await.unwrap();

    let fields = engine.fields("signup").unwrap();
    assert!(!fields.contains("email"));
    assert_eq!(fields.len(), 3);
    assert_eq!(engine.handle_change(email).await.unwrap(), None);
}

#[tokio::test]
async fn test_grow_only_ignores_same_size_swap() {
    let engine = engine_with(signup_form());
    engine
        .init(FormConfig::new("signup").with_reconcile(ReconcilePolicy::GrowOnly))
        .unwrap();

    remove_field(&engine, "confirm");
    add_field(&engine, "phone");
    engine.resync("signup").await.unwrap();

    let fields = engine.fields("signup").unwrap();
    assert!(!fields.contains("confirm"));
    assert!(!fields.contains("phone"));

    add_field(&engine, "fax");
    engine.resync("signup").await.unwrap();
    let fields = engine.fields("signup").unwrap();
    // Five found against three kept: both new names join
    assert!(fields.contains("phone"));
    assert!(fields.contains("fax"));
}
