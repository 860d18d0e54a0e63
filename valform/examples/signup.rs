use std::fs::File;
use std::time::Duration;

use formdom::{Document, DomEvent, Element};
use simplelog::{Config, LevelFilter, WriteLogger};
use valform::{Dispatched, Engine, FormConfig, SubmitOutcome};

fn form() -> Element {
    Element::form("signup").children([
        Element::div().class("row").children([
            Element::text_input("username")
                .id("username")
                .data("val-rules", "required|alpha_dash|min_length[3]|available")
                .data("val-display", "Username"),
            Element::new("small").class("hint").text("Letters, digits, dashes"),
        ]),
        Element::text_input("email")
            .id("email")
            .data("val-rules", "required|valid_email")
            .data("val-display", "Email"),
        Element::text_input("dob")
            .id("dob")
            .data("val-rules", "required|valid_date|min_years_in_past[18]")
            .data("val-display", "Date of birth"),
        Element::div().children([
            Element::checkbox("terms", "yes")
                .id("terms")
                .data("val-rules", "required")
                .data("val-display", "Terms"),
        ]),
    ])
}

fn fill(doc: &formdom::SharedDocument, values: &[(&str, &str)]) {
    let mut doc = doc.write().unwrap_or_else(|e| e.into_inner());
    for (id, value) in values {
        if let Some(node) = doc.get_element_by_id(id) {
            doc.set_value(node, *value);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up file logging
    let log_file = File::create("signup.log")?;
    WriteLogger::init(LevelFilter::Debug, Config::default(), log_file)?;

    let doc = Document::new(Element::new("body").child(form())).shared();
    let engine = Engine::new(doc.clone());

    engine.add_val_method_async("available", |input| {
        let name = input.text().to_lowercase();
        async move {
            // Stands in for a remote lookup
            tokio::time::sleep(Duration::from_millis(20)).await;
            !matches!(name.as_str(), "admin" | "root")
        }
    });
    engine.add_val_message("available", "The %s is already taken.");
    engine.init_json(r#"{ "formId": "signup", "appendAfter": "hint", "dateFormat": "YYYY-mm-dd" }"#)?;

    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            let status = match &event.field.error {
                Some(error) => format!("invalid: {error}"),
                None => "valid".to_string(),
            };
            println!("  {} -> {status}", event.field.name);
        }
    });

    let form = {
        let doc = doc.read().unwrap_or_else(|e| e.into_inner());
        doc.get_element_by_id("signup").ok_or("form missing")?
    };

    println!("first attempt:");
    fill(&doc, &[("username", "admin"), ("email", "ada@"), ("dob", "2015-02-30")]);
    if let Dispatched::Submit(SubmitOutcome::Blocked(result)) =
        engine.dispatch(DomEvent::Submit { form }).await?
    {
        println!("blocked: {}", result.invalid_fields().join(", "));
    }

    println!("second attempt:");
    fill(&doc, &[("username", "ada"), ("email", "ada@example.com"), ("dob", "1990-12-10")]);
    {
        let mut doc = doc.write().unwrap_or_else(|e| e.into_inner());
        if let Some(terms) = doc.get_element_by_id("terms") {
            doc.set_checked(terms, true);
        }
    }
    let outcome = engine.handle_submit("signup").await?;
    println!("submitted: {}", outcome.is_submitted());

    // Let the listener drain
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}
