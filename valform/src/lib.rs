//! Declarative form validation
//!
//! Binds to forms in a [`formdom::Document`], discovers fields tagged with
//! `data-val-rules`, evaluates their rules and reflects the outcome through
//! state classes and injected error elements.

pub mod config;
pub mod date;
pub mod discovery;
pub mod error;
pub mod field;
pub mod message;
pub mod reflect;
pub mod rule;
pub mod session;
pub mod value;

mod engine;
mod evaluator;
mod result;

pub use config::{DiscoveryScope, FormConfig, ReconcilePolicy};
pub use date::DateFormat;
pub use engine::*;
pub use error::EngineError;
pub use field::{FieldKind, FieldRecord, FieldSet, Validity};
pub use message::{MessageCatalog, render_message};
pub use result::{FieldError, ValidationResult};
pub use rule::{RuleInput, RuleRegistry, RuleSpec, Verdict};
pub use session::ValidatedEvent;
pub use value::FieldValue;
