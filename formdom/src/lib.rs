pub mod document;
pub mod element;
pub mod event;

pub use document::{Ancestors, Document, Node, NodeId, SharedDocument, MAX_DEPTH};
pub use element::Element;
pub use event::DomEvent;
