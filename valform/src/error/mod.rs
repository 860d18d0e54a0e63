//! Error types

mod config;
mod engine;
mod lookup;
mod rule;

pub use config::*;
pub use engine::*;
pub use lookup::*;
pub use rule::*;
