//! Top-level engine error

use super::{ConfigError, LookupError, RuleError};

/// Any error an [`Engine`](crate::Engine) operation can return.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl EngineError {
    /// Returns `true` if this is a lookup miss rather than misconfiguration.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }
}
