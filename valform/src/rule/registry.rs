//! Rule registry: rule name to predicate.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::{RuleInput, Verdict, builtin};
use crate::error::RuleError;

/// A registered rule predicate.
pub type Predicate = Arc<dyn Fn(&RuleInput<'_>) -> Verdict + Send + Sync>;

/// Mapping from rule name to predicate.
///
/// Registering under an existing name replaces the previous predicate, so
/// built-in rules can be overridden.
///
/// # Example
///
/// ```
/// use valform::RuleRegistry;
///
/// let mut rules = RuleRegistry::default();
/// assert!(rules.contains("required"));
///
/// rules.register("even", |input| {
///     input.text().parse::<i64>().is_ok_and(|n| n % 2 == 0)
/// });
/// assert!(rules.contains("even"));
/// ```
#[derive(Clone)]
pub struct RuleRegistry {
    rules: HashMap<String, Predicate>,
}

impl RuleRegistry {
    /// Creates a registry without any rules.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Creates a registry seeded with the built-in rules.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        builtin::install(&mut registry);
        registry
    }

    /// Register a synchronous rule.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&RuleInput<'_>) -> bool + Send + Sync + 'static,
    {
        let predicate: Predicate = Arc::new(move |input: &RuleInput<'_>| Verdict::Ready(f(input)));
        self.register_predicate(name, predicate);
    }

    /// Register a rule whose check suspends.
    ///
    /// The closure runs synchronously with access to the [`RuleInput`] and
    /// returns a future that owns whatever it needs from it.
    pub fn register_async<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&RuleInput<'_>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let predicate: Predicate =
            Arc::new(move |input: &RuleInput<'_>| Verdict::Pending(Box::pin(f(input))));
        self.register_predicate(name, predicate);
    }

    /// Register a predicate that decides per call whether to suspend.
    pub fn register_predicate(&mut self, name: impl Into<String>, predicate: Predicate) {
        let name = name.into();
        if self.rules.insert(name.clone(), predicate).is_some() {
            log::debug!("[rules] replaced rule '{name}'");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Predicate> {
        self.rules.get(name)
    }

    /// Look up `rule` for evaluating `field`.
    pub fn lookup(&self, rule: &str, field: &str) -> Result<Predicate, RuleError> {
        self.rules
            .get(rule)
            .cloned()
            .ok_or_else(|| RuleError::unknown_rule(rule, field))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Registered rule names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}
