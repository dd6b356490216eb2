//! Reference-resolution boundary for human-supplied parameters
//!
//! Callers hand the orchestrator raw parameter values: a literal resource
//! identifier, a reference token produced by an autocomplete picker, or a
//! comma list for multi-valued parameters. Resolution of those raw values
//! to provider identifiers is an external collaborator's job; this module
//! only fixes the interface and ships a literal passthrough implementation.

#[cfg(test)]
use mockall::automock;

/// Resolves raw parameter values to provider identifiers
#[cfg_attr(test, automock)]
pub trait ReferenceResolver: Send + Sync {
    /// Resolve a single-valued raw parameter to an identifier.
    ///
    /// Returns None when the raw value is empty or resolves to nothing.
    fn resolve(&self, raw: &str) -> Option<String>;

    /// Resolve a multi-valued raw parameter to a list of identifiers.
    ///
    /// An empty raw value resolves to an empty list.
    fn resolve_multi(&self, raw: &str) -> Vec<String>;
}

/// Passthrough resolver: literals resolve to themselves, multi-valued
/// parameters are comma lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralResolver;

impl ReferenceResolver for LiteralResolver {
    fn resolve(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn resolve_multi(&self, raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
