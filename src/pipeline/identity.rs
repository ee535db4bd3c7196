use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Set of record identities already admitted by a pipeline
///
/// The index only grows. It is not persisted and never consults existing
/// output files.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    seen: Mutex<HashSet<String>>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `identity` was already registered; otherwise
    /// registers it and returns `false`
    ///
    /// Check and insert happen under one lock, so two concurrent callers with
    /// the same identity never both see `false`.
    pub fn contains_or_register(&self, identity: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.contains(identity) {
            return true;
        }
        seen.insert(identity.to_string());
        false
    }

    /// Number of distinct identities registered so far
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
