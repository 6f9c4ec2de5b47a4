//! Scope token allocation.

use std::collections::HashMap;

/// Issues `<element-name>-<n>` tokens, counting from 1 per element type.
#[derive(Debug, Default)]
pub struct ScopeAllocator {
    counters: HashMap<String, u32>,
}

impl ScopeAllocator {
    /// An allocator that has issued nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The next token for `element_name`. Never repeats for a type.
    pub fn generate(&mut self, element_name: &str) -> String {
        let counter = self.counters.entry(element_name.to_string()).or_insert(0);
        *counter += 1;
        let token = format!("{element_name}-{counter}");
        tracing::debug!(%token, "scope token allocated");
        token
    }

    /// How many tokens `element_name` has been issued.
    #[must_use]
    pub fn issued(&self, element_name: &str) -> u32 {
        self.counters.get(element_name).copied().unwrap_or(0)
    }
}
