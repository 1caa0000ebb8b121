//! Handler registry.
//!
//! Maps normalized, dot-separated mutation names to handlers.
//!
//! # Example
//!
//! ```rust,ignore
//! let issues = HandlerRegistry::new()
//!     .on("create", CreateIssue)
//!     .on("close", CloseIssue);
//!
//! let registry = HandlerRegistry::new()
//!     .mount("issue", issues)          // issue.create, issue.close
//!     .on("comment.add", AddComment);
//!
//! let admin = HandlerRegistry::inherit(&registry)
//!     .on("issue.purge", PurgeIssue);  // everything above, plus issue.purge
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use super::MutationHandler;
use crate::storage::LedgerStore;

/// Alternate separator clients may use in mutation names.
const ALT_SEPARATOR: char = '|';

/// Normalize a mutation name for lookup (`issue|create` → `issue.create`).
pub fn normalize_name(name: &str) -> String {
    name.replace(ALT_SEPARATOR, ".")
}

/// Name → handler lookup. Read-only once handed to a processor.
pub struct HandlerRegistry<S: LedgerStore> {
    handlers: HashMap<String, Arc<dyn MutationHandler<S>>>,
}

impl<S: LedgerStore> Default for HandlerRegistry<S> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S: LedgerStore> Clone for HandlerRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<S: LedgerStore> std::fmt::Debug for HandlerRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl<S: LedgerStore> HandlerRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a registry containing every entry of `base`.
    ///
    /// Entries registered afterwards are added on top and replace base
    /// entries with the same name.
    pub fn inherit(base: &HandlerRegistry<S>) -> Self {
        base.clone()
    }

    /// Register a handler under `name`.
    pub fn on(mut self, name: &str, handler: impl MutationHandler<S> + 'static) -> Self {
        self.register(name, Arc::new(handler));
        self
    }

    /// Register a shared handler under `name`, replacing any existing entry.
    pub fn register(&mut self, name: &str, handler: Arc<dyn MutationHandler<S>>) {
        self.handlers.insert(normalize_name(name), handler);
    }

    /// Add every entry of `nested` under `prefix.`.
    pub fn mount(mut self, prefix: &str, nested: HandlerRegistry<S>) -> Self {
        let prefix = normalize_name(prefix);
        for (name, handler) in nested.handlers {
            self.handlers.insert(format!("{prefix}.{name}"), handler);
        }
        self
    }

    /// Look up a handler. `name` is normalized first.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn MutationHandler<S>>> {
        self.handlers.get(&normalize_name(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
