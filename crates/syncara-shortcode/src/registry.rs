//! Shortcode registry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, ShortcodeError};
use crate::handler::ShortcodeHandler;
use crate::key::ShortcodeKey;

/// One registered shortcode.
#[derive(Clone)]
pub struct ShortcodeEntry {
    pub key: ShortcodeKey,
    /// Token form shown to the model, e.g. `TODO:COMPLETE:id_or_number`.
    pub usage: String,
    pub description: String,
    pub handler: Arc<dyn ShortcodeHandler>,
}

/// Maps `CATEGORY:ACTION` keys to handlers.
///
/// Built at startup, then [sealed](Self::seal) and shared behind an `Arc`.
/// After [`teardown`](Self::teardown) every lookup misses, so replies that
/// race a shutdown keep their tokens instead of reaching dead handlers.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use syncara_shortcode::{ShortcodeHandler, ShortcodeRegistry};
///
/// fn build(todo: Arc<dyn ShortcodeHandler>) -> Arc<ShortcodeRegistry> {
///     let mut registry = ShortcodeRegistry::new();
///     registry
///         .register("TODO:LIST", "TODO:LIST:filter", "List todos", todo)
///         .unwrap();
///     registry.seal();
///     Arc::new(registry)
/// }
/// ```
pub struct ShortcodeRegistry {
    entries: BTreeMap<ShortcodeKey, ShortcodeEntry>,
    sealed: bool,
    torn_down: AtomicBool,
}

impl Default for ShortcodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortcodeRegistry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            sealed: false,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Registers `handler` under `key`.
    ///
    /// Fails on a malformed or duplicate key, or once the registry is
    /// sealed or torn down.
    pub fn register(
        &mut self,
        key: &str,
        usage: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ShortcodeHandler>,
    ) -> Result<()> {
        if self.is_torn_down() {
            return Err(ShortcodeError::TornDown);
        }
        if self.sealed {
            return Err(ShortcodeError::Sealed(key.to_string()));
        }
        let key = ShortcodeKey::parse(key)?;
        if self.entries.contains_key(&key) {
            return Err(ShortcodeError::Duplicate(key.to_string()));
        }
        debug!(key = %key, "Registered shortcode");
        self.entries.insert(
            key.clone(),
            ShortcodeEntry {
                key,
                usage: usage.into(),
                description: description.into(),
                handler,
            },
        );
        Ok(())
    }

    /// Forbids further registration.
    pub fn seal(&mut self) {
        if !self.sealed {
            info!(count = self.entries.len(), "Shortcode registry sealed");
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Disables every lookup. Cannot be undone.
    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::SeqCst) {
            info!("Shortcode registry torn down");
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Exact-key lookup.
    pub fn get(&self, key: &ShortcodeKey) -> Option<Arc<dyn ShortcodeHandler>> {
        if self.is_torn_down() {
            return None;
        }
        self.entries.get(key).map(|e| e.handler.clone())
    }

    pub fn entries(&self) -> impl Iterator<Item = &ShortcodeEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().map(ShortcodeKey::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per shortcode, grouped by category, for the system prompt.
    pub fn documentation(&self) -> String {
        let mut out = String::new();
        let mut category = "";
        for entry in self.entries.values() {
            if entry.key.category() != category {
                if !out.is_empty() {
                    out.push('\n');
                }
                category = entry.key.category();
                out.push_str(&format!("{}:\n", category));
            }
            out.push_str(&format!("- [{}] - {}\n", entry.usage, entry.description));
        }
        out.truncate(out.trim_end().len());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerContext, HandlerOutcome};
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl ShortcodeHandler for Noop {
        async fn handle(&self, _ctx: &HandlerContext, _params: &str) -> HandlerOutcome {
            HandlerOutcome::Handled
        }
    }

    fn key(s: &str) -> ShortcodeKey {
        ShortcodeKey::parse(s).unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ShortcodeRegistry::new();
        registry
            .register("TODO:LIST", "TODO:LIST", "List todos", Arc::new(Noop))
            .unwrap();
        assert!(registry.get(&key("TODO:LIST")).is_some());
        assert!(registry.get(&key("TODO:CLEAR")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_and_invalid() {
        let mut registry = ShortcodeRegistry::new();
        registry.register("A:B", "A:B", "x", Arc::new(Noop)).unwrap();
        assert_eq!(
            registry.register("A:B", "A:B", "y", Arc::new(Noop)),
            Err(ShortcodeError::Duplicate("A:B".into()))
        );
        assert!(matches!(
            registry.register("a:b", "a:b", "y", Arc::new(Noop)),
            Err(ShortcodeError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_sealed_rejects_registration() {
        let mut registry = ShortcodeRegistry::new();
        registry.seal();
        assert!(matches!(
            registry.register("A:B", "A:B", "x", Arc::new(Noop)),
            Err(ShortcodeError::Sealed(_))
        ));
    }

    #[test]
    fn test_teardown_disables_lookup() {
        let mut registry = ShortcodeRegistry::new();
        registry.register("A:B", "A:B", "x", Arc::new(Noop)).unwrap();
        registry.seal();
        registry.teardown();
        assert!(registry.get(&key("A:B")).is_none());
        assert!(registry.is_torn_down());
    }

    #[test]
    fn test_documentation_grouped() {
        let mut registry = ShortcodeRegistry::new();
        registry
            .register("TODO:LIST", "TODO:LIST:filter", "List todos", Arc::new(Noop))
            .unwrap();
        registry
            .register("CANVAS:SHOW", "CANVAS:SHOW:name", "Show a file", Arc::new(Noop))
            .unwrap();
        assert_eq!(
            registry.documentation(),
            "CANVAS:\n- [CANVAS:SHOW:name] - Show a file\n\nTODO:\n- [TODO:LIST:filter] - List todos"
        );
    }
}
