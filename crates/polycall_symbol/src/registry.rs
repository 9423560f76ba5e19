use std::sync::Arc;

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::handle::FunctionHandle;

/// Name-keyed table of invocable functions.
///
/// Names are unique: registering a name that already exists replaces the
/// previous handle (last writer wins). The registry has no lock of its own;
/// the owning runtime serializes access to it together with its loaders.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: AHashMap<String, Arc<FunctionHandle>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `handle`, returning the handle it replaced.
    pub fn register(&mut self, handle: FunctionHandle) -> Option<Arc<FunctionHandle>> {
        let name = handle.name.clone();
        let previous = self.functions.insert(name, Arc::new(handle));
        if let Some(previous) = &previous {
            warn!(
                function = %previous.name,
                previous_loader = previous.loader_tag().unwrap_or("native"),
                "replacing registered function"
            );
        }
        previous
    }

    /// Inserts a batch discovered by a single load.
    pub fn register_many<I>(&mut self, handles: I) -> usize
    where
        I: IntoIterator<Item = FunctionHandle>,
    {
        let mut count = 0;
        for handle in handles {
            debug!(function = %handle.name, signature = %handle.signature, "registering function");
            self.register(handle);
            count += 1;
        }
        count
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<FunctionHandle>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Drops every function owned by the loader registered under `tag`.
    pub fn unregister_all_for(&mut self, tag: &str) -> usize {
        let before = self.functions.len();
        self.functions
            .retain(|_, handle| handle.loader_tag() != Some(tag));
        before - self.functions.len()
    }

    pub fn clear(&mut self) {
        self.functions.clear();
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.functions.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn all(&self) -> Vec<Arc<FunctionHandle>> {
        let mut handles = self.functions.values().cloned().collect::<Vec<_>>();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        handles
    }
}

#[cfg(test)]
mod tests {
    use polycall_value::{ParamType, Value, ValueTag};

    use super::*;
    use crate::handle::Signature;

    fn loader_fn(name: &str, tag: &str) -> FunctionHandle {
        FunctionHandle::loader(
            name,
            Signature::new(vec![ParamType::Any], ParamType::Any),
            tag,
            name,
        )
    }

    #[test]
    fn lookup_returns_most_recent_registration() {
        let mut registry = FunctionRegistry::new();
        assert!(registry.register(loader_fn("sum", "a")).is_none());
        let replaced = registry.register(loader_fn("sum", "b"));

        assert_eq!(replaced.and_then(|h| h.loader_tag().map(str::to_owned)), Some("a".into()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("sum").unwrap().loader_tag(), Some("b"));
    }

    #[test]
    fn native_registration_replaces_loader_function() {
        let mut registry = FunctionRegistry::new();
        registry.register(loader_fn("now", "a"));
        registry.register(FunctionHandle::native(
            "now",
            Signature::new(vec![], ParamType::Tag(ValueTag::I64)),
            Arc::new(|_: &[Value]| Ok(Value::I64(0))),
        ));
        assert!(registry.lookup("now").unwrap().is_native());
    }

    #[test]
    fn unregister_all_for_only_touches_that_loader() {
        let mut registry = FunctionRegistry::new();
        registry.register_many([loader_fn("a1", "a"), loader_fn("a2", "a"), loader_fn("b1", "b")]);

        assert_eq!(registry.unregister_all_for("a"), 2);
        assert_eq!(registry.names(), vec!["b1".to_string()]);
        assert_eq!(registry.unregister_all_for("a"), 0);
    }

    #[test]
    fn missing_name_is_none() {
        let registry = FunctionRegistry::new();
        assert!(registry.lookup("does_not_exist").is_none());
        assert!(registry.is_empty());
    }
}
