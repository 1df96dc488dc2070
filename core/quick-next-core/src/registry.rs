//! One engine per execution context.
//!
//! A page context must never run two engines: both would inject a control and
//! both would react to every mutation. The registry is the single place an
//! engine is created, and the handle the popup adapter uses to reach it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::engine::QuickNext;
use crate::error::{QuickNextError, Result};

/// Identifies an execution context (typically a tab/frame pair).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(String);

impl ContextId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type SharedEngine = Rc<RefCell<QuickNext>>;

#[derive(Default)]
pub struct InstanceRegistry {
    instances: RefCell<HashMap<ContextId, SharedEngine>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the context's engine, building it with `factory` on first use.
    pub fn get_or_create(
        &self,
        context: &ContextId,
        factory: impl FnOnce() -> QuickNext,
    ) -> SharedEngine {
        if let Some(existing) = self.get(context) {
            tracing::debug!(context = %context, "Reusing existing engine");
            return existing;
        }
        let engine = Rc::new(RefCell::new(factory()));
        self.instances
            .borrow_mut()
            .insert(context.clone(), Rc::clone(&engine));
        tracing::debug!(context = %context, "Engine registered");
        engine
    }

    /// Registers a prebuilt engine. Fails if the context already has one.
    pub fn register(&self, context: &ContextId, engine: QuickNext) -> Result<SharedEngine> {
        let mut instances = self.instances.borrow_mut();
        if instances.contains_key(context) {
            return Err(QuickNextError::AlreadyRegistered(context.to_string()));
        }
        let engine = Rc::new(RefCell::new(engine));
        instances.insert(context.clone(), Rc::clone(&engine));
        Ok(engine)
    }

    pub fn get(&self, context: &ContextId) -> Option<SharedEngine> {
        self.instances.borrow().get(context).cloned()
    }

    /// Drops the context's engine, e.g. on a full page unload.
    pub fn remove(&self, context: &ContextId) -> Option<SharedEngine> {
        self.instances.borrow_mut().remove(context)
    }

    pub fn len(&self) -> usize {
        self.instances.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuickNextConfig;
    use crate::sim::SimulatedPage;
    use crate::storage::MemoryStorage;

    fn engine() -> QuickNext {
        QuickNext::new(
            Box::new(SimulatedPage::new("https://www.linkedin.com/jobs/search/")),
            Box::new(MemoryStorage::new()),
            QuickNextConfig::default(),
        )
    }

    #[test]
    fn get_or_create_builds_once() {
        let registry = InstanceRegistry::new();
        let context = ContextId::new("tab-1");
        let mut built = 0;

        let first = registry.get_or_create(&context, || {
            built += 1;
            engine()
        });
        let second = registry.get_or_create(&context, || {
            built += 1;
            engine()
        });

        assert_eq!(built, 1);
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn register_rejects_second_instance() {
        let registry = InstanceRegistry::new();
        let context = ContextId::new("tab-1");
        registry.register(&context, engine()).unwrap();

        let err = registry.register(&context, engine()).err().unwrap();
        assert!(matches!(err, QuickNextError::AlreadyRegistered(id) if id == "tab-1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn contexts_are_isolated() {
        let registry = InstanceRegistry::new();
        registry.get_or_create(&ContextId::new("a"), engine);
        registry.get_or_create(&ContextId::new("b"), engine);
        assert_eq!(registry.len(), 2);
        assert!(registry.remove(&ContextId::new("a")).is_some());
        assert!(registry.get(&ContextId::new("a")).is_none());
    }
}
