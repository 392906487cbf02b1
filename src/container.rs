//! # Service Container
//!
//! Named services shared by every handler through [`HandlerRequest::services`].
//!
//! Two kinds of binding:
//! - [`instance`](Container::instance): a ready value.
//! - [`bind`](Container::bind): a factory run on first [`make`](Container::make) and cached
//!   for the life of the container. Factories receive the container, so a service can be
//!   built from other services.
//!
//! The map is a `DashMap`; bindings are cloned out of their shard before a factory runs,
//! so a factory that resolves other services never re-enters a held shard lock.
//!
//! [`HandlerRequest::services`]: crate::dispatcher::HandlerRequest::services

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::errors::ContainerError;

type Service = Arc<dyn Any + Send + Sync>;
type Factory = dyn Fn(&Container) -> Service + Send + Sync;

struct LazyService {
    factory: Box<Factory>,
    value: OnceCell<Service>,
}

#[derive(Clone)]
enum Binding {
    Instance(Service),
    Lazy(Arc<LazyService>),
}

#[derive(Default)]
pub struct Container {
    bindings: DashMap<String, Binding>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.names())
            .finish()
    }
}

impl Container {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a ready value under `name`, replacing any previous binding.
    pub fn instance<T>(&self, name: &str, value: T)
    where
        T: Send + Sync + 'static,
    {
        debug!(service = name, kind = "instance", "Service bound");
        self.bindings
            .insert(name.to_string(), Binding::Instance(Arc::new(value)));
    }

    /// Bind a lazily built singleton under `name`, replacing any previous binding.
    pub fn bind<T, F>(&self, name: &str, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        debug!(service = name, kind = "factory", "Service bound");
        let lazy = LazyService {
            factory: Box::new(move |c: &Container| -> Service { Arc::new(factory(c)) }),
            value: OnceCell::new(),
        };
        self.bindings
            .insert(name.to_string(), Binding::Lazy(Arc::new(lazy)));
    }

    /// Resolve `name` as a `T`.
    pub fn make<T>(&self, name: &str) -> Result<Arc<T>, ContainerError>
    where
        T: Send + Sync + 'static,
    {
        let binding = self
            .bindings
            .get(name)
            .map(|b| b.value().clone())
            .ok_or_else(|| ContainerError::NotBound(name.to_string()))?;

        let service = match binding {
            Binding::Instance(service) => service,
            Binding::Lazy(lazy) => Arc::clone(lazy.value.get_or_init(|| (lazy.factory)(self))),
        };

        service
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bound names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn instance_round_trip() {
        let c = Container::new();
        c.instance("greeting", String::from("hello"));
        assert_eq!(c.make::<String>("greeting").unwrap().as_str(), "hello");
        assert!(c.has("greeting"));
        assert!(!c.has("missing"));
    }

    #[test]
    fn factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let c = Container::new();
        c.bind("answer", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            42u32
        });
        assert_eq!(*c.make::<u32>("answer").unwrap(), 42);
        assert_eq!(*c.make::<u32>("answer").unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_can_resolve_other_services() {
        let c = Container::new();
        c.instance("base", 10u64);
        c.bind("doubled", |c| *c.make::<u64>("base").unwrap() * 2);
        assert_eq!(*c.make::<u64>("doubled").unwrap(), 20);
    }

    #[test]
    fn lookup_errors() {
        let c = Container::new();
        c.instance("n", 1i32);
        assert!(matches!(c.make::<i32>("x"), Err(ContainerError::NotBound(n)) if n == "x"));
        assert!(matches!(
            c.make::<String>("n"),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }
}
