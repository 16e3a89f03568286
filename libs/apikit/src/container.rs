//! Typed service locator holding named definitions, shared instances and lazily built clients.

use std::any::{type_name, Any, TypeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::env::Environment;
use crate::error::ContainerError;
use crate::factory::ClientFactory;
use crate::marker::BoxedClient;
use crate::scanner::RegistrationRecord;

/// Answers whether a named definition exists. The scanner needs nothing more.
pub trait DefinitionRegistry {
    fn has_definition(&self, name: &str) -> bool;
}

type Erased = Box<dyn Any + Send + Sync>;

/// Registry of everything the client pipeline needs at runtime.
///
/// - **definitions**: values registered by name, e.g. the shared `ClientManager`
/// - **instances**: values registered by type, e.g. interceptors or cached clients
/// - **factories**: deferred client constructions keyed by the `TypeId` of `dyn Api`
///
/// Locks are never held while a client is being built.
pub struct Container {
    environment: Environment,
    definitions: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    instances: RwLock<HashMap<TypeId, Erased>>,
    factories: RwLock<HashMap<TypeId, Arc<ClientFactory>>>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut definitions: Vec<String> = self.definitions.read().keys().cloned().collect();
        definitions.sort();
        f.debug_struct("Container")
            .field("definitions", &definitions)
            .field("instances", &self.instances.read().len())
            .field("factories", &self.factories.read().len())
            .finish()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new(Environment::new())
    }
}

impl Container {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            definitions: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
            factories: RwLock::new(HashMap::new()),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn resolve_placeholders(&self, text: &str) -> String {
        self.environment.resolve_placeholders(text)
    }

    /// Register `value` under `name`, replacing any previous definition.
    pub fn register_definition<T>(&self, name: impl Into<String>, value: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(definition = %name, ty = type_name::<T>(), "definition registered");
        self.definitions.write().insert(name, value);
    }

    /// The definition registered under `name`, if it has type `T`.
    pub fn definition<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let erased = self.definitions.read().get(name).cloned()?;
        erased.downcast::<T>().ok()
    }

    /// Register a shared instance under its type. `T` may be a trait object.
    pub fn register<T>(&self, value: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instances
            .write()
            .insert(TypeId::of::<T>(), Box::new(value));
    }

    /// The instance registered under `T`. Never builds anything.
    pub fn lookup<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instances
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|erased| erased.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Bind one client factory per record. Returns how many were bound.
    pub fn install<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = RegistrationRecord>,
    {
        records
            .into_iter()
            .map(|record| self.bind(ClientFactory::from_record(record)))
            .filter(|bound| *bound)
            .count()
    }

    /// Bind a factory to its interface. A second binding for the same interface is skipped.
    pub fn bind(&self, factory: ClientFactory) -> bool {
        let mut factories = self.factories.write();
        match factories.entry(factory.interface_id()) {
            Entry::Occupied(existing) => {
                tracing::warn!(
                    api = factory.name(),
                    bound = existing.get().qualified_name(),
                    skipped = factory.qualified_name(),
                    "api client is already bound, skipping duplicate registration"
                );
                false
            }
            Entry::Vacant(slot) => {
                tracing::debug!(api = factory.name(), "api client factory bound");
                slot.insert(Arc::new(factory));
                true
            }
        }
    }

    pub fn is_bound<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.factories.read().contains_key(&TypeId::of::<T>())
    }

    /// The client for `T` (usually `dyn Api`), built on first use.
    ///
    /// Registered instances win over factories. Singleton factories build once;
    /// concurrent first lookups may both build, but all callers observe the same cached
    /// instance afterwards.
    pub fn get<T>(&self) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if let Some(found) = self.lookup::<T>() {
            return Ok(found);
        }

        let factory = self.factory_for::<T>()?;
        let client = downcast::<T>(factory.build(self)?, factory.name())?;
        if !factory.is_singleton() {
            return Ok(client);
        }

        let mut instances = self.instances.write();
        let cached = instances
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(client));
        cached
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(ContainerError::TypeMismatch {
                api: factory.name(),
            })
    }

    /// Build a new client for `T`, bypassing any cache.
    pub fn build_fresh<T>(&self) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let factory = self.factory_for::<T>()?;
        downcast::<T>(factory.build(self)?, factory.name())
    }

    fn factory_for<T>(&self) -> Result<Arc<ClientFactory>, ContainerError>
    where
        T: ?Sized + 'static,
    {
        self.factories
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or(ContainerError::NotRegistered {
                type_name: type_name::<T>(),
            })
    }
}

impl DefinitionRegistry for Container {
    fn has_definition(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }
}

fn downcast<T>(boxed: BoxedClient, api: &'static str) -> Result<Arc<T>, ContainerError>
where
    T: ?Sized + Send + Sync + 'static,
{
    boxed
        .downcast::<Arc<T>>()
        .map(|client| *client)
        .map_err(|_| ContainerError::TypeMismatch { api })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ClientManager, DEFAULT_MANAGER_DEF};
    use crate::test_support::{sample_factory, Sample};

    fn container() -> Container {
        let container = Container::new(Environment::isolated(HashMap::new()));
        container.register_definition(DEFAULT_MANAGER_DEF, Arc::new(ClientManager::new()));
        container
    }

    #[test]
    fn definitions_are_typed_and_named() {
        let container = container();

        assert!(container.has_definition(DEFAULT_MANAGER_DEF));
        assert!(container.definition::<ClientManager>(DEFAULT_MANAGER_DEF).is_some());
        assert!(container.definition::<String>(DEFAULT_MANAGER_DEF).is_none());
        assert!(!container.has_definition("other"));
    }

    #[test]
    fn lookup_supports_trait_objects() {
        trait Greeter: Send + Sync {
            fn hello(&self) -> &'static str;
        }
        struct En;
        impl Greeter for En {
            fn hello(&self) -> &'static str {
                "hello"
            }
        }

        let container = container();
        assert!(container.lookup::<dyn Greeter>().is_none());

        container.register::<dyn Greeter>(Arc::new(En));
        assert_eq!(container.lookup::<dyn Greeter>().map(|g| g.hello()), Some("hello"));
    }

    #[test]
    fn get_caches_singletons() {
        let container = container();
        assert!(container.bind(sample_factory("http://svc")));

        let first = container.get::<dyn Sample>().unwrap();
        let second = container.get::<dyn Sample>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let fresh = container.build_fresh::<dyn Sample>().unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
    }

    #[test]
    fn duplicate_bindings_are_skipped() {
        let container = container();

        assert!(container.bind(sample_factory("http://first")));
        assert!(!container.bind(sample_factory("http://second")));

        let sample = container.get::<dyn Sample>().unwrap();
        assert_eq!(sample.client().base_url(), "http://first");
    }

    #[test]
    fn unbound_interfaces_are_not_registered() {
        let err = container().get::<dyn Sample>().err();
        assert!(matches!(err, Some(ContainerError::NotRegistered { .. })));
    }
}
