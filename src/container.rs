use alloc::{sync::Arc, sync::Weak, vec::Vec};
use core::{
    any::type_name,
    fmt::{self, Debug, Formatter},
};
use parking_lot::RwLock;
use tracing::{debug, error, info_span};

use crate::{
    any::{TypeKey, Value},
    builder::ActivationExpressionBuilder,
    cache::ScopedCache,
    compiler::{ActivationDelegate, DelegateCache},
    config::Config,
    context::InjectionContext,
    disposal::DisposalScope,
    errors::{ConfigErrorKind, ResolveErrorKind},
    expression::{ActivationExpressionResult, Expression},
    key::Key,
    registry::{Registry, RegistryBuilder},
    request::ActivationRequest,
    scope::ScopeData,
    wrappers::Enumerable,
};

/// State shared by every scope of a container
pub(crate) struct ContainerCore {
    registry: RwLock<Registry>,
    config: Config,
    delegates: DelegateCache,
}

/// Handle to a lifetime scope.
///
/// Cloning the handle is cheap. The scope is disposed when [`Container::dispose`] is called
/// or when the last handle is dropped.
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    /// Creates a root container with the default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::from_core(ContainerCore {
            registry: RwLock::new(Registry::new()),
            config: Config::default(),
            delegates: DelegateCache::new(),
        })
    }

    /// Creates a root container with `config`
    ///
    /// # Errors
    /// Returns [`ConfigErrorKind`] if the configuration is invalid
    pub fn with_config(config: Config) -> Result<Self, ConfigErrorKind> {
        if let Err(err) = config.validate() {
            error!("{}", err);
            return Err(err);
        }
        Ok(Self::from_core(ContainerCore {
            registry: RwLock::new(Registry::new()),
            config,
            delegates: DelegateCache::new(),
        }))
    }

    fn from_core(core: ContainerCore) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                core: Arc::new(core),
                scope_data: ScopeData::new(None),
                parent: None,
                scoped: ScopedCache::new(),
                disposal: DisposalScope::new(),
            }),
        }
    }

    /// Adds registrations. Every registration is validated before any of them is applied.
    ///
    /// Compiled delegates are dropped, so later locates see the new registrations.
    ///
    /// # Errors
    /// Returns [`ConfigErrorKind`] if a registration is invalid
    pub fn configure(&self, configure: impl FnOnce(&mut RegistryBuilder)) -> Result<(), ConfigErrorKind> {
        let mut builder = RegistryBuilder::new();
        configure(&mut builder);

        let core = &self.inner.core;
        let mut registry = core.registry.write();
        if let Err(err) = builder.apply(&mut registry) {
            error!("{}", err);
            return Err(err);
        }
        core.delegates.clear();
        debug!(registered = registry.len(), "Configured");
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.core.config
    }

    /// Creates a child scope sharing registrations and singletons with this one
    #[must_use]
    pub fn begin_lifetime_scope(&self, name: Option<&str>) -> Container {
        let scope_data = ScopeData::new(name.map(Arc::from));
        debug!(id = scope_data.id, name = ?scope_data.name(), parent = self.inner.scope_data.id, "Lifetime scope created");

        Container {
            inner: Arc::new(ContainerInner {
                core: self.inner.core.clone(),
                scope_data,
                parent: Some(self.clone()),
                scoped: ScopedCache::new(),
                disposal: DisposalScope::new(),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.scope_data.name()
    }

    #[inline]
    #[must_use]
    pub fn scope_data(&self) -> &ScopeData {
        &self.inner.scope_data
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    #[must_use]
    pub fn root(&self) -> Container {
        let mut scope = self;
        while let Some(parent) = scope.parent() {
            scope = parent;
        }
        scope.clone()
    }

    /// Nearest scope named `name`, starting with this one
    #[must_use]
    pub fn find_named_scope(&self, name: &str) -> Option<Container> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if current.inner.scope_data.is_named(name) {
                return Some(current.clone());
            }
            scope = current.parent();
        }
        None
    }

    /// Locates a value of `type_key`, exported with `key` if it's set
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::ScopeDisposed`] if the scope is disposed
    /// - Returns [`ResolveErrorKind::Unresolvable`] if nothing can produce the value
    /// - Returns [`ResolveErrorKind::GraphDepthExceeded`] if the object graph is too deep, usually because of a cycle
    /// - Returns any other error raised while building or running the plan
    #[inline]
    pub fn locate(&self, type_key: &TypeKey, key: Option<Key>) -> Result<Value, ResolveErrorKind> {
        self.locate_with_context(type_key, key, InjectionContext::new())
    }

    /// Locates a value, making the extra data of `context` available to the object graph
    ///
    /// # Errors
    /// Returns the same errors as [`Container::locate`]
    pub fn locate_with_context(&self, type_key: &TypeKey, key: Option<Key>, context: InjectionContext) -> Result<Value, ResolveErrorKind> {
        let span = info_span!("locate", type_key = %type_key, key = ?key, scope = ?self.name());
        let _guard = span.enter();

        if self.is_disposed() {
            let err = ResolveErrorKind::ScopeDisposed;
            error!("{}", err);
            return Err(err);
        }

        let delegate = self.activation_delegate(type_key, key.as_ref())?;
        match delegate(self, &self.inner.disposal, &context) {
            Ok(value) => Ok(value),
            Err(err) => {
                error!("{}", err);
                Err(err)
            }
        }
    }

    /// Locates a value and downcasts it to `T`
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::IncorrectType`] if the value isn't a `T`
    /// - Returns the same errors as [`Container::locate`]
    pub fn locate_as<T: Send + Sync + 'static>(&self, type_key: &TypeKey, key: Option<Key>) -> Result<Arc<T>, ResolveErrorKind> {
        self.locate(type_key, key)?.downcast().map_err(|_| {
            let err = ResolveErrorKind::IncorrectType {
                type_key: type_key.clone(),
                expected: type_name::<T>(),
            };
            error!("{}", err);
            err
        })
    }

    /// Locates an unkeyed `T` by its own type
    ///
    /// # Errors
    /// Returns the same errors as [`Container::locate_as`]
    #[inline]
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.locate_as(&TypeKey::of::<T>(), None)
    }

    /// Locates a `T` exported with `key` by its own type
    ///
    /// # Errors
    /// Returns the same errors as [`Container::locate_as`]
    #[inline]
    pub fn get_keyed<T: Send + Sync + 'static>(&self, key: impl Into<Key>) -> Result<Arc<T>, ResolveErrorKind> {
        self.locate_as(&TypeKey::of::<T>(), Some(key.into()))
    }

    /// Locates a value, `None` if nothing can produce it
    ///
    /// # Errors
    /// Returns errors raised while building or running the plan of a locatable value
    pub fn try_locate(&self, type_key: &TypeKey, key: Option<Key>) -> Result<Option<Value>, ResolveErrorKind> {
        if !self.can_locate(type_key, key.as_ref()) {
            debug!(type_key = %type_key, ?key, "Can't locate");
            return Ok(None);
        }
        self.locate(type_key, key).map(Some)
    }

    /// Locates every export of `type_key` in registration order.
    /// [`Key::Many`] aggregates the exports of several keys.
    ///
    /// # Errors
    /// Returns the same errors as [`Container::locate`]
    pub fn locate_all(&self, type_key: &TypeKey, key: Option<Key>) -> Result<Vec<Value>, ResolveErrorKind> {
        let span = info_span!("locate_all", type_key = %type_key, key = ?key, scope = ?self.name());
        let _guard = span.enter();

        if self.is_disposed() {
            let err = ResolveErrorKind::ScopeDisposed;
            error!("{}", err);
            return Err(err);
        }

        let core = &self.inner.core;
        let delegate = {
            let registry = core.registry.read();
            let builder = ActivationExpressionBuilder::new(&registry, &core.config);
            let request = ActivationRequest::root(TypeKey::enumerable(type_key.clone()), key);
            let items = builder.enumerable_items(&request, type_key).inspect_err(|err| error!("{}", err))?;
            builder.compile(&ActivationExpressionResult::compose(items, |items| Expression::Enumerable {
                element_type: type_key.clone(),
                items,
                creator: None,
            }))
        };

        let value = delegate(self, &self.inner.disposal, &InjectionContext::new()).inspect_err(|err| error!("{}", err))?;
        match value.downcast::<Enumerable>() {
            Ok(enumerable) => Ok(enumerable.items().to_vec()),
            Err(_) => Err(ResolveErrorKind::IncorrectType {
                type_key: TypeKey::enumerable(type_key.clone()),
                expected: type_name::<Enumerable>(),
            }),
        }
    }

    /// Checks whether a value of `type_key` can be located, without activating anything
    #[must_use]
    pub fn can_locate(&self, type_key: &TypeKey, key: Option<&Key>) -> bool {
        let core = &self.inner.core;
        if core.delegates.get(type_key, key).is_some() {
            return true;
        }
        let registry = core.registry.read();
        ActivationExpressionBuilder::new(&registry, &core.config).can_locate(&ActivationRequest::root(type_key.clone(), key.cloned()))
    }

    /// Finalizes the instances tracked by this scope in reverse order and drops its scoped instances.
    /// Child scopes aren't disposed. Further locates in this scope fail with [`ResolveErrorKind::ScopeDisposed`].
    #[inline]
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposal.is_disposed()
    }

    #[inline]
    #[must_use]
    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn scoped_cache(&self) -> &ScopedCache {
        &self.inner.scoped
    }

    #[inline]
    #[must_use]
    pub(crate) fn disposal_scope(&self) -> &DisposalScope {
        &self.inner.disposal
    }

    /// Compiled delegate for the request, built and cached on first use
    pub(crate) fn activation_delegate(&self, type_key: &TypeKey, key: Option<&Key>) -> Result<ActivationDelegate, ResolveErrorKind> {
        let core = &self.inner.core;
        if let Some(delegate) = core.delegates.get(type_key, key) {
            debug!("Found compiled delegate");
            return Ok(delegate);
        }
        debug!("Compiled delegate not found");

        let (result, delegate) = {
            let registry = core.registry.read();
            let builder = ActivationExpressionBuilder::new(&registry, &core.config);
            let request = ActivationRequest::root(type_key.clone(), key.cloned());
            let result = match builder.get_activation_expression(&request) {
                Ok(result) => result,
                Err(err) => {
                    error!("{}", err);
                    return Err(err);
                }
            };
            let delegate = builder.compile(&result);
            (result, delegate)
        };

        if !result.reusable {
            debug!("Compiled delegate isn't reusable");
            return Ok(delegate);
        }
        debug!("Compiled delegate cached");
        Ok(core.delegates.insert(type_key.clone(), key.cloned(), delegate))
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("scope_data", &self.inner.scope_data)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

pub(crate) struct ContainerInner {
    core: Arc<ContainerCore>,
    scope_data: ScopeData,
    parent: Option<Container>,
    scoped: ScopedCache,
    disposal: DisposalScope,
}

impl ContainerInner {
    fn dispose(&self) {
        self.disposal.dispose();
        self.scoped.clear();
        debug!(id = self.scope_data.id, name = ?self.scope_data.name(), "Scope disposed");
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        self.dispose();
        debug!("Scope disposed on drop");
    }
}

/// Handle to a scope that doesn't keep it alive
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<ContainerInner>,
}

impl WeakContainer {
    #[inline]
    #[must_use]
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }

    /// # Errors
    /// - Returns [`ResolveErrorKind::ScopeDisposed`] if the scope is dropped
    /// - Returns the same errors as [`Container::locate`]
    pub fn locate(&self, type_key: &TypeKey, key: Option<Key>) -> Result<Value, ResolveErrorKind> {
        self.upgrade().ok_or(ResolveErrorKind::ScopeDisposed)?.locate(type_key, key)
    }

    /// # Errors
    /// - Returns [`ResolveErrorKind::ScopeDisposed`] if the scope is dropped
    /// - Returns the same errors as [`Container::locate_as`]
    pub fn locate_as<T: Send + Sync + 'static>(&self, type_key: &TypeKey, key: Option<Key>) -> Result<Arc<T>, ResolveErrorKind> {
        self.upgrade().ok_or(ResolveErrorKind::ScopeDisposed)?.locate_as(type_key, key)
    }
}

impl Debug for WeakContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakContainer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::Container;
    use crate::{
        any::TypeKey,
        config::Config,
        descriptor::TypeDescriptor,
        errors::{InstantiateErrorKind, ResolveErrorKind},
        inject::Inject,
    };

    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing_test::traced_test;

    struct Basic;
    struct Dependent(Arc<Basic>);

    #[test]
    #[traced_test]
    fn test_locate_and_delegate_cache() {
        let container = Container::new();
        container
            .configure(|registry| {
                registry.export(TypeDescriptor::of::<Basic>().with_instantiator(|| Ok::<_, InstantiateErrorKind>(Basic)));
                registry.export(
                    TypeDescriptor::of::<Dependent>()
                        .with_instantiator(|Inject(basic): Inject<Basic>| Ok::<_, InstantiateErrorKind>(Dependent(basic))),
                );
            })
            .unwrap();

        let first = container.get::<Dependent>().unwrap();
        let second = container.get::<Dependent>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first.0, &second.0));
        assert_eq!(container.inner.core.delegates.len(), 1);
        assert!(logs_contain("Found compiled delegate"));

        container.configure(|_| {}).unwrap();
        assert_eq!(container.inner.core.delegates.len(), 0);
    }

    #[test]
    #[traced_test]
    fn test_unresolvable() {
        let container = Container::new();
        assert!(matches!(
            container.locate(&TypeKey::named("IMissing"), None),
            Err(ResolveErrorKind::Unresolvable { .. })
        ));
        assert!(!container.can_locate(&TypeKey::named("IMissing"), None));
        assert!(container.try_locate(&TypeKey::named("IMissing"), None).unwrap().is_none());
    }

    #[test]
    #[traced_test]
    fn test_scope_tree() {
        let root = Container::new();
        let request = root.begin_lifetime_scope(Some("request"));
        let nested = request.begin_lifetime_scope(None);

        assert_eq!(nested.name(), None);
        assert_eq!(request.name(), Some("request"));
        assert!(Arc::ptr_eq(&nested.root().inner, &root.inner));
        assert!(Arc::ptr_eq(&nested.find_named_scope("request").unwrap().inner, &request.inner));
        assert!(nested.find_named_scope("other").is_none());
        assert!(Arc::ptr_eq(&nested.inner.core, &root.inner.core));
    }

    #[test]
    #[traced_test]
    fn test_dispose_on_drop() {
        static FINALIZED: AtomicU8 = AtomicU8::new(0);

        let root = Container::new();
        root.configure(|registry| {
            registry
                .export(TypeDescriptor::of::<Basic>().with_instantiator(|| Ok::<_, InstantiateErrorKind>(Basic)))
                .with_finalizer(|_: Arc<Basic>| {
                    FINALIZED.fetch_add(1, Ordering::SeqCst);
                })
                .scoped();
        })
        .unwrap();

        let scope = root.begin_lifetime_scope(None);
        let weak = scope.downgrade();
        let first = scope.get::<Basic>().unwrap();
        assert!(Arc::ptr_eq(&first, &scope.get::<Basic>().unwrap()));
        assert!(weak.upgrade().is_some());

        drop(scope);
        assert_eq!(FINALIZED.load(Ordering::SeqCst), 1);
        assert!(weak.upgrade().is_none());
        assert!(matches!(weak.locate(&TypeKey::of::<Basic>(), None), Err(ResolveErrorKind::ScopeDisposed)));
        assert!(logs_contain("Scope disposed on drop"));
    }

    #[test]
    #[traced_test]
    fn test_disposed_scope_refuses_locate() {
        let root = Container::new();
        root.configure(|registry| {
            registry.export_value(1_i32);
        })
        .unwrap();

        assert_eq!(*root.get::<i32>().unwrap(), 1);
        root.dispose();
        assert!(root.is_disposed());
        assert!(matches!(root.get::<i32>(), Err(ResolveErrorKind::ScopeDisposed)));
    }

    #[test]
    fn test_invalid_config() {
        assert!(Container::with_config(Config::default().with_max_object_graph_depth(0)).is_err());
    }
}
