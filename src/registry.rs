use alloc::{boxed::Box, collections::BTreeMap, sync::Arc, vec::Vec};
use tracing::debug;

use crate::{
    any::{GenericDefinition, TypeKey, Value},
    container::Container,
    context::InjectionContext,
    descriptor::TypeDescriptor,
    errors::{ConfigErrorKind, InstantiateErrorKind},
    finalizer::{boxed_finalizer_factory, Finalizer},
    key::Key,
    lifestyle::{Lifestyle, Scoped, Singleton, SingletonPerNamedScope},
    strategy::{Activation, ExportCondition, ExportStrategy, ParameterBinding, WhenInjectedInto},
    wrappers::{default_wrappers, WrapperStrategy},
};

struct Registered<T> {
    unkeyed: Vec<T>,
    keyed: BTreeMap<Key, Vec<T>>,
}

impl<T> Default for Registered<T> {
    fn default() -> Self {
        Self {
            unkeyed: Vec::new(),
            keyed: BTreeMap::new(),
        }
    }
}

impl<T> Registered<T> {
    fn push(&mut self, key: Option<Key>, value: T) {
        match key {
            Some(key) => self.keyed.entry(key).or_default().push(value),
            None => self.unkeyed.push(value),
        }
    }

    fn get(&self, key: Option<&Key>) -> &[T] {
        match key {
            Some(key) => self.keyed.get(key).map_or(&[] as &[T], Vec::as_slice),
            None => &self.unkeyed,
        }
    }
}

struct OpenExport {
    pattern: TypeKey,
    strategy: Arc<ExportStrategy>,
}

/// Export matching a request
#[derive(Clone, Debug)]
pub(crate) struct Candidate {
    pub(crate) strategy: Arc<ExportStrategy>,
    /// Registered for the requested type itself rather than closed from an open generic
    pub(crate) exact: bool,
}

/// Registered exports, known types and wrappers of a container
pub struct Registry {
    exports: BTreeMap<TypeKey, Registered<Arc<ExportStrategy>>>,
    open_exports: BTreeMap<GenericDefinition, Registered<OpenExport>>,
    known_types: BTreeMap<TypeKey, TypeDescriptor>,
    open_known_types: BTreeMap<GenericDefinition, TypeDescriptor>,
    wrappers: Vec<Arc<dyn WrapperStrategy>>,
    next_id: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            exports: BTreeMap::new(),
            open_exports: BTreeMap::new(),
            known_types: BTreeMap::new(),
            open_known_types: BTreeMap::new(),
            wrappers: default_wrappers(),
            next_id: 1,
        }
    }
}

impl Registry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, mut strategy: ExportStrategy) -> Arc<ExportStrategy> {
        strategy.id = self.next_id;
        self.next_id += 1;

        if let Activation::Type(descriptor) = &strategy.activation {
            self.add_known_type(descriptor.clone());
        }

        let strategy = Arc::new(strategy);
        let exports = strategy
            .exports()
            .into_iter()
            .map(|type_key| (type_key, None))
            .chain(
                strategy
                    .keyed_exports()
                    .iter()
                    .map(|(type_key, key)| (type_key.clone(), Some(key.clone()))),
            );

        for (type_key, key) in exports {
            debug!(export = %type_key, ?key, activation = %strategy.activation_type, "Registered export");
            if type_key.is_open() {
                self.open_exports.entry(type_key.definition()).or_default().push(
                    key,
                    OpenExport {
                        pattern: type_key,
                        strategy: strategy.clone(),
                    },
                );
            } else {
                self.exports.entry(type_key).or_default().push(key, strategy.clone());
            }
        }
        strategy
    }

    pub(crate) fn add_known_type(&mut self, descriptor: TypeDescriptor) {
        if descriptor.is_open_generic() {
            self.open_known_types.insert(descriptor.type_key().definition(), descriptor);
        } else {
            self.known_types.insert(descriptor.type_key().clone(), descriptor);
        }
    }

    pub(crate) fn add_wrapper(&mut self, wrapper: Arc<dyn WrapperStrategy>) {
        self.wrappers.push(wrapper);
    }

    /// Exports registered for `type_key` and a single `key`, in registration order.
    /// Exports closed from open generics follow the exact ones.
    pub(crate) fn candidates(&self, type_key: &TypeKey, key: Option<&Key>) -> Vec<Candidate> {
        let mut candidates: Vec<_> = self
            .exports
            .get(type_key)
            .map(|registered| registered.get(key))
            .unwrap_or_default()
            .iter()
            .map(|strategy| Candidate {
                strategy: strategy.clone(),
                exact: true,
            })
            .collect();

        if type_key.is_generic() {
            if let Some(registered) = self.open_exports.get(&type_key.definition()) {
                candidates.extend(registered.get(key).iter().filter_map(|open| {
                    open.strategy.close_for(&open.pattern, type_key).map(|strategy| Candidate {
                        strategy,
                        exact: false,
                    })
                }));
            }
        }
        candidates
    }

    /// Exports for every single key `key` stands for, in registration order and without duplicates
    pub(crate) fn candidates_for_all(&self, type_key: &TypeKey, key: Option<&Key>) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = match key {
            Some(key) => key
                .flatten()
                .into_iter()
                .flat_map(|key| self.candidates(type_key, Some(key)))
                .collect(),
            None => self.candidates(type_key, None),
        };
        candidates.sort_by_key(|candidate| candidate.strategy.id());
        candidates.dedup_by_key(|candidate| candidate.strategy.id());
        candidates
    }

    #[must_use]
    pub(crate) fn known_type(&self, type_key: &TypeKey) -> Option<TypeDescriptor> {
        if let Some(descriptor) = self.known_types.get(type_key) {
            return Some(descriptor.clone());
        }
        if !type_key.is_generic() || type_key.is_open() {
            return None;
        }
        self.open_known_types
            .get(&type_key.definition())
            .map(|descriptor| descriptor.close(type_key.args()))
    }

    #[inline]
    #[must_use]
    pub(crate) fn wrappers(&self) -> &[Arc<dyn WrapperStrategy>] {
        &self.wrappers
    }

    /// Checks whether an export is registered for `type_key` and `key`, including open generics
    #[must_use]
    pub fn contains(&self, type_key: &TypeKey, key: Option<&Key>) -> bool {
        !self.candidates(type_key, key).is_empty()
    }

    /// Count of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from(self.next_id - 1).unwrap_or(usize::MAX)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collects registrations made in [`Container::configure`]
#[derive(Default)]
pub struct RegistryBuilder {
    strategies: Vec<ExportStrategy>,
    known_types: Vec<TypeDescriptor>,
    wrappers: Vec<Arc<dyn WrapperStrategy>>,
}

impl RegistryBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, strategy: ExportStrategy) -> ExportBuilder<'_> {
        self.strategies.push(strategy);
        let index = self.strategies.len() - 1;
        ExportBuilder {
            strategy: &mut self.strategies[index],
        }
    }

    /// Exports a type activated through one of its constructors.
    /// It's exported as itself unless [`ExportBuilder::as_type`] or [`ExportBuilder::as_keyed`] is used.
    pub fn export(&mut self, descriptor: TypeDescriptor) -> ExportBuilder<'_> {
        self.push(ExportStrategy::new(descriptor.type_key().clone(), Activation::Type(descriptor)))
    }

    /// Exports an open generic type, closed for each requested set of generic arguments.
    /// Export types must use the placeholders of the activation type.
    pub fn export_open_generic(&mut self, descriptor: TypeDescriptor) -> ExportBuilder<'_> {
        self.export(descriptor)
    }

    /// Exports an instance created outside the container
    pub fn export_instance(&mut self, type_key: TypeKey, instance: Value) -> ExportBuilder<'_> {
        self.push(ExportStrategy::new(type_key, Activation::Instance(instance)))
    }

    /// Exports an instance of `T`
    pub fn export_value<T: Send + Sync + 'static>(&mut self, instance: T) -> ExportBuilder<'_> {
        self.export_instance(TypeKey::of::<T>(), Arc::new(instance))
    }

    /// Exports instances created by a factory receiving the locating scope.
    /// Returning `None` is an error unless null instances are allowed by [`crate::Config`].
    pub fn export_factory<F, E>(&mut self, type_key: TypeKey, factory: F) -> ExportBuilder<'_>
    where
        F: Fn(&Container, &InjectionContext) -> Result<Option<Value>, E> + Send + Sync + 'static,
        E: Into<InstantiateErrorKind>,
    {
        let factory = Arc::new(move |scope: &Container, context: &InjectionContext| factory(scope, context).map_err(Into::into));
        self.push(ExportStrategy::new(type_key, Activation::Factory(factory)))
    }

    /// Adds a type that may be activated without an export
    pub fn add_known_type(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.known_types.push(descriptor);
        self
    }

    /// Adds a wrapper tried after the built-in ones
    pub fn add_wrapper(&mut self, wrapper: impl WrapperStrategy + 'static) -> &mut Self {
        self.wrappers.push(Arc::new(wrapper));
        self
    }

    /// Validates every registration, then applies all of them
    pub(crate) fn apply(self, registry: &mut Registry) -> Result<(), ConfigErrorKind> {
        for strategy in &self.strategies {
            strategy.validate()?;
        }

        for descriptor in self.known_types {
            registry.add_known_type(descriptor);
        }
        for wrapper in self.wrappers {
            registry.add_wrapper(wrapper);
        }
        for strategy in self.strategies {
            registry.register(strategy);
        }
        Ok(())
    }
}

pub struct ExportBuilder<'a> {
    strategy: &'a mut ExportStrategy,
}

impl ExportBuilder<'_> {
    #[inline]
    pub fn as_type(self, type_key: TypeKey) -> Self {
        self.strategy.exports.push(type_key);
        self
    }

    #[inline]
    pub fn as_keyed(self, type_key: TypeKey, key: impl Into<Key>) -> Self {
        self.strategy.keyed_exports.push((type_key, key.into()));
        self
    }

    #[inline]
    pub fn lifestyle(self, lifestyle: impl Lifestyle + 'static) -> Self {
        self.strategy.lifestyle = Some(Box::new(lifestyle));
        self
    }

    #[inline]
    pub fn singleton(self) -> Self {
        self.lifestyle(Singleton::new())
    }

    #[inline]
    pub fn scoped(self) -> Self {
        self.lifestyle(Scoped::new())
    }

    #[inline]
    pub fn singleton_per_named_scope(self, name: &str) -> Self {
        self.lifestyle(SingletonPerNamedScope::new(name))
    }

    /// Instances aren't finalized by the container
    #[inline]
    pub fn externally_owned(self) -> Self {
        self.strategy.externally_owned = true;
        self
    }

    /// Higher priority wins over registration order
    #[inline]
    pub fn with_priority(self, priority: i32) -> Self {
        self.strategy.priority = priority;
        self
    }

    #[inline]
    pub fn when(self, condition: impl ExportCondition + 'static) -> Self {
        self.strategy.conditions.push(Arc::new(condition));
        self
    }

    #[inline]
    pub fn when_injected_into(self, type_key: TypeKey) -> Self {
        self.when(WhenInjectedInto(type_key))
    }

    #[inline]
    pub fn with_ctor_param(self, binding: ParameterBinding) -> Self {
        self.strategy.bindings.push(binding);
        self
    }

    /// Sets finalizer, replacing the one of the type descriptor
    #[inline]
    pub fn with_finalizer<Dep, Fin>(self, finalizer: Fin) -> Self
    where
        Dep: Send + Sync + 'static,
        Fin: Finalizer<Dep>,
    {
        self.strategy.finalizer = Some(boxed_finalizer_factory(finalizer));
        self
    }
}
