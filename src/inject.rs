use alloc::sync::Arc;
use core::{any::type_name, marker::PhantomData};

use crate::{
    any::{is_absent, TypeKey},
    container::WeakContainer,
    context::InjectionContext,
    dependency_resolver::{positional_name, DependencyResolver},
    descriptor::{Arguments, Parameter},
    errors::InstantiateErrorKind,
    wrappers::{Enumerable, Func, Lazy},
};

pub struct Inject<Dep>(pub Arc<Dep>);

impl<Dep: Send + Sync + 'static> DependencyResolver for Inject<Dep> {
    fn parameter(index: usize) -> Parameter {
        Parameter::new(positional_name(index), TypeKey::of::<Dep>())
    }

    fn resolve(arguments: &Arguments, index: usize) -> Result<Self, InstantiateErrorKind> {
        arguments.get(index).map(Self)
    }
}

/// Optional dependency: `None` when nothing could be located
impl<Dep: Send + Sync + 'static> DependencyResolver for Option<Inject<Dep>> {
    fn parameter(index: usize) -> Parameter {
        Inject::<Dep>::parameter(index).optional()
    }

    fn resolve(arguments: &Arguments, index: usize) -> Result<Self, InstantiateErrorKind> {
        match arguments.value(index) {
            Some(value) if is_absent(value) => Ok(None),
            _ => Inject::resolve(arguments, index).map(Some),
        }
    }
}

pub struct InjectLazy<Dep>(pub Arc<Lazy>, PhantomData<fn() -> Dep>);

impl<Dep> InjectLazy<Dep> {
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Arc<Lazy> {
        self.0
    }
}

impl<Dep: Send + Sync + 'static> DependencyResolver for InjectLazy<Dep> {
    fn parameter(index: usize) -> Parameter {
        Parameter::new(positional_name(index), TypeKey::lazy(TypeKey::of::<Dep>()))
    }

    fn resolve(arguments: &Arguments, index: usize) -> Result<Self, InstantiateErrorKind> {
        arguments.get(index).map(|lazy| Self(lazy, PhantomData))
    }
}

/// Factory creating a new `Dep` on each invocation
pub struct InjectFunc<Dep>(pub Arc<Func>, PhantomData<fn() -> Dep>);

impl<Dep> InjectFunc<Dep> {
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Arc<Func> {
        self.0
    }
}

impl<Dep: Send + Sync + 'static> DependencyResolver for InjectFunc<Dep> {
    fn parameter(index: usize) -> Parameter {
        Parameter::new(positional_name(index), TypeKey::func([], TypeKey::of::<Dep>()))
    }

    fn resolve(arguments: &Arguments, index: usize) -> Result<Self, InstantiateErrorKind> {
        arguments.get(index).map(|func| Self(func, PhantomData))
    }
}

/// All exports of `Dep` in registration order
pub struct InjectAll<Dep>(pub Arc<Enumerable>, PhantomData<fn() -> Dep>);

impl<Dep: Send + Sync + 'static> InjectAll<Dep> {
    /// Instances downcast to `Dep`
    ///
    /// # Errors
    /// Returns [`InstantiateErrorKind::ArgumentType`] if an instance isn't a `Dep`
    pub fn instances(&self) -> Result<alloc::vec::Vec<Arc<Dep>>, InstantiateErrorKind> {
        self.0
            .iter()
            .enumerate()
            .map(|(index, value)| {
                value.clone().downcast().map_err(|_| InstantiateErrorKind::ArgumentType {
                    index,
                    expected: type_name::<Dep>(),
                })
            })
            .collect()
    }
}

impl<Dep: Send + Sync + 'static> DependencyResolver for InjectAll<Dep> {
    fn parameter(index: usize) -> Parameter {
        Parameter::new(positional_name(index), TypeKey::enumerable(TypeKey::of::<Dep>()))
    }

    fn resolve(arguments: &Arguments, index: usize) -> Result<Self, InstantiateErrorKind> {
        arguments.get(index).map(|enumerable| Self(enumerable, PhantomData))
    }
}

/// The scope that is locating the object graph
pub struct InjectScope(pub WeakContainer);

impl DependencyResolver for InjectScope {
    fn parameter(index: usize) -> Parameter {
        Parameter::new(positional_name(index), TypeKey::locator_scope())
    }

    fn resolve(arguments: &Arguments, index: usize) -> Result<Self, InstantiateErrorKind> {
        arguments.get::<WeakContainer>(index).map(|scope| Self((*scope).clone()))
    }
}

pub struct InjectContext(pub Arc<InjectionContext>);

impl DependencyResolver for InjectContext {
    fn parameter(index: usize) -> Parameter {
        Parameter::new(positional_name(index), TypeKey::injection_context())
    }

    fn resolve(arguments: &Arguments, index: usize) -> Result<Self, InstantiateErrorKind> {
        arguments.get(index).map(Self)
    }
}
