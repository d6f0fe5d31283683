use alloc::{boxed::Box, sync::Arc};
use core::sync::atomic::{AtomicU64, Ordering};

use crate::{
    cache::{InstanceCell, SlotId},
    expression::{ActivationExpressionResult, CacheLocation, Expression},
    request::ActivationRequest,
};

static NEXT_SLOT: AtomicU64 = AtomicU64::new(1);

#[inline]
fn next_slot() -> SlotId {
    NEXT_SLOT.fetch_add(1, Ordering::Relaxed)
}

/// Controls how many instances an export creates and where they are kept
pub trait Lifestyle: Send + Sync {
    /// Instances are created against the root scope, whatever scope locates them
    fn root_request(&self) -> bool;

    /// Fresh lifestyle of the same kind with its own storage, used when closing open generic exports
    fn clone_lifestyle(&self) -> Box<dyn Lifestyle>;

    fn provide_lifestyle_expression(
        &self,
        request: &ActivationRequest<'_>,
        activation: ActivationExpressionResult,
    ) -> ActivationExpressionResult;
}

/// One instance for the container, disposed with the root scope
#[derive(Default)]
pub struct Singleton {
    cell: Arc<InstanceCell>,
}

impl Singleton {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lifestyle for Singleton {
    fn root_request(&self) -> bool {
        true
    }

    fn clone_lifestyle(&self) -> Box<dyn Lifestyle> {
        Box::new(Singleton::new())
    }

    fn provide_lifestyle_expression(
        &self,
        _request: &ActivationRequest<'_>,
        activation: ActivationExpressionResult,
    ) -> ActivationExpressionResult {
        let cache = CacheLocation::root(self.cell.clone());
        activation.map(|inner| Expression::Cached {
            cache,
            inner: Box::new(inner),
        })
    }
}

/// One instance per lifetime scope that locates it
pub struct Scoped {
    slot: SlotId,
}

impl Scoped {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { slot: next_slot() }
    }
}

impl Default for Scoped {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifestyle for Scoped {
    fn root_request(&self) -> bool {
        false
    }

    fn clone_lifestyle(&self) -> Box<dyn Lifestyle> {
        Box::new(Scoped::new())
    }

    fn provide_lifestyle_expression(
        &self,
        _request: &ActivationRequest<'_>,
        activation: ActivationExpressionResult,
    ) -> ActivationExpressionResult {
        let cache = CacheLocation::scope(self.slot);
        activation.map(|inner| Expression::Cached {
            cache,
            inner: Box::new(inner),
        })
    }
}

/// One instance per nearest scope with the given name.
/// Locating it outside such a scope fails with [`crate::ResolveErrorKind::NamedScopeNotFound`].
pub struct SingletonPerNamedScope {
    name: Arc<str>,
    slot: SlotId,
}

impl SingletonPerNamedScope {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            slot: next_slot(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Lifestyle for SingletonPerNamedScope {
    fn root_request(&self) -> bool {
        false
    }

    fn clone_lifestyle(&self) -> Box<dyn Lifestyle> {
        Box::new(SingletonPerNamedScope::new(self.name.clone()))
    }

    fn provide_lifestyle_expression(
        &self,
        _request: &ActivationRequest<'_>,
        activation: ActivationExpressionResult,
    ) -> ActivationExpressionResult {
        let cache = CacheLocation::named_scope(self.name.clone(), self.slot);
        activation.map(|inner| Expression::Cached {
            cache,
            inner: Box::new(inner),
        })
    }
}
