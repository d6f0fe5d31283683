use alloc::sync::Arc;
use core::{
    any::type_name,
    fmt::{self, Debug, Formatter},
};
use tracing::debug;

use super::WrapperStrategy;
use crate::{
    any::{TypeKey, Value, LAZY},
    builder::ActivationExpressionBuilder,
    cache::InstanceCell,
    compiler::ActivationDelegate,
    container::{Container, WeakContainer},
    context::InjectionContext,
    disposal::DisposalScope,
    errors::ResolveErrorKind,
    expression::{ActivationExpressionResult, DeferredActivation, Expression},
    request::{ActivationRequest, RequestType},
};

pub struct LazyWrapperStrategy;

impl WrapperStrategy for LazyWrapperStrategy {
    fn get_wrapped_type(&self, type_key: &TypeKey) -> Option<TypeKey> {
        match type_key.args() {
            [value_type] if type_key.name() == LAZY => Some(value_type.clone()),
            _ => None,
        }
    }

    fn get_activation_expression(
        &self,
        builder: &ActivationExpressionBuilder<'_>,
        request: &ActivationRequest<'_>,
    ) -> Result<ActivationExpressionResult, ResolveErrorKind> {
        let Some(value_type) = self.get_wrapped_type(request.type_key()) else {
            return Err(ResolveErrorKind::Unresolvable {
                type_key: request.type_key().clone(),
                key: request.key().cloned(),
            });
        };

        let child = request.child(value_type.clone(), request.key().cloned(), RequestType::Wrapper);
        let nested = builder.get_activation_expression(&child)?;
        let delegate = builder.compile(&nested);
        debug!(type_key = %request.type_key(), "Compiled lazy delegate");

        Ok(Expression::Deferred(Arc::new(LazyActivation { value_type, delegate })).into())
    }
}

struct LazyActivation {
    value_type: TypeKey,
    delegate: ActivationDelegate,
}

impl DeferredActivation for LazyActivation {
    fn activate(&self, scope: &Container, _disposal: &DisposalScope, context: &InjectionContext) -> Result<Value, ResolveErrorKind> {
        Ok(Arc::new(Lazy {
            value_type: self.value_type.clone(),
            delegate: self.delegate.clone(),
            scope: scope.downgrade(),
            context: context.clone(),
            cell: InstanceCell::new(),
        }) as Value)
    }
}

/// Value located on first access, then reused by this wrapper
pub struct Lazy {
    value_type: TypeKey,
    delegate: ActivationDelegate,
    scope: WeakContainer,
    context: InjectionContext,
    cell: InstanceCell,
}

impl Lazy {
    #[inline]
    #[must_use]
    pub fn value_type(&self) -> &TypeKey {
        &self.value_type
    }

    /// Locates the value on first call, concurrent first calls wait for it
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::ScopeDisposed`] if the scope the wrapper was created in is disposed
    /// - Returns any error raised while locating the value, the next call tries again
    pub fn value(&self) -> Result<Value, ResolveErrorKind> {
        self.cell.get_or_try_init(|| {
            let scope = self.scope.upgrade().ok_or(ResolveErrorKind::ScopeDisposed)?;
            if scope.is_disposed() {
                return Err(ResolveErrorKind::ScopeDisposed);
            }
            (self.delegate)(&scope, scope.disposal_scope(), &self.context)
        })
    }

    /// # Errors
    /// - Returns [`ResolveErrorKind::IncorrectType`] if the value isn't a `T`
    /// - Returns any error of [`Lazy::value`]
    pub fn value_as<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.value()?.downcast().map_err(|_| ResolveErrorKind::IncorrectType {
            type_key: self.value_type.clone(),
            expected: type_name::<T>(),
        })
    }

    #[inline]
    #[must_use]
    pub fn is_value_created(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Debug for Lazy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("value_type", &self.value_type)
            .field("is_value_created", &self.is_value_created())
            .finish_non_exhaustive()
    }
}
