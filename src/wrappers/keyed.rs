use alloc::sync::Arc;
use core::{
    any::type_name,
    fmt::{self, Debug, Formatter},
};

use super::WrapperStrategy;
use crate::{
    any::{TypeKey, Value, KEYED_LOCATE_DELEGATE},
    builder::ActivationExpressionBuilder,
    container::{Container, WeakContainer},
    context::InjectionContext,
    disposal::DisposalScope,
    errors::ResolveErrorKind,
    expression::{ActivationExpressionResult, DeferredActivation, Expression},
    key::Key,
    request::ActivationRequest,
};

pub struct KeyedLocateDelegateWrapperStrategy;

impl WrapperStrategy for KeyedLocateDelegateWrapperStrategy {
    fn get_wrapped_type(&self, type_key: &TypeKey) -> Option<TypeKey> {
        match type_key.args() {
            [_, value_type] if type_key.name() == KEYED_LOCATE_DELEGATE => Some(value_type.clone()),
            _ => None,
        }
    }

    /// Keys are only known when the delegate is called
    fn can_locate(&self, _builder: &ActivationExpressionBuilder<'_>, request: &ActivationRequest<'_>) -> bool {
        self.get_wrapped_type(request.type_key()).is_some()
    }

    fn get_activation_expression(
        &self,
        _builder: &ActivationExpressionBuilder<'_>,
        request: &ActivationRequest<'_>,
    ) -> Result<ActivationExpressionResult, ResolveErrorKind> {
        let Some(value_type) = self.get_wrapped_type(request.type_key()) else {
            return Err(ResolveErrorKind::Unresolvable {
                type_key: request.type_key().clone(),
                key: request.key().cloned(),
            });
        };
        Ok(Expression::Deferred(Arc::new(KeyedLocateActivation { value_type })).into())
    }
}

struct KeyedLocateActivation {
    value_type: TypeKey,
}

impl DeferredActivation for KeyedLocateActivation {
    fn activate(&self, scope: &Container, _disposal: &DisposalScope, context: &InjectionContext) -> Result<Value, ResolveErrorKind> {
        Ok(Arc::new(KeyedLocateDelegate {
            value_type: self.value_type.clone(),
            scope: scope.downgrade(),
            context: context.clone(),
        }) as Value)
    }
}

/// Locates values of one type by key, in the scope it was created in
pub struct KeyedLocateDelegate {
    value_type: TypeKey,
    scope: WeakContainer,
    context: InjectionContext,
}

impl KeyedLocateDelegate {
    #[inline]
    #[must_use]
    pub fn value_type(&self) -> &TypeKey {
        &self.value_type
    }

    /// # Errors
    /// - Returns [`ResolveErrorKind::ScopeDisposed`] if the scope the delegate was created in is disposed
    /// - Returns [`ResolveErrorKind::Unresolvable`] if nothing is exported with `key`
    pub fn locate(&self, key: impl Into<Key>) -> Result<Value, ResolveErrorKind> {
        let scope = self.scope.upgrade().ok_or(ResolveErrorKind::ScopeDisposed)?;
        scope.locate_with_context(&self.value_type, Some(key.into()), self.context.clone())
    }

    /// # Errors
    /// - Returns [`ResolveErrorKind::IncorrectType`] if the value isn't a `T`
    /// - Returns any error of [`KeyedLocateDelegate::locate`]
    pub fn locate_as<T: Send + Sync + 'static>(&self, key: impl Into<Key>) -> Result<Arc<T>, ResolveErrorKind> {
        self.locate(key)?.downcast().map_err(|_| ResolveErrorKind::IncorrectType {
            type_key: self.value_type.clone(),
            expected: type_name::<T>(),
        })
    }
}

impl Debug for KeyedLocateDelegate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLocateDelegate")
            .field("value_type", &self.value_type)
            .finish_non_exhaustive()
    }
}
