use alloc::{format, sync::Arc, vec::Vec};
use core::{
    any::type_name,
    fmt::{self, Debug, Formatter},
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::debug;

use super::WrapperStrategy;
use crate::{
    any::{Absent, TypeKey, Value, FUNC},
    builder::ActivationExpressionBuilder,
    compiler::ActivationDelegate,
    container::{Container, WeakContainer},
    context::InjectionContext,
    disposal::DisposalScope,
    errors::{InstantiateErrorKind, ResolveErrorKind},
    expression::{ActivationExpressionResult, DeferredActivation, Expression},
    request::{ActivationRequest, KnownValue, RequestType},
};

/// Builds `Func` wrappers of one arity.
///
/// Each argument position gets an id unique to this strategy,
/// and invocations bind their arguments to these ids in a fresh injection context.
pub struct FuncWrapperStrategy {
    arity: usize,
    next_id: AtomicU64,
}

impl FuncWrapperStrategy {
    #[inline]
    #[must_use]
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            next_id: AtomicU64::new(1),
        }
    }

    fn unique_id(&self, position: usize) -> Arc<str> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("kiln::func{}::{}::{}", self.arity, position, id).into()
    }

    fn split<'t>(&self, type_key: &'t TypeKey) -> Option<(&'t [TypeKey], &'t TypeKey)> {
        if type_key.name() != FUNC || type_key.arity() != self.arity + 1 {
            return None;
        }
        let (result, arguments) = type_key.args().split_last()?;
        Some((arguments, result))
    }
}

impl WrapperStrategy for FuncWrapperStrategy {
    fn get_wrapped_type(&self, type_key: &TypeKey) -> Option<TypeKey> {
        self.split(type_key).map(|(_, result)| result.clone())
    }

    fn can_locate(&self, builder: &ActivationExpressionBuilder<'_>, request: &ActivationRequest<'_>) -> bool {
        let Some((arguments, result)) = self.split(request.type_key()) else {
            return false;
        };
        let mut child = request.child(result.clone(), request.key().cloned(), RequestType::Wrapper);
        for argument in arguments {
            child.add_known_value(KnownValue::new(argument.clone(), Expression::Constant(Arc::new(Absent))));
        }
        builder.can_locate(&child)
    }

    fn get_activation_expression(
        &self,
        builder: &ActivationExpressionBuilder<'_>,
        request: &ActivationRequest<'_>,
    ) -> Result<ActivationExpressionResult, ResolveErrorKind> {
        let Some((arguments, result)) = self.split(request.type_key()) else {
            return Err(ResolveErrorKind::Unresolvable {
                type_key: request.type_key().clone(),
                key: request.key().cloned(),
            });
        };

        let ids: Arc<[Arc<str>]> = (0..arguments.len()).map(|position| self.unique_id(position)).collect();
        let mut child = request.child(result.clone(), request.key().cloned(), RequestType::Wrapper);
        for (id, argument) in ids.iter().zip(arguments) {
            child.add_known_value(KnownValue::new(
                argument.clone(),
                Expression::ExtraData {
                    id: id.clone(),
                    type_key: argument.clone(),
                },
            ));
        }

        let nested = builder.get_activation_expression(&child)?;
        let delegate = builder.compile(&nested);
        debug!(type_key = %request.type_key(), "Compiled func delegate");

        Ok(Expression::Deferred(Arc::new(FuncActivation {
            type_key: request.type_key().clone(),
            argument_types: arguments.into(),
            ids,
            delegate,
        }))
        .into())
    }
}

struct FuncActivation {
    type_key: TypeKey,
    argument_types: Arc<[TypeKey]>,
    ids: Arc<[Arc<str>]>,
    delegate: ActivationDelegate,
}

impl DeferredActivation for FuncActivation {
    fn activate(&self, scope: &Container, _disposal: &DisposalScope, context: &InjectionContext) -> Result<Value, ResolveErrorKind> {
        Ok(Arc::new(Func {
            type_key: self.type_key.clone(),
            argument_types: self.argument_types.clone(),
            ids: self.ids.clone(),
            delegate: self.delegate.clone(),
            scope: scope.downgrade(),
            context: context.clone(),
        }) as Value)
    }
}

/// Factory locating a new value on each invocation, in the scope it was created in.
///
/// Arguments are available to the whole object graph of the value as known values of their types.
pub struct Func {
    type_key: TypeKey,
    argument_types: Arc<[TypeKey]>,
    ids: Arc<[Arc<str>]>,
    delegate: ActivationDelegate,
    scope: WeakContainer,
    context: InjectionContext,
}

impl Func {
    #[inline]
    #[must_use]
    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.argument_types.len()
    }

    #[inline]
    #[must_use]
    pub fn argument_types(&self) -> &[TypeKey] {
        &self.argument_types
    }

    /// # Errors
    /// - Returns [`InstantiateErrorKind::ArgumentCount`] if the count of `arguments` doesn't match the arity
    /// - Returns [`ResolveErrorKind::ScopeDisposed`] if the scope the func was created in is disposed
    /// - Returns any error raised while locating the value
    pub fn invoke(&self, arguments: Vec<Value>) -> Result<Value, ResolveErrorKind> {
        if arguments.len() != self.arity() {
            return Err(InstantiateErrorKind::ArgumentCount {
                expected: self.arity(),
                actual: arguments.len(),
            }
            .into());
        }
        let scope = self.scope.upgrade().ok_or(ResolveErrorKind::ScopeDisposed)?;
        if scope.is_disposed() {
            return Err(ResolveErrorKind::ScopeDisposed);
        }

        let mut context = self.context.clone();
        for (id, argument) in self.ids.iter().zip(arguments) {
            context.set_extra_data(id.clone(), argument);
        }
        (self.delegate)(&scope, scope.disposal_scope(), &context)
    }

    /// Invokes the func and downcasts the value
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::IncorrectType`] if the value isn't a `T`
    /// - Returns any error of [`Func::invoke`]
    pub fn invoke_as<T: Send + Sync + 'static>(&self, arguments: Vec<Value>) -> Result<Arc<T>, ResolveErrorKind> {
        self.invoke(arguments)?
            .downcast()
            .map_err(|_| ResolveErrorKind::IncorrectType {
                type_key: self.result_type().clone(),
                expected: type_name::<T>(),
            })
    }

    /// Invokes a func without arguments
    ///
    /// # Errors
    /// Returns any error of [`Func::invoke`]
    #[inline]
    pub fn call(&self) -> Result<Value, ResolveErrorKind> {
        self.invoke(Vec::new())
    }

    fn result_type(&self) -> &TypeKey {
        self.type_key.args().last().unwrap_or(&self.type_key)
    }
}

impl Debug for Func {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func").field("type_key", &self.type_key).finish_non_exhaustive()
    }
}
