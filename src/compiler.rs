use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::{
    any::{Absent, TypeKey, Value},
    container::Container,
    context::InjectionContext,
    descriptor::Arguments,
    disposal::DisposalScope,
    errors::ResolveErrorKind,
    expression::{ActivationExpressionResult, CacheKind, Expression},
    key::Key,
    wrappers::Enumerable,
};

/// Compiled plan, invoked with the locating scope, the disposal scope tracking instances and the injection context
pub type ActivationDelegate =
    Arc<dyn Fn(&Container, &DisposalScope, &InjectionContext) -> Result<Value, ResolveErrorKind> + Send + Sync>;

#[must_use]
pub(crate) fn compile(result: &ActivationExpressionResult) -> ActivationDelegate {
    compile_expression(&result.expression)
}

fn compile_expression(expression: &Expression) -> ActivationDelegate {
    match expression {
        Expression::Constant(value) => {
            let value = value.clone();
            Arc::new(move |_: &Container, _: &DisposalScope, _: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                Ok(value.clone())
            })
        }
        Expression::Construct {
            type_key,
            constructor,
            arguments,
        } => {
            let type_key = type_key.clone();
            let constructor = constructor.clone();
            let arguments: Vec<_> = arguments.iter().map(compile_expression).collect();
            Arc::new(move |scope: &Container, disposal: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                let values = arguments
                    .iter()
                    .map(|argument| argument(scope, disposal, context))
                    .collect::<Result<Vec<_>, _>>()?;
                constructor.activate(Arguments::new(values)).map_err(|err| {
                    error!(type_key = %type_key, "{}", err);
                    ResolveErrorKind::Instantiate(err)
                })
            })
        }
        Expression::Factory {
            type_key,
            factory,
            allow_null,
        } => {
            let type_key = type_key.clone();
            let factory = factory.clone();
            let allow_null = *allow_null;
            Arc::new(move |scope: &Container, _: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                match factory(scope, context)? {
                    Some(value) => Ok(value),
                    None if allow_null => {
                        debug!(type_key = %type_key, "Factory returned nothing");
                        Ok(Arc::new(Absent) as Value)
                    }
                    None => Err(ResolveErrorKind::NullInstance {
                        type_key: type_key.clone(),
                    }),
                }
            })
        }
        Expression::Provider(provider) => {
            let provider = provider.clone();
            Arc::new(move |scope: &Container, _: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                provider(scope, context).map_err(Into::into)
            })
        }
        Expression::ExtraData { id, type_key } => {
            let id = id.clone();
            let type_key = type_key.clone();
            Arc::new(move |_: &Container, _: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                context
                    .get_extra_data(&id)
                    .cloned()
                    .ok_or_else(|| ResolveErrorKind::Unresolvable {
                        type_key: type_key.clone(),
                        key: None,
                    })
            })
        }
        Expression::LocatorScope => Arc::new(|scope: &Container, _: &DisposalScope, _: &InjectionContext| -> Result<Value, ResolveErrorKind> {
            Ok(Arc::new(scope.downgrade()) as Value)
        }),
        Expression::InjectionScope => Arc::new(|scope: &Container, _: &DisposalScope, _: &InjectionContext| -> Result<Value, ResolveErrorKind> {
            Ok(Arc::new(scope.root().downgrade()) as Value)
        }),
        Expression::InjectionContext => Arc::new(|_: &Container, _: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
            Ok(Arc::new(context.clone()) as Value)
        }),
        Expression::TrackDisposal { inner, finalizer } => {
            let inner = compile_expression(inner);
            let finalizer = finalizer.clone();
            Arc::new(move |scope: &Container, disposal: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                let value = inner(scope, disposal, context)?;
                disposal.track(value.clone(), finalizer.clone());
                Ok(value)
            })
        }
        Expression::Cached { cache, inner } => {
            let inner = compile_expression(inner);
            match &cache.0 {
                CacheKind::Root(cell) => {
                    let cell = cell.clone();
                    Arc::new(move |scope: &Container, _: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                        cell.get_or_try_init(|| {
                            let root = scope.root();
                            inner(&root, root.disposal_scope(), context)
                        })
                    })
                }
                CacheKind::Scope(slot) => {
                    let slot = *slot;
                    Arc::new(move |scope: &Container, _: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                        scope
                            .scoped_cache()
                            .get_or_try_init(slot, || inner(scope, scope.disposal_scope(), context))
                    })
                }
                CacheKind::NamedScope { name, slot } => {
                    let name = name.clone();
                    let slot = *slot;
                    Arc::new(move |scope: &Container, _: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                        let named = scope
                            .find_named_scope(&name)
                            .ok_or_else(|| ResolveErrorKind::NamedScopeNotFound { name: name.clone() })?;
                        named
                            .scoped_cache()
                            .get_or_try_init(slot, || inner(&named, named.disposal_scope(), context))
                    })
                }
            }
        }
        Expression::Deferred(activation) => {
            let activation = activation.clone();
            Arc::new(move |scope: &Container, disposal: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                activation.activate(scope, disposal, context)
            })
        }
        Expression::Enumerable {
            element_type,
            items,
            creator,
        } => {
            let element_type = element_type.clone();
            let items: Vec<_> = items.iter().map(compile_expression).collect();
            let creator = creator.clone();
            Arc::new(move |scope: &Container, disposal: &DisposalScope, context: &InjectionContext| -> Result<Value, ResolveErrorKind> {
                let values = items
                    .iter()
                    .map(|item| item(scope, disposal, context))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(match &creator {
                    Some(creator) => creator.create_enumerable(&element_type, values),
                    None => Arc::new(Enumerable::new(element_type.clone(), values)) as Value,
                })
            })
        }
    }
}

type DelegateKey = (TypeKey, Option<Key>);

/// Compiled delegates of locate requests, shared by every scope of a container
#[derive(Default)]
pub(crate) struct DelegateCache {
    delegates: RwLock<BTreeMap<DelegateKey, ActivationDelegate>>,
}

impl DelegateCache {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub(crate) fn get(&self, type_key: &TypeKey, key: Option<&Key>) -> Option<ActivationDelegate> {
        self.delegates
            .read()
            .get(&(type_key.clone(), key.cloned()))
            .cloned()
    }

    /// Keeps the delegate compiled first when several threads compile the same request
    pub(crate) fn insert(&self, type_key: TypeKey, key: Option<Key>, delegate: ActivationDelegate) -> ActivationDelegate {
        self.delegates
            .write()
            .entry((type_key, key))
            .or_insert(delegate)
            .clone()
    }

    pub(crate) fn clear(&self) {
        self.delegates.write().clear();
        debug!("Compiled delegates cleared");
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.delegates.read().len()
    }
}
