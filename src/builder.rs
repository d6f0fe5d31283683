use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::cmp::Reverse;
use tracing::{debug, warn};

use crate::{
    any::{TypeKey, INJECTION_CONTEXT, INJECTION_SCOPE, LOCATOR_SCOPE},
    compiler::{compile, ActivationDelegate},
    config::{AmbiguousExportPolicy, Config},
    constructor::create_construct_expression,
    errors::ResolveErrorKind,
    expression::{ActivationExpressionResult, Expression},
    registry::{Candidate, Registry},
    request::{ActivationRequest, RequestType},
    strategy::{Activation, ExportStrategy},
};

/// Builds activation plans from the registry.
///
/// Lookup order for a request is: known values, the scope and context types,
/// registered exports, wrappers, then auto-registration of known types.
pub struct ActivationExpressionBuilder<'r> {
    registry: &'r Registry,
    config: &'r Config,
}

impl<'r> ActivationExpressionBuilder<'r> {
    #[inline]
    #[must_use]
    pub(crate) fn new(registry: &'r Registry, config: &'r Config) -> Self {
        Self { registry, config }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        self.config
    }

    /// Compiles a plan built by this builder
    #[inline]
    #[must_use]
    pub fn compile(&self, result: &ActivationExpressionResult) -> ActivationDelegate {
        compile(result)
    }

    /// # Errors
    /// - Returns [`ResolveErrorKind::GraphDepthExceeded`] if the request is deeper than the max object graph depth
    /// - Returns [`ResolveErrorKind::Unresolvable`] if nothing can produce the requested type
    /// - Returns any error raised while building the plans of dependencies
    pub fn get_activation_expression(&self, request: &ActivationRequest<'_>) -> Result<ActivationExpressionResult, ResolveErrorKind> {
        if request.depth() > self.config.max_object_graph_depth {
            return Err(ResolveErrorKind::GraphDepthExceeded {
                max_depth: self.config.max_object_graph_depth,
                path: request.path(),
            });
        }

        if request.key().is_none() {
            if let Some(known_value) = request.find_known_value(request.type_key()) {
                debug!(type_key = %request.type_key(), "Using known value");
                return Ok(known_value.expression().clone().into());
            }
        }

        if let Some(expression) = self.scope_expression(request)? {
            return Ok(expression.into());
        }

        if let Some(strategy) = self.select_strategy(request)? {
            return self.strategy_expression(&strategy, request);
        }

        for wrapper in self.registry.wrappers() {
            if wrapper.get_wrapped_type(request.type_key()).is_some() {
                debug!(type_key = %request.type_key(), "Using wrapper");
                return wrapper.get_activation_expression(self, request);
            }
        }

        if let Some(strategy) = self.auto_registration(request) {
            debug!(type_key = %request.type_key(), "Auto-registering known type");
            return self.strategy_expression(&strategy, request);
        }

        Err(ResolveErrorKind::Unresolvable {
            type_key: request.type_key().clone(),
            key: request.key().cloned(),
        })
    }

    /// Checks whether the request can be satisfied without building its whole object graph
    #[must_use]
    pub fn can_locate(&self, request: &ActivationRequest<'_>) -> bool {
        if request.key().is_none() && request.find_known_value(request.type_key()).is_some() {
            return true;
        }
        match request.type_key().name() {
            LOCATOR_SCOPE | INJECTION_CONTEXT if !request.type_key().is_generic() => return true,
            INJECTION_SCOPE if !request.type_key().is_generic() => return self.config.allow_injection_scope_location,
            _ => {}
        }
        if !self.eligible_candidates(request).is_empty() {
            return true;
        }
        for wrapper in self.registry.wrappers() {
            if wrapper.get_wrapped_type(request.type_key()).is_some() {
                return wrapper.can_locate(self, request);
            }
        }
        self.auto_registration(request).is_some()
    }

    fn scope_expression(&self, request: &ActivationRequest<'_>) -> Result<Option<Expression>, ResolveErrorKind> {
        if request.type_key().is_generic() {
            return Ok(None);
        }
        Ok(match request.type_key().name() {
            LOCATOR_SCOPE => Some(Expression::LocatorScope),
            INJECTION_CONTEXT => Some(Expression::InjectionContext),
            INJECTION_SCOPE if self.config.allow_injection_scope_location => Some(Expression::InjectionScope),
            INJECTION_SCOPE => return Err(ResolveErrorKind::InjectionScopeNotAllowed),
            _ => None,
        })
    }

    fn eligible_candidates(&self, request: &ActivationRequest<'_>) -> Vec<Candidate> {
        if request.key().is_some_and(|key| key.is_many()) {
            return Vec::new();
        }
        let mut candidates: Vec<_> = self
            .registry
            .candidates(request.type_key(), request.key())
            .into_iter()
            .filter(|candidate| candidate.strategy.meets_conditions(request))
            .collect();
        candidates.sort_by_key(|candidate| {
            (
                Reverse(candidate.strategy.priority()),
                Reverse(candidate.exact),
                Reverse(candidate.strategy.id()),
            )
        });
        candidates
    }

    /// Picks the export for a single-value request: highest priority, then exact over generic, then most recent
    fn select_strategy(&self, request: &ActivationRequest<'_>) -> Result<Option<Arc<ExportStrategy>>, ResolveErrorKind> {
        let candidates = self.eligible_candidates(request);
        let Some(selected) = candidates.first() else {
            return Ok(None);
        };

        let tied = candidates
            .iter()
            .filter(|candidate| candidate.strategy.priority() == selected.strategy.priority() && candidate.exact == selected.exact)
            .count();
        if tied > 1 {
            match self.config.ambiguous_export_policy {
                AmbiguousExportPolicy::LastRegistered => {
                    warn!(type_key = %request.type_key(), count = tied, "Several exports match, using the last registered");
                }
                AmbiguousExportPolicy::Error => {
                    return Err(ResolveErrorKind::AmbiguousExport {
                        type_key: request.type_key().clone(),
                        key: request.key().cloned(),
                        count: tied,
                    });
                }
            }
        }
        Ok(Some(selected.strategy.clone()))
    }

    fn auto_registration(&self, request: &ActivationRequest<'_>) -> Option<Arc<ExportStrategy>> {
        if !self.config.auto_register_unknown || request.key().is_some() {
            return None;
        }
        let descriptor = self.registry.known_type(request.type_key())?;
        if descriptor.is_open_generic() || descriptor.constructors().is_empty() {
            return None;
        }
        Some(Arc::new(ExportStrategy::new(
            descriptor.type_key().clone(),
            Activation::Type(descriptor),
        )))
    }

    /// Builds the plan of an export, applying disposal tracking and its lifestyle
    ///
    /// # Errors
    /// Returns any error raised while building the plans of constructor parameters
    pub fn strategy_expression(
        &self,
        strategy: &ExportStrategy,
        request: &ActivationRequest<'_>,
    ) -> Result<ActivationExpressionResult, ResolveErrorKind> {
        let mut result = match &strategy.activation {
            Activation::Instance(instance) => return Ok(Expression::Constant(instance.clone()).into()),
            Activation::Factory(factory) => Expression::Factory {
                type_key: request.type_key().clone(),
                factory: factory.clone(),
                allow_null: self.config.allow_instance_and_factory_to_return_null,
            }
            .into(),
            Activation::Type(descriptor) => create_construct_expression(self, request, strategy, descriptor)?,
        };

        if let Some(finalizer) = strategy.finalizer() {
            if strategy.is_externally_owned() {
                debug!(activation_type = %strategy.activation_type(), "Externally owned, not tracked for disposal");
            } else {
                let finalizer = finalizer.clone();
                result = result.map(|inner| Expression::TrackDisposal {
                    inner: Box::new(inner),
                    finalizer,
                });
            }
        }
        if let Some(lifestyle) = strategy.lifestyle() {
            result = lifestyle.provide_lifestyle_expression(request, result);
        }
        Ok(result)
    }

    /// Plans of every export of `element_type` for the keys of the request, in registration order
    ///
    /// # Errors
    /// Returns any error raised while building the plans of the exports
    pub fn enumerable_items(
        &self,
        request: &ActivationRequest<'_>,
        element_type: &TypeKey,
    ) -> Result<Vec<ActivationExpressionResult>, ResolveErrorKind> {
        let child = request.child(element_type.clone(), request.key().cloned(), RequestType::Enumerable);

        let candidates: Vec<_> = self
            .registry
            .candidates_for_all(element_type, request.key())
            .into_iter()
            .filter(|candidate| candidate.strategy.meets_conditions(&child))
            .collect();

        if candidates.is_empty() && request.key().is_none() {
            for wrapper in self.registry.wrappers() {
                if wrapper.get_wrapped_type(element_type).is_some() {
                    if wrapper.can_locate(self, &child) {
                        let item = wrapper.get_activation_expression(self, &child)?;
                        return Ok(alloc::vec![item]);
                    }
                    warn!(element_type = %element_type, "Wrapped element can't be located, enumerable is empty");
                    return Ok(Vec::new());
                }
            }
        }

        candidates
            .iter()
            .map(|candidate| self.strategy_expression(&candidate.strategy, &child))
            .collect()
    }
}
