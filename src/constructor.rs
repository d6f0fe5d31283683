use alloc::{sync::Arc, vec, vec::Vec};
use tracing::debug;

use crate::{
    any::{Absent, TypeKey},
    builder::ActivationExpressionBuilder,
    config::ConstructorSelectionMethod,
    descriptor::{Constructor, Parameter, TypeDescriptor},
    errors::ResolveErrorKind,
    expression::{ActivationExpressionResult, Expression},
    key::Key,
    request::{ActivationRequest, RequestType},
    strategy::{BindingValue, ExportStrategy, ParameterBinding},
};

/// Custom constructor selection, used with [`ConstructorSelectionMethod::Other`]
pub trait ConstructorSelector: Send + Sync {
    /// Returns the index of the constructor to use.
    /// `can_resolve` tells whether a parameter can be satisfied.
    fn select_constructor(
        &self,
        activation_type: &TypeKey,
        constructors: &[Constructor],
        can_resolve: &dyn Fn(&Parameter) -> bool,
    ) -> Option<usize>;
}

#[must_use]
pub(crate) fn select_constructor(
    method: &ConstructorSelectionMethod,
    activation_type: &TypeKey,
    constructors: &[Constructor],
    can_resolve: &dyn Fn(&Parameter) -> bool,
) -> Option<usize> {
    // Ties keep the constructor declared first
    match method {
        ConstructorSelectionMethod::BestMatch => {
            let mut best: Option<(usize, (bool, usize, usize))> = None;
            for (index, constructor) in constructors.iter().enumerate() {
                let parameters = constructor.parameters();
                let satisfied = parameters.iter().filter(|parameter| can_resolve(parameter)).count();
                let score = (satisfied == parameters.len(), satisfied, parameters.len());
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((index, score));
                }
            }
            best.map(|(index, _)| index)
        }
        ConstructorSelectionMethod::MostParameters => {
            let mut best: Option<(usize, usize)> = None;
            for (index, constructor) in constructors.iter().enumerate() {
                let count = constructor.parameters().len();
                if best.map_or(true, |(_, best_count)| count > best_count) {
                    best = Some((index, count));
                }
            }
            best.map(|(index, _)| index)
        }
        ConstructorSelectionMethod::LeastParameters => {
            let mut best: Option<(usize, usize)> = None;
            for (index, constructor) in constructors.iter().enumerate() {
                let count = constructor.parameters().len();
                if best.map_or(true, |(_, best_count)| count < best_count) {
                    best = Some((index, count));
                }
            }
            best.map(|(index, _)| index)
        }
        ConstructorSelectionMethod::Other(selector) => selector
            .select_constructor(activation_type, constructors, can_resolve)
            .filter(|index| *index < constructors.len()),
    }
}

/// Keys tried in order when locating a parameter
fn parameter_keys(builder: &ActivationExpressionBuilder<'_>, binding: Option<&ParameterBinding>, parameter: &Parameter) -> Vec<Option<Key>> {
    if let Some(key) = binding.and_then(ParameterBinding::locate_key) {
        return vec![Some(key.clone())];
    }
    if builder.config().is_keyed_type(parameter.type_key()) {
        return vec![Some(Key::from(parameter.shared_name().clone())), None];
    }
    vec![None]
}

fn is_required(binding: Option<&ParameterBinding>, parameter: &Parameter) -> bool {
    binding
        .and_then(ParameterBinding::required)
        .unwrap_or_else(|| parameter.is_required())
}

fn default_value<'a>(binding: Option<&'a ParameterBinding>, parameter: &'a Parameter) -> Option<&'a crate::any::Value> {
    binding.and_then(ParameterBinding::default).or_else(|| parameter.default_value())
}

fn can_resolve_parameter(
    builder: &ActivationExpressionBuilder<'_>,
    request: &ActivationRequest<'_>,
    strategy: &ExportStrategy,
    activation_type: &TypeKey,
    parameter: &Parameter,
) -> bool {
    let binding = strategy.binding_for(parameter);
    if binding.and_then(ParameterBinding::binding_value).is_some() {
        return true;
    }
    let locatable = parameter_keys(builder, binding, parameter).into_iter().any(|key| {
        let child = request
            .child(parameter.type_key().clone(), key, RequestType::ConstructorParameter)
            .injected_into(activation_type.clone(), parameter.shared_name().clone());
        builder.can_locate(&child)
    });
    locatable || default_value(binding, parameter).is_some() || !is_required(binding, parameter)
}

fn parameter_expression(
    builder: &ActivationExpressionBuilder<'_>,
    request: &ActivationRequest<'_>,
    strategy: &ExportStrategy,
    activation_type: &TypeKey,
    parameter: &Parameter,
) -> Result<ActivationExpressionResult, ResolveErrorKind> {
    let binding = strategy.binding_for(parameter);
    match binding.and_then(ParameterBinding::binding_value) {
        Some(BindingValue::Constant(value)) => return Ok(Expression::Constant(value.clone()).into()),
        Some(BindingValue::Provider(provider)) => return Ok(Expression::Provider(provider.clone()).into()),
        None => {}
    }

    for key in parameter_keys(builder, binding, parameter) {
        let child = request
            .child(parameter.type_key().clone(), key, RequestType::ConstructorParameter)
            .injected_into(activation_type.clone(), parameter.shared_name().clone());
        if builder.can_locate(&child) {
            return builder.get_activation_expression(&child);
        }
    }

    if let Some(value) = default_value(binding, parameter) {
        debug!(parameter = parameter.name(), "Using default value");
        return Ok(Expression::Constant(value.clone()).into());
    }
    if !is_required(binding, parameter) {
        debug!(parameter = parameter.name(), "Optional parameter not located");
        return Ok(Expression::Constant(Arc::new(Absent)).into());
    }

    Err(ResolveErrorKind::UnresolvableParameter {
        parameter: parameter.shared_name().clone(),
        parameter_type: parameter.type_key().clone(),
        activation_type: activation_type.clone(),
    })
}

/// Builds the plan constructing `descriptor` with the selected constructor
pub(crate) fn create_construct_expression(
    builder: &ActivationExpressionBuilder<'_>,
    request: &ActivationRequest<'_>,
    strategy: &ExportStrategy,
    descriptor: &TypeDescriptor,
) -> Result<ActivationExpressionResult, ResolveErrorKind> {
    let activation_type = descriptor.type_key();
    let constructors = descriptor.constructors();

    let can_resolve = |parameter: &Parameter| can_resolve_parameter(builder, request, strategy, activation_type, parameter);
    let Some(index) = select_constructor(&builder.config().constructor_selection, activation_type, constructors, &can_resolve)
    else {
        return Err(ResolveErrorKind::Unresolvable {
            type_key: activation_type.clone(),
            key: request.key().cloned(),
        });
    };
    let constructor = &constructors[index];
    debug!(activation_type = %activation_type, constructor = index, "Selected constructor");

    let arguments = constructor
        .parameters()
        .iter()
        .map(|parameter| parameter_expression(builder, request, strategy, activation_type, parameter))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ActivationExpressionResult::compose(arguments, |arguments| Expression::Construct {
        type_key: activation_type.clone(),
        constructor: constructor.clone(),
        arguments,
    }))
}
