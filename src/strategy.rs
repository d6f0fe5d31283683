use alloc::{boxed::Box, collections::BTreeMap, sync::Arc, vec::Vec};
use core::fmt::{self, Debug, Formatter};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    any::{TypeKey, Value},
    descriptor::{Parameter, TypeDescriptor},
    errors::ConfigErrorKind,
    expression::{ExportFactory, ValueProvider},
    finalizer::BoxedFinalizer,
    key::Key,
    lifestyle::Lifestyle,
    request::ActivationRequest,
};

#[derive(Clone)]
pub(crate) enum Activation {
    Type(TypeDescriptor),
    Instance(Value),
    Factory(ExportFactory),
}

/// Filters exports by the request they would satisfy
pub trait ExportCondition: Send + Sync {
    fn meets_condition(&self, strategy: &ExportStrategy, request: &ActivationRequest<'_>) -> bool;
}

impl<F> ExportCondition for F
where
    F: Fn(&ActivationRequest<'_>) -> bool + Send + Sync,
{
    #[inline]
    fn meets_condition(&self, _strategy: &ExportStrategy, request: &ActivationRequest<'_>) -> bool {
        self(request)
    }
}

/// Export is used only when injected into a constructor parameter of the given type
pub struct WhenInjectedInto(pub TypeKey);

impl ExportCondition for WhenInjectedInto {
    fn meets_condition(&self, _strategy: &ExportStrategy, request: &ActivationRequest<'_>) -> bool {
        request.injection_target() == Some(&self.0)
    }
}

#[derive(Clone, Debug)]
pub enum ParameterSelector {
    Name(Arc<str>),
    Type(TypeKey),
}

#[derive(Clone)]
pub(crate) enum BindingValue {
    Constant(Value),
    Provider(ValueProvider),
}

/// Per-export override of how a constructor parameter is satisfied
#[derive(Clone)]
pub struct ParameterBinding {
    selector: ParameterSelector,
    value: Option<BindingValue>,
    locate_key: Option<Key>,
    default: Option<Value>,
    required: Option<bool>,
}

impl ParameterBinding {
    #[inline]
    #[must_use]
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::new(ParameterSelector::Name(name.into()))
    }

    #[inline]
    #[must_use]
    pub fn of_type(type_key: TypeKey) -> Self {
        Self::new(ParameterSelector::Type(type_key))
    }

    fn new(selector: ParameterSelector) -> Self {
        Self {
            selector,
            value: None,
            locate_key: None,
            default: None,
            required: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(BindingValue::Constant(value));
        self
    }

    #[must_use]
    pub fn provider<F, E>(mut self, provider: F) -> Self
    where
        F: Fn(&crate::Container, &crate::InjectionContext) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<crate::InstantiateErrorKind>,
    {
        self.value = Some(BindingValue::Provider(Arc::new(move |scope, context| {
            provider(scope, context).map_err(Into::into)
        })));
        self
    }

    /// Locates the parameter with `key`. [`Key::Many`] selects several keys for enumerable parameters.
    #[inline]
    #[must_use]
    pub fn locate_with_key(mut self, key: impl Into<Key>) -> Self {
        self.locate_key = Some(key.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    #[must_use]
    pub fn matches(&self, parameter: &Parameter) -> bool {
        match &self.selector {
            ParameterSelector::Name(name) => &**name == parameter.name(),
            ParameterSelector::Type(type_key) => type_key == parameter.type_key(),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn binding_value(&self) -> Option<&BindingValue> {
        self.value.as_ref()
    }

    #[inline]
    #[must_use]
    pub(crate) fn locate_key(&self) -> Option<&Key> {
        self.locate_key.as_ref()
    }

    #[inline]
    #[must_use]
    pub(crate) fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[inline]
    #[must_use]
    pub(crate) fn required(&self) -> Option<bool> {
        self.required
    }
}

impl Debug for ParameterBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBinding")
            .field("selector", &self.selector)
            .field("has_value", &self.value.is_some())
            .field("locate_key", &self.locate_key)
            .field("has_default", &self.default.is_some())
            .field("required", &self.required)
            .finish()
    }
}

/// Registered way of producing instances for one or more exported types and keys
pub struct ExportStrategy {
    pub(crate) id: u64,
    pub(crate) activation_type: TypeKey,
    pub(crate) activation: Activation,
    pub(crate) exports: Vec<TypeKey>,
    pub(crate) keyed_exports: Vec<(TypeKey, Key)>,
    pub(crate) lifestyle: Option<Box<dyn Lifestyle>>,
    pub(crate) externally_owned: bool,
    pub(crate) priority: i32,
    pub(crate) conditions: Vec<Arc<dyn ExportCondition>>,
    pub(crate) bindings: Vec<ParameterBinding>,
    pub(crate) finalizer: Option<BoxedFinalizer>,
    closed: Mutex<BTreeMap<Vec<TypeKey>, Arc<ExportStrategy>>>,
}

impl ExportStrategy {
    #[must_use]
    pub(crate) fn new(activation_type: TypeKey, activation: Activation) -> Self {
        Self {
            id: 0,
            activation_type,
            activation,
            exports: Vec::new(),
            keyed_exports: Vec::new(),
            lifestyle: None,
            externally_owned: false,
            priority: 0,
            conditions: Vec::new(),
            bindings: Vec::new(),
            finalizer: None,
            closed: Mutex::new(BTreeMap::new()),
        }
    }

    /// Registration order of the strategy
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn activation_type(&self) -> &TypeKey {
        &self.activation_type
    }

    #[inline]
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[inline]
    #[must_use]
    pub fn is_externally_owned(&self) -> bool {
        self.externally_owned
    }

    #[inline]
    #[must_use]
    pub fn is_open_generic(&self) -> bool {
        matches!(&self.activation, Activation::Type(descriptor) if descriptor.is_open_generic())
    }

    #[inline]
    #[must_use]
    pub fn lifestyle(&self) -> Option<&dyn Lifestyle> {
        self.lifestyle.as_deref()
    }

    /// Exported unkeyed types. The activation type is exported when nothing else is.
    #[must_use]
    pub fn exports(&self) -> Vec<TypeKey> {
        if self.exports.is_empty() && self.keyed_exports.is_empty() {
            return alloc::vec![self.activation_type.clone()];
        }
        self.exports.clone()
    }

    #[inline]
    #[must_use]
    pub fn keyed_exports(&self) -> &[(TypeKey, Key)] {
        &self.keyed_exports
    }

    #[must_use]
    pub(crate) fn meets_conditions(&self, request: &ActivationRequest<'_>) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.meets_condition(self, request))
    }

    /// Last matching binding wins
    #[must_use]
    pub(crate) fn binding_for(&self, parameter: &Parameter) -> Option<&ParameterBinding> {
        self.bindings.iter().rev().find(|binding| binding.matches(parameter))
    }

    #[must_use]
    pub(crate) fn finalizer(&self) -> Option<&BoxedFinalizer> {
        match (&self.finalizer, &self.activation) {
            (Some(finalizer), _) => Some(finalizer),
            (None, Activation::Type(descriptor)) => descriptor.finalizer(),
            (None, _) => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigErrorKind> {
        let exported = self
            .exports()
            .into_iter()
            .chain(self.keyed_exports.iter().map(|(type_key, _)| type_key.clone()));

        if !self.is_open_generic() {
            if let Activation::Type(descriptor) = &self.activation {
                if descriptor.constructors().is_empty() {
                    return Err(ConfigErrorKind::NoConstructors {
                        type_key: self.activation_type.clone(),
                    });
                }
            }
            for export_type in exported {
                if export_type.is_open() {
                    return Err(ConfigErrorKind::OpenExportOfClosedType {
                        activation_type: self.activation_type.clone(),
                        export_type,
                    });
                }
            }
            return Ok(());
        }

        let arity = self.activation_type.arity();
        for export_type in exported {
            let mut bound = Vec::new();
            // Binding the pattern to itself collects the placeholders it uses
            let binds_all = export_type.is_open()
                && export_type.bind(&export_type, &mut bound)
                && (0..arity).all(|index| matches!(bound.get(index), Some(Some(_))));
            if !binds_all {
                return Err(ConfigErrorKind::GenericMismatch {
                    activation_type: self.activation_type.clone(),
                    export_type,
                });
            }
        }
        Ok(())
    }

    /// Closes an open generic strategy for `requested`, matched against the exported pattern.
    /// The same closed strategy is returned for the same generic arguments.
    pub(crate) fn close_for(&self, pattern: &TypeKey, requested: &TypeKey) -> Option<Arc<ExportStrategy>> {
        let Activation::Type(descriptor) = &self.activation else {
            return None;
        };

        let mut bound = Vec::new();
        if !pattern.bind(requested, &mut bound) {
            return None;
        }
        let args = (0..self.activation_type.arity())
            .map(|index| bound.get(index).cloned().flatten())
            .collect::<Option<Vec<_>>>()?;

        let mut closed = self.closed.lock();
        if let Some(strategy) = closed.get(&args) {
            return Some(strategy.clone());
        }

        let descriptor = descriptor.close(&args);
        let strategy = Arc::new(ExportStrategy {
            id: self.id,
            activation_type: descriptor.type_key().clone(),
            activation: Activation::Type(descriptor),
            exports: self.exports.iter().map(|type_key| type_key.close(&args)).collect(),
            keyed_exports: self
                .keyed_exports
                .iter()
                .map(|(type_key, key)| (type_key.close(&args), key.clone()))
                .collect(),
            lifestyle: self.lifestyle.as_ref().map(|lifestyle| lifestyle.clone_lifestyle()),
            externally_owned: self.externally_owned,
            priority: self.priority,
            conditions: self.conditions.clone(),
            bindings: self.bindings.clone(),
            finalizer: self.finalizer.clone(),
            closed: Mutex::new(BTreeMap::new()),
        });
        debug!(activation_type = %strategy.activation_type, "Closed open generic export");

        closed.insert(args, strategy.clone());
        Some(strategy)
    }
}

impl Debug for ExportStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportStrategy")
            .field("id", &self.id)
            .field("activation_type", &self.activation_type)
            .field("exports", &self.exports)
            .field("keyed_exports", &self.keyed_exports)
            .field("has_lifestyle", &self.lifestyle.is_some())
            .field("externally_owned", &self.externally_owned)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
