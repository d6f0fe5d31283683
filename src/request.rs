use alloc::{sync::Arc, vec::Vec};

use crate::{any::TypeKey, expression::Expression, key::Key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Root,
    ConstructorParameter,
    Wrapper,
    Enumerable,
}

/// Value already available while building a plan, such as a `Func` argument
#[derive(Clone, Debug)]
pub struct KnownValue {
    type_key: TypeKey,
    expression: Expression,
}

impl KnownValue {
    #[inline]
    #[must_use]
    pub fn new(type_key: TypeKey, expression: Expression) -> Self {
        Self { type_key, expression }
    }

    #[inline]
    #[must_use]
    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    #[inline]
    #[must_use]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

/// Request to build a plan for a type within an object graph.
///
/// Child requests borrow their parent, so the chain of requests
/// from the root is available for known values, conditions and error paths.
#[derive(Debug)]
pub struct ActivationRequest<'a> {
    type_key: TypeKey,
    key: Option<Key>,
    depth: usize,
    request_type: RequestType,
    parent: Option<&'a ActivationRequest<'a>>,
    known_values: Vec<KnownValue>,
    injected_into: Option<TypeKey>,
    parameter: Option<Arc<str>>,
}

impl ActivationRequest<'static> {
    #[inline]
    #[must_use]
    pub fn root(type_key: TypeKey, key: Option<Key>) -> Self {
        Self {
            type_key,
            key,
            depth: 1,
            request_type: RequestType::Root,
            parent: None,
            known_values: Vec::new(),
            injected_into: None,
            parameter: None,
        }
    }
}

impl<'a> ActivationRequest<'a> {
    #[must_use]
    pub fn child(&self, type_key: TypeKey, key: Option<Key>, request_type: RequestType) -> ActivationRequest<'_> {
        ActivationRequest {
            type_key,
            key,
            depth: self.depth + 1,
            request_type,
            parent: Some(self),
            known_values: Vec::new(),
            injected_into: None,
            parameter: None,
        }
    }

    /// Records the type and parameter the requested value is injected into
    #[inline]
    #[must_use]
    pub fn injected_into(mut self, activation_type: TypeKey, parameter: Arc<str>) -> Self {
        self.injected_into = Some(activation_type);
        self.parameter = Some(parameter);
        self
    }

    #[inline]
    pub fn add_known_value(&mut self, known_value: KnownValue) {
        self.known_values.push(known_value);
    }

    /// Finds a known value of `type_key` in this request or its ancestors, nearest first
    #[must_use]
    pub fn find_known_value(&self, type_key: &TypeKey) -> Option<&KnownValue> {
        let mut request = Some(self);
        while let Some(current) = request {
            if let Some(known_value) = current
                .known_values
                .iter()
                .find(|known_value| &known_value.type_key == type_key)
            {
                return Some(known_value);
            }
            request = current.parent;
        }
        None
    }

    #[inline]
    #[must_use]
    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    #[must_use]
    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&ActivationRequest<'a>> {
        self.parent
    }

    /// Type whose constructor the requested value is injected into
    #[inline]
    #[must_use]
    pub fn injection_target(&self) -> Option<&TypeKey> {
        self.injected_into.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn parameter_name(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// Requested types from the root request to this one
    #[must_use]
    pub fn path(&self) -> Vec<TypeKey> {
        let mut path = Vec::with_capacity(self.depth);
        let mut request = Some(self);
        while let Some(current) = request {
            path.push(current.type_key.clone());
            request = current.parent;
        }
        path.reverse();
        path
    }
}
