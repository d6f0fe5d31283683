use alloc::{sync::Arc, vec::Vec};
use core::{any::type_name, slice};

use super::WrapperStrategy;
use crate::{
    any::{TypeKey, Value, ENUMERABLE},
    builder::ActivationExpressionBuilder,
    errors::ResolveErrorKind,
    expression::{ActivationExpressionResult, Expression},
    request::ActivationRequest,
};

/// Creates the value of enumerable requests from the located items
pub trait EnumerableCreator: Send + Sync {
    fn create_enumerable(&self, element_type: &TypeKey, items: Vec<Value>) -> Value;
}

impl<F> EnumerableCreator for F
where
    F: Fn(&TypeKey, Vec<Value>) -> Value + Send + Sync,
{
    #[inline]
    fn create_enumerable(&self, element_type: &TypeKey, items: Vec<Value>) -> Value {
        self(element_type, items)
    }
}

/// Every export of an element type, in registration order
#[derive(Debug, Clone)]
pub struct Enumerable {
    element_type: TypeKey,
    items: Vec<Value>,
}

impl Enumerable {
    #[inline]
    #[must_use]
    pub fn new(element_type: TypeKey, items: Vec<Value>) -> Self {
        Self { element_type, items }
    }

    #[inline]
    #[must_use]
    pub fn element_type(&self) -> &TypeKey {
        &self.element_type
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Value> {
        self.items.iter()
    }

    #[inline]
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<Value> {
        self.items
    }

    /// # Errors
    /// Returns [`ResolveErrorKind::IncorrectType`] if an item isn't a `T`
    pub fn downcast_all<T: Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, ResolveErrorKind> {
        self.items
            .iter()
            .map(|item| {
                item.clone().downcast().map_err(|_| ResolveErrorKind::IncorrectType {
                    type_key: self.element_type.clone(),
                    expected: type_name::<T>(),
                })
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a Enumerable {
    type Item = &'a Value;
    type IntoIter = slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct EnumerableWrapperStrategy;

impl WrapperStrategy for EnumerableWrapperStrategy {
    fn get_wrapped_type(&self, type_key: &TypeKey) -> Option<TypeKey> {
        match type_key.args() {
            [element_type] if type_key.name() == ENUMERABLE => Some(element_type.clone()),
            _ => None,
        }
    }

    /// An empty enumerable is a valid value
    fn can_locate(&self, _builder: &ActivationExpressionBuilder<'_>, request: &ActivationRequest<'_>) -> bool {
        self.get_wrapped_type(request.type_key()).is_some()
    }

    fn get_activation_expression(
        &self,
        builder: &ActivationExpressionBuilder<'_>,
        request: &ActivationRequest<'_>,
    ) -> Result<ActivationExpressionResult, ResolveErrorKind> {
        let Some(element_type) = self.get_wrapped_type(request.type_key()) else {
            return Err(ResolveErrorKind::Unresolvable {
                type_key: request.type_key().clone(),
                key: request.key().cloned(),
            });
        };
        let items = builder.enumerable_items(request, &element_type)?;

        let creator = builder.config().custom_enumerable_creator.clone();
        Ok(ActivationExpressionResult::compose(items, |items| Expression::Enumerable {
            element_type,
            items,
            creator,
        }))
    }
}
