mod enumerable;
mod func;
mod keyed;
mod lazy;

pub use enumerable::{Enumerable, EnumerableCreator, EnumerableWrapperStrategy};
pub use func::{Func, FuncWrapperStrategy};
pub use keyed::{KeyedLocateDelegate, KeyedLocateDelegateWrapperStrategy};
pub use lazy::{Lazy, LazyWrapperStrategy};

use alloc::{sync::Arc, vec::Vec};

use crate::{
    any::TypeKey,
    builder::ActivationExpressionBuilder,
    errors::ResolveErrorKind,
    expression::ActivationExpressionResult,
    request::{ActivationRequest, RequestType},
};

/// Largest `Func` arity supported out of the box
pub const MAX_FUNC_ARITY: usize = 4;

/// Recognizes a generic shape, such as `Func<T>` or `Lazy<T>`,
/// and builds a plan producing the wrapper instead of locating an export of the shape itself.
pub trait WrapperStrategy: Send + Sync {
    /// Type produced by the wrapper, `None` if `type_key` isn't of the wrapper shape
    fn get_wrapped_type(&self, type_key: &TypeKey) -> Option<TypeKey>;

    /// By default the wrapped type must be locatable with the key of the request
    fn can_locate(&self, builder: &ActivationExpressionBuilder<'_>, request: &ActivationRequest<'_>) -> bool {
        let Some(wrapped_type) = self.get_wrapped_type(request.type_key()) else {
            return false;
        };
        let child = request.child(wrapped_type, request.key().cloned(), RequestType::Wrapper);
        builder.can_locate(&child)
    }

    /// # Errors
    /// Returns any error raised while building the plan of the wrapped type
    fn get_activation_expression(
        &self,
        builder: &ActivationExpressionBuilder<'_>,
        request: &ActivationRequest<'_>,
    ) -> Result<ActivationExpressionResult, ResolveErrorKind>;
}

pub(crate) fn default_wrappers() -> Vec<Arc<dyn WrapperStrategy>> {
    let mut wrappers: Vec<Arc<dyn WrapperStrategy>> = (0..=MAX_FUNC_ARITY)
        .map(|arity| Arc::new(FuncWrapperStrategy::new(arity)) as Arc<dyn WrapperStrategy>)
        .collect();
    wrappers.push(Arc::new(LazyWrapperStrategy));
    wrappers.push(Arc::new(EnumerableWrapperStrategy));
    wrappers.push(Arc::new(KeyedLocateDelegateWrapperStrategy));
    wrappers
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::default_wrappers;
    use crate::any::TypeKey;

    #[test]
    fn test_wrapped_types() {
        let wrapped = |type_key: TypeKey| {
            default_wrappers()
                .iter()
                .find_map(|wrapper| wrapper.get_wrapped_type(&type_key))
        };
        let basic = TypeKey::named("Basic");

        assert_eq!(wrapped(TypeKey::func([], basic.clone())), Some(basic.clone()));
        assert_eq!(
            wrapped(TypeKey::func([TypeKey::of::<i32>(), TypeKey::of::<u8>()], basic.clone())),
            Some(basic.clone())
        );
        assert_eq!(wrapped(TypeKey::lazy(basic.clone())), Some(basic.clone()));
        assert_eq!(wrapped(TypeKey::enumerable(basic.clone())), Some(basic.clone()));
        assert_eq!(
            wrapped(TypeKey::keyed_locate_delegate(TypeKey::of::<&str>(), basic.clone())),
            Some(basic.clone())
        );
        assert_eq!(wrapped(TypeKey::generic("List", [basic.clone()])), None);
        assert_eq!(wrapped(basic), None);

        let too_many = (0..=super::MAX_FUNC_ARITY).map(|_| TypeKey::of::<i32>());
        assert_eq!(wrapped(TypeKey::func(too_many, TypeKey::named("Basic"))), None);
    }
}
