use alloc::{format, vec::Vec};

use crate::{
    descriptor::{Arguments, Parameter},
    errors::InstantiateErrorKind,
};

/// Typed view of a single activator argument
pub trait DependencyResolver: Sized {
    /// Declares the parameter located for the argument at `index`
    fn parameter(index: usize) -> Parameter;

    fn resolve(arguments: &Arguments, index: usize) -> Result<Self, InstantiateErrorKind>;
}

/// Typed view of all activator arguments
pub trait Dependencies: Sized {
    fn parameters() -> Vec<Parameter>;

    fn resolve(arguments: &Arguments) -> Result<Self, InstantiateErrorKind>;
}

#[inline]
#[must_use]
pub(crate) fn positional_name(index: usize) -> alloc::string::String {
    format!("arg{index}")
}

macro_rules! impl_dependencies {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut, unused_assignments, unused_variables)]
        impl<$($ty,)*> Dependencies for ($($ty,)*)
        where
            $( $ty: DependencyResolver, )*
        {
            #[inline]
            fn parameters() -> Vec<Parameter> {
                let mut parameters = Vec::with_capacity(count_idents!($($ty),*));
                $( parameters.push($ty::parameter(parameters.len())); )*
                parameters
            }

            #[inline]
            fn resolve(arguments: &Arguments) -> Result<Self, InstantiateErrorKind> {
                let expected = count_idents!($($ty),*);
                if arguments.len() != expected {
                    return Err(InstantiateErrorKind::ArgumentCount {
                        expected,
                        actual: arguments.len(),
                    });
                }

                let mut index = 0;
                $(
                    let $ty = $ty::resolve(arguments, index)?;
                    index += 1;
                )*
                Ok(($($ty,)*))
            }
        }
    };
}

all_the_tuples!(impl_dependencies);
