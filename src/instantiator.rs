use alloc::sync::Arc;
use tracing::debug;

use crate::{
    any::Value,
    dependency_resolver::Dependencies,
    descriptor::Arguments,
    errors::InstantiateErrorKind,
};

pub trait Instantiator<Deps>: Send + Sync + 'static
where
    Deps: Dependencies,
{
    type Provides: Send + Sync + 'static;
    type Error: Into<InstantiateErrorKind>;

    fn instantiate(&self, dependencies: Deps) -> Result<Self::Provides, Self::Error>;
}

pub(crate) type BoxedActivator = Arc<dyn Fn(Arguments) -> Result<Value, InstantiateErrorKind> + Send + Sync>;

#[must_use]
pub(crate) fn boxed_activator<Inst, Deps>(instantiator: Inst) -> BoxedActivator
where
    Inst: Instantiator<Deps>,
    Deps: Dependencies,
{
    Arc::new(move |arguments| {
        let dependencies = Deps::resolve(&arguments)?;
        let dependency = instantiator.instantiate(dependencies).map_err(Into::into)?;

        debug!("Activated");

        Ok(Arc::new(dependency) as Value)
    })
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, Err, $($ty,)*> Instantiator<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Result<Response, Err> + Send + Sync + 'static,
            Response: Send + Sync + 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: crate::dependency_resolver::DependencyResolver, )*
        {
            type Provides = Response;
            type Error = Err;

            fn instantiate(&self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Provides, Self::Error> {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_instantiator);

/// Wrapper to create an instantiator that just returns passed value.
/// It can be used when the value was created outside the container.
#[inline]
#[must_use]
pub fn instance<T: Clone + Send + Sync + 'static>(val: T) -> impl Instantiator<(), Provides = T, Error = InstantiateErrorKind> {
    move || Ok(val.clone())
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{boxed_activator, instance, InstantiateErrorKind, Instantiator};
    use crate::{
        any::Value,
        dependency_resolver::Dependencies,
        descriptor::Arguments,
        inject::Inject,
    };

    use alloc::{sync::Arc, vec};
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing::debug;
    use tracing_test::traced_test;

    struct Request(bool);
    struct Response(bool);

    #[test]
    #[allow(dead_code)]
    fn test_factory_helper() {
        fn resolver<Deps: Dependencies, F: Instantiator<Deps>>(_f: F) {}
        fn resolver_with_dep() {
            resolver(|| Ok::<_, InstantiateErrorKind>(()));
            resolver(|Inject(_request): Inject<Request>| Ok::<_, InstantiateErrorKind>(()));
        }
    }

    #[test]
    #[traced_test]
    fn test_boxed_activator() {
        let call_count = Arc::new(AtomicU8::new(0));

        let activator = boxed_activator({
            let call_count = call_count.clone();
            move |Inject(request): Inject<Request>| {
                call_count.fetch_add(1, Ordering::SeqCst);

                debug!("Call activator");
                Ok::<_, InstantiateErrorKind>(Response(request.0))
            }
        });

        let request = Arc::new(Request(true)) as Value;
        let response_1 = activator(Arguments::new(vec![request.clone()])).unwrap();
        let response_2 = activator(Arguments::new(vec![request])).unwrap();

        assert!(response_1.downcast::<Response>().unwrap().0);
        assert!(response_2.downcast::<Response>().unwrap().0);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
        assert!(logs_contain("Activated"));
    }

    #[test]
    #[traced_test]
    fn test_boxed_activator_error() {
        let activator = boxed_activator(|| Err::<Response, _>(InstantiateErrorKind::Custom(anyhow::anyhow!("boom"))));

        let err = activator(Arguments::new(vec![])).unwrap_err();
        assert!(matches!(err, InstantiateErrorKind::Custom(_)));
        assert!(!logs_contain("Activated"));
    }

    #[test]
    fn test_instance() {
        let activator = boxed_activator(instance(5_i32));
        let value = activator(Arguments::new(vec![])).unwrap();
        assert_eq!(*value.downcast::<i32>().unwrap(), 5);
    }
}
