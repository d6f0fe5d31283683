use alloc::sync::Arc;
use core::any::type_name;
use tracing::warn;

use crate::any::Value;

pub trait Finalizer<Dep>: Send + Sync + 'static {
    fn finalize(&self, dependency: Arc<Dep>);
}

impl<F, Dep> Finalizer<Dep> for F
where
    F: Fn(Arc<Dep>) + Send + Sync + 'static,
{
    #[inline]
    fn finalize(&self, dependency: Arc<Dep>) {
        self(dependency);
    }
}

/// Instances releasing resources when their disposal scope is disposed.
///
/// Register it with [`crate::TypeDescriptor::disposable`].
pub trait Disposable: Send + Sync + 'static {
    fn dispose(&self);
}

/// Type-erased finalizer, invoked with the tracked instance
pub type BoxedFinalizer = Arc<dyn Fn(&Value) + Send + Sync>;

#[must_use]
pub(crate) fn boxed_finalizer_factory<Dep, Fin>(finalizer: Fin) -> BoxedFinalizer
where
    Dep: Send + Sync + 'static,
    Fin: Finalizer<Dep>,
{
    Arc::new(move |value: &Value| match value.clone().downcast::<Dep>() {
        Ok(dependency) => finalizer.finalize(dependency),
        Err(_) => warn!(expected = type_name::<Dep>(), "Finalizer skipped an instance of another type"),
    })
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{boxed_finalizer_factory, Disposable};
    use crate::any::Value;

    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing_test::traced_test;

    struct Connection(AtomicU8);

    impl Disposable for Connection {
        fn dispose(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    #[traced_test]
    fn test_boxed_finalizer() {
        let finalizer = boxed_finalizer_factory(|connection: Arc<Connection>| connection.dispose());

        let connection = Arc::new(Connection(AtomicU8::new(0)));
        finalizer(&(connection.clone() as Value));
        finalizer(&(Arc::new(1_i32) as Value));

        assert_eq!(connection.0.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Finalizer skipped an instance of another type"));
    }
}
