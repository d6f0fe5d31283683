use alloc::{collections::BTreeMap, sync::Arc};
use core::fmt::{self, Debug, Formatter};

use crate::any::Value;

/// Per-locate bag of extra data.
///
/// Wrapper arguments are passed to compiled plans through it under unique identifiers,
/// and factories can read caller-supplied data from it.
#[derive(Clone, Default)]
pub struct InjectionContext {
    extra_data: BTreeMap<Arc<str>, Value>,
}

impl InjectionContext {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets extra data, returning the previous value under the same identifier
    #[inline]
    pub fn set_extra_data(&mut self, id: impl Into<Arc<str>>, value: Value) -> Option<Value> {
        self.extra_data.insert(id.into(), value)
    }

    #[inline]
    #[must_use]
    pub fn with_extra_data(mut self, id: impl Into<Arc<str>>, value: Value) -> Self {
        self.set_extra_data(id, value);
        self
    }

    #[inline]
    #[must_use]
    pub fn get_extra_data(&self, id: &str) -> Option<&Value> {
        self.extra_data.get(id)
    }

    /// Gets extra data downcast to `T`
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, id: &str) -> Option<Arc<T>> {
        self.get_extra_data(id)?.clone().downcast().ok()
    }

    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.extra_data.keys().map(|id| &**id)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.extra_data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extra_data.is_empty()
    }
}

impl Debug for InjectionContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::InjectionContext;
    use crate::any::Value;

    use alloc::{sync::Arc, vec::Vec};

    #[test]
    fn test_extra_data() {
        let mut context = InjectionContext::new();
        assert!(context.is_empty());

        assert!(context.set_extra_data("a", Arc::new(1_i32) as Value).is_none());
        assert!(context.set_extra_data("a", Arc::new(2_i32) as Value).is_some());
        let context = context.with_extra_data("b", Arc::new("value"));

        assert_eq!(context.len(), 2);
        assert_eq!(context.get::<i32>("a").as_deref(), Some(&2));
        assert_eq!(context.get::<&str>("b").as_deref(), Some(&"value"));
        assert!(context.get::<i32>("b").is_none());
        assert!(context.get::<i32>("c").is_none());
        assert_eq!(context.keys().collect::<Vec<_>>(), ["a", "b"]);
    }
}
