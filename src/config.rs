use alloc::sync::Arc;
use core::fmt::{self, Debug, Formatter};

use crate::{any::TypeKey, constructor::ConstructorSelector, errors::ConfigErrorKind, wrappers::EnumerableCreator};

pub type KeyedTypeSelector = Arc<dyn Fn(&TypeKey) -> bool + Send + Sync>;

/// Strategy used to pick a constructor when a type has several
#[derive(Clone, Default)]
pub enum ConstructorSelectionMethod {
    /// Prefers constructors whose parameters can all be satisfied, then the one satisfying the most parameters
    #[default]
    BestMatch,
    MostParameters,
    LeastParameters,
    Other(Arc<dyn ConstructorSelector>),
}

impl Debug for ConstructorSelectionMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::BestMatch => f.write_str("BestMatch"),
            Self::MostParameters => f.write_str("MostParameters"),
            Self::LeastParameters => f.write_str("LeastParameters"),
            Self::Other(_) => f.write_str("Other"),
        }
    }
}

/// What to do when several exports of the same priority match a single-value request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguousExportPolicy {
    /// The most recently registered export wins
    #[default]
    LastRegistered,
    /// Fail with [`crate::ResolveErrorKind::AmbiguousExport`]
    Error,
}

/// Types that are located by key when injected into a constructor parameter:
/// the parameter name is tried as the key first.
#[must_use]
pub fn default_keyed_type_selector(type_key: &TypeKey) -> bool {
    type_key.is_primitive()
}

/// Compilation behavior of a container
/// ## Fields
/// - `max_object_graph_depth`:
///   Depth at which building an object graph fails with [`crate::ResolveErrorKind::GraphDepthExceeded`].
///   Recursive graphs are detected this way.
/// - `allow_injection_scope_location`:
///   If `false`, the root scope can't be injected through [`TypeKey::injection_scope`].
/// - `allow_instance_and_factory_to_return_null`:
///   If `true`, a factory returning nothing produces [`crate::Absent`] instead of an error.
/// - `auto_register_unknown`:
///   If `true`, known types that have no export are activated as transients.
#[derive(Clone)]
pub struct Config {
    pub max_object_graph_depth: usize,
    pub allow_injection_scope_location: bool,
    pub constructor_selection: ConstructorSelectionMethod,
    pub custom_enumerable_creator: Option<Arc<dyn EnumerableCreator>>,
    pub allow_instance_and_factory_to_return_null: bool,
    pub auto_register_unknown: bool,
    pub ambiguous_export_policy: AmbiguousExportPolicy,
    keyed_type_selector: KeyedTypeSelector,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_object_graph_depth: 100,
            allow_injection_scope_location: false,
            constructor_selection: ConstructorSelectionMethod::BestMatch,
            custom_enumerable_creator: None,
            allow_instance_and_factory_to_return_null: false,
            auto_register_unknown: true,
            ambiguous_export_policy: AmbiguousExportPolicy::LastRegistered,
            keyed_type_selector: Arc::new(default_keyed_type_selector),
        }
    }
}

impl Config {
    #[inline]
    #[must_use]
    pub fn with_max_object_graph_depth(mut self, depth: usize) -> Self {
        self.max_object_graph_depth = depth;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_constructor_selection(mut self, method: ConstructorSelectionMethod) -> Self {
        self.constructor_selection = method;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_ambiguous_export_policy(mut self, policy: AmbiguousExportPolicy) -> Self {
        self.ambiguous_export_policy = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_enumerable_creator(mut self, creator: impl EnumerableCreator + 'static) -> Self {
        self.custom_enumerable_creator = Some(Arc::new(creator));
        self
    }

    /// Replaces the keyed type selector
    ///
    /// # Errors
    /// Returns [`ConfigErrorKind::MissingKeyedTypeSelector`] if `selector` is `None`
    pub fn with_keyed_type_selector<F>(mut self, selector: Option<F>) -> Result<Self, ConfigErrorKind>
    where
        F: Fn(&TypeKey) -> bool + Send + Sync + 'static,
    {
        let selector = selector.ok_or(ConfigErrorKind::MissingKeyedTypeSelector)?;
        self.keyed_type_selector = Arc::new(selector);
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn keyed_type_selector(&self) -> &KeyedTypeSelector {
        &self.keyed_type_selector
    }

    #[inline]
    #[must_use]
    pub fn is_keyed_type(&self, type_key: &TypeKey) -> bool {
        (self.keyed_type_selector)(type_key)
    }

    /// # Errors
    /// Returns [`ConfigErrorKind::ZeroMaxObjectGraphDepth`] if the max depth is zero
    pub fn validate(&self) -> Result<(), ConfigErrorKind> {
        if self.max_object_graph_depth == 0 {
            return Err(ConfigErrorKind::ZeroMaxObjectGraphDepth);
        }
        Ok(())
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("max_object_graph_depth", &self.max_object_graph_depth)
            .field("allow_injection_scope_location", &self.allow_injection_scope_location)
            .field("constructor_selection", &self.constructor_selection)
            .field("custom_enumerable_creator", &self.custom_enumerable_creator.is_some())
            .field(
                "allow_instance_and_factory_to_return_null",
                &self.allow_instance_and_factory_to_return_null,
            )
            .field("auto_register_unknown", &self.auto_register_unknown)
            .field("ambiguous_export_policy", &self.ambiguous_export_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{AmbiguousExportPolicy, Config, ConstructorSelectionMethod};
    use crate::{any::TypeKey, errors::ConfigErrorKind};

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.max_object_graph_depth, 100);
        assert!(!config.allow_injection_scope_location);
        assert!(matches!(config.constructor_selection, ConstructorSelectionMethod::BestMatch));
        assert!(config.custom_enumerable_creator.is_none());
        assert!(!config.allow_instance_and_factory_to_return_null);
        assert_eq!(config.ambiguous_export_policy, AmbiguousExportPolicy::LastRegistered);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_keyed_type_selector() {
        let config = Config::default();
        assert!(config.is_keyed_type(&TypeKey::of::<i32>()));
        assert!(config.is_keyed_type(&TypeKey::of::<alloc::string::String>()));
        assert!(!config.is_keyed_type(&TypeKey::named("Basic")));

        let config = config
            .with_keyed_type_selector(Some(|type_key: &TypeKey| type_key.name() == "Basic"))
            .unwrap();
        assert!(config.is_keyed_type(&TypeKey::named("Basic")));
        assert!(!config.is_keyed_type(&TypeKey::of::<i32>()));

        let missing: Option<fn(&TypeKey) -> bool> = None;
        assert!(matches!(
            Config::default().with_keyed_type_selector(missing),
            Err(ConfigErrorKind::MissingKeyedTypeSelector)
        ));
    }

    #[test]
    fn test_validate() {
        let config = Config::default().with_max_object_graph_depth(0);
        assert!(matches!(config.validate(), Err(ConfigErrorKind::ZeroMaxObjectGraphDepth)));
    }
}
