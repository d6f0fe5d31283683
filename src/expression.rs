use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::fmt::{self, Debug, Formatter};

use crate::{
    any::{TypeKey, Value},
    cache::{InstanceCell, SlotId},
    container::Container,
    context::InjectionContext,
    descriptor::Constructor,
    disposal::DisposalScope,
    errors::{InstantiateErrorKind, ResolveErrorKind},
    finalizer::BoxedFinalizer,
    wrappers::EnumerableCreator,
};

pub type ExportFactory =
    Arc<dyn Fn(&Container, &InjectionContext) -> Result<Option<Value>, InstantiateErrorKind> + Send + Sync>;
pub type ValueProvider = Arc<dyn Fn(&Container, &InjectionContext) -> Result<Value, InstantiateErrorKind> + Send + Sync>;

/// Part of a plan that creates its value when the plan runs, such as a wrapper instance
pub trait DeferredActivation: Send + Sync {
    /// # Errors
    /// Returns any error raised while creating the value
    fn activate(&self, scope: &Container, disposal: &DisposalScope, context: &InjectionContext) -> Result<Value, ResolveErrorKind>;
}

/// Where a lifestyle keeps its instance
#[derive(Clone)]
pub struct CacheLocation(pub(crate) CacheKind);

#[derive(Clone)]
pub(crate) enum CacheKind {
    Root(Arc<InstanceCell>),
    Scope(SlotId),
    NamedScope { name: Arc<str>, slot: SlotId },
}

impl CacheLocation {
    #[inline]
    #[must_use]
    pub(crate) fn root(cell: Arc<InstanceCell>) -> Self {
        Self(CacheKind::Root(cell))
    }

    #[inline]
    #[must_use]
    pub(crate) fn scope(slot: SlotId) -> Self {
        Self(CacheKind::Scope(slot))
    }

    #[inline]
    #[must_use]
    pub(crate) fn named_scope(name: Arc<str>, slot: SlotId) -> Self {
        Self(CacheKind::NamedScope { name, slot })
    }
}

impl Debug for CacheLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.0 {
            CacheKind::Root(_) => f.write_str("Root"),
            CacheKind::Scope(slot) => write!(f, "Scope({slot})"),
            CacheKind::NamedScope { name, slot } => write!(f, "NamedScope({name:?}, {slot})"),
        }
    }
}

/// Activation plan for a value.
///
/// Plans are built once per requested type and key, then compiled into an [`crate::ActivationDelegate`].
#[derive(Clone)]
pub enum Expression {
    Constant(Value),
    Construct {
        type_key: TypeKey,
        constructor: Constructor,
        arguments: Vec<Expression>,
    },
    Factory {
        type_key: TypeKey,
        factory: ExportFactory,
        allow_null: bool,
    },
    Provider(ValueProvider),
    /// Reads a value bound to `id` in the injection context
    ExtraData {
        id: Arc<str>,
        type_key: TypeKey,
    },
    LocatorScope,
    InjectionScope,
    InjectionContext,
    TrackDisposal {
        inner: Box<Expression>,
        finalizer: BoxedFinalizer,
    },
    Cached {
        cache: CacheLocation,
        inner: Box<Expression>,
    },
    Deferred(Arc<dyn DeferredActivation>),
    Enumerable {
        element_type: TypeKey,
        items: Vec<Expression>,
        creator: Option<Arc<dyn EnumerableCreator>>,
    },
}

impl Expression {
    /// Metadata of this node alone, without its children
    fn node_metadata(&self) -> Metadata {
        Metadata {
            uses_disposal_scope: matches!(self, Self::TrackDisposal { .. } | Self::Deferred(_)),
            reusable: !matches!(self, Self::ExtraData { .. }),
        }
    }

    fn metadata(&self) -> Metadata {
        let node = self.node_metadata();
        match self {
            Self::Construct { arguments, .. } => arguments.iter().map(Self::metadata).fold(node, Metadata::merge),
            Self::TrackDisposal { inner, .. } | Self::Cached { inner, .. } => node.merge(inner.metadata()),
            Self::Enumerable { items, .. } => items.iter().map(Self::metadata).fold(node, Metadata::merge),
            _ => node,
        }
    }
}

#[derive(Clone, Copy)]
struct Metadata {
    uses_disposal_scope: bool,
    reusable: bool,
}

impl Metadata {
    #[inline]
    fn merge(self, other: Self) -> Self {
        Self {
            uses_disposal_scope: self.uses_disposal_scope || other.uses_disposal_scope,
            reusable: self.reusable && other.reusable,
        }
    }
}

impl Debug for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(_) => f.write_str("Constant"),
            Self::Construct { type_key, arguments, .. } => f
                .debug_struct("Construct")
                .field("type_key", type_key)
                .field("arguments", arguments)
                .finish_non_exhaustive(),
            Self::Factory { type_key, .. } => f.debug_struct("Factory").field("type_key", type_key).finish_non_exhaustive(),
            Self::Provider(_) => f.write_str("Provider"),
            Self::ExtraData { id, type_key } => f.debug_struct("ExtraData").field("id", id).field("type_key", type_key).finish(),
            Self::LocatorScope => f.write_str("LocatorScope"),
            Self::InjectionScope => f.write_str("InjectionScope"),
            Self::InjectionContext => f.write_str("InjectionContext"),
            Self::TrackDisposal { inner, .. } => f.debug_tuple("TrackDisposal").field(inner).finish(),
            Self::Cached { cache, inner } => f.debug_struct("Cached").field("cache", cache).field("inner", inner).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
            Self::Enumerable { element_type, items, .. } => f
                .debug_struct("Enumerable")
                .field("element_type", element_type)
                .field("items", items)
                .finish_non_exhaustive(),
        }
    }
}

/// Plan with metadata about what it needs at run time
#[derive(Clone, Debug)]
pub struct ActivationExpressionResult {
    pub expression: Expression,
    /// The plan tracks instances or hands the disposal scope to wrappers
    pub uses_disposal_scope: bool,
    /// The plan doesn't read wrapper arguments, so it can be cached and shared between requests
    pub reusable: bool,
}

impl ActivationExpressionResult {
    /// Walks the whole plan to collect its metadata
    #[must_use]
    pub fn new(expression: Expression) -> Self {
        let metadata = expression.metadata();
        Self::from_metadata(expression, metadata)
    }

    /// Builds a plan from child plans whose metadata is already known.
    ///
    /// Only the node returned by `f` is inspected.
    #[must_use]
    pub fn compose(children: Vec<ActivationExpressionResult>, f: impl FnOnce(Vec<Expression>) -> Expression) -> Self {
        let mut metadata = Metadata {
            uses_disposal_scope: false,
            reusable: true,
        };
        let children = children
            .into_iter()
            .map(|child| {
                metadata = metadata.merge(child.metadata());
                child.expression
            })
            .collect();
        let expression = f(children);
        let metadata = metadata.merge(expression.node_metadata());
        Self::from_metadata(expression, metadata)
    }

    /// Wraps the plan in a new node. `f` must keep the plan as a child of that node.
    #[inline]
    #[must_use]
    pub fn map(self, f: impl FnOnce(Expression) -> Expression) -> Self {
        let metadata = self.metadata();
        let expression = f(self.expression);
        let metadata = metadata.merge(expression.node_metadata());
        Self::from_metadata(expression, metadata)
    }

    #[inline]
    fn metadata(&self) -> Metadata {
        Metadata {
            uses_disposal_scope: self.uses_disposal_scope,
            reusable: self.reusable,
        }
    }

    #[inline]
    fn from_metadata(expression: Expression, metadata: Metadata) -> Self {
        Self {
            expression,
            uses_disposal_scope: metadata.uses_disposal_scope,
            reusable: metadata.reusable,
        }
    }
}

impl From<Expression> for ActivationExpressionResult {
    fn from(expression: Expression) -> Self {
        Self::new(expression)
    }
}
