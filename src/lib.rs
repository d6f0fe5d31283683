#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod builder;
pub(crate) mod cache;
pub(crate) mod compiler;
pub(crate) mod config;
pub(crate) mod constructor;
pub(crate) mod container;
pub(crate) mod context;
pub(crate) mod dependency_resolver;
pub(crate) mod descriptor;
pub(crate) mod disposal;
pub(crate) mod errors;
pub(crate) mod expression;
pub(crate) mod finalizer;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod key;
pub(crate) mod lifestyle;
pub(crate) mod registry;
pub(crate) mod request;
pub(crate) mod scope;
pub(crate) mod strategy;

pub mod wrappers;

pub use any::{is_absent, Absent, TypeKey, Value};
pub use builder::ActivationExpressionBuilder;
pub use compiler::ActivationDelegate;
pub use config::{default_keyed_type_selector, AmbiguousExportPolicy, Config, ConstructorSelectionMethod, KeyedTypeSelector};
pub use constructor::ConstructorSelector;
pub use container::{Container, WeakContainer};
pub use context::InjectionContext;
pub use dependency_resolver::{Dependencies, DependencyResolver};
pub use descriptor::{Arguments, Constructor, Parameter, TypeDescriptor};
pub use disposal::DisposalScope;
pub use errors::{ConfigErrorKind, InstantiateErrorKind, ResolveErrorKind};
pub use expression::{ActivationExpressionResult, CacheLocation, DeferredActivation, ExportFactory, Expression, ValueProvider};
pub use finalizer::{BoxedFinalizer, Disposable, Finalizer};
pub use inject::{Inject, InjectAll, InjectContext, InjectFunc, InjectLazy, InjectScope};
pub use instantiator::{instance, Instantiator};
pub use key::Key;
pub use lifestyle::{Lifestyle, Scoped, Singleton, SingletonPerNamedScope};
pub use registry::{ExportBuilder, Registry, RegistryBuilder};
pub use request::{ActivationRequest, KnownValue, RequestType};
pub use scope::ScopeData;
pub use strategy::{ExportCondition, ExportStrategy, ParameterBinding, ParameterSelector, WhenInjectedInto};
pub use wrappers::{Enumerable, EnumerableCreator, Func, KeyedLocateDelegate, Lazy, WrapperStrategy};
