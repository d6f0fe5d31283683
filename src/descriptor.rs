use alloc::{sync::Arc, vec::Vec};
use core::{
    any::type_name,
    fmt::{self, Debug, Formatter},
};
use tracing::debug;

use crate::{
    any::{TypeKey, Value},
    dependency_resolver::Dependencies,
    errors::InstantiateErrorKind,
    finalizer::{boxed_finalizer_factory, BoxedFinalizer, Disposable, Finalizer},
    instantiator::{boxed_activator, BoxedActivator, Instantiator},
};

/// Constructor parameter
#[derive(Clone)]
pub struct Parameter {
    name: Arc<str>,
    type_key: TypeKey,
    default: Option<Value>,
    required: bool,
}

impl Parameter {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, type_key: TypeKey) -> Self {
        Self {
            name: name.into(),
            type_key,
            default: None,
            required: true,
        }
    }

    /// Value used when nothing can be located for the parameter
    #[inline]
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Marks the parameter as optional: [`crate::Absent`] is passed when nothing can be located
    #[inline]
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub(crate) fn shared_name(&self) -> &Arc<str> {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    #[inline]
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }
}

impl Debug for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("type_key", &self.type_key)
            .field("has_default", &self.default.is_some())
            .field("required", &self.required)
            .finish()
    }
}

/// Located values passed to an activator, in parameter order
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    #[inline]
    #[must_use]
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Gets the argument at `index` downcast to `T`
    ///
    /// # Errors
    /// - Returns [`InstantiateErrorKind::ArgumentCount`] if there is no argument at `index`
    /// - Returns [`InstantiateErrorKind::ArgumentType`] if the argument isn't an instance of `T`
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, InstantiateErrorKind> {
        let Some(value) = self.values.get(index) else {
            return Err(InstantiateErrorKind::ArgumentCount {
                expected: index + 1,
                actual: self.values.len(),
            });
        };
        value.clone().downcast().map_err(|_| InstantiateErrorKind::ArgumentType {
            index,
            expected: type_name::<T>(),
        })
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<Value> {
        self.values
    }
}

/// Way to activate a type: parameters to locate and the activator they are passed to
#[derive(Clone)]
pub struct Constructor {
    parameters: Arc<[Parameter]>,
    activator: BoxedActivator,
}

impl Constructor {
    #[must_use]
    pub fn new<F, T, E>(parameters: impl IntoIterator<Item = Parameter>, activator: F) -> Self
    where
        F: Fn(Arguments) -> Result<T, E> + Send + Sync + 'static,
        T: Send + Sync + 'static,
        E: Into<InstantiateErrorKind>,
    {
        Self {
            parameters: parameters.into_iter().collect(),
            activator: Arc::new(move |arguments| {
                let instance = activator(arguments).map_err(Into::into)?;
                debug!("Activated");
                Ok(Arc::new(instance) as Value)
            }),
        }
    }

    /// Creates a constructor whose parameters are described by the instantiator arguments
    #[must_use]
    pub fn of<Inst, Deps>(instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: Dependencies,
    {
        Self {
            parameters: Deps::parameters().into(),
            activator: boxed_activator(instantiator),
        }
    }

    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub(crate) fn activate(&self, arguments: Arguments) -> Result<Value, InstantiateErrorKind> {
        if arguments.len() != self.parameters.len() {
            return Err(InstantiateErrorKind::ArgumentCount {
                expected: self.parameters.len(),
                actual: arguments.len(),
            });
        }
        (self.activator)(arguments)
    }
}

impl Debug for Constructor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Constructor").field(&self.parameters).finish()
    }
}

pub(crate) type GenericCloser = Arc<dyn Fn(&[TypeKey]) -> Vec<Constructor> + Send + Sync>;

/// Describes how to activate a type.
///
/// An open generic descriptor produces the constructors of each closed type
/// from its generic arguments.
#[derive(Clone)]
pub struct TypeDescriptor {
    type_key: TypeKey,
    constructors: Vec<Constructor>,
    closer: Option<GenericCloser>,
    finalizer: Option<BoxedFinalizer>,
}

impl TypeDescriptor {
    #[inline]
    #[must_use]
    pub fn new(type_key: TypeKey) -> Self {
        Self {
            type_key,
            constructors: Vec::new(),
            closer: None,
            finalizer: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>())
    }

    #[must_use]
    pub fn open_generic<F>(name: impl Into<Arc<str>>, arity: usize, closer: F) -> Self
    where
        F: Fn(&[TypeKey]) -> Vec<Constructor> + Send + Sync + 'static,
    {
        Self {
            type_key: TypeKey::open(name, arity),
            constructors: Vec::new(),
            closer: Some(Arc::new(closer)),
            finalizer: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_instantiator<Inst, Deps>(self, instantiator: Inst) -> Self
    where
        Inst: Instantiator<Deps>,
        Deps: Dependencies,
    {
        self.with_constructor(Constructor::of(instantiator))
    }

    /// Sets finalizer called when the disposal scope tracking an instance is disposed
    #[inline]
    #[must_use]
    pub fn with_finalizer<Dep, Fin>(mut self, finalizer: Fin) -> Self
    where
        Dep: Send + Sync + 'static,
        Fin: Finalizer<Dep>,
    {
        self.finalizer = Some(boxed_finalizer_factory(finalizer));
        self
    }

    #[inline]
    #[must_use]
    pub fn disposable<T: Disposable>(self) -> Self {
        self.with_finalizer(|instance: Arc<T>| instance.dispose())
    }

    #[inline]
    #[must_use]
    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    #[inline]
    #[must_use]
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    #[inline]
    #[must_use]
    pub fn is_open_generic(&self) -> bool {
        self.closer.is_some()
    }

    #[inline]
    #[must_use]
    pub(crate) fn finalizer(&self) -> Option<&BoxedFinalizer> {
        self.finalizer.as_ref()
    }

    /// Closes an open generic descriptor with `args`
    #[must_use]
    pub fn close(&self, args: &[TypeKey]) -> Self {
        let Some(closer) = &self.closer else {
            return self.clone();
        };
        Self {
            type_key: self.type_key.close(args),
            constructors: closer(args),
            closer: None,
            finalizer: self.finalizer.clone(),
        }
    }
}

impl Debug for TypeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_key", &self.type_key)
            .field("constructors", &self.constructors)
            .field("open_generic", &self.closer.is_some())
            .field("has_finalizer", &self.finalizer.is_some())
            .finish()
    }
}
