use alloc::{format, sync::Arc, vec::Vec};
use core::{
    any::{type_name, Any},
    fmt::{self, Debug, Display, Formatter},
};

/// Type-erased instance produced by the container.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Stands in for an instance when a factory returned nothing and null instances are allowed,
/// or when an optional parameter couldn't be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Absent;

#[inline]
#[must_use]
pub fn is_absent(value: &Value) -> bool {
    value.is::<Absent>()
}

pub(crate) type GenericDefinition = (Arc<str>, usize);

const PARAMETER_PREFIX: &str = "`";

pub(crate) const FUNC: &str = "kiln::Func";
pub(crate) const LAZY: &str = "kiln::Lazy";
pub(crate) const ENUMERABLE: &str = "kiln::Enumerable";
pub(crate) const KEYED_LOCATE_DELEGATE: &str = "kiln::KeyedLocateDelegate";
pub(crate) const LOCATOR_SCOPE: &str = "kiln::LocatorScope";
pub(crate) const INJECTION_SCOPE: &str = "kiln::InjectionScope";
pub(crate) const INJECTION_CONTEXT: &str = "kiln::InjectionContext";

const PRIMITIVES: &[&str] = &[
    "bool",
    "char",
    "i8",
    "i16",
    "i32",
    "i64",
    "i128",
    "isize",
    "u8",
    "u16",
    "u32",
    "u64",
    "u128",
    "usize",
    "f32",
    "f64",
    "&str",
    "alloc::string::String",
    "std::time::SystemTime",
];

/// Runtime identity of a type, possibly generic and possibly open.
///
/// Rust types are identified by [`core::any::type_name`] through [`TypeKey::of`].
/// Service contracts that have no Rust type (interfaces, generic definitions closed at runtime)
/// are identified by name with [`TypeKey::named`] and [`TypeKey::generic`].
///
/// Open generics use positional placeholders created by [`TypeKey::parameter`],
/// so `TypeKey::open("Repository", 1)` is `Repository<`0>` and
/// closing it with `[User]` gives `Repository<User>`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey {
    name: Arc<str>,
    args: Arc<[TypeKey]>,
}

impl TypeKey {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::named(type_name::<T>())
    }

    #[inline]
    #[must_use]
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new().into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn generic(name: impl Into<Arc<str>>, args: impl IntoIterator<Item = TypeKey>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Placeholder for the generic argument at `index`
    #[inline]
    #[must_use]
    pub fn parameter(index: usize) -> Self {
        Self::named(format!("{PARAMETER_PREFIX}{index}"))
    }

    /// Generic definition with `arity` placeholders in order
    #[inline]
    #[must_use]
    pub fn open(name: impl Into<Arc<str>>, arity: usize) -> Self {
        Self::generic(name, (0..arity).map(Self::parameter))
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn args(&self) -> &[TypeKey] {
        &self.args
    }

    #[inline]
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    #[inline]
    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.args.is_empty()
    }

    #[must_use]
    pub fn parameter_index(&self) -> Option<usize> {
        if self.is_generic() {
            return None;
        }
        self.name.strip_prefix(PARAMETER_PREFIX)?.parse().ok()
    }

    /// Checks whether any placeholder is left in the type or its arguments
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.parameter_index().is_some() || self.args.iter().any(TypeKey::is_open)
    }

    #[inline]
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        !self.is_generic() && PRIMITIVES.contains(&&*self.name)
    }

    #[inline]
    #[must_use]
    pub(crate) fn definition(&self) -> GenericDefinition {
        (self.name.clone(), self.args.len())
    }

    /// Replaces placeholders with `args` by position. Placeholders without a matching argument are kept.
    #[must_use]
    pub fn close(&self, args: &[TypeKey]) -> TypeKey {
        if let Some(index) = self.parameter_index() {
            return args.get(index).cloned().unwrap_or_else(|| self.clone());
        }
        if !self.is_generic() {
            return self.clone();
        }
        Self {
            name: self.name.clone(),
            args: self.args.iter().map(|arg| arg.close(args)).collect(),
        }
    }

    /// Matches `self` as a pattern against `concrete`, filling `bound` with the type bound to each placeholder.
    /// Returns `false` if the shapes differ or a placeholder is bound to two different types.
    pub(crate) fn bind(&self, concrete: &TypeKey, bound: &mut Vec<Option<TypeKey>>) -> bool {
        if let Some(index) = self.parameter_index() {
            if bound.len() <= index {
                bound.resize(index + 1, None);
            }
            return match &bound[index] {
                Some(previous) => previous == concrete,
                None => {
                    bound[index] = Some(concrete.clone());
                    true
                }
            };
        }
        if self.name != concrete.name || self.args.len() != concrete.args.len() {
            return false;
        }
        self.args
            .iter()
            .zip(concrete.args.iter())
            .all(|(pattern, concrete)| pattern.bind(concrete, bound))
    }
}

impl TypeKey {
    /// `Func` taking `args` in order and producing `result`
    #[must_use]
    pub fn func(args: impl IntoIterator<Item = TypeKey>, result: TypeKey) -> Self {
        let mut args: Vec<_> = args.into_iter().collect();
        args.push(result);
        Self::generic(FUNC, args)
    }

    #[inline]
    #[must_use]
    pub fn lazy(value_type: TypeKey) -> Self {
        Self::generic(LAZY, [value_type])
    }

    #[inline]
    #[must_use]
    pub fn enumerable(element_type: TypeKey) -> Self {
        Self::generic(ENUMERABLE, [element_type])
    }

    #[inline]
    #[must_use]
    pub fn keyed_locate_delegate(key_type: TypeKey, value_type: TypeKey) -> Self {
        Self::generic(KEYED_LOCATE_DELEGATE, [key_type, value_type])
    }

    /// The scope that is locating the current object graph
    #[inline]
    #[must_use]
    pub fn locator_scope() -> Self {
        Self::named(LOCATOR_SCOPE)
    }

    /// The root scope of the container
    #[inline]
    #[must_use]
    pub fn injection_scope() -> Self {
        Self::named(INJECTION_SCOPE)
    }

    #[inline]
    #[must_use]
    pub fn injection_context() -> Self {
        Self::named(INJECTION_CONTEXT)
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.is_generic() {
            f.write_str("<")?;
            for (index, arg) in self.args.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                Display::fmt(arg, f)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl Debug for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{is_absent, Absent, TypeKey, Value};

    use alloc::{string::ToString as _, sync::Arc, vec::Vec};

    #[test]
    fn test_close_nested_placeholders() {
        let open = TypeKey::generic("Service", [TypeKey::generic("Vec", [TypeKey::parameter(0)]), TypeKey::parameter(1)]);
        assert!(open.is_open());

        let closed = open.close(&[TypeKey::of::<i32>(), TypeKey::named("Basic")]);
        assert!(!closed.is_open());
        assert_eq!(closed.to_string(), "Service<Vec<i32>, Basic>");
    }

    #[test]
    fn test_bind() {
        let pattern = TypeKey::generic("Pair", [TypeKey::parameter(1), TypeKey::parameter(0)]);
        let concrete = TypeKey::generic("Pair", [TypeKey::named("A"), TypeKey::named("B")]);

        let mut bound = Vec::new();
        assert!(pattern.bind(&concrete, &mut bound));
        assert_eq!(bound, [Some(TypeKey::named("B")), Some(TypeKey::named("A"))]);

        let conflicting = TypeKey::generic("Pair", [TypeKey::parameter(0), TypeKey::parameter(0)]);
        assert!(!conflicting.bind(&concrete, &mut Vec::new()));

        let other = TypeKey::generic("Other", [TypeKey::named("A"), TypeKey::named("B")]);
        assert!(!pattern.bind(&other, &mut Vec::new()));
    }

    #[test]
    fn test_well_known() {
        let func = TypeKey::func([TypeKey::of::<i32>()], TypeKey::named("Basic"));
        assert_eq!(func.arity(), 2);
        assert_eq!(func.args().last(), Some(&TypeKey::named("Basic")));

        assert!(TypeKey::of::<i32>().is_primitive());
        assert!(TypeKey::of::<alloc::string::String>().is_primitive());
        assert!(!TypeKey::named("Basic").is_primitive());
        assert!(!TypeKey::parameter(0).is_primitive());
    }

    #[test]
    fn test_absent() {
        let absent: Value = Arc::new(Absent);
        let present: Value = Arc::new(1);

        assert!(is_absent(&absent));
        assert!(!is_absent(&present));
    }
}
