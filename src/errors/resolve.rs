use alloc::{string::String, sync::Arc, vec::Vec};
use core::fmt::Write as _;

use super::{config::ConfigErrorKind, instantiate::InstantiateErrorKind};
use crate::{any::TypeKey, key::Key};

fn with_key(key: Option<&Key>) -> String {
    let mut buf = String::new();
    if let Some(key) = key {
        let _ = write!(buf, " with key {key}");
    }
    buf
}

fn join_path(path: &[TypeKey]) -> String {
    let mut buf = String::new();
    for (index, type_key) in path.iter().enumerate() {
        if index > 0 {
            buf.push_str(" -> ");
        }
        let _ = write!(buf, "{type_key}");
    }
    buf
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Could not locate {type_key}{}", with_key(.key.as_ref()))]
    Unresolvable { type_key: TypeKey, key: Option<Key> },
    #[error("Could not resolve parameter `{parameter}` of type {parameter_type} for {activation_type}")]
    UnresolvableParameter {
        parameter: Arc<str>,
        parameter_type: TypeKey,
        activation_type: TypeKey,
    },
    #[error("Object graph exceeded max depth of {max_depth}, possible recursion: {}", join_path(.path))]
    GraphDepthExceeded { max_depth: usize, path: Vec<TypeKey> },
    #[error("Found {count} exports for {type_key}{} with the same priority", with_key(.key.as_ref()))]
    AmbiguousExport {
        type_key: TypeKey,
        key: Option<Key>,
        count: usize,
    },
    #[error("Factory for {type_key} returned no instance")]
    NullInstance { type_key: TypeKey },
    #[error("Could not find scope named {name:?}")]
    NamedScopeNotFound { name: Arc<str> },
    #[error("Locating the injection scope is not allowed")]
    InjectionScopeNotAllowed,
    #[error("Scope has already been disposed")]
    ScopeDisposed,
    #[error("Located {type_key} isn't an instance of {expected}")]
    IncorrectType { type_key: TypeKey, expected: &'static str },
    #[error(transparent)]
    Instantiate(#[from] InstantiateErrorKind),
    #[error(transparent)]
    Configuration(#[from] ConfigErrorKind),
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::ResolveErrorKind;
    use crate::{any::TypeKey, key::Key};

    use alloc::{string::ToString as _, vec};

    #[test]
    fn test_display() {
        let err = ResolveErrorKind::Unresolvable {
            type_key: TypeKey::named("Basic"),
            key: Some(Key::from("A")),
        };
        assert_eq!(err.to_string(), "Could not locate Basic with key \"A\"");

        let err = ResolveErrorKind::GraphDepthExceeded {
            max_depth: 2,
            path: vec![TypeKey::named("A"), TypeKey::named("B"), TypeKey::named("A")],
        };
        assert_eq!(
            err.to_string(),
            "Object graph exceeded max depth of 2, possible recursion: A -> B -> A"
        );
    }
}
