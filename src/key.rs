use alloc::{string::String, sync::Arc, vec::Vec};
use core::fmt::{self, Display, Formatter};

/// Discriminator that selects one of several exports of the same type.
///
/// [`Key::Many`] is only meaningful for enumerable requests,
/// where it aggregates the exports registered under each of its keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Str(Arc<str>),
    Char(char),
    Int(i64),
    Bool(bool),
    Many(Arc<[Key]>),
}

impl Key {
    #[must_use]
    pub fn many<K: Into<Key>>(keys: impl IntoIterator<Item = K>) -> Self {
        Self::Many(keys.into_iter().map(Into::into).collect())
    }

    /// Single keys this key stands for, in order
    #[must_use]
    pub fn flatten(&self) -> Vec<&Key> {
        match self {
            Self::Many(keys) => keys.iter().flat_map(Key::flatten).collect(),
            key => alloc::vec![key],
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl From<Arc<str>> for Key {
    fn from(value: Arc<str>) -> Self {
        Self::Str(value)
    }
}

impl From<char> for Key {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<bool> for Key {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Key {
                fn from(value: $ty) -> Self {
                    Self::Int(value.into())
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl<K: Into<Key>> From<Vec<K>> for Key {
    fn from(value: Vec<K>) -> Self {
        Self::many(value)
    }
}

impl<K: Into<Key>, const N: usize> From<[K; N]> for Key {
    fn from(value: [K; N]) -> Self {
        Self::many(value)
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "{value:?}"),
            Self::Char(value) => write!(f, "{value:?}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Many(keys) => {
                f.write_str("[")?;
                for (index, key) in keys.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    Display::fmt(key, f)?;
                }
                f.write_str("]")
            }
        }
    }
}
