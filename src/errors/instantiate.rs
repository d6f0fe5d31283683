use core::convert::Infallible;

#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error("Activator expects {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("Argument {index} isn't an instance of {expected}")]
    ArgumentType { index: usize, expected: &'static str },
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl From<Infallible> for InstantiateErrorKind {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}
