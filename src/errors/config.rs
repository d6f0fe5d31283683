use crate::any::TypeKey;

#[derive(thiserror::Error, Debug)]
pub enum ConfigErrorKind {
    #[error("Max object graph depth must be greater than zero")]
    ZeroMaxObjectGraphDepth,
    #[error("Keyed type selector can't be empty")]
    MissingKeyedTypeSelector,
    #[error("Type {type_key} has no constructors")]
    NoConstructors { type_key: TypeKey },
    #[error("Open generic {activation_type} can't be exported as {export_type}: generic arguments don't match")]
    GenericMismatch { activation_type: TypeKey, export_type: TypeKey },
    #[error("Closed type {activation_type} can't be exported as open generic {export_type}")]
    OpenExportOfClosedType { activation_type: TypeKey, export_type: TypeKey },
}
