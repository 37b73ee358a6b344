use thiserror::Error;

/// A document could not be read into, or built from, archive blocks.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("field `{field}` expected {expected} but found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("`{value}` is not a valid {type_name}")]
    UnknownEnum {
        type_name: &'static str,
        value: String,
    },
    #[error("expected root block `{expected}` but found `{found}`")]
    RootMismatch { expected: String, found: String },
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("invalid data: {0}")]
    Invalid(String),
}

/// Everything that can go wrong while saving or loading a resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("unknown resource format")]
    UnknownFormat,
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("stream failure: {0}")]
    Stream(#[from] std::io::Error),
}

impl ArchiveError {
    pub fn malformed(err: impl std::fmt::Display) -> Self {
        ArchiveError::Malformed(err.to_string())
    }
}
