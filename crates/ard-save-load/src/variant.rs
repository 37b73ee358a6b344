use crate::{block::ArchiveValue, error::ArchiveError};

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Variant {
    /// Type name used by text encodings which cannot tell scalars apart on their own.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Bool(_) => "Bool",
            Variant::Int(_) => "Int",
            Variant::Float(_) => "Float",
            Variant::String(_) => "String",
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Variant::Bool(value) => value.to_string(),
            Variant::Int(value) => value.to_string(),
            Variant::Float(value) => value.to_string(),
            Variant::String(value) => value.clone(),
        }
    }

    /// Parses a value written by [`Variant::to_text`].
    pub fn from_text(type_name: &str, text: &str) -> Result<Self, ArchiveError> {
        let invalid = || ArchiveError::Invalid(format!("`{text}` is not a valid {type_name}"));
        match type_name {
            "Bool" => text.parse().map(Variant::Bool).map_err(|_| invalid()),
            "Int" => text.parse().map(Variant::Int).map_err(|_| invalid()),
            "Float" => text.parse().map(Variant::Float).map_err(|_| invalid()),
            "String" => Ok(Variant::String(text.to_owned())),
            other => Err(ArchiveError::Invalid(format!(
                "unknown attribute type `{other}`"
            ))),
        }
    }
}

impl From<Variant> for ArchiveValue {
    fn from(value: Variant) -> Self {
        match value {
            Variant::Bool(value) => ArchiveValue::Bool(value),
            Variant::Int(value) => ArchiveValue::Int(value),
            Variant::Float(value) => ArchiveValue::Float(value),
            Variant::String(value) => ArchiveValue::String(value),
        }
    }
}

impl TryFrom<&ArchiveValue> for Variant {
    type Error = ArchiveError;

    fn try_from(value: &ArchiveValue) -> Result<Self, Self::Error> {
        match value {
            ArchiveValue::Bool(value) => Ok(Variant::Bool(*value)),
            ArchiveValue::Int(value) => Ok(Variant::Int(*value)),
            ArchiveValue::Float(value) => Ok(Variant::Float(*value)),
            ArchiveValue::String(value) => Ok(Variant::String(value.clone())),
            other => Err(ArchiveError::Invalid(format!(
                "attributes must be scalars but found {}",
                other.kind()
            ))),
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int(value)
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Variant::Float(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_owned())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(value)
    }
}
