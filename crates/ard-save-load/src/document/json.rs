use std::io::Write;

use serde_json::{Map, Number, Value};

use crate::{
    block::{ArchiveBlock, ArchiveValue, MAX_BLOCK_DEPTH},
    error::{ArchiveError, ResourceError},
    format::{ResourceFormat, UTF8_BOM},
};

use super::ArchiveDocument;

/// JSON document. The root object holds a single member per root block.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument {
    root: Value,
}

impl JsonDocument {
    pub fn new(name: &str, block: &ArchiveBlock) -> Result<Self, ArchiveError> {
        let mut root = Map::new();
        root.insert(name.to_owned(), block_to_json(name, block, 1)?);
        Ok(Self {
            root: Value::Object(root),
        })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let bytes = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
        let root: Value = serde_json::from_slice(bytes).map_err(ArchiveError::malformed)?;
        if !root.is_object() {
            return Err(ArchiveError::Malformed(
                "JSON document root must be an object".into(),
            ));
        }
        Ok(Self { root })
    }

    #[inline(always)]
    pub fn root(&self) -> &Value {
        &self.root
    }
}

impl ArchiveDocument for JsonDocument {
    fn format(&self) -> ResourceFormat {
        ResourceFormat::Json
    }

    fn open_root_block(&self, name: &str) -> Result<ArchiveBlock, ArchiveError> {
        let value = match self.root.get(name) {
            Some(value) => value,
            None => {
                return Err(ArchiveError::RootMismatch {
                    expected: name.into(),
                    found: self
                        .root
                        .as_object()
                        .and_then(|root| root.keys().next())
                        .cloned()
                        .unwrap_or_default(),
                })
            }
        };

        match json_to_value(name, value, 1)? {
            ArchiveValue::Block(block) => Ok(block),
            other => Err(ArchiveError::TypeMismatch {
                field: name.into(),
                expected: "block",
                found: other.kind(),
            }),
        }
    }

    fn write_to(&self, dest: &mut dyn Write) -> Result<(), ResourceError> {
        serde_json::to_writer_pretty(&mut *dest, &self.root).map_err(std::io::Error::from)?;
        dest.write_all(b"\n")?;
        Ok(())
    }
}

fn block_to_json(name: &str, block: &ArchiveBlock, depth: usize) -> Result<Value, ArchiveError> {
    if depth > MAX_BLOCK_DEPTH {
        return Err(ArchiveError::Invalid(format!(
            "field `{name}` is nested deeper than {MAX_BLOCK_DEPTH} levels"
        )));
    }

    let mut object = Map::new();
    for (key, value) in block.iter() {
        object.insert(key.to_owned(), value_to_json(key, value, depth)?);
    }
    Ok(Value::Object(object))
}

fn value_to_json(key: &str, value: &ArchiveValue, depth: usize) -> Result<Value, ArchiveError> {
    Ok(match value {
        ArchiveValue::Bool(value) => Value::Bool(*value),
        ArchiveValue::Int(value) => Value::from(*value),
        ArchiveValue::Float(value) => match Number::from_f64(*value) {
            Some(number) => Value::Number(number),
            None => {
                return Err(ArchiveError::Invalid(format!(
                    "field `{key}` holds {value}, which JSON cannot represent"
                )))
            }
        },
        ArchiveValue::String(value) => Value::String(value.clone()),
        ArchiveValue::Block(block) => block_to_json(key, block, depth + 1)?,
        ArchiveValue::Array(values) => {
            if depth + 1 > MAX_BLOCK_DEPTH {
                return Err(ArchiveError::Invalid(format!(
                    "field `{key}` is nested deeper than {MAX_BLOCK_DEPTH} levels"
                )));
            }

            Value::Array(
                values
                    .iter()
                    .map(|value| value_to_json(key, value, depth + 1))
                    .collect::<Result<_, _>>()?,
            )
        }
    })
}

fn json_to_value(key: &str, value: &Value, depth: usize) -> Result<ArchiveValue, ArchiveError> {
    if depth > MAX_BLOCK_DEPTH && (value.is_array() || value.is_object()) {
        return Err(ArchiveError::Malformed(format!(
            "field `{key}` is nested deeper than {MAX_BLOCK_DEPTH} levels"
        )));
    }

    Ok(match value {
        Value::Null => {
            return Err(ArchiveError::Malformed(format!(
                "field `{key}` is null"
            )))
        }
        Value::Bool(value) => ArchiveValue::Bool(*value),
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(value), _) => ArchiveValue::Int(value),
            (None, Some(value)) => ArchiveValue::Float(value),
            (None, None) => {
                return Err(ArchiveError::Malformed(format!(
                    "field `{key}` holds an unsupported number"
                )))
            }
        },
        Value::String(value) => ArchiveValue::String(value.clone()),
        Value::Array(values) => ArchiveValue::Array(
            values
                .iter()
                .map(|value| json_to_value(key, value, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(object) => {
            let mut block = ArchiveBlock::new();
            for (key, value) in object {
                block.insert(key.clone(), json_to_value(key, value, depth + 1)?);
            }
            ArchiveValue::Block(block)
        }
    })
}
