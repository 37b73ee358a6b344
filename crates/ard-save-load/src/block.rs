use std::collections::BTreeMap;

use crate::{error::ArchiveError, flags::SaveFlags};

/// Name of a schema field. Archives asking for compact names store the field under `compact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: &'static str,
    pub compact: &'static str,
}

/// Deepest nesting of blocks and arrays a document may hold, counting the root block as one.
/// Documents past this are rejected, both when written and when read.
pub const MAX_BLOCK_DEPTH: usize = 64;

/// A single value stored within an archive block.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Block(ArchiveBlock),
    Array(Vec<ArchiveValue>),
}

/// A named, unordered section of an archive. Fields are kept sorted by key so the same block
/// always encodes to the same bytes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArchiveBlock {
    fields: BTreeMap<String, ArchiveValue>,
}

/// Types that can be read out of an archive value.
pub trait FromArchive: Sized {
    /// Kind name used in type mismatch errors.
    const EXPECTED: &'static str;

    fn from_archive(value: &ArchiveValue) -> Option<Self>;
}

/// Fieldless enumerations that archives may write either by name or by value.
pub trait ArchiveEnum: Copy + PartialEq + 'static {
    const TYPE_NAME: &'static str;

    /// Every variant paired with its name. A variant's value is its index in this list.
    const VARIANTS: &'static [(Self, &'static str)];

    /// Fails when the value is missing from [`ArchiveEnum::VARIANTS`].
    fn to_archive(self, flags: SaveFlags) -> Result<ArchiveValue, ArchiveError> {
        let (idx, name) = Self::VARIANTS
            .iter()
            .enumerate()
            .find(|(_, (variant, _))| *variant == self)
            .map(|(idx, (_, name))| (idx, *name))
            .ok_or_else(|| {
                ArchiveError::Invalid(format!(
                    "{} value is not one of its listed variants",
                    Self::TYPE_NAME
                ))
            })?;

        Ok(if flags.contains(SaveFlags::ENUMS_AS_STRINGS) {
            ArchiveValue::String(name.to_owned())
        } else {
            ArchiveValue::Int(idx as i64)
        })
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .find(|(_, variant_name)| *variant_name == name)
            .map(|(variant, _)| *variant)
    }

    fn from_index(idx: i64) -> Option<Self> {
        usize::try_from(idx)
            .ok()
            .and_then(|idx| Self::VARIANTS.get(idx))
            .map(|(variant, _)| *variant)
    }

    fn name(self) -> Option<&'static str> {
        Self::VARIANTS
            .iter()
            .find(|(variant, _)| *variant == self)
            .map(|(_, name)| *name)
    }
}

impl Field {
    pub const fn new(name: &'static str, compact: &'static str) -> Self {
        Self { name, compact }
    }

    #[inline]
    pub fn key(&self, flags: SaveFlags) -> &'static str {
        if flags.contains(SaveFlags::COMPACT_NAMES) {
            self.compact
        } else {
            self.name
        }
    }
}

impl ArchiveValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ArchiveValue::Bool(_) => "bool",
            ArchiveValue::Int(_) => "int",
            ArchiveValue::Float(_) => "float",
            ArchiveValue::String(_) => "string",
            ArchiveValue::Block(_) => "block",
            ArchiveValue::Array(_) => "array",
        }
    }
}

impl ArchiveBlock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over every field in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArchiveValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Inserts a value under a raw key. Used for data driven keys, such as attribute names,
    /// which have no compact spelling.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArchiveValue>) {
        self.fields.insert(key.into(), value.into());
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&ArchiveValue> {
        self.fields.get(key)
    }

    /// Looks up a schema field under either of its spellings.
    pub fn field(&self, field: Field) -> Option<&ArchiveValue> {
        self.fields
            .get(field.name)
            .or_else(|| self.fields.get(field.compact))
    }

    pub fn read<T: FromArchive>(&self, field: Field) -> Result<T, ArchiveError> {
        match self.read_optional(field)? {
            Some(value) => Ok(value),
            None => Err(ArchiveError::MissingField(field.name.into())),
        }
    }

    pub fn read_optional<T: FromArchive>(&self, field: Field) -> Result<Option<T>, ArchiveError> {
        let value = match self.field(field) {
            Some(value) => value,
            None => return Ok(None),
        };

        T::from_archive(value)
            .map(Some)
            .ok_or_else(|| ArchiveError::TypeMismatch {
                field: field.name.into(),
                expected: T::EXPECTED,
                found: value.kind(),
            })
    }

    /// Reads an enumeration stored either by name or by value.
    pub fn read_enum<E: ArchiveEnum>(&self, field: Field) -> Result<E, ArchiveError> {
        let value = self
            .field(field)
            .ok_or_else(|| ArchiveError::MissingField(field.name.into()))?;

        let variant = match value {
            ArchiveValue::String(name) => E::from_name(name),
            ArchiveValue::Int(idx) => E::from_index(*idx),
            other => {
                return Err(ArchiveError::TypeMismatch {
                    field: field.name.into(),
                    expected: "enum",
                    found: other.kind(),
                })
            }
        };

        variant.ok_or_else(|| ArchiveError::UnknownEnum {
            type_name: E::TYPE_NAME,
            value: match value {
                ArchiveValue::String(name) => name.clone(),
                ArchiveValue::Int(idx) => idx.to_string(),
                _ => String::default(),
            },
        })
    }

    pub fn read_block(&self, field: Field) -> Result<&ArchiveBlock, ArchiveError> {
        match self.field(field) {
            Some(ArchiveValue::Block(block)) => Ok(block),
            Some(other) => Err(ArchiveError::TypeMismatch {
                field: field.name.into(),
                expected: "block",
                found: other.kind(),
            }),
            None => Err(ArchiveError::MissingField(field.name.into())),
        }
    }

    pub fn read_array(&self, field: Field) -> Result<&[ArchiveValue], ArchiveError> {
        match self.field(field) {
            Some(ArchiveValue::Array(values)) => Ok(values),
            Some(other) => Err(ArchiveError::TypeMismatch {
                field: field.name.into(),
                expected: "array",
                found: other.kind(),
            }),
            None => Err(ArchiveError::MissingField(field.name.into())),
        }
    }

    /// Reads an array whose every element is a block.
    pub fn read_blocks(&self, field: Field) -> Result<Vec<&ArchiveBlock>, ArchiveError> {
        self.read_array(field)?
            .iter()
            .map(|value| match value {
                ArchiveValue::Block(block) => Ok(block),
                other => Err(ArchiveError::TypeMismatch {
                    field: field.name.into(),
                    expected: "block",
                    found: other.kind(),
                }),
            })
            .collect()
    }
}

impl FromArchive for bool {
    const EXPECTED: &'static str = "bool";

    fn from_archive(value: &ArchiveValue) -> Option<Self> {
        match value {
            ArchiveValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromArchive for i64 {
    const EXPECTED: &'static str = "int";

    fn from_archive(value: &ArchiveValue) -> Option<Self> {
        match value {
            ArchiveValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromArchive for u32 {
    const EXPECTED: &'static str = "unsigned 32-bit int";

    fn from_archive(value: &ArchiveValue) -> Option<Self> {
        match value {
            ArchiveValue::Int(value) => u32::try_from(*value).ok(),
            _ => None,
        }
    }
}

impl FromArchive for f64 {
    const EXPECTED: &'static str = "float";

    fn from_archive(value: &ArchiveValue) -> Option<Self> {
        match value {
            ArchiveValue::Float(value) => Some(*value),
            ArchiveValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }
}

impl FromArchive for String {
    const EXPECTED: &'static str = "string";

    fn from_archive(value: &ArchiveValue) -> Option<Self> {
        match value {
            ArchiveValue::String(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl From<bool> for ArchiveValue {
    #[inline(always)]
    fn from(value: bool) -> Self {
        ArchiveValue::Bool(value)
    }
}

impl From<i64> for ArchiveValue {
    #[inline(always)]
    fn from(value: i64) -> Self {
        ArchiveValue::Int(value)
    }
}

impl From<u32> for ArchiveValue {
    #[inline(always)]
    fn from(value: u32) -> Self {
        ArchiveValue::Int(value.into())
    }
}

impl From<f64> for ArchiveValue {
    #[inline(always)]
    fn from(value: f64) -> Self {
        ArchiveValue::Float(value)
    }
}

impl From<String> for ArchiveValue {
    #[inline(always)]
    fn from(value: String) -> Self {
        ArchiveValue::String(value)
    }
}

impl From<&str> for ArchiveValue {
    #[inline(always)]
    fn from(value: &str) -> Self {
        ArchiveValue::String(value.to_owned())
    }
}

impl From<ArchiveBlock> for ArchiveValue {
    #[inline(always)]
    fn from(value: ArchiveBlock) -> Self {
        ArchiveValue::Block(value)
    }
}

impl From<Vec<ArchiveValue>> for ArchiveValue {
    #[inline(always)]
    fn from(value: Vec<ArchiveValue>) -> Self {
        ArchiveValue::Array(value)
    }
}
