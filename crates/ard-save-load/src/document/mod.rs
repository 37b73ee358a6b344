pub mod binary;
pub mod json;
pub mod xml;

use std::io::{Read, Seek, Write};

use ard_log::debug;
use enum_dispatch::enum_dispatch;

use crate::{
    block::ArchiveBlock,
    error::{ArchiveError, ResourceError},
    flags::{LoadFlags, SaveFlags},
    format::{peek_resource_format, ResourceFormat, BINARY_MAGIC},
    LoadContext, SaveContext, SaveLoad,
};

use self::{binary::BinaryDocument, json::JsonDocument, xml::XmlDocument};

/// A parsed document in one of the supported formats.
#[enum_dispatch]
pub trait ArchiveDocument {
    fn format(&self) -> ResourceFormat;

    /// Reads the named top level section out of the document.
    fn open_root_block(&self, name: &str) -> Result<ArchiveBlock, ArchiveError>;

    /// Encodes the document into `dest`.
    fn write_to(&self, dest: &mut dyn Write) -> Result<(), ResourceError>;
}

/// Intermediate form of a resource, between raw bytes and a live object. Exactly one format.
#[enum_dispatch(ArchiveDocument)]
#[derive(Debug, Clone)]
pub enum Document {
    Binary(BinaryDocument),
    Json(JsonDocument),
    Xml(XmlDocument),
}

impl Document {
    /// Wraps a root block in a document of the requested format.
    pub fn new(
        format: ResourceFormat,
        name: &str,
        block: &ArchiveBlock,
    ) -> Result<Self, ResourceError> {
        Ok(match format {
            ResourceFormat::Binary => BinaryDocument::new(name, block.clone()).into(),
            ResourceFormat::Json => JsonDocument::new(name, block)?.into(),
            ResourceFormat::Xml => XmlDocument::from_root_block(name, block)?.into(),
            ResourceFormat::Unknown => return Err(ResourceError::UnknownFormat),
        })
    }

    /// Parses a complete document of a known format.
    pub fn parse(format: ResourceFormat, bytes: &[u8]) -> Result<Self, ResourceError> {
        Ok(match format {
            ResourceFormat::Binary => BinaryDocument::parse(bytes)?.into(),
            ResourceFormat::Json => JsonDocument::parse(bytes)?.into(),
            ResourceFormat::Xml => XmlDocument::parse(bytes)?.into(),
            ResourceFormat::Unknown => return Err(ResourceError::UnknownFormat),
        })
    }

    /// Detects the format of the stream and parses the whole of it.
    pub fn read<R: Read + Seek>(source: &mut R) -> Result<Self, ResourceError> {
        let format = peek_resource_format(source, &BINARY_MAGIC)?;
        if !format.is_known() {
            return Err(ResourceError::UnknownFormat);
        }
        debug!("detected {format:?} document");

        let mut bytes = Vec::default();
        source.read_to_end(&mut bytes)?;
        Self::parse(format, &bytes)
    }

    /// Saves `object` into a new root block named `name` and wraps it in a document.
    pub fn from_object<T: SaveLoad + ?Sized>(
        format: ResourceFormat,
        name: &str,
        object: &T,
        flags: SaveFlags,
    ) -> Result<Self, ResourceError> {
        let ctx = SaveContext { flags };
        let mut block = ArchiveBlock::new();
        object.save(&ctx, &mut block)?;
        Self::new(format, name, &block)
    }

    /// Loads `object` from the root block named `name`.
    pub fn apply_to<T: SaveLoad + ?Sized>(
        &self,
        name: &str,
        object: &mut T,
        flags: LoadFlags,
    ) -> Result<(), ArchiveError> {
        let block = self.open_root_block(name)?;
        object.load(&LoadContext { flags }, &block)
    }
}
