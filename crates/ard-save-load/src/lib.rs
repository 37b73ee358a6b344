pub mod block;
pub mod document;
pub mod error;
pub mod flags;
pub mod format;
pub mod id_map;
pub mod variant;

#[cfg(test)]
mod tests;

use block::{ArchiveBlock, ArchiveEnum, ArchiveValue, Field};
use error::ArchiveError;
use flags::{LoadFlags, SaveFlags};

pub mod prelude {
    pub use crate::{
        block::*,
        document::{binary::*, json::*, xml::*, *},
        error::*,
        flags::*,
        format::*,
        id_map::*,
        variant::*,
        LoadContext, SaveContext, SaveLoad,
    };
}

/// Objects that can be written into, and read back out of, an archive block.
pub trait SaveLoad {
    fn save(&self, ctx: &SaveContext, block: &mut ArchiveBlock) -> Result<(), ArchiveError>;

    /// Replaces the contents of `self` with what is stored in `block`.
    fn load(&mut self, ctx: &LoadContext, block: &ArchiveBlock) -> Result<(), ArchiveError>;
}

pub struct SaveContext {
    pub flags: SaveFlags,
}

pub struct LoadContext {
    pub flags: LoadFlags,
}

impl SaveContext {
    pub fn new(flags: SaveFlags) -> Self {
        Self { flags }
    }

    /// Key a schema field is written under.
    #[inline(always)]
    pub fn key(&self, field: Field) -> &'static str {
        field.key(self.flags)
    }

    pub fn write(&self, block: &mut ArchiveBlock, field: Field, value: impl Into<ArchiveValue>) {
        block.insert(self.key(field), value);
    }

    pub fn write_enum<E: ArchiveEnum>(
        &self,
        block: &mut ArchiveBlock,
        field: Field,
        value: E,
    ) -> Result<(), ArchiveError> {
        block.insert(self.key(field), value.to_archive(self.flags)?);
        Ok(())
    }
}

impl LoadContext {
    pub fn new(flags: LoadFlags) -> Self {
        Self { flags }
    }
}
