use std::io::{self, Read, Seek, SeekFrom};

use crate::flags::SaveFlags;

/// Magic bytes written in front of every binary resource.
pub const BINARY_MAGIC: [u8; 4] = *b"\0BIN";

/// Format used by default saves when nothing else picks one.
pub const DEFAULT_SAVE_FORMAT: ResourceFormat = ResourceFormat::Json;

/// Leading whitespace allowed before a text document's opening token.
const MAX_LEADING_WHITESPACE: u64 = 64 * 1024;

pub(crate) const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Encodings a resource can be stored in.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceFormat {
    #[default]
    Unknown,
    Binary,
    Json,
    Xml,
}

impl ResourceFormat {
    #[inline]
    pub fn is_known(self) -> bool {
        self != ResourceFormat::Unknown
    }

    /// Save flags every format is written with. Text formats favor readability, binary favors
    /// size.
    pub fn save_flags(self) -> SaveFlags {
        match self {
            ResourceFormat::Json | ResourceFormat::Xml => SaveFlags::ENUMS_AS_STRINGS,
            ResourceFormat::Binary => SaveFlags::COMPACT_NAMES,
            ResourceFormat::Unknown => SaveFlags::empty(),
        }
    }

    /// Conventional file extension for the format.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            ResourceFormat::Binary => Some("bin"),
            ResourceFormat::Json => Some("json"),
            ResourceFormat::Xml => Some("xml"),
            ResourceFormat::Unknown => None,
        }
    }
}

/// Picks the format for a save that did not ask for one. An explicit hint wins over the format
/// the resource was last loaded from, which wins over `default`.
pub fn resolve_save_format(
    hint: Option<ResourceFormat>,
    last_load: Option<ResourceFormat>,
    default: ResourceFormat,
) -> ResourceFormat {
    hint.filter(|format| format.is_known())
        .or_else(|| last_load.filter(|format| format.is_known()))
        .unwrap_or(default)
}

/// Classifies the stream by its leading bytes. The stream is left where it was found.
pub fn peek_resource_format<R: Read + Seek>(
    reader: &mut R,
    magic: &[u8],
) -> io::Result<ResourceFormat> {
    let start = reader.stream_position()?;
    let format = sniff_resource_format(reader, magic);
    reader.seek(SeekFrom::Start(start))?;
    format
}

/// Like [`peek_resource_format`], but consumes what it reads.
pub fn sniff_resource_format<R: Read>(reader: &mut R, magic: &[u8]) -> io::Result<ResourceFormat> {
    let mut prefix = Vec::with_capacity(magic.len());
    reader
        .by_ref()
        .take(magic.len() as u64)
        .read_to_end(&mut prefix)?;

    if !magic.is_empty() && prefix == magic {
        return Ok(ResourceFormat::Binary);
    }

    let rest = reader.take(MAX_LEADING_WHITESPACE).bytes();
    for (i, byte) in prefix.into_iter().map(Ok).chain(rest).enumerate() {
        let byte = byte?;

        if i < UTF8_BOM.len() && byte == UTF8_BOM[i] {
            continue;
        }

        match byte {
            b' ' | b'\t' | b'\r' | b'\n' => continue,
            b'{' => return Ok(ResourceFormat::Json),
            b'<' => return Ok(ResourceFormat::Xml),
            _ => return Ok(ResourceFormat::Unknown),
        }
    }

    Ok(ResourceFormat::Unknown)
}
