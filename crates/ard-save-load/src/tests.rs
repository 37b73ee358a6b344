use std::io::{Cursor, Seek};

use crate::prelude::*;

#[derive(Debug, Copy, Clone, PartialEq)]
enum Shape {
    Box,
    Sphere,
    Capsule,
}

impl ArchiveEnum for Shape {
    const TYPE_NAME: &'static str = "Shape";
    const VARIANTS: &'static [(Self, &'static str)] = &[
        (Shape::Box, "Box"),
        (Shape::Sphere, "Sphere"),
        (Shape::Capsule, "Capsule"),
    ];
}

const SHAPE: Field = Field::new("shape", "s");
const RADIUS: Field = Field::new("radius", "r");
const LABEL: Field = Field::new("label", "l");
const POINTS: Field = Field::new("points", "p");

#[derive(Debug, Clone, PartialEq)]
struct Collider {
    shape: Shape,
    radius: f64,
    label: String,
    points: Vec<i64>,
}

impl SaveLoad for Collider {
    fn save(&self, ctx: &SaveContext, block: &mut ArchiveBlock) -> Result<(), ArchiveError> {
        ctx.write_enum(block, SHAPE, self.shape)?;
        ctx.write(block, RADIUS, self.radius);
        ctx.write(block, LABEL, self.label.as_str());
        ctx.write(
            block,
            POINTS,
            self.points
                .iter()
                .map(|p| ArchiveValue::Int(*p))
                .collect::<Vec<_>>(),
        );
        Ok(())
    }

    fn load(&mut self, _: &LoadContext, block: &ArchiveBlock) -> Result<(), ArchiveError> {
        self.shape = block.read_enum(SHAPE)?;
        self.radius = block.read(RADIUS)?;
        self.label = block.read(LABEL)?;
        self.points = block
            .read_array(POINTS)?
            .iter()
            .map(|value| match value {
                ArchiveValue::Int(p) => Ok(*p),
                other => Err(ArchiveError::TypeMismatch {
                    field: POINTS.name.into(),
                    expected: "int",
                    found: other.kind(),
                }),
            })
            .collect::<Result<_, _>>()?;
        Ok(())
    }
}

fn collider() -> Collider {
    Collider {
        shape: Shape::Capsule,
        radius: 1.0,
        label: "a < b & \"c\"".into(),
        points: vec![3, -1, 4],
    }
}

fn empty_collider() -> Collider {
    Collider {
        shape: Shape::Box,
        radius: 0.0,
        label: String::default(),
        points: Vec::default(),
    }
}

fn encode(format: ResourceFormat, object: &Collider) -> Vec<u8> {
    let doc = Document::from_object(format, "resource", object, format.save_flags()).unwrap();
    let mut bytes = Vec::default();
    doc.write_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn detects_binary_magic() {
    let mut stream = Cursor::new(b"\0BIN\x01\x02".to_vec());
    let format = peek_resource_format(&mut stream, &BINARY_MAGIC).unwrap();
    assert_eq!(format, ResourceFormat::Binary);
    assert_eq!(stream.stream_position().unwrap(), 0);
}

#[test]
fn detects_text_formats_after_whitespace_and_bom() {
    let mut json = Cursor::new(b"\xEF\xBB\xBF \n\t{\"resource\": {}}".to_vec());
    assert_eq!(
        peek_resource_format(&mut json, &BINARY_MAGIC).unwrap(),
        ResourceFormat::Json
    );

    let mut xml = Cursor::new(b"\r\n   <?xml version=\"1.0\"?><resource/>".to_vec());
    assert_eq!(
        peek_resource_format(&mut xml, &BINARY_MAGIC).unwrap(),
        ResourceFormat::Xml
    );
}

#[test]
fn unrecognized_bytes_are_unknown() {
    let cases: [&[u8]; 5] = [b"", b"   ", b"\0BI", b"hello", b"\0BOO{}"];
    for bytes in cases {
        let mut stream = Cursor::new(bytes.to_vec());
        assert_eq!(
            peek_resource_format(&mut stream, &BINARY_MAGIC).unwrap(),
            ResourceFormat::Unknown,
            "{bytes:?}"
        );
        assert_eq!(stream.stream_position().unwrap(), 0);
    }
}

#[test]
fn peek_restores_a_mid_stream_position() {
    let mut stream = Cursor::new(b"xx<resource/>".to_vec());
    stream.set_position(2);
    let format = peek_resource_format(&mut stream, &BINARY_MAGIC).unwrap();
    assert_eq!(format, ResourceFormat::Xml);
    assert_eq!(stream.position(), 2);
}

#[test]
fn saved_documents_are_detected_as_their_format() {
    for format in [
        ResourceFormat::Binary,
        ResourceFormat::Json,
        ResourceFormat::Xml,
    ] {
        let mut stream = Cursor::new(encode(format, &collider()));
        assert_eq!(
            peek_resource_format(&mut stream, &BINARY_MAGIC).unwrap(),
            format
        );
    }
}

#[test]
fn objects_survive_every_format() {
    for format in [
        ResourceFormat::Binary,
        ResourceFormat::Json,
        ResourceFormat::Xml,
    ] {
        let bytes = encode(format, &collider());
        let doc = Document::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(doc.format(), format);

        let mut loaded = empty_collider();
        doc.apply_to("resource", &mut loaded, LoadFlags::empty())
            .unwrap();
        assert_eq!(loaded, collider(), "{format:?}");
    }
}

#[test]
fn save_flags_change_encoding_not_schema() {
    let text = String::from_utf8(encode(ResourceFormat::Json, &collider())).unwrap();
    assert!(text.contains("\"Capsule\""));
    assert!(text.contains("\"radius\": 1.0"));

    let ctx = SaveContext::new(SaveFlags::COMPACT_NAMES);
    let mut block = ArchiveBlock::new();
    collider().save(&ctx, &mut block).unwrap();
    assert_eq!(block.get("s"), Some(&ArchiveValue::Int(2)));
    assert!(block.get("shape").is_none());

    let mut loaded = empty_collider();
    loaded
        .load(&LoadContext::new(LoadFlags::empty()), &block)
        .unwrap();
    assert_eq!(loaded, collider());
}

#[test]
fn enums_read_by_name_or_value() {
    let mut block = ArchiveBlock::new();
    block.insert("by_name", "Sphere");
    block.insert("by_value", 1_i64);
    block.insert("bad_name", "Cone");
    block.insert("bad_value", 7_i64);

    let read = |name| block.read_enum::<Shape>(Field::new(name, name));
    assert_eq!(read("by_name").unwrap(), Shape::Sphere);
    assert_eq!(read("by_value").unwrap(), Shape::Sphere);
    assert!(matches!(
        read("bad_name"),
        Err(ArchiveError::UnknownEnum { .. })
    ));
    assert!(matches!(
        read("bad_value"),
        Err(ArchiveError::UnknownEnum { .. })
    ));
    assert!(matches!(
        read("missing"),
        Err(ArchiveError::MissingField(_))
    ));
}

#[test]
fn type_mismatch_is_reported() {
    let mut block = ArchiveBlock::new();
    block.insert("radius", "wide");
    let err = block.read::<f64>(RADIUS).unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::TypeMismatch {
            expected: "float",
            found: "string",
            ..
        }
    ));
}

#[test]
fn binary_garbage_is_malformed() {
    let mut bytes = BINARY_MAGIC.to_vec();
    bytes.extend_from_slice(&[0xFF; 16]);
    assert!(matches!(
        Document::parse(ResourceFormat::Binary, &bytes),
        Err(ResourceError::Archive(ArchiveError::Malformed(_)))
    ));

    let mut truncated = encode(ResourceFormat::Binary, &collider());
    truncated.truncate(truncated.len() / 2);
    assert!(Document::parse(ResourceFormat::Binary, &truncated).is_err());
}

#[test]
fn malformed_text_is_rejected() {
    assert!(Document::parse(ResourceFormat::Json, b"{\"resource\": ").is_err());
    assert!(Document::parse(ResourceFormat::Json, b"[1, 2]").is_err());
    assert!(Document::parse(ResourceFormat::Xml, b"<resource><int name=\"a\" value=\"1\"/>").is_err());
    assert!(Document::parse(ResourceFormat::Xml, b"<a></b>").is_err());
    assert!(Document::parse(ResourceFormat::Unknown, b"{}").is_err());
}

#[test]
fn root_block_name_is_checked() {
    let bytes = encode(ResourceFormat::Binary, &collider());
    let doc = Document::parse(ResourceFormat::Binary, &bytes).unwrap();
    assert!(matches!(
        doc.open_root_block("prefab"),
        Err(ArchiveError::RootMismatch { .. })
    ));

    let doc = Document::parse(ResourceFormat::Xml, b"<scene/>").unwrap();
    assert!(matches!(
        doc.open_root_block("resource"),
        Err(ArchiveError::RootMismatch { .. })
    ));
}

#[test]
fn json_rejects_non_finite_floats() {
    let mut bad = collider();
    bad.radius = f64::NAN;
    let res = Document::from_object(
        ResourceFormat::Json,
        "resource",
        &bad,
        SaveFlags::ENUMS_AS_STRINGS,
    );
    assert!(matches!(
        res,
        Err(ResourceError::Archive(ArchiveError::Invalid(_)))
    ));
}

#[test]
fn save_format_precedence() {
    use ResourceFormat::*;

    assert_eq!(resolve_save_format(None, None, Json), Json);
    assert_eq!(resolve_save_format(None, Some(Binary), Json), Binary);
    assert_eq!(resolve_save_format(Some(Xml), Some(Binary), Json), Xml);
    assert_eq!(resolve_save_format(None, Some(Unknown), Json), Json);
    assert_eq!(resolve_save_format(Some(Unknown), Some(Xml), Json), Xml);
}

#[test]
fn id_map_compacts_in_first_seen_order() {
    let map = IdMap::new_from_ids([40, 7, 40, 1000], 1);
    assert_eq!(map.len(), 3);
    assert_eq!(map.to_map(40), Some(MappedId(1)));
    assert_eq!(map.to_map(7), Some(MappedId(2)));
    assert_eq!(map.to_map(1000), Some(MappedId(3)));
    assert_eq!(map.to_map(5), None);
    assert_eq!(map.from_map(MappedId(2)), Some(7));
    assert_eq!(map.from_map(MappedId(0)), None);
}

#[test]
fn variants_round_trip_through_text() {
    for variant in [
        Variant::Bool(true),
        Variant::Int(-12),
        Variant::Float(0.1),
        Variant::String("x y".into()),
    ] {
        let parsed = Variant::from_text(variant.type_name(), &variant.to_text()).unwrap();
        assert_eq!(parsed, variant);
    }
    assert!(Variant::from_text("Int", "1.5").is_err());
    assert!(Variant::from_text("Quaternion", "1").is_err());
}

#[test]
fn bom_prefixed_text_documents_load() {
    for format in [ResourceFormat::Json, ResourceFormat::Xml] {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(&encode(format, &collider()));

        let doc = Document::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(doc.format(), format);

        let mut loaded = empty_collider();
        doc.apply_to("resource", &mut loaded, LoadFlags::empty())
            .unwrap();
        assert_eq!(loaded, collider(), "{format:?}");
    }
}

/// `depth` levels of blocks, each holding the next under `a`. The innermost one is empty.
fn nested_block(depth: usize) -> ArchiveBlock {
    let mut block = ArchiveBlock::new();
    for _ in 1..depth {
        let mut outer = ArchiveBlock::new();
        outer.insert("a", block);
        block = outer;
    }
    block
}

fn nested_json(depth: usize) -> Vec<u8> {
    let inner = format!(
        "{}{{}}{}",
        "{\"a\": ".repeat(depth - 1),
        "}".repeat(depth - 1)
    );
    format!("{{\"resource\": {inner}}}").into_bytes()
}

fn nested_xml(depth: usize) -> Vec<u8> {
    format!(
        "<resource>{}{}</resource>",
        "<block name=\"a\">".repeat(depth - 1),
        "</block>".repeat(depth - 1)
    )
    .into_bytes()
}

/// Hand encoded so the payload can be deeper than anything the writer accepts. Bincode lays
/// out `(name, tokens)` as length prefixed strings and lists with `u32` variant tags.
fn nested_binary(depth: usize) -> Vec<u8> {
    const BLOCK_TAG: u32 = 4;
    const KEY_TAG: u32 = 6;

    let mut bytes = BINARY_MAGIC.to_vec();
    bytes.extend_from_slice(&8_u64.to_le_bytes());
    bytes.extend_from_slice(b"resource");
    bytes.extend_from_slice(&((depth * 2 - 1) as u64).to_le_bytes());
    for level in 0..depth {
        if level > 0 {
            bytes.extend_from_slice(&KEY_TAG.to_le_bytes());
            bytes.extend_from_slice(&1_u64.to_le_bytes());
            bytes.push(b'a');
        }
        let len: u32 = if level + 1 == depth { 0 } else { 1 };
        bytes.extend_from_slice(&BLOCK_TAG.to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
    }
    bytes
}

fn open_nested(format: ResourceFormat, bytes: &[u8]) -> Result<ArchiveBlock, ResourceError> {
    let doc = Document::parse(format, bytes)?;
    Ok(doc.open_root_block("resource")?)
}

#[test]
fn nesting_limit_holds_when_writing() {
    for format in [
        ResourceFormat::Binary,
        ResourceFormat::Json,
        ResourceFormat::Xml,
    ] {
        let deepest = nested_block(MAX_BLOCK_DEPTH);
        let doc = Document::new(format, "resource", &deepest).unwrap();
        let mut bytes = Vec::default();
        doc.write_to(&mut bytes).unwrap();
        assert_eq!(open_nested(format, &bytes).unwrap(), deepest, "{format:?}");

        let res = Document::new(format, "resource", &nested_block(MAX_BLOCK_DEPTH + 1))
            .and_then(|doc| doc.write_to(&mut Vec::<u8>::new()));
        assert!(
            matches!(res, Err(ResourceError::Archive(ArchiveError::Invalid(_)))),
            "{format:?}"
        );
    }
}

#[test]
fn deeply_nested_documents_are_malformed() {
    let cases: [(ResourceFormat, fn(usize) -> Vec<u8>); 3] = [
        (ResourceFormat::Binary, nested_binary),
        (ResourceFormat::Json, nested_json),
        (ResourceFormat::Xml, nested_xml),
    ];

    for (format, nested) in cases {
        assert_eq!(
            open_nested(format, &nested(MAX_BLOCK_DEPTH)).unwrap(),
            nested_block(MAX_BLOCK_DEPTH),
            "{format:?}"
        );

        for depth in [MAX_BLOCK_DEPTH + 1, 200_000] {
            assert!(
                matches!(
                    open_nested(format, &nested(depth)),
                    Err(ResourceError::Archive(ArchiveError::Malformed(_)))
                ),
                "{format:?} at depth {depth}"
            );
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Partial {
    Listed,
    Unlisted,
}

impl ArchiveEnum for Partial {
    const TYPE_NAME: &'static str = "Partial";
    const VARIANTS: &'static [(Self, &'static str)] = &[(Partial::Listed, "Listed")];
}

#[test]
fn unlisted_enum_values_are_not_saved() {
    for flags in [SaveFlags::empty(), SaveFlags::ENUMS_AS_STRINGS] {
        assert!(matches!(
            Partial::Unlisted.to_archive(flags),
            Err(ArchiveError::Invalid(_))
        ));
    }
    assert_eq!(
        Partial::Listed.to_archive(SaveFlags::empty()).unwrap(),
        ArchiveValue::Int(0)
    );
    assert_eq!(Partial::Listed.name(), Some("Listed"));
    assert_eq!(Partial::Unlisted.name(), None);
}
