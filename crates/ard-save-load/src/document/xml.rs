use std::io::Write;

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Reader, Writer,
};

use crate::{
    block::{ArchiveBlock, ArchiveValue, MAX_BLOCK_DEPTH},
    error::{ArchiveError, ResourceError},
    format::{ResourceFormat, UTF8_BOM},
};

use super::ArchiveDocument;

const NAME_ATTRIBUTE: &str = "name";
const VALUE_ATTRIBUTE: &str = "value";

/// Deepest element nesting a parsed document may hold, counting the root element as one.
pub const MAX_ELEMENT_DEPTH: usize = 256;

/// An element of a parsed XML tree. Text content is not kept.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
}

/// XML document. Each field of the root block is a child of the root element, tagged with the
/// kind of value it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`XmlElement::attribute`], but a missing attribute is an error.
    pub fn required_attribute(&self, key: &str) -> Result<&str, ArchiveError> {
        self.attribute(key).ok_or_else(|| {
            ArchiveError::Malformed(format!(
                "element `{}` is missing attribute `{key}`",
                self.name
            ))
        })
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key, value)),
        }
    }

    #[inline(always)]
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }

    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    pub fn from_root_block(name: &str, block: &ArchiveBlock) -> Result<Self, ArchiveError> {
        let mut root = XmlElement::new(name);
        for (key, value) in block.iter() {
            root.push_child(value_to_element(Some(key), value, 2)?);
        }
        Ok(Self { root })
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let bytes = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::default();
        let mut stack: Vec<XmlElement> = Vec::default();
        let mut root = None;

        loop {
            match reader
                .read_event_into(&mut buf)
                .map_err(ArchiveError::malformed)?
            {
                Event::Start(start) => {
                    if stack.len() >= MAX_ELEMENT_DEPTH {
                        return Err(ArchiveError::Malformed(format!(
                            "elements are nested deeper than {MAX_ELEMENT_DEPTH} levels"
                        )));
                    }
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        ArchiveError::Malformed("unbalanced closing tag".into())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(ArchiveError::Malformed(
                "document ended inside an element".into(),
            ));
        }

        match root {
            Some(root) => Ok(Self { root }),
            None => Err(ArchiveError::Malformed(
                "document has no root element".into(),
            )),
        }
    }

    #[inline(always)]
    pub fn root(&self) -> &XmlElement {
        &self.root
    }
}

impl ArchiveDocument for XmlDocument {
    fn format(&self) -> ResourceFormat {
        ResourceFormat::Xml
    }

    fn open_root_block(&self, name: &str) -> Result<ArchiveBlock, ArchiveError> {
        if self.root.name != name {
            return Err(ArchiveError::RootMismatch {
                expected: name.into(),
                found: self.root.name.clone(),
            });
        }

        let mut block = ArchiveBlock::new();
        for child in &self.root.children {
            let key = child.required_attribute(NAME_ATTRIBUTE)?;
            block.insert(key, element_to_value(child, 2)?);
        }
        Ok(block)
    }

    fn write_to(&self, dest: &mut dyn Write) -> Result<(), ResourceError> {
        let mut writer = Writer::new_with_indent(&mut *dest, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        write_element(&mut writer, &self.root)?;
        dest.write_all(b"\n")?;
        Ok(())
    }
}

fn element_from_start(start: &BytesStart) -> Result<XmlElement, ArchiveError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(ArchiveError::malformed)?
        .to_owned();

    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(ArchiveError::malformed)?;
        let key = std::str::from_utf8(attribute.key.as_ref()).map_err(ArchiveError::malformed)?;
        let value = attribute
            .unescape_value()
            .map_err(ArchiveError::malformed)?;
        element.set_attribute(key, value.into_owned());
    }

    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), ArchiveError> {
    match stack.last_mut() {
        Some(parent) => parent.push_child(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(ArchiveError::Malformed(
                "document has more than one root element".into(),
            ))
        }
    }
    Ok(())
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &XmlElement) -> std::io::Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        for child in &element.children {
            write_element(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    }

    Ok(())
}

fn value_to_element(
    key: Option<&str>,
    value: &ArchiveValue,
    depth: usize,
) -> Result<XmlElement, ArchiveError> {
    let nested = matches!(value, ArchiveValue::Block(_) | ArchiveValue::Array(_));
    if nested && depth > MAX_BLOCK_DEPTH {
        return Err(ArchiveError::Invalid(format!(
            "blocks are nested deeper than {MAX_BLOCK_DEPTH} levels"
        )));
    }

    let mut element = XmlElement::new(value.kind());
    if let Some(key) = key {
        element.set_attribute(NAME_ATTRIBUTE, key);
    }

    match value {
        ArchiveValue::Bool(value) => element.set_attribute(VALUE_ATTRIBUTE, value.to_string()),
        ArchiveValue::Int(value) => element.set_attribute(VALUE_ATTRIBUTE, value.to_string()),
        ArchiveValue::Float(value) => element.set_attribute(VALUE_ATTRIBUTE, value.to_string()),
        ArchiveValue::String(value) => element.set_attribute(VALUE_ATTRIBUTE, value.as_str()),
        ArchiveValue::Block(block) => {
            for (key, value) in block.iter() {
                element.push_child(value_to_element(Some(key), value, depth + 1)?);
            }
        }
        ArchiveValue::Array(values) => {
            for value in values {
                element.push_child(value_to_element(None, value, depth + 1)?);
            }
        }
    }

    Ok(element)
}

fn element_to_value(element: &XmlElement, depth: usize) -> Result<ArchiveValue, ArchiveError> {
    if depth > MAX_BLOCK_DEPTH && matches!(element.name.as_str(), "block" | "array") {
        return Err(ArchiveError::Malformed(format!(
            "blocks are nested deeper than {MAX_BLOCK_DEPTH} levels"
        )));
    }

    let text = || element.required_attribute(VALUE_ATTRIBUTE);
    let invalid = |text: &str| {
        ArchiveError::Malformed(format!(
            "`{text}` is not a valid {} value",
            element.name
        ))
    };

    Ok(match element.name.as_str() {
        "bool" => {
            let text = text()?;
            ArchiveValue::Bool(text.parse().map_err(|_| invalid(text))?)
        }
        "int" => {
            let text = text()?;
            ArchiveValue::Int(text.parse().map_err(|_| invalid(text))?)
        }
        "float" => {
            let text = text()?;
            ArchiveValue::Float(text.parse().map_err(|_| invalid(text))?)
        }
        "string" => ArchiveValue::String(text()?.to_owned()),
        "block" => {
            let mut block = ArchiveBlock::new();
            for child in &element.children {
                let key = child.required_attribute(NAME_ATTRIBUTE)?;
                block.insert(key, element_to_value(child, depth + 1)?);
            }
            ArchiveValue::Block(block)
        }
        "array" => ArchiveValue::Array(
            element
                .children
                .iter()
                .map(|child| element_to_value(child, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        other => {
            return Err(ArchiveError::Malformed(format!(
                "unexpected element `{other}`"
            )))
        }
    })
}
