use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::{
    block::{ArchiveBlock, ArchiveValue, MAX_BLOCK_DEPTH},
    error::{ArchiveError, ResourceError},
    format::{ResourceFormat, BINARY_MAGIC},
};

use super::ArchiveDocument;

/// Binary document. Laid out as [`BINARY_MAGIC`] followed by the bincode encoded root block
/// name and the root block as a flat list of [`Token`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryDocument {
    name: String,
    block: ArchiveBlock,
}

/// One step of a pre-order walk over a block. Containers carry how many values they hold, and
/// every value inside of a block is preceded by its key.
#[derive(Debug, Serialize, Deserialize)]
enum Token {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Block(u32),
    Array(u32),
    Key(String),
}

/// A container being rebuilt from tokens.
struct Frame {
    container: Container,
    remaining: u32,
    key: Option<String>,
}

enum Container {
    Block(ArchiveBlock),
    Array(Vec<ArchiveValue>),
}

impl BinaryDocument {
    pub fn new(name: &str, block: ArchiveBlock) -> Self {
        Self {
            name: name.to_owned(),
            block,
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let payload = match bytes.strip_prefix(&BINARY_MAGIC) {
            Some(payload) => payload,
            None => {
                return Err(ArchiveError::Malformed(
                    "binary document is missing its magic bytes".into(),
                ))
            }
        };

        let (name, tokens) = bincode::deserialize::<(String, Vec<Token>)>(payload)
            .map_err(ArchiveError::malformed)?;
        let block = rebuild(tokens)?;

        Ok(Self { name, block })
    }
}

impl ArchiveDocument for BinaryDocument {
    fn format(&self) -> ResourceFormat {
        ResourceFormat::Binary
    }

    fn open_root_block(&self, name: &str) -> Result<ArchiveBlock, ArchiveError> {
        if self.name != name {
            return Err(ArchiveError::RootMismatch {
                expected: name.into(),
                found: self.name.clone(),
            });
        }
        Ok(self.block.clone())
    }

    fn write_to(&self, dest: &mut dyn Write) -> Result<(), ResourceError> {
        let mut tokens = Vec::default();
        flatten_block(&self.block, 1, &mut tokens)?;

        dest.write_all(&BINARY_MAGIC)?;
        bincode::serialize_into(&mut *dest, &(&self.name, &tokens)).map_err(|err| match *err {
            bincode::ErrorKind::Io(err) => ResourceError::Stream(err),
            other => ResourceError::Archive(ArchiveError::Invalid(other.to_string())),
        })?;
        Ok(())
    }
}

impl Frame {
    fn new(container: Container, remaining: u32) -> Self {
        Self {
            container,
            remaining,
            key: None,
        }
    }

    #[inline]
    fn awaits_key(&self) -> bool {
        matches!(self.container, Container::Block(_)) && self.key.is_none()
    }

    fn push(&mut self, value: ArchiveValue) -> Result<(), ArchiveError> {
        match &mut self.container {
            Container::Block(block) => match self.key.take() {
                Some(key) => block.insert(key, value),
                None => {
                    return Err(ArchiveError::Malformed(
                        "block value is missing its key".into(),
                    ))
                }
            },
            Container::Array(values) => values.push(value),
        }
        self.remaining -= 1;
        Ok(())
    }

    fn into_value(self) -> ArchiveValue {
        match self.container {
            Container::Block(block) => ArchiveValue::Block(block),
            Container::Array(values) => ArchiveValue::Array(values),
        }
    }
}

fn too_deep() -> ArchiveError {
    ArchiveError::Malformed(format!(
        "blocks are nested deeper than {MAX_BLOCK_DEPTH} levels"
    ))
}

fn container_len(len: usize) -> Result<u32, ArchiveError> {
    u32::try_from(len)
        .map_err(|_| ArchiveError::Invalid(format!("{len} values do not fit in one container")))
}

fn flatten_block(
    block: &ArchiveBlock,
    depth: usize,
    out: &mut Vec<Token>,
) -> Result<(), ArchiveError> {
    if depth > MAX_BLOCK_DEPTH {
        return Err(ArchiveError::Invalid(format!(
            "blocks are nested deeper than {MAX_BLOCK_DEPTH} levels"
        )));
    }

    out.push(Token::Block(container_len(block.len())?));
    for (key, value) in block.iter() {
        out.push(Token::Key(key.to_owned()));
        flatten_value(value, depth, out)?;
    }
    Ok(())
}

fn flatten_value(
    value: &ArchiveValue,
    depth: usize,
    out: &mut Vec<Token>,
) -> Result<(), ArchiveError> {
    match value {
        ArchiveValue::Bool(value) => out.push(Token::Bool(*value)),
        ArchiveValue::Int(value) => out.push(Token::Int(*value)),
        ArchiveValue::Float(value) => out.push(Token::Float(*value)),
        ArchiveValue::String(value) => out.push(Token::String(value.clone())),
        ArchiveValue::Block(block) => flatten_block(block, depth + 1, out)?,
        ArchiveValue::Array(values) => {
            if depth + 1 > MAX_BLOCK_DEPTH {
                return Err(ArchiveError::Invalid(format!(
                    "blocks are nested deeper than {MAX_BLOCK_DEPTH} levels"
                )));
            }

            out.push(Token::Array(container_len(values.len())?));
            for value in values {
                flatten_value(value, depth + 1, out)?;
            }
        }
    }
    Ok(())
}

/// Rebuilds the root block from its tokens without recursing, so hostile payloads can only
/// fail, never exhaust the stack.
fn rebuild(tokens: Vec<Token>) -> Result<ArchiveBlock, ArchiveError> {
    let mut tokens = tokens.into_iter();
    let mut stack = match tokens.next() {
        Some(Token::Block(len)) => vec![Frame::new(Container::Block(ArchiveBlock::new()), len)],
        _ => {
            return Err(ArchiveError::Malformed(
                "binary payload does not start with a block".into(),
            ))
        }
    };

    loop {
        // Close every container that has all of its values.
        if stack.last().is_some_and(|frame| frame.remaining == 0) {
            let value = match stack.pop() {
                Some(frame) => frame.into_value(),
                None => break,
            };

            match stack.last_mut() {
                Some(parent) => parent.push(value)?,
                None => {
                    if tokens.next().is_some() {
                        return Err(ArchiveError::Malformed(
                            "binary payload has data after its root block".into(),
                        ));
                    }

                    return match value {
                        ArchiveValue::Block(block) => Ok(block),
                        _ => Err(ArchiveError::Malformed(
                            "binary root is not a block".into(),
                        )),
                    };
                }
            }
            continue;
        }

        let depth = stack.len();
        let frame = match stack.last_mut() {
            Some(frame) => frame,
            None => break,
        };
        let token = tokens.next().ok_or_else(|| {
            ArchiveError::Malformed("binary payload ended inside of a block".into())
        })?;

        let value = match token {
            Token::Key(key) if frame.awaits_key() => {
                frame.key = Some(key);
                continue;
            }
            Token::Key(key) => {
                return Err(ArchiveError::Malformed(format!(
                    "unexpected key `{key}` in binary payload"
                )))
            }
            _ if frame.awaits_key() => {
                return Err(ArchiveError::Malformed(
                    "block value is missing its key".into(),
                ))
            }
            Token::Block(_) | Token::Array(_) if depth >= MAX_BLOCK_DEPTH => return Err(too_deep()),
            Token::Block(len) => {
                stack.push(Frame::new(Container::Block(ArchiveBlock::new()), len));
                continue;
            }
            Token::Array(len) => {
                stack.push(Frame::new(Container::Array(Vec::default()), len));
                continue;
            }
            Token::Bool(value) => ArchiveValue::Bool(value),
            Token::Int(value) => ArchiveValue::Int(value),
            Token::Float(value) => ArchiveValue::Float(value),
            Token::String(value) => ArchiveValue::String(value),
        };
        frame.push(value)?;
    }

    Err(ArchiveError::Malformed(
        "binary payload ended inside of a block".into(),
    ))
}
