use super::node::{ArrayNode, Entry, Node, TaggedNode, ValueNode};
use super::tokenizer::{TokenKind, TokenTape, Tokenizer};
use crate::{Error, Scalar};
use std::collections::HashSet;

/// Tags recognized by default: the color spaces plus `LIST`
pub const DEFAULT_TAGS: &[&str] = &["rgb", "hsv", "hsv360", "hex", "cylindrical", "LIST"];

/// Parser configuration
///
/// ```
/// use clausewitz_save::text::{NodeParser, ParserOptions};
/// let options = ParserOptions::new().with_tag("flag");
/// let root = NodeParser::new(&options).parse(b"a = flag { 1 2 }")?;
/// assert!(root.get_first("a").unwrap().is_tagged());
/// # Ok::<(), clausewitz_save::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    tags: HashSet<String>,
}

impl ParserOptions {
    /// Options with the default tag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with exactly the given tag set
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParserOptions {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds a tag to the set
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Returns true if the unquoted scalar is a tag when directly followed
    /// by a group
    pub fn is_tag(&self, data: &[u8]) -> bool {
        std::str::from_utf8(data).map_or(false, |x| self.tags.contains(x))
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::with_tags(DEFAULT_TAGS.iter().copied())
    }
}

/// Builds a [`Node`] tree from a [`TokenTape`]
#[derive(Debug, Clone, Copy)]
pub struct NodeParser<'a> {
    options: &'a ParserOptions,
}

struct Frame {
    key: Option<ValueNode>,
    tag: Option<String>,
    array: ArrayNode,
}

impl<'a> NodeParser<'a> {
    /// Creates a parser with the given options
    pub fn new(options: &'a ParserOptions) -> Self {
        NodeParser { options }
    }

    /// Tokenizes and parses the data. The result is always an array: the
    /// implicit group wrapping the document.
    pub fn parse(&self, data: &[u8]) -> Result<Node, Error> {
        let tape = Tokenizer::new(data).tokenize()?;
        self.parse_tape(&tape)
    }

    /// Parses an existing tape
    pub fn parse_tape(&self, tape: &TokenTape) -> Result<Node, Error> {
        let tokens = tape.tokens();
        let sizes = tape.group_sizes();
        let capacity = |i: usize| usize::try_from(sizes[i]).unwrap_or(0);

        let mut stack = vec![Frame {
            key: None,
            tag: None,
            array: ArrayNode::with_capacity(capacity(0)),
        }];

        let mut pending_key: Option<ValueNode> = None;
        let mut pending_tag: Option<String> = None;
        let mut scalar_ind = 0;
        let mut group_ind = 1;
        let mut offset = 0;
        let mut pos = 1;

        while let Some(&token) = tokens.get(pos) {
            match token {
                TokenKind::OpenGroup => {
                    stack.push(Frame {
                        key: pending_key.take(),
                        tag: pending_tag.take(),
                        array: ArrayNode::with_capacity(capacity(group_ind)),
                    });
                    group_ind += 1;
                    pos += 1;
                }
                TokenKind::CloseGroup => {
                    let frame = match stack.pop() {
                        Some(x) => x,
                        None => return Err(Error::parse(offset, "unbalanced close group")),
                    };

                    let node = match frame.tag {
                        Some(tag) => Node::Tagged(TaggedNode::new(tag, frame.array)),
                        None => Node::Array(frame.array),
                    };

                    match stack.last_mut() {
                        Some(parent) => parent.array.push_entry(Entry {
                            key: frame.key,
                            node,
                        }),
                        None => return Ok(node),
                    }
                    pos += 1;
                }
                TokenKind::Equals => {
                    return Err(Error::parse(offset, "'=' without a preceding key"));
                }
                TokenKind::UnquotedScalar | TokenKind::QuotedScalar => {
                    let (start, len) = tape.scalar_span(scalar_ind);
                    offset = start;
                    let touches_group = tape.data().get(start + len as usize) == Some(&b'{');
                    let value = to_value(tape.scalar(scalar_ind), token);
                    scalar_ind += 1;

                    let next = tokens.get(pos + 1).copied();
                    if pending_key.is_none() && next == Some(TokenKind::Equals) {
                        pending_key = Some(value);
                        pos += 2;
                        match tokens.get(pos) {
                            Some(x) if x.is_scalar() || *x == TokenKind::OpenGroup => {}
                            _ => return Err(Error::parse(offset, "expected a value after '='")),
                        }
                    } else if next == Some(TokenKind::OpenGroup)
                        && token == TokenKind::UnquotedScalar
                        && self.options.is_tag(value.as_bytes())
                    {
                        pending_tag = Some(String::from_utf8_lossy(value.as_bytes()).into_owned());
                        pos += 1;
                    } else if next == Some(TokenKind::OpenGroup) && pending_key.is_none() && touches_group {
                        // `key{ ... }` with the `=` omitted. A scalar separated from the
                        // group by whitespace stays a bare value of a list.
                        pending_key = Some(value);
                        pos += 1;
                    } else {
                        let entry = Entry {
                            key: pending_key.take(),
                            node: Node::Value(value),
                        };

                        if let Some(frame) = stack.last_mut() {
                            frame.array.push_entry(entry);
                        }
                        pos += 1;
                    }
                }
            }
        }

        Err(Error::parse(offset, "token stream ended before the root group closed"))
    }
}

fn to_value(scalar: Scalar, kind: TokenKind) -> ValueNode {
    let data = scalar.as_bytes();
    match kind {
        TokenKind::QuotedScalar => ValueNode::new(&data[1..data.len() - 1], true),
        _ => ValueNode::new(data, false),
    }
}

/// Parses a document with the default options
///
/// ```
/// use clausewitz_save::text::parse;
/// let root = parse(b"a=1 # comment\nb=2")?;
/// assert_eq!(root.len(), 2);
/// assert_eq!(root.get_first("b").unwrap().to_i64()?, 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse(data: &[u8]) -> Result<Node, Error> {
    NodeParser::new(&ParserOptions::default()).parse(data)
}
