use super::node::{ArrayNode, Entry, Node, TaggedNode, ValueNode};
use crate::{Charset, Error};
use std::io::Write;

/// Whether a write ran to completion or stopped at the line limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The whole tree was written
    Complete,

    /// The line limit was reached and a `...` line marks the cut
    Truncated,
}

/// Writes a [`Node`] tree in the text format.
///
/// Instantiated via [`NodeWriterBuilder`]
#[derive(Debug)]
pub struct NodeWriter<W> {
    writer: W,
    indent: Vec<u8>,
    max_lines: Option<usize>,
    depth: usize,
    lines: usize,
    truncated: bool,
}

/// Construct a customized node writer
///
/// ```
/// use clausewitz_save::text::{parse, NodeWriterBuilder, WriteOutcome};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = parse(b"hello=world data={ a=b }")?;
/// let mut out: Vec<u8> = Vec::new();
/// let mut writer = NodeWriterBuilder::new().indent(b"  ").build(&mut out);
/// assert_eq!(writer.write_node(&root)?, WriteOutcome::Complete);
/// assert_eq!(std::str::from_utf8(&out)?, "hello=world\ndata={\n  a=b\n}\n");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NodeWriterBuilder {
    indent: Vec<u8>,
    max_lines: Option<usize>,
}

impl<W> NodeWriter<W>
where
    W: Write,
{
    /// Get inner writer, keeping ownership
    pub fn inner(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes this Writer, returning the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes a tree. An array root is written as a document: one entry per
    /// line without surrounding braces.
    pub fn write_node(&mut self, node: &Node) -> Result<WriteOutcome, Error> {
        match node {
            Node::Array(arr) => {
                for entry in arr.entries() {
                    self.write_entry(entry)?;
                    if self.truncated {
                        break;
                    }
                }
            }
            _ => self.write_entry(&Entry::bare(node.clone()))?,
        }

        Ok(self.outcome())
    }

    /// Writes a single `key=node` line at the current depth
    pub fn write_field(&mut self, key: &ValueNode, node: &Node) -> Result<WriteOutcome, Error> {
        if !self.begin_line()? {
            return Ok(self.outcome());
        }

        self.write_scalar(key)?;
        self.writer.write_all(b"=")?;
        self.write_value(node)?;
        if !self.truncated {
            self.end_line()?;
        }
        Ok(self.outcome())
    }

    /// The number of complete lines written so far
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    fn outcome(&self) -> WriteOutcome {
        if self.truncated {
            WriteOutcome::Truncated
        } else {
            WriteOutcome::Complete
        }
    }

    fn write_entry(&mut self, entry: &Entry) -> Result<(), Error> {
        if !self.begin_line()? {
            return Ok(());
        }

        if let Some(key) = &entry.key {
            self.write_scalar(key)?;
            self.writer.write_all(b"=")?;
        }

        self.write_value(&entry.node)?;
        if !self.truncated {
            self.end_line()?;
        }
        Ok(())
    }

    fn write_value(&mut self, node: &Node) -> Result<(), Error> {
        match node {
            Node::Value(x) => self.write_scalar(x),
            Node::Array(x) => self.write_group(x),
            Node::Tagged(x) => self.write_tagged(x),
        }
    }

    fn write_tagged(&mut self, node: &TaggedNode) -> Result<(), Error> {
        self.writer.write_all(node.tag().as_bytes())?;
        self.writer.write_all(b" ")?;
        self.write_group(node.array())
    }

    fn write_group(&mut self, arr: &ArrayNode) -> Result<(), Error> {
        if arr.is_empty() {
            self.writer.write_all(b"{ }")?;
            return Ok(());
        }

        let inline = arr
            .entries()
            .iter()
            .all(|x| x.key.is_none() && x.node.is_value());

        if inline {
            self.writer.write_all(b"{")?;
            for value in arr.values().filter_map(Node::as_value) {
                self.writer.write_all(b" ")?;
                self.write_scalar(value)?;
            }
            self.writer.write_all(b" }")?;
            return Ok(());
        }

        self.writer.write_all(b"{")?;
        self.end_line()?;
        self.depth += 1;
        for entry in arr.entries() {
            self.write_entry(entry)?;
            if self.truncated {
                return Ok(());
            }
        }
        self.depth -= 1;

        if self.begin_line()? {
            self.writer.write_all(b"}")?;
        }
        Ok(())
    }

    fn write_scalar(&mut self, value: &ValueNode) -> Result<(), Error> {
        if value.is_quoted() {
            self.writer.write_all(b"\"")?;
            self.writer.write_all(value.as_bytes())?;
            self.writer.write_all(b"\"")?;
        } else {
            self.writer.write_all(value.as_bytes())?;
        }
        Ok(())
    }

    /// Writes the indent for a new line, or the truncation marker if the
    /// line limit has been reached. Returns false once truncated.
    fn begin_line(&mut self) -> Result<bool, Error> {
        if self.truncated {
            return Ok(false);
        }

        self.write_indent()?;
        if self.max_lines.map_or(false, |max| self.lines >= max) {
            self.writer.write_all(b"...\n")?;
            self.truncated = true;
            return Ok(false);
        }

        Ok(true)
    }

    fn end_line(&mut self) -> Result<(), Error> {
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    /// Write the indent characters
    fn write_indent(&mut self) -> Result<(), Error> {
        for _ in 0..self.depth {
            self.writer.write_all(&self.indent)?;
        }

        Ok(())
    }
}

impl NodeWriterBuilder {
    /// Construct a new NodeWriterBuilder with default values
    pub fn new() -> NodeWriterBuilder {
        NodeWriterBuilder::default()
    }

    /// The bytes written once per level of depth.
    ///
    /// The default is a tab.
    pub fn indent(&mut self, indent: &[u8]) -> &mut NodeWriterBuilder {
        self.indent = indent.to_vec();
        self
    }

    /// The number of lines after which the writer stops and marks the cut
    /// with `...`.
    ///
    /// The default is no limit.
    pub fn max_lines(&mut self, max_lines: Option<usize>) -> &mut NodeWriterBuilder {
        self.max_lines = max_lines;
        self
    }

    /// Construct a node writer from a builder and a writer.
    pub fn build<W>(&self, writer: W) -> NodeWriter<W>
    where
        W: Write,
    {
        NodeWriter {
            writer,
            indent: self.indent.clone(),
            max_lines: self.max_lines,
            depth: 0,
            lines: 0,
            truncated: false,
        }
    }
}

impl Default for NodeWriterBuilder {
    fn default() -> Self {
        NodeWriterBuilder {
            indent: vec![b'\t'],
            max_lines: None,
        }
    }
}

/// Writes the tree into a new buffer
pub fn write_to_vec(node: &Node, options: &NodeWriterBuilder) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    options.build(&mut out).write_node(node)?;
    Ok(out)
}

/// Writes the tree into a string for display, such as a preview of the
/// first lines of a large document
///
/// ```
/// use clausewitz_save::{Charset, text::{parse, write_to_string, NodeWriterBuilder}};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = parse(b"a=1 b=2 c=3")?;
/// let preview = write_to_string(&root, NodeWriterBuilder::new().max_lines(Some(2)), Charset::Utf8)?;
/// assert_eq!(preview, "a=1\nb=2\n...\n");
/// # Ok(())
/// # }
/// ```
pub fn write_to_string(
    node: &Node,
    options: &NodeWriterBuilder,
    charset: Charset,
) -> Result<String, Error> {
    let out = write_to_vec(node, options)?;
    Ok(charset.transcode(&out).into_owned())
}
