//! Types for tokenizing, building, and writing clausewitz plaintext documents
//!
//! The pipeline runs [Tokenizer] → [TokenTape] → [NodeParser] → [Node], and
//! [NodeWriter] turns a [Node] back into text.
mod color;
mod node;
mod parser;
mod pointer;
mod tokenizer;
mod writer;

pub use self::color::{ColorSpace, GameColor};
pub use self::node::{ArrayNode, Entry, KeyPolicy, Node, TaggedNode, ValueNode};
pub use self::parser::{parse, NodeParser, ParserOptions, DEFAULT_TAGS};
pub use self::pointer::{NodePointer, PointerError, PointerSegment};
pub use self::tokenizer::{TokenKind, TokenTape, Tokenizer};
pub use self::writer::{write_to_string, write_to_vec, NodeWriter, NodeWriterBuilder, WriteOutcome};
