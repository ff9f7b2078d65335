//! Conversion of node trees to and from JSON
//!
//! The mapping is lossless so that a tree survives a trip through JSON
//! unchanged:
//!
//! - an unquoted scalar becomes a number when its text is a canonical
//!   integer, a bool for `yes` and `no`, and a string otherwise
//! - a quoted scalar becomes `{"quoted": "<text>"}`
//! - an array becomes `{"type": "array", "val": [...]}` where a keyed entry
//!   is the pair `[key, value]` and a bare entry is the value itself
//! - a tagged array becomes `{"type": "tagged", "tag": "rgb", "val": [...]}`
//!
//! Serializing with [`Charset::Utf8`] fails on a scalar that is not valid
//! UTF-8 rather than writing replacement characters.
//!
//! ```
//! use clausewitz_save::{Charset, json, text::parse};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = parse(r#"name="Jåhkåmåhkke" num=1 pi=3.14 human=yes"#.as_bytes())?;
//! let actual = root.json(Charset::Utf8).to_string();
//! let expected = r#"{"type":"array","val":[["name",{"quoted":"Jåhkåmåhkke"}],["num",1],["pi","3.14"],["human",true]]}"#;
//! assert_eq!(actual, expected);
//!
//! let back = json::from_str(&actual, Charset::Utf8)?;
//! assert_eq!(back, root);
//! # Ok(())
//! # }
//! ```

use crate::text::{ArrayNode, Entry, Node, TaggedNode, ValueNode};
use crate::{Charset, Error};
use serde::{
    ser::{Error as _, SerializeMap, SerializeSeq},
    Serialize, Serializer,
};
use serde_json::Value;
use std::io::Write;

/// Serializes a node tree as JSON
///
/// Instantiated via [`Node::json`]
#[derive(Debug, Clone, Copy)]
pub struct JsonNode<'a> {
    node: &'a Node,
    charset: Charset,
}

impl<'a> JsonNode<'a> {
    /// Output the JSON into a writer, minified
    pub fn to_writer<W>(&self, writer: W) -> Result<(), Error>
    where
        W: Write,
    {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Output the JSON into a writer, pretty printed
    pub fn to_writer_pretty<W>(&self, writer: W) -> Result<(), Error>
    where
        W: Write,
    {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Output the JSON into a byte vector
    ///
    /// Fails when a scalar is not valid in the charset, which can only
    /// happen for malformed UTF-8.
    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.to_writer(&mut out)?;
        Ok(out)
    }
}

impl<'a> std::fmt::Display for JsonNode<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.to_vec().map_err(|_| std::fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&data))
    }
}

impl Node {
    /// Converts the tree to its JSON representation. Scalar text is decoded
    /// with the charset.
    pub fn json(&self, charset: Charset) -> JsonNode {
        JsonNode {
            node: self,
            charset,
        }
    }
}

/// The text of a canonical integer: no leading zeros, no plus sign, no `-0`
fn canonical_int(data: &[u8]) -> Option<Value> {
    let digits = data.strip_prefix(b"-").unwrap_or(data);
    match digits {
        [] | [b'0', _, ..] => return None,
        [b'0'] if digits.len() != data.len() => return None,
        _ => {}
    }

    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let text = std::str::from_utf8(data).ok()?;
    if let Ok(x) = text.parse::<i64>() {
        Some(Value::from(x))
    } else {
        text.parse::<u64>().ok().map(Value::from)
    }
}

struct JsonScalar<'a> {
    value: &'a ValueNode,
    charset: Charset,
}

impl<'a> Serialize for JsonScalar<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.value.as_bytes();
        let text = self
            .charset
            .transcode_exact(data)
            .ok_or_else(|| S::Error::custom("scalar is not valid UTF-8"))?;
        if self.value.is_quoted() {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry("quoted", &text)?;
            return map.end();
        }

        match data {
            b"yes" => return serializer.serialize_bool(true),
            b"no" => return serializer.serialize_bool(false),
            _ => {}
        }

        match canonical_int(data) {
            Some(x) => x.serialize(serializer),
            None => serializer.serialize_str(&text),
        }
    }
}

struct JsonEntries<'a> {
    array: &'a ArrayNode,
    charset: Charset,
}

impl<'a> Serialize for JsonEntries<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.array.len()))?;
        for entry in self.array.entries() {
            let value = entry.node.json(self.charset);
            match &entry.key {
                Some(key) => {
                    let key = JsonScalar {
                        value: key,
                        charset: self.charset,
                    };
                    seq.serialize_element(&(key, value))?;
                }
                None => seq.serialize_element(&value)?,
            }
        }

        seq.end()
    }
}

impl<'a> Serialize for JsonNode<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.node {
            Node::Value(x) => JsonScalar {
                value: x,
                charset: self.charset,
            }
            .serialize(serializer),
            Node::Array(x) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry(
                    "val",
                    &JsonEntries {
                        array: x,
                        charset: self.charset,
                    },
                )?;
                map.end()
            }
            Node::Tagged(x) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "tagged")?;
                map.serialize_entry("tag", x.tag())?;
                map.serialize_entry(
                    "val",
                    &JsonEntries {
                        array: x.array(),
                        charset: self.charset,
                    },
                )?;
                map.end()
            }
        }
    }
}

fn shape_error(msg: impl std::fmt::Display) -> Error {
    Error::from(<serde_json::Error as serde::de::Error>::custom(msg))
}

fn scalar_from_value(value: &Value, charset: Charset) -> Result<ValueNode, Error> {
    match value {
        Value::Bool(x) => Ok(ValueNode::from_bool(*x)),
        Value::Number(x) => Ok(ValueNode::unquoted(x.to_string())),
        Value::String(x) => Ok(ValueNode::unquoted(charset.encode(x).into_owned())),
        Value::Object(map) => match (map.len(), map.get("quoted")) {
            (1, Some(Value::String(x))) => Ok(ValueNode::new(charset.encode(x).into_owned(), true)),
            _ => Err(shape_error("expected a scalar")),
        },
        _ => Err(shape_error("expected a scalar")),
    }
}

fn entries_from_value(value: Option<&Value>, charset: Charset) -> Result<ArrayNode, Error> {
    let values = match value {
        Some(Value::Array(x)) => x,
        _ => return Err(shape_error("expected a \"val\" array")),
    };

    let mut array = ArrayNode::with_capacity(values.len());
    for value in values {
        let entry = match value {
            Value::Array(pair) => match pair.as_slice() {
                [key, node] => Entry {
                    key: Some(scalar_from_value(key, charset)?),
                    node: from_value(node, charset)?,
                },
                _ => return Err(shape_error("expected a [key, value] pair")),
            },
            x => Entry::bare(from_value(x, charset)?),
        };
        array.push_entry(entry);
    }

    Ok(array)
}

/// Converts a JSON value back into a node tree. Scalar text is encoded with
/// the charset.
pub fn from_value(value: &Value, charset: Charset) -> Result<Node, Error> {
    let map = match value {
        Value::Object(map) if !map.contains_key("quoted") => map,
        x => return scalar_from_value(x, charset).map(Node::Value),
    };

    match map.get("type").and_then(Value::as_str) {
        Some("array") => Ok(Node::Array(entries_from_value(map.get("val"), charset)?)),
        Some("tagged") => {
            let tag = map
                .get("tag")
                .and_then(Value::as_str)
                .ok_or_else(|| shape_error("tagged node without a tag"))?;
            let array = entries_from_value(map.get("val"), charset)?;
            Ok(Node::Tagged(TaggedNode::new(tag, array)))
        }
        _ => Err(shape_error("expected an object with a known \"type\"")),
    }
}

/// Parses JSON text into a node tree
pub fn from_str(data: &str, charset: Charset) -> Result<Node, Error> {
    from_slice(data.as_bytes(), charset)
}

/// Parses JSON bytes into a node tree
pub fn from_slice(data: &[u8], charset: Charset) -> Result<Node, Error> {
    let value: Value = serde_json::from_slice(data)?;
    from_value(&value, charset)
}
