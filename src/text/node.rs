use crate::common::Date;
use crate::scalar::{to_bool, to_date, to_f64, to_i64, to_u64};
use crate::{Charset, ScalarError};
use std::borrow::Cow;

/// Which entry wins when an array holds the same key more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPolicy {
    /// The earliest entry with the key
    First,

    /// The latest entry with the key, as the game would see it after
    /// applying every assignment in order
    Last,
}

/// A scalar leaf.
///
/// The data is kept in wire form: quotes are stripped but escape sequences
/// are not resolved, so that writing the value back out is lossless. Whether
/// the value was quoted is tracked explicitly and never re-derived from the
/// content.
///
/// ```
/// use clausewitz_save::text::ValueNode;
/// let value = ValueNode::unquoted("1444.11.11");
/// assert_eq!(value.to_date()?.year(), 1444);
/// assert!(!value.is_quoted());
///
/// let name = ValueNode::quoted(r#"Captain "Joe""#);
/// assert_eq!(name.as_bytes(), br#"Captain \"Joe\""#);
/// assert_eq!(name.text(Default::default()), r#"Captain "Joe""#);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueNode {
    data: Vec<u8>,
    quoted: bool,
}

impl ValueNode {
    /// Creates a value from raw wire bytes
    pub fn new(data: impl Into<Vec<u8>>, quoted: bool) -> Self {
        ValueNode {
            data: data.into(),
            quoted,
        }
    }

    /// Creates an unquoted value. The bytes are taken as is.
    pub fn unquoted(data: impl Into<Vec<u8>>) -> Self {
        Self::new(data, false)
    }

    /// Creates a quoted value from text, escaping quotes and backslashes
    pub fn quoted(text: &str) -> Self {
        let mut data = Vec::with_capacity(text.len());
        for &x in text.as_bytes() {
            if x == b'\\' || x == b'"' {
                data.push(b'\\');
            }
            data.push(x);
        }

        Self::new(data, true)
    }

    /// Creates an integer value
    pub fn from_i64(value: i64) -> Self {
        #[cfg(feature = "faster_writer")]
        {
            let mut buffer = itoa::Buffer::new();
            Self::unquoted(buffer.format(value).as_bytes())
        }

        #[cfg(not(feature = "faster_writer"))]
        Self::unquoted(value.to_string())
    }

    /// Creates a floating point value
    pub fn from_f64(value: f64) -> Self {
        Self::unquoted(value.to_string())
    }

    /// Creates a `yes` or `no` value
    pub fn from_bool(value: bool) -> Self {
        Self::unquoted(if value { "yes" } else { "no" })
    }

    /// Creates a date value in the game format
    pub fn from_date(value: Date) -> Self {
        Self::unquoted(value.game_fmt())
    }

    /// The wire form bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the value, returning the wire form bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Returns true if the value was written within quotes
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Decodes the value as text with escapes resolved
    pub fn text(&self, charset: Charset) -> Cow<str> {
        charset.decode(&self.data)
    }

    /// Try converting the value to i32
    pub fn to_i32(&self) -> Result<i32, ScalarError> {
        let x = self.to_i64()?;
        i32::try_from(x).map_err(|_| ScalarError::Overflow(x.to_string()))
    }

    /// Try converting the value to i64
    pub fn to_i64(&self) -> Result<i64, ScalarError> {
        to_i64(&self.data)
    }

    /// Try converting the value to u64
    pub fn to_u64(&self) -> Result<u64, ScalarError> {
        to_u64(&self.data)
    }

    /// Try converting the value to f64
    pub fn to_f64(&self) -> Result<f64, ScalarError> {
        to_f64(&self.data)
    }

    /// Try converting the value to a boolean (`yes`/`no`)
    pub fn to_bool(&self) -> Result<bool, ScalarError> {
        to_bool(&self.data)
    }

    /// Try converting the value to a date
    pub fn to_date(&self) -> Result<Date, ScalarError> {
        to_date(&self.data)
    }

    pub(crate) fn eq_key(&self, key: &str) -> bool {
        self.data == key.as_bytes()
    }
}

impl From<&str> for ValueNode {
    fn from(value: &str) -> Self {
        ValueNode::unquoted(value)
    }
}

/// A member of an array: a bare node or a `key=node` pair
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The key, absent for bare entries
    pub key: Option<ValueNode>,

    /// The entry's node
    pub node: Node,
}

impl Entry {
    /// Creates a bare entry
    pub fn bare(node: Node) -> Self {
        Entry { key: None, node }
    }

    /// Creates a keyed entry
    pub fn keyed(key: impl Into<ValueNode>, node: Node) -> Self {
        Entry {
            key: Some(key.into()),
            node,
        }
    }

    /// Returns true if the entry carries the key
    pub fn has_key(&self, key: &str) -> bool {
        self.key.as_ref().map_or(false, |k| k.eq_key(key))
    }
}

/// An ordered sequence of entries.
///
/// Arrays and objects are not distinguished by the format, so a single array
/// may hold both bare and keyed entries. Source order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayNode {
    entries: Vec<Entry>,
}

impl ArrayNode {
    /// Creates an empty array
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty array that can hold `capacity` entries without
    /// reallocating
    pub fn with_capacity(capacity: usize) -> Self {
        ArrayNode {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Creates an array from entries
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        ArrayNode { entries }
    }

    /// The entries in source order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Mutable access to the entries
    pub fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    /// Consumes the array, returning its entries
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// The number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the index of the entry with the key according to the policy
    pub fn position(&self, key: &str, policy: KeyPolicy) -> Option<usize> {
        match policy {
            KeyPolicy::First => self.entries.iter().position(|x| x.has_key(key)),
            KeyPolicy::Last => self.entries.iter().rposition(|x| x.has_key(key)),
        }
    }

    /// Looks up the node stored under the key
    ///
    /// ```
    /// use clausewitz_save::text::{parse, KeyPolicy};
    /// let root = parse(b"a=1 a=2")?;
    /// let root = root.as_array().unwrap();
    /// assert_eq!(root.get("a", KeyPolicy::First).unwrap().to_i64()?, 1);
    /// assert_eq!(root.get("a", KeyPolicy::Last).unwrap().to_i64()?, 2);
    /// assert!(root.get("b", KeyPolicy::First).is_none());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn get(&self, key: &str, policy: KeyPolicy) -> Option<&Node> {
        self.position(key, policy).map(|i| &self.entries[i].node)
    }

    /// Mutable lookup of the node stored under the key
    pub fn get_mut(&mut self, key: &str, policy: KeyPolicy) -> Option<&mut Node> {
        let i = self.position(key, policy)?;
        Some(&mut self.entries[i].node)
    }

    /// Shorthand for [`KeyPolicy::First`] lookup
    pub fn get_first(&self, key: &str) -> Option<&Node> {
        self.get(key, KeyPolicy::First)
    }

    /// Shorthand for [`KeyPolicy::Last`] lookup
    pub fn get_last(&self, key: &str) -> Option<&Node> {
        self.get(key, KeyPolicy::Last)
    }

    /// Every node stored under the key, in source order
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.entries
            .iter()
            .filter(move |x| x.has_key(key))
            .map(|x| &x.node)
    }

    /// Returns true if any entry carries the key
    pub fn has_key(&self, key: &str) -> bool {
        self.entries.iter().any(|x| x.has_key(key))
    }

    /// The keyed entries
    pub fn iter_keyed(&self) -> impl Iterator<Item = (&ValueNode, &Node)> {
        self.entries
            .iter()
            .filter_map(|x| x.key.as_ref().map(|k| (k, &x.node)))
    }

    /// Every entry's node, keyed or not
    pub fn values(&self) -> impl Iterator<Item = &Node> {
        self.entries.iter().map(|x| &x.node)
    }

    /// Replaces the node at the index, keeping its key. Returns the previous
    /// node, or `None` (and changes nothing) if the index is out of bounds.
    pub fn replace_at(&mut self, index: usize, node: Node) -> Option<Node> {
        let entry = self.entries.get_mut(index)?;
        Some(std::mem::replace(&mut entry.node, node))
    }

    /// Replaces the node stored under the key. Returns the previous node, or
    /// `None` (and changes nothing) if the key is absent.
    pub fn replace_key(&mut self, key: &str, node: Node, policy: KeyPolicy) -> Option<Node> {
        let index = self.position(key, policy)?;
        self.replace_at(index, node)
    }

    /// Appends an entry
    pub fn push_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Appends a bare entry
    pub fn push(&mut self, node: Node) {
        self.entries.push(Entry::bare(node));
    }

    /// Appends a keyed entry
    pub fn push_keyed(&mut self, key: impl Into<ValueNode>, node: Node) {
        self.entries.push(Entry::keyed(key, node));
    }

    /// Inserts a keyed entry at the index, shifting later entries
    ///
    /// Panics if `index > len`
    pub fn insert_keyed(&mut self, index: usize, key: impl Into<ValueNode>, node: Node) {
        self.entries.insert(index, Entry::keyed(key, node));
    }

    /// Removes the first entry carrying the key, returning its node
    pub fn remove_key(&mut self, key: &str) -> Option<Node> {
        let index = self.position(key, KeyPolicy::First)?;
        Some(self.entries.remove(index).node)
    }
}

impl FromIterator<Entry> for ArrayNode {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        ArrayNode {
            entries: iter.into_iter().collect(),
        }
    }
}

/// An array decorated with a leading type tag, like `rgb { 10 20 30 }`
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedNode {
    tag: String,
    array: ArrayNode,
}

impl TaggedNode {
    /// Creates a tagged node
    pub fn new(tag: impl Into<String>, array: ArrayNode) -> Self {
        TaggedNode {
            tag: tag.into(),
            array,
        }
    }

    /// The tag
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The tagged payload
    pub fn array(&self) -> &ArrayNode {
        &self.array
    }

    /// Mutable access to the tagged payload
    pub fn array_mut(&mut self) -> &mut ArrayNode {
        &mut self.array
    }

    /// Consumes the node, returning the payload
    pub fn into_array(self) -> ArrayNode {
        self.array
    }
}

/// A document element.
///
/// ```
/// use clausewitz_save::text::{parse, Node};
/// let root = parse(b"color = rgb { 10 20 30 } provinces = { 1 2 3 }")?;
/// let root = root.as_array().unwrap();
/// assert!(root.get_first("color").unwrap().is_tagged());
/// assert_eq!(root.get_first("provinces").unwrap().len(), 3);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A scalar leaf
    Value(ValueNode),

    /// An ordered sequence of entries
    Array(ArrayNode),

    /// A tagged array
    Tagged(TaggedNode),
}

impl Node {
    /// Returns true for a scalar leaf
    pub fn is_value(&self) -> bool {
        matches!(self, Node::Value(_))
    }

    /// Returns true for an untagged array
    pub fn is_array(&self) -> bool {
        matches!(self, Node::Array(_))
    }

    /// Returns true for a tagged array
    pub fn is_tagged(&self) -> bool {
        matches!(self, Node::Tagged(_))
    }

    /// The scalar leaf, if this is one
    pub fn as_value(&self) -> Option<&ValueNode> {
        match self {
            Node::Value(x) => Some(x),
            _ => None,
        }
    }

    /// The entries of an array or tagged array
    pub fn as_array(&self) -> Option<&ArrayNode> {
        match self {
            Node::Value(_) => None,
            Node::Array(x) => Some(x),
            Node::Tagged(x) => Some(x.array()),
        }
    }

    /// Mutable access to the entries of an array or tagged array
    pub fn as_array_mut(&mut self) -> Option<&mut ArrayNode> {
        match self {
            Node::Value(_) => None,
            Node::Array(x) => Some(x),
            Node::Tagged(x) => Some(x.array_mut()),
        }
    }

    /// The tagged array, if this is one
    pub fn as_tagged(&self) -> Option<&TaggedNode> {
        match self {
            Node::Tagged(x) => Some(x),
            _ => None,
        }
    }

    /// The scalar leaf, or an error for arrays
    pub fn value(&self) -> Result<&ValueNode, ScalarError> {
        self.as_value().ok_or(ScalarError::NotAValue)
    }

    /// The number of children. Values have none.
    pub fn len(&self) -> usize {
        self.as_array().map_or(0, |x| x.len())
    }

    /// Returns true if there are no children
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if this is an array holding the key
    pub fn has_key(&self, key: &str) -> bool {
        self.as_array().map_or(false, |x| x.has_key(key))
    }

    /// Looks up a child by key. Values have no children.
    pub fn get(&self, key: &str, policy: KeyPolicy) -> Option<&Node> {
        self.as_array().and_then(|x| x.get(key, policy))
    }

    /// Shorthand for [`KeyPolicy::First`] lookup
    pub fn get_first(&self, key: &str) -> Option<&Node> {
        self.get(key, KeyPolicy::First)
    }

    /// Shorthand for [`KeyPolicy::Last`] lookup
    pub fn get_last(&self, key: &str) -> Option<&Node> {
        self.get(key, KeyPolicy::Last)
    }

    /// Every child stored under the key
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.as_array().into_iter().flat_map(move |x| x.get_all(key))
    }

    /// Decodes a scalar leaf as text
    pub fn text(&self, charset: Charset) -> Result<Cow<str>, ScalarError> {
        Ok(self.value()?.text(charset))
    }

    /// Try converting a scalar leaf to i32
    pub fn to_i32(&self) -> Result<i32, ScalarError> {
        self.value()?.to_i32()
    }

    /// Try converting a scalar leaf to i64
    pub fn to_i64(&self) -> Result<i64, ScalarError> {
        self.value()?.to_i64()
    }

    /// Try converting a scalar leaf to u64
    pub fn to_u64(&self) -> Result<u64, ScalarError> {
        self.value()?.to_u64()
    }

    /// Try converting a scalar leaf to f64
    pub fn to_f64(&self) -> Result<f64, ScalarError> {
        self.value()?.to_f64()
    }

    /// Try converting a scalar leaf to a boolean
    pub fn to_bool(&self) -> Result<bool, ScalarError> {
        self.value()?.to_bool()
    }

    /// Try converting a scalar leaf to a date
    pub fn to_date(&self) -> Result<Date, ScalarError> {
        self.value()?.to_date()
    }
}

impl From<ValueNode> for Node {
    fn from(value: ValueNode) -> Self {
        Node::Value(value)
    }
}

impl From<ArrayNode> for Node {
    fn from(value: ArrayNode) -> Self {
        Node::Array(value)
    }
}

impl From<TaggedNode> for Node {
    fn from(value: TaggedNode) -> Self {
        Node::Tagged(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(x: &str) -> Node {
        Node::Value(ValueNode::unquoted(x))
    }

    fn sample() -> ArrayNode {
        let mut arr = ArrayNode::new();
        arr.push_keyed("a", value("1"));
        arr.push(value("bare"));
        arr.push_keyed("b", value("2"));
        arr.push_keyed("a", value("3"));
        arr
    }

    #[test]
    fn test_key_policy() {
        let arr = sample();
        assert_eq!(arr.get("a", KeyPolicy::First), Some(&value("1")));
        assert_eq!(arr.get("a", KeyPolicy::Last), Some(&value("3")));
        assert_eq!(arr.get_all("a").count(), 2);
        assert!(arr.get("bare", KeyPolicy::First).is_none());
        assert!(arr.has_key("b"));
        assert!(!arr.has_key("c"));
    }

    #[test]
    fn test_replace_keeps_siblings() {
        let mut arr = sample();
        let before: Vec<_> = arr.entries().to_vec();
        let old = arr.replace_at(1, value("changed"));
        assert_eq!(old, Some(value("bare")));
        assert_eq!(arr.len(), 4);
        for i in [0, 2, 3] {
            assert_eq!(arr.entries()[i], before[i]);
        }

        assert_eq!(arr.replace_at(10, value("x")), None);
        assert_eq!(arr.len(), 4);
    }

    #[test]
    fn test_replace_key() {
        let mut arr = sample();
        let old = arr.replace_key("a", value("4"), KeyPolicy::Last);
        assert_eq!(old, Some(value("3")));
        assert_eq!(arr.get_first("a"), Some(&value("1")));
        assert_eq!(arr.get_last("a"), Some(&value("4")));
        assert_eq!(arr.replace_key("zzz", value("4"), KeyPolicy::First), None);
    }

    #[test]
    fn test_remove_and_insert() {
        let mut arr = sample();
        assert_eq!(arr.remove_key("a"), Some(value("1")));
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get_first("a"), Some(&value("3")));
        arr.insert_keyed(0, "z", value("0"));
        assert_eq!(arr.entries()[0].key, Some(ValueNode::unquoted("z")));
        assert_eq!(arr.remove_key("missing"), None);
    }

    #[test]
    fn test_iterators() {
        let arr = sample();
        let keys: Vec<_> = arr.iter_keyed().map(|(k, _)| k.as_bytes()).collect();
        assert_eq!(keys, vec![&b"a"[..], b"b", b"a"]);
        assert_eq!(arr.values().count(), 4);
    }

    #[test]
    fn test_node_queries() {
        let node = Node::Array(sample());
        assert!(node.is_array());
        assert!(!node.is_value());
        assert_eq!(node.len(), 4);
        assert!(node.has_key("a"));
        assert_eq!(node.get_first("b").unwrap().to_i64(), Ok(2));

        let tagged = Node::Tagged(TaggedNode::new("rgb", sample()));
        assert!(tagged.is_tagged());
        assert_eq!(tagged.len(), 4);

        let leaf = value("10");
        assert!(leaf.is_value());
        assert_eq!(leaf.len(), 0);
        assert!(leaf.get_first("a").is_none());
        assert_eq!(node.to_i64(), Err(ScalarError::NotAValue));
    }

    #[test]
    fn test_value_coercions() {
        assert_eq!(ValueNode::unquoted("-3").to_i32(), Ok(-3));
        assert_eq!(
            ValueNode::unquoted("10000000000").to_i32(),
            Err(ScalarError::Overflow(String::from("10000000000")))
        );
        assert_eq!(ValueNode::unquoted("0.500").to_f64(), Ok(0.5));
        assert_eq!(ValueNode::unquoted("yes").to_bool(), Ok(true));
        assert!(ValueNode::unquoted("abc").to_i64().is_err());
        assert_eq!(
            ValueNode::unquoted("1444.11.11").to_date(),
            Ok(Date::from_ymd(1444, 11, 11))
        );
    }

    #[test]
    fn test_value_constructors() {
        assert_eq!(ValueNode::from_i64(-12).as_bytes(), b"-12");
        assert_eq!(ValueNode::from_f64(0.5).as_bytes(), b"0.5");
        assert_eq!(ValueNode::from_bool(false).as_bytes(), b"no");
        assert_eq!(
            ValueNode::from_date(Date::from_ymd(1444, 11, 11)).as_bytes(),
            b"1444.11.11"
        );

        let quoted = ValueNode::quoted(r#"C:\Games "x""#);
        assert!(quoted.is_quoted());
        assert_eq!(quoted.as_bytes(), br#"C:\\Games \"x\""#);
        assert_eq!(quoted.text(Charset::Utf8), r#"C:\Games "x""#);
    }
}
