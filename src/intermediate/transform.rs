use crate::container::GameFamily;
use crate::text::{ArrayNode, Entry, Node, ValueNode};
use std::fmt;

/// A normalizing edit applied to a document root in place.
///
/// Transforms smooth over shape differences between game versions. They are
/// one way: nothing restores the shape a save was originally written in.
pub trait Transformer: fmt::Debug {
    /// Rewrites the root. Roots that are not arrays are left alone.
    fn transform(&self, root: &mut Node);
}

/// Renames every entry keyed `from` to `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameKey {
    from: String,
    to: String,
}

impl RenameKey {
    /// Renames entries keyed `from` to `to`
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        RenameKey {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Transformer for RenameKey {
    fn transform(&self, root: &mut Node) {
        let Some(root) = root.as_array_mut() else {
            return;
        };

        for entry in root.entries_mut() {
            if entry.has_key(&self.from) {
                entry.key = Some(ValueNode::unquoted(self.to.as_str()));
            }
        }
    }
}

/// Turns `key=value` into `key={ value }` where a list is expected but a
/// single item may be written without braces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapInArray {
    key: String,
}

impl WrapInArray {
    /// Wraps a bare value keyed `key` in an array
    pub fn new(key: impl Into<String>) -> Self {
        WrapInArray { key: key.into() }
    }
}

impl Transformer for WrapInArray {
    fn transform(&self, root: &mut Node) {
        let Some(root) = root.as_array_mut() else {
            return;
        };

        for entry in root.entries_mut() {
            if entry.has_key(&self.key) && !entry.node.is_array() {
                let item = std::mem::replace(&mut entry.node, Node::Array(ArrayNode::new()));
                entry.node = Node::Array(ArrayNode::from_entries(vec![Entry::bare(item)]));
            }
        }
    }
}

/// Folds every `key=...` entry into a single `into={ ... }` entry placed
/// where the first one was
///
/// ```
/// use clausewitz_save::intermediate::{CollectDuplicates, Transformer};
/// use clausewitz_save::text::parse;
/// let mut root = parse(b"active_war={ name=a } date=1444.11.11 active_war={ name=b }")?;
/// CollectDuplicates::new("active_war", "active_wars").transform(&mut root);
/// assert_eq!(root.len(), 2);
/// assert_eq!(root.get_first("active_wars").unwrap().len(), 2);
/// # Ok::<(), clausewitz_save::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectDuplicates {
    key: String,
    into: String,
}

impl CollectDuplicates {
    /// Collects every `key` entry under a single `into` entry
    pub fn new(key: impl Into<String>, into: impl Into<String>) -> Self {
        CollectDuplicates {
            key: key.into(),
            into: into.into(),
        }
    }
}

impl Transformer for CollectDuplicates {
    fn transform(&self, root: &mut Node) {
        let Some(root) = root.as_array_mut() else {
            return;
        };

        let Some(first) = root.position(&self.key, crate::text::KeyPolicy::First) else {
            return;
        };

        let entries = std::mem::take(root).into_entries();
        let mut collected = ArrayNode::new();
        let mut kept = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.has_key(&self.key) {
                collected.push(entry.node);
            } else {
                kept.push(entry);
            }
        }

        kept.insert(first, Entry::keyed(self.into.as_str(), Node::Array(collected)));
        *root = ArrayNode::from_entries(kept);
    }
}

/// Transformers run in order
#[derive(Debug, Default)]
pub struct TransformerChain {
    steps: Vec<Box<dyn Transformer>>,
}

impl TransformerChain {
    /// A chain with no steps, which leaves a root untouched
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step
    pub fn with<T: Transformer + 'static>(mut self, step: T) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Number of steps in the chain
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The normalization applied to a family's gamestate
    pub fn for_gamestate(family: GameFamily) -> Self {
        match family {
            GameFamily::Eu4 => TransformerChain::new()
                .with(CollectDuplicates::new("active_war", "active_wars"))
                .with(CollectDuplicates::new("previous_war", "previous_wars"))
                .with(CollectDuplicates::new("rebel_faction", "rebel_factions"))
                .with(RenameKey::new("trade", "trade_nodes"))
                .with(RenameKey::new("religion_instance_data", "religion_data")),
            GameFamily::Ck3 | GameFamily::Hoi4 | GameFamily::Stellaris => TransformerChain::new(),
        }
    }

    /// The normalization applied to a family's metadata
    pub fn for_meta(family: GameFamily) -> Self {
        match family {
            GameFamily::Eu4 => TransformerChain::new().with(WrapInArray::new("dlc_enabled")),
            GameFamily::Ck3 | GameFamily::Hoi4 | GameFamily::Stellaris => TransformerChain::new(),
        }
    }
}

impl Transformer for TransformerChain {
    fn transform(&self, root: &mut Node) {
        for step in &self.steps {
            step.transform(root);
        }
    }
}
