use super::node::{KeyPolicy, Node};
use std::fmt;
use std::str::FromStr;

/// One step of a [`NodePointer`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PointerSegment {
    /// The child stored under a key
    Key(String),

    /// The child at a position, keyed or not
    Index(usize),
}

/// A locator for a node within a tree.
///
/// Instead of nodes holding references to their parent's storage, edits are
/// addressed by the path from the root and applied through the parent's
/// indexed replace.
///
/// ```
/// use clausewitz_save::text::{parse, Node, NodePointer, ValueNode};
/// let mut root = parse(b"countries={ ENG={ treasury=10 } }")?;
/// let ptr: NodePointer = "countries/ENG/treasury".parse()?;
/// assert_eq!(ptr.resolve(&root).unwrap().to_i64()?, 10);
///
/// ptr.replace(&mut root, Node::Value(ValueNode::from_i64(20)));
/// assert_eq!(ptr.resolve(&root).unwrap().to_i64()?, 20);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePointer {
    segments: Vec<PointerSegment>,
    policy: KeyPolicy,
}

impl Default for NodePointer {
    fn default() -> Self {
        Self::root()
    }
}

impl NodePointer {
    /// A pointer to the root itself
    pub fn root() -> Self {
        NodePointer {
            segments: Vec::new(),
            policy: KeyPolicy::First,
        }
    }

    /// The policy used to resolve key segments when a key is duplicated
    pub fn with_policy(mut self, policy: KeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Extends the pointer with a key segment
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PointerSegment::Key(key.into()));
        self
    }

    /// Extends the pointer with an index segment
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PointerSegment::Index(index));
        self
    }

    /// The segments from the root down
    pub fn segments(&self) -> &[PointerSegment] {
        &self.segments
    }

    /// The pointer to the parent, or `None` for the root
    pub fn parent(&self) -> Option<NodePointer> {
        let (_, rest) = self.segments.split_last()?;
        Some(NodePointer {
            segments: rest.to_vec(),
            policy: self.policy,
        })
    }

    fn step<'a>(&self, node: &'a Node, segment: &PointerSegment) -> Option<&'a Node> {
        let array = node.as_array()?;
        match segment {
            PointerSegment::Key(key) => array.get(key, self.policy),
            PointerSegment::Index(i) => array.entries().get(*i).map(|x| &x.node),
        }
    }

    fn step_mut<'a>(&self, node: &'a mut Node, segment: &PointerSegment) -> Option<&'a mut Node> {
        let array = node.as_array_mut()?;
        match segment {
            PointerSegment::Key(key) => array.get_mut(key, self.policy),
            PointerSegment::Index(i) => array.entries_mut().get_mut(*i).map(|x| &mut x.node),
        }
    }

    /// Follows the pointer from the root
    pub fn resolve<'a>(&self, root: &'a Node) -> Option<&'a Node> {
        self.segments
            .iter()
            .try_fold(root, |node, segment| self.step(node, segment))
    }

    /// Follows the pointer from the root, allowing mutation of the target
    pub fn resolve_mut<'a>(&self, root: &'a mut Node) -> Option<&'a mut Node> {
        self.segments
            .iter()
            .try_fold(root, |node, segment| self.step_mut(node, segment))
    }

    /// Replaces the target through its parent, returning the previous node.
    /// Sibling positions are untouched. Returns `None` (and changes nothing)
    /// if the target does not exist.
    pub fn replace(&self, root: &mut Node, node: Node) -> Option<Node> {
        let (last, rest) = match self.segments.split_last() {
            Some(x) => x,
            None => return Some(std::mem::replace(root, node)),
        };

        let parent = rest
            .iter()
            .try_fold(root, |node, segment| self.step_mut(node, segment))?
            .as_array_mut()?;

        match last {
            PointerSegment::Key(key) => parent.replace_key(key, node, self.policy),
            PointerSegment::Index(i) => parent.replace_at(*i, node),
        }
    }
}

impl fmt::Display for NodePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PointerSegment::Key(key) => {
                    if i != 0 {
                        f.write_str("/")?;
                    }
                    f.write_str(key)?;
                }
                PointerSegment::Index(ind) => write!(f, "[{}]", ind)?,
            }
        }

        Ok(())
    }
}

/// The text could not be read as a pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerError(String);

impl fmt::Display for PointerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid node pointer: {}", self.0)
    }
}

impl std::error::Error for PointerError {}

impl FromStr for NodePointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PointerError(String::from(s));
        let mut result = NodePointer::root();
        if s.is_empty() {
            return Ok(result);
        }

        for part in s.split('/') {
            let (key, mut rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };

            if !key.is_empty() {
                result = result.key(key);
            } else if rest.is_empty() {
                return Err(err());
            }

            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(err)?;
                let ind = rest[1..close].parse::<usize>().map_err(|_| err())?;
                result = result.index(ind);
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(err());
                }
            }
        }

        Ok(result)
    }
}
