/*!

Read, edit and write the plaintext save files of
[Clausewitz](https://en.wikipedia.org/wiki/Paradox_Development_Studio#Clausewitz_Engine)
engine games: EU4, CK3, HOI4 and Stellaris.

The crate is organized in layers, each usable on its own:

- [`text::Tokenizer`] splits a document into a flat [`text::TokenTape`]
  that references the input bytes
- [`text::NodeParser`] builds a mutable [`text::Node`] tree from the tape
- [`text::NodeWriter`] writes a tree back in the text format, optionally
  stopping after a number of lines for previews
- [`container::SavegameContainer`] unwraps a save file's envelope (plain,
  zip, or a `SAV` header line followed by metadata and a zip) into named parts
- [`intermediate::IntermediateSavegame`] normalizes and splits a decoded save
  and persists it as a versioned package of JSON documents

## Quick Start

```rust
use clausewitz_save::text::{parse, write_to_vec, Node, NodeWriterBuilder, ValueNode};

let data = br#"
    human = yes
    player = "ENG"
    ideas = { a b c }
    color = rgb { 10 20 30 }
"#;

let mut root = parse(&data[..])?;
assert_eq!(root.get_first("human").unwrap().to_bool()?, true);
assert!(root.get_first("player").unwrap().as_value().unwrap().is_quoted());
assert_eq!(root.get_first("ideas").unwrap().len(), 3);

let color = root.get_first("color").unwrap().as_tagged().unwrap().color()?;
assert_eq!(color.components(), &[10.0, 20.0, 30.0]);

root.as_array_mut()
    .unwrap()
    .push_keyed("treasury", Node::Value(ValueNode::from_i64(100)));

let out = write_to_vec(&root, &NodeWriterBuilder::new())?;
assert_eq!(
    std::str::from_utf8(&out)?,
    "human=yes\nplayer=\"ENG\"\nideas={ a b c }\ncolor=rgb { 10 20 30 }\ntreasury=100\n"
);
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Saves

```rust
use clausewitz_save::container::{GameFamily, SavegameContainer};

let container = SavegameContainer::decode(b"HOI4txt\ndate=\"1936.1.1.12\"", GameFamily::Hoi4)?;
let date = container.part("gamestate").unwrap().get_first("date").unwrap().to_date()?;
assert_eq!((date.year(), date.hour()), (1936, 12));
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Caveats

Binary encoded saves (ironman) are detected and rejected with
[`FormatError::BinaryUnsupported`]; only the text format is handled.

*/

pub mod common;
pub mod container;
mod data;
mod encoding;
mod errors;
#[cfg(feature = "json")]
pub mod intermediate;
#[cfg(feature = "json")]
pub mod json;
mod scalar;
pub mod text;
pub(crate) mod util;

pub use self::encoding::Charset;
pub use self::errors::*;
pub use self::scalar::{Scalar, ScalarError};
