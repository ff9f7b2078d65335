//! Savegame envelopes: detecting how a save file is packaged and turning it
//! into named parts.
//!
//! A decoded save is a [`SavegameContainer`], a map from part name to the
//! parsed document. How the parts are laid out on disk depends on the
//! [`GameFamily`]:
//!
//! - EU4 writes either a plain `EU4txt` document or a zip with `meta`,
//!   `gamestate` and `ai` entries
//! - HOI4 writes a plain `HOI4txt` document
//! - Stellaris writes a zip with `meta` and `gamestate` entries
//! - CK3 writes a [`SaveHeader`] line, the metadata in plain text, and then a
//!   zip holding the gamestate
//!
//! ```
//! use clausewitz_save::container::{GameFamily, SavegameContainer};
//! let container = SavegameContainer::decode(b"EU4txt\ndate=1444.11.11", GameFamily::Eu4)?;
//! let gamestate = container.part("gamestate").unwrap();
//! assert_eq!(gamestate.get_first("date").unwrap().to_date()?.year(), 1444);
//!
//! let mut out = Vec::new();
//! container.encode(GameFamily::Eu4, &mut out)?;
//! assert_eq!(&out, b"EU4txt\ndate=1444.11.11\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub(crate) mod archive;
mod header;

pub use self::archive::{is_zip, MAX_SEARCH, ZIP_MAGIC};
pub use self::header::{SaveHeader, SaveHeaderKind};

use self::archive::{locate_zip, ZipBuilder, ZipReader};
use crate::text::{Node, NodeParser, NodeWriterBuilder, ParserOptions, ValueNode};
use crate::{Charset, Error, FormatError};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// The game a save belongs to. Everything that differs between games'
/// envelopes hangs off this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GameFamily {
    /// Europa Universalis IV
    Eu4,

    /// Crusader Kings III
    Ck3,

    /// Hearts of Iron IV
    Hoi4,

    /// Stellaris
    Stellaris,
}

impl GameFamily {
    /// All known families
    pub const ALL: [GameFamily; 4] = [
        GameFamily::Eu4,
        GameFamily::Ck3,
        GameFamily::Hoi4,
        GameFamily::Stellaris,
    ];

    /// Short lowercase identifier
    pub fn name(&self) -> &'static str {
        match self {
            GameFamily::Eu4 => "eu4",
            GameFamily::Ck3 => "ck3",
            GameFamily::Hoi4 => "hoi4",
            GameFamily::Stellaris => "stellaris",
        }
    }

    /// Every part a save of this family can hold
    pub fn part_names(&self) -> &'static [&'static str] {
        match self {
            GameFamily::Eu4 => &["meta", "gamestate", "ai"],
            GameFamily::Stellaris => &["meta", "gamestate"],
            GameFamily::Ck3 | GameFamily::Hoi4 => &["gamestate"],
        }
    }

    /// The parts present for the given envelope
    fn expected_parts(&self, compressed: bool) -> &'static [&'static str] {
        match (self, compressed) {
            (GameFamily::Eu4, false) => &["gamestate"],
            _ => self.part_names(),
        }
    }

    /// The magic that starts every text document, if any
    pub fn text_magic(&self) -> Option<&'static [u8]> {
        match self {
            GameFamily::Eu4 => Some(b"EU4txt"),
            GameFamily::Hoi4 => Some(b"HOI4txt"),
            GameFamily::Ck3 | GameFamily::Stellaris => None,
        }
    }

    /// The magic that starts a binary encoded document, if any
    pub fn binary_magic(&self) -> Option<&'static [u8]> {
        match self {
            GameFamily::Eu4 => Some(b"EU4bin"),
            GameFamily::Hoi4 => Some(b"HOI4bin"),
            GameFamily::Ck3 | GameFamily::Stellaris => None,
        }
    }

    /// The character set of the family's text
    pub fn charset(&self) -> Charset {
        match self {
            GameFamily::Eu4 => Charset::Windows1252,
            _ => Charset::Utf8,
        }
    }

    /// Parser options for the family's documents
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions::default()
    }

    /// Whether a save of this family is compressed unless stated otherwise
    fn compressed_by_default(&self) -> bool {
        !matches!(self, GameFamily::Hoi4)
    }
}

impl fmt::Display for GameFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded save: its parts plus what is needed to write the same envelope
/// back out
#[derive(Debug, Clone, PartialEq)]
pub struct SavegameContainer {
    parts: BTreeMap<String, Node>,
    compressed: bool,
    header: Option<SaveHeader>,
}

impl SavegameContainer {
    /// A container for the family's usual envelope
    pub fn new(family: GameFamily, parts: BTreeMap<String, Node>) -> Self {
        SavegameContainer {
            parts,
            compressed: family.compressed_by_default(),
            header: None,
        }
    }

    /// Decodes save data
    pub fn decode(data: &[u8], family: GameFamily) -> Result<Self, Error> {
        let options = family.parser_options();
        let parser = NodeParser::new(&options);
        match family {
            GameFamily::Ck3 => decode_headered(data, &parser),
            GameFamily::Eu4 | GameFamily::Hoi4 | GameFamily::Stellaris => {
                let compressed = is_zip(data);
                let raw: Vec<(String, Cow<[u8]>)> = if compressed {
                    debug!(family = %family, "detected zip envelope");
                    let entries = ZipReader::new(data)?.into_entries()?;
                    entries.into_iter().map(|(n, b)| (n, Cow::Owned(b))).collect()
                } else {
                    debug!(family = %family, "detected plain envelope");
                    vec![(String::from("gamestate"), Cow::Borrowed(data))]
                };

                let mut parts = BTreeMap::new();
                for (name, body) in raw {
                    if !family.expected_parts(compressed).contains(&name.as_str()) {
                        return Err(FormatError::UnexpectedPart(name).into());
                    }

                    let body = strip_magic(&body, family)?;
                    debug!(part = %name, len = body.len(), "parsing part");
                    parts.insert(name, parser.parse(body)?);
                }

                let result = SavegameContainer {
                    parts,
                    compressed,
                    header: None,
                };
                result.check_parts(family)?;
                Ok(result)
            }
        }
    }

    /// Reads the file fully into memory and decodes it
    pub fn from_path<P: AsRef<Path>>(path: P, family: GameFamily) -> Result<Self, Error> {
        let data = std::fs::read(path)?;
        Self::decode(&data, family)
    }

    /// Encodes the parts into the family's envelope
    pub fn encode<W: Write>(&self, family: GameFamily, mut writer: W) -> Result<(), Error> {
        self.check_parts(family)?;
        let options = NodeWriterBuilder::new();
        match family {
            GameFamily::Ck3 => {
                let gamestate = self.require("gamestate")?;
                let (meta, rest) = split_meta_data(gamestate)?;
                let mut meta_bytes = Vec::new();
                options
                    .build(&mut meta_bytes)
                    .write_field(&ValueNode::unquoted("meta_data"), meta)?;

                let kind = if self.compressed {
                    SaveHeaderKind::UnifiedText
                } else {
                    SaveHeaderKind::Text
                };

                let mut header = self
                    .header
                    .clone()
                    .unwrap_or_else(|| SaveHeader::new(kind, 0));
                header.set_kind(kind);
                header.set_metadata_len(meta_bytes.len().saturating_sub(1) as u64);
                header.write(&mut writer)?;
                writer.write_all(&meta_bytes)?;

                if self.compressed {
                    let mut zip = ZipBuilder::new();
                    let entry = zip.start("gamestate")?;
                    entry.write_all(&meta_bytes)?;
                    options.build(entry).write_node(&rest)?;
                    writer.write_all(&zip.finish()?)?;
                } else {
                    options.build(&mut writer).write_node(&rest)?;
                }
            }
            GameFamily::Eu4 | GameFamily::Hoi4 | GameFamily::Stellaris => {
                let names = family.expected_parts(self.compressed);
                if self.compressed {
                    let mut zip = ZipBuilder::new();
                    for name in names {
                        let entry = zip.start(name)?;
                        write_document(entry, family, self.require(name)?, &options)?;
                    }
                    writer.write_all(&zip.finish()?)?;
                } else {
                    write_document(&mut writer, family, self.require("gamestate")?, &options)?;
                }
            }
        }

        Ok(())
    }

    /// Encodes into a `.tmp` sibling of the path and renames it into place
    pub fn write_path<P: AsRef<Path>>(&self, path: P, family: GameFamily) -> Result<(), Error> {
        let path = path.as_ref();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");

        let mut out = Vec::new();
        self.encode(family, &mut out)?;
        std::fs::write(&tmp, &out)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), len = out.len(), "wrote savegame");
        Ok(())
    }

    /// The parts by name
    pub fn parts(&self) -> &BTreeMap<String, Node> {
        &self.parts
    }

    /// The parts by name, for editing
    pub fn parts_mut(&mut self) -> &mut BTreeMap<String, Node> {
        &mut self.parts
    }

    /// Consumes the container, returning its parts
    pub fn into_parts(self) -> BTreeMap<String, Node> {
        self.parts
    }

    /// A single part
    pub fn part(&self, name: &str) -> Option<&Node> {
        self.parts.get(name)
    }

    /// A single part, for editing
    pub fn part_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.parts.get_mut(name)
    }

    /// Whether the body is written zip compressed
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Switches between the compressed and plain envelope. For EU4 the
    /// plain envelope only holds the gamestate.
    pub fn set_compressed(&mut self, compressed: bool) {
        self.compressed = compressed;
    }

    /// Whether the body is in the binary format. Binary bodies are rejected
    /// with [`FormatError::BinaryUnsupported`] on decode and there is no
    /// binary writer, so this is false for every container.
    pub fn is_binary(&self) -> bool {
        false
    }

    /// The header line the save was decoded with (CK3 only)
    pub fn header(&self) -> Option<&SaveHeader> {
        self.header.as_ref()
    }

    fn require(&self, name: &str) -> Result<&Node, Error> {
        self.parts
            .get(name)
            .ok_or_else(|| FormatError::MissingPart(String::from(name)).into())
    }

    fn check_parts(&self, family: GameFamily) -> Result<(), Error> {
        let expected = family.expected_parts(self.compressed);
        if let Some(name) = expected.iter().find(|x| !self.parts.contains_key(**x)) {
            return Err(FormatError::MissingPart(String::from(*name)).into());
        }

        if let Some(name) = self.parts.keys().find(|x| !expected.contains(&x.as_str())) {
            return Err(FormatError::UnexpectedPart(name.clone()).into());
        }

        Ok(())
    }
}

fn strip_magic(data: &[u8], family: GameFamily) -> Result<&[u8], Error> {
    let Some(magic) = family.text_magic() else {
        return Ok(data);
    };

    if let Some(rest) = data.strip_prefix(magic) {
        return Ok(rest);
    }

    match family.binary_magic() {
        Some(bin) if data.starts_with(bin) => Err(FormatError::BinaryUnsupported.into()),
        _ => Err(FormatError::UnknownMagic.into()),
    }
}

fn write_document<W: Write>(
    mut writer: W,
    family: GameFamily,
    node: &Node,
    options: &NodeWriterBuilder,
) -> Result<(), Error> {
    if let Some(magic) = family.text_magic() {
        writer.write_all(magic)?;
        writer.write_all(b"\n")?;
    }

    options.build(writer).write_node(node)?;
    Ok(())
}

fn decode_headered(data: &[u8], parser: &NodeParser) -> Result<SavegameContainer, Error> {
    let header = SaveHeader::from_slice(data)?;
    let kind = header.kind();
    debug!(kind = kind.value(), meta_len = header.metadata_len(), "detected save header");

    if let SaveHeaderKind::Other(x) = kind {
        return Err(FormatError::UnknownHeaderKind(x).into());
    }

    if kind.is_binary() {
        return Err(FormatError::BinaryUnsupported.into());
    }

    let body = &data[header.header_len()..];
    let gamestate = if kind.is_compressed() {
        let meta_len = usize::try_from(header.metadata_len()).unwrap_or(usize::MAX);
        let declared = header
            .header_len()
            .saturating_add(meta_len)
            .saturating_add(1);
        let start = locate_zip(data, declared)?;

        let mut entries = ZipReader::new(&data[start..])?.into_entries()?;
        if let Some((name, _)) = entries.iter().find(|(name, _)| name != "gamestate") {
            return Err(FormatError::UnexpectedPart(name.clone()).into());
        }

        let (_, body) = entries
            .pop()
            .ok_or_else(|| FormatError::MissingPart(String::from("gamestate")))?;
        parser.parse(&body)?
    } else {
        parser.parse(body)?
    };

    let mut parts = BTreeMap::new();
    parts.insert(String::from("gamestate"), gamestate);
    Ok(SavegameContainer {
        parts,
        compressed: kind.is_compressed(),
        header: Some(header),
    })
}

/// Separates the `meta_data` block from the rest of a CK3 gamestate
fn split_meta_data(gamestate: &Node) -> Result<(&Node, Node), Error> {
    let missing = || Error::from(FormatError::MissingPart(String::from("meta_data")));
    let root = gamestate.as_array().ok_or_else(missing)?;
    let meta = root.get_first("meta_data").ok_or_else(missing)?;

    let mut rest = root.clone();
    rest.remove_key("meta_data");
    Ok((meta, Node::Array(rest)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::parse;
    use crate::ErrorKind;

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = ZipBuilder::new();
        for (name, data) in entries {
            builder.add(name, data).unwrap();
        }
        builder.finish().unwrap()
    }

    fn format_error(result: Result<SavegameContainer, Error>) -> FormatError {
        match result.unwrap_err().into_kind() {
            ErrorKind::Format(x) => x,
            x => panic!("unexpected error: {:?}", x),
        }
    }

    #[test]
    fn test_eu4_plain() {
        let container = SavegameContainer::decode(b"EU4txt\nplayer=\"ENG\"", GameFamily::Eu4).unwrap();
        assert!(!container.is_compressed());
        assert_eq!(container.parts().len(), 1);
        let player = container.part("gamestate").unwrap().get_first("player").unwrap();
        assert!(player.as_value().unwrap().is_quoted());
    }

    #[test]
    fn test_eu4_zip() {
        let data = zip_of(&[
            ("meta", &b"EU4txt\ndate=1444.11.11"[..]),
            ("gamestate", &b"EU4txt\nplayer=\"ENG\""[..]),
            ("ai", &b"EU4txt\nai={ }"[..]),
        ]);
        let container = SavegameContainer::decode(&data, GameFamily::Eu4).unwrap();
        assert!(container.is_compressed());
        let names: Vec<_> = container.parts().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["ai", "gamestate", "meta"]);

        let mut out = Vec::new();
        container.encode(GameFamily::Eu4, &mut out).unwrap();
        let again = SavegameContainer::decode(&out, GameFamily::Eu4).unwrap();
        assert_eq!(again, container);
    }

    #[test]
    fn test_eu4_rejections() {
        let err = format_error(SavegameContainer::decode(b"EU4bin\x01\x00", GameFamily::Eu4));
        assert_eq!(err, FormatError::BinaryUnsupported);

        let err = format_error(SavegameContainer::decode(b"HOI4txt\na=b", GameFamily::Eu4));
        assert_eq!(err, FormatError::UnknownMagic);

        let data = zip_of(&[("meta", &b"EU4txt\na=b"[..]), ("gamestate", &b"EU4txt\na=b"[..])]);
        let err = format_error(SavegameContainer::decode(&data, GameFamily::Eu4));
        assert_eq!(err, FormatError::MissingPart(String::from("ai")));

        let data = zip_of(&[("rnw.zip", &b"EU4txt\na=b"[..])]);
        let err = format_error(SavegameContainer::decode(&data, GameFamily::Eu4));
        assert_eq!(err, FormatError::UnexpectedPart(String::from("rnw.zip")));

        let data = zip_of(&[
            ("meta", &b"EU4bin\x01"[..]),
            ("gamestate", &b"EU4bin\x01"[..]),
            ("ai", &b"EU4bin\x01"[..]),
        ]);
        let err = format_error(SavegameContainer::decode(&data, GameFamily::Eu4));
        assert_eq!(err, FormatError::BinaryUnsupported);
    }

    #[test]
    fn test_hoi4() {
        let container = SavegameContainer::decode(b"HOI4txt\nplayer=\"GER\"", GameFamily::Hoi4).unwrap();
        let mut out = Vec::new();
        container.encode(GameFamily::Hoi4, &mut out).unwrap();
        assert_eq!(&out, b"HOI4txt\nplayer=\"GER\"\n");

        let err = format_error(SavegameContainer::decode(b"HOI4bin", GameFamily::Hoi4));
        assert_eq!(err, FormatError::BinaryUnsupported);
    }

    #[test]
    fn test_stellaris() {
        let data = zip_of(&[
            ("meta", &b"version=\"Pyxis v3.0.3\""[..]),
            ("gamestate", &b"name=\"Earth\"\nspecies={ { name=\"Humans\" } }"[..]),
        ]);
        let container = SavegameContainer::decode(&data, GameFamily::Stellaris).unwrap();
        assert_eq!(container.parts().len(), 2);

        let err = format_error(SavegameContainer::decode(b"name=\"Earth\"", GameFamily::Stellaris));
        assert_eq!(err, FormatError::MissingPart(String::from("meta")));
    }

    fn ck3_save(meta_delta: i64) -> Vec<u8> {
        let meta = b"meta_data={\n\tversion=\"1.0.2\"\n}\n";
        let gamestate = b"meta_data={\n\tversion=\"1.0.2\"\n}\ndate=867.1.1\nplayed_character={ name=\"Petur\" }\n";
        let meta_len = meta.len() as i64 - 1 + meta_delta;
        let mut data = format!("SAV0102a40f789f{:08x}\n", meta_len).into_bytes();
        data.extend_from_slice(meta);
        data.extend_from_slice(&zip_of(&[("gamestate", &gamestate[..])]));
        data
    }

    #[test]
    fn test_ck3_compressed() {
        let container = SavegameContainer::decode(&ck3_save(0), GameFamily::Ck3).unwrap();
        assert!(container.is_compressed());
        let gamestate = container.part("gamestate").unwrap();
        assert!(gamestate.has_key("meta_data"));
        assert_eq!(gamestate.get_first("date").unwrap().to_date().unwrap().year(), 867);
    }

    #[test]
    fn test_ck3_wrong_metadata_length() {
        let expected = SavegameContainer::decode(&ck3_save(0), GameFamily::Ck3).unwrap();
        for delta in [-7, 3, 100_000] {
            let container = SavegameContainer::decode(&ck3_save(delta), GameFamily::Ck3).unwrap();
            assert_eq!(container.parts(), expected.parts());
        }
    }

    #[test]
    fn test_ck3_encode_round_trip() {
        let container = SavegameContainer::decode(&ck3_save(0), GameFamily::Ck3).unwrap();
        let mut out = Vec::new();
        container.encode(GameFamily::Ck3, &mut out).unwrap();

        let header = SaveHeader::from_slice(&out).unwrap();
        assert_eq!(header.kind(), SaveHeaderKind::UnifiedText);
        let meta_end = header.header_len() + header.metadata_len() as usize;
        assert_eq!(&out[header.header_len()..meta_end], b"meta_data={\n\tversion=\"1.0.2\"\n}");
        assert!(is_zip(&out[meta_end + 1..]));

        let again = SavegameContainer::decode(&out, GameFamily::Ck3).unwrap();
        assert_eq!(again.parts(), container.parts());
    }

    #[test]
    fn test_ck3_plain() {
        let data = b"SAV0100a40f789f00000003\nmeta_data={ a=b }\nc=d";
        let mut container = SavegameContainer::decode(data, GameFamily::Ck3).unwrap();
        assert!(!container.is_compressed());
        assert_eq!(container.part("gamestate").unwrap().len(), 2);

        let mut out = Vec::new();
        container.encode(GameFamily::Ck3, &mut out).unwrap();
        assert!(out.starts_with(b"SAV0100a40f789f"));
        let again = SavegameContainer::decode(&out, GameFamily::Ck3).unwrap();
        assert_eq!(again.parts(), container.parts());

        container.set_compressed(true);
        let mut out = Vec::new();
        container.encode(GameFamily::Ck3, &mut out).unwrap();
        let again = SavegameContainer::decode(&out, GameFamily::Ck3).unwrap();
        assert_eq!(again.parts(), container.parts());
    }

    #[test]
    fn test_ck3_rejections() {
        let err = format_error(SavegameContainer::decode(
            b"SAV0101ad23696300004c29\n\x01\x00",
            GameFamily::Ck3,
        ));
        assert_eq!(err, FormatError::BinaryUnsupported);

        let err = format_error(SavegameContainer::decode(
            b"SAV0109ad23696300004c29\n",
            GameFamily::Ck3,
        ));
        assert_eq!(err, FormatError::UnknownHeaderKind(9));

        let err = format_error(SavegameContainer::decode(b"meta_data={}", GameFamily::Ck3));
        assert_eq!(err, FormatError::InvalidHeader);

        let data = b"SAV0102ad23696300000005\nmeta_data={}\nno zip here";
        let err = SavegameContainer::decode(data, GameFamily::Ck3).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Integrity { declared: 30, .. }));
    }

    #[test]
    fn test_ck3_encode_requires_meta_data() {
        let mut parts = BTreeMap::new();
        parts.insert(String::from("gamestate"), parse(b"date=867.1.1").unwrap());
        let container = SavegameContainer::new(GameFamily::Ck3, parts);
        let err = container.encode(GameFamily::Ck3, Vec::new()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Format(FormatError::MissingPart(x)) if x == "meta_data"
        ));
    }

    #[test]
    fn test_encode_checks_parts() {
        let mut parts = BTreeMap::new();
        parts.insert(String::from("gamestate"), parse(b"a=b").unwrap());
        let container = SavegameContainer::new(GameFamily::Stellaris, parts.clone());
        let err = container.encode(GameFamily::Stellaris, Vec::new()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Format(FormatError::MissingPart(_))));

        parts.insert(String::from("extra"), parse(b"a=b").unwrap());
        let mut container = SavegameContainer::new(GameFamily::Eu4, parts);
        container.set_compressed(false);
        let err = container.encode(GameFamily::Eu4, Vec::new()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Format(FormatError::UnexpectedPart(_))));
    }

    #[test]
    fn test_write_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autosave.eu4");
        let container = SavegameContainer::decode(b"EU4txt\na=b", GameFamily::Eu4).unwrap();
        container.write_path(&path, GameFamily::Eu4).unwrap();
        assert!(!dir.path().join("autosave.eu4.tmp").exists());

        let again = SavegameContainer::from_path(&path, GameFamily::Eu4).unwrap();
        assert_eq!(again, container);
    }
}
