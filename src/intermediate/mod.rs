//! A normalized, split and JSON backed form of a decoded save.
//!
//! Turning a [`SavegameContainer`] into an [`IntermediateSavegame`]:
//!
//! 1. normalizes the gamestate and metadata with the family's
//!    [`TransformerChain`]
//! 2. lifts large top level sections of the gamestate (provinces, countries,
//!    ...) into parts of their own so they can be inspected without the rest
//! 3. can be written as a package: one pretty printed `<part>.json` per part
//!    plus a `version` file, either in a directory or a zip
//!
//! A package is only ever read back by the same format version.
//!
//! ```
//! use clausewitz_save::container::{GameFamily, SavegameContainer};
//! use clausewitz_save::intermediate::{IntermediateSavegame, PackageFormat};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = b"EU4txt\ndate=1444.11.11\nprovinces={ -1={ owner=SWE } }";
//! let container = SavegameContainer::decode(data, GameFamily::Eu4)?;
//! let save = IntermediateSavegame::from_container(container, GameFamily::Eu4);
//! assert!(save.part("provinces").is_some());
//!
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("save");
//! save.write(&path, PackageFormat::Zip)?;
//! let loaded = IntermediateSavegame::load(&path, GameFamily::Eu4)?;
//! assert_eq!(loaded, save);
//! # Ok(())
//! # }
//! ```

mod package;
mod splitter;
mod transform;

pub use self::package::PackageFormat;
pub use self::splitter::{join, split, split_keys};
pub use self::transform::{
    CollectDuplicates, RenameKey, Transformer, TransformerChain, WrapInArray,
};

use crate::container::{GameFamily, SavegameContainer};
use crate::text::Node;
use crate::{Error, FormatError};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A save in the intermediate form: named parts of one game family
#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateSavegame {
    version: u32,
    family: GameFamily,
    parts: BTreeMap<String, Node>,
}

impl IntermediateSavegame {
    /// The current format version. Packages written by any other version
    /// are rejected on load.
    pub const VERSION: u32 = 12;

    /// Normalizes and splits a decoded save
    pub fn from_container(container: SavegameContainer, family: GameFamily) -> Self {
        let mut parts = container.into_parts();

        if let Some(meta) = parts.get_mut("meta") {
            TransformerChain::for_meta(family).transform(meta);
        }

        if let Some(mut gamestate) = parts.remove("gamestate") {
            TransformerChain::for_gamestate(family).transform(&mut gamestate);
            if family == GameFamily::Ck3 {
                if let Some(meta) = gamestate.as_array_mut().and_then(|x| x.remove_key("meta_data")) {
                    parts.insert(String::from("meta"), meta);
                }
            }

            let lifted = split(&mut gamestate, split_keys(family));
            debug!(%family, lifted = lifted.len(), "split gamestate");
            parts.extend(lifted);
            parts.insert(String::from("gamestate"), gamestate);
        }

        IntermediateSavegame {
            version: Self::VERSION,
            family,
            parts,
        }
    }

    /// Rejoins the split parts into a container for the family's envelope
    pub fn into_container(self) -> Result<SavegameContainer, Error> {
        let family = self.family;
        let mut parts = self.parts;
        let mut gamestate = parts
            .remove("gamestate")
            .ok_or_else(|| FormatError::MissingPart(String::from("gamestate")))?;

        join(&mut gamestate, &mut parts, split_keys(family));
        if family == GameFamily::Ck3 {
            if let (Some(meta), Some(root)) = (parts.remove("meta"), gamestate.as_array_mut()) {
                root.insert_keyed(0, "meta_data", meta);
            }
        }

        if let Some(name) = parts.keys().find(|x| !family.part_names().contains(&x.as_str())) {
            return Err(FormatError::UnexpectedPart(name.clone()).into());
        }

        let plain = family == GameFamily::Eu4 && !parts.contains_key("meta");
        parts.insert(String::from("gamestate"), gamestate);
        let mut container = SavegameContainer::new(family, parts);
        if plain {
            container.set_compressed(false);
        }

        Ok(container)
    }

    /// Writes the package
    pub fn write<P: AsRef<Path>>(&self, path: P, format: PackageFormat) -> Result<(), Error> {
        package::write(
            path.as_ref(),
            format,
            self.version,
            &self.parts,
            self.family.charset(),
        )
    }

    /// Loads a package written in the current format version. A directory
    /// is read as a directory package and anything else as a zip.
    pub fn load<P: AsRef<Path>>(path: P, family: GameFamily) -> Result<Self, Error> {
        let parts = package::read(path.as_ref(), Self::VERSION, family, None)?;
        Ok(IntermediateSavegame {
            version: Self::VERSION,
            family,
            parts,
        })
    }

    /// Loads only the named parts of a package, leaving the others unread.
    /// Every requested part must be present.
    ///
    /// ```
    /// use clausewitz_save::container::{GameFamily, SavegameContainer};
    /// use clausewitz_save::intermediate::{IntermediateSavegame, PackageFormat};
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let data = b"EU4txt\ndate=1444.11.11\nprovinces={ -1={ owner=SWE } }";
    /// let container = SavegameContainer::decode(data, GameFamily::Eu4)?;
    /// let dir = tempfile::tempdir()?;
    /// IntermediateSavegame::from_container(container, GameFamily::Eu4)
    ///     .write(dir.path(), PackageFormat::Directory)?;
    ///
    /// let save = IntermediateSavegame::load_parts(dir.path(), GameFamily::Eu4, &["gamestate"])?;
    /// assert_eq!(save.parts().len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_parts<P: AsRef<Path>>(
        path: P,
        family: GameFamily,
        names: &[&str],
    ) -> Result<Self, Error> {
        let parts = package::read(path.as_ref(), Self::VERSION, family, Some(names))?;
        Ok(IntermediateSavegame {
            version: Self::VERSION,
            family,
            parts,
        })
    }

    /// Reads only the version marker of a package
    pub fn read_version<P: AsRef<Path>>(path: P) -> Result<u32, Error> {
        package::read_version(path.as_ref())
    }

    /// The format version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The game family
    pub fn family(&self) -> GameFamily {
        self.family
    }

    /// The parts by name
    pub fn parts(&self) -> &BTreeMap<String, Node> {
        &self.parts
    }

    /// The parts by name, for editing
    pub fn parts_mut(&mut self) -> &mut BTreeMap<String, Node> {
        &mut self.parts
    }

    /// A single part
    pub fn part(&self, name: &str) -> Option<&Node> {
        self.parts.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::parse;
    use crate::ErrorKind;

    fn eu4_save() -> SavegameContainer {
        let data = b"EU4txt\ndate=1444.11.11\nplayer=\"ENG\"\n\
            active_war={ name=\"First War\" }\n\
            provinces={ -1={ owner=SWE } }\n\
            active_war={ name=\"Second War\" }\n\
            countries={ SWE={ treasury=10.5 } }";
        SavegameContainer::decode(data, GameFamily::Eu4).unwrap()
    }

    #[test]
    fn test_eu4_from_container() {
        let save = IntermediateSavegame::from_container(eu4_save(), GameFamily::Eu4);
        let names: Vec<_> = save.parts().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["active_wars", "countries", "gamestate", "provinces"]);
        assert_eq!(save.part("active_wars").unwrap().len(), 2);
        assert_eq!(save.part("gamestate").unwrap(), &parse(b"date=1444.11.11 player=\"ENG\"").unwrap());
        assert_eq!(save.version(), IntermediateSavegame::VERSION);
    }

    #[test]
    fn test_eu4_into_container() {
        let save = IntermediateSavegame::from_container(eu4_save(), GameFamily::Eu4);
        let container = save.into_container().unwrap();
        assert!(!container.is_compressed());

        let gamestate = container.part("gamestate").unwrap();
        let keys: Vec<_> = gamestate
            .as_array()
            .unwrap()
            .iter_keyed()
            .map(|(k, _)| k.text(crate::Charset::Utf8).into_owned())
            .collect();
        assert_eq!(keys, vec!["date", "player", "active_wars", "provinces", "countries"]);
    }

    #[test]
    fn test_ck3_meta_lifted() {
        let mut parts = BTreeMap::new();
        let gamestate = parse(b"meta_data={ version=\"1.0\" } date=867.1.1 living={ 1={ } }").unwrap();
        parts.insert(String::from("gamestate"), gamestate.clone());
        let container = SavegameContainer::new(GameFamily::Ck3, parts);

        let save = IntermediateSavegame::from_container(container, GameFamily::Ck3);
        assert_eq!(save.part("meta").unwrap().len(), 1);
        assert!(save.part("living").is_some());
        assert!(!save.part("gamestate").unwrap().has_key("meta_data"));

        let container = save.into_container().unwrap();
        assert_eq!(container.part("gamestate"), Some(&gamestate));
    }

    #[test]
    fn test_unexpected_part() {
        let mut save = IntermediateSavegame::from_container(eu4_save(), GameFamily::Eu4);
        save.parts_mut().insert(String::from("mystery"), parse(b"a=b").unwrap());
        let err = save.into_container().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Format(FormatError::UnexpectedPart(x)) if x == "mystery"));
    }

    #[test]
    fn test_directory_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package");
        let save = IntermediateSavegame::from_container(eu4_save(), GameFamily::Eu4);
        save.write(&path, PackageFormat::Directory).unwrap();

        assert!(path.join("provinces.json").is_file());
        assert_eq!(std::fs::read_to_string(path.join("version")).unwrap(), "12");
        assert_eq!(IntermediateSavegame::read_version(&path).unwrap(), 12);

        let loaded = IntermediateSavegame::load(&path, GameFamily::Eu4).unwrap();
        assert_eq!(loaded, save);
    }

    #[test]
    fn test_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package");
        let save = IntermediateSavegame::from_container(eu4_save(), GameFamily::Eu4);
        save.write(&path, PackageFormat::Directory).unwrap();
        std::fs::write(path.join("version"), "11").unwrap();

        let err = IntermediateSavegame::load(&path, GameFamily::Eu4).unwrap_err();
        match err.kind() {
            ErrorKind::Version { found, expected } => {
                assert_eq!(*found, 11);
                assert_eq!(*expected, IntermediateSavegame::VERSION);
            }
            x => panic!("unexpected error: {:?}", x),
        }
    }
}
