use super::splitter::split_keys;
use crate::container::archive::{ZipBuilder, ZipReader};
use crate::container::GameFamily;
use crate::text::Node;
use crate::{json, Charset, Error, ErrorKind, FormatError};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

const VERSION_FILE: &str = "version";
const PART_SUFFIX: &str = ".json";

/// How an intermediate package is laid out on disk
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageFormat {
    /// A directory of files
    #[default]
    Directory,

    /// A single zip file
    Zip,
}

/// Returns true if the part name can appear in a package of the family
pub(crate) fn is_known_part(family: GameFamily, name: &str) -> bool {
    name == "meta" || family.part_names().contains(&name) || split_keys(family).contains(&name)
}

fn part_file(name: &str) -> String {
    format!("{}{}", name, PART_SUFFIX)
}

/// Removes the parts of a previously written package so that none of them
/// outlive a rewrite
fn clear_parts(path: &Path) -> Result<(), Error> {
    if !path.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let is_part = file_name.to_str().map_or(false, |x| x.ends_with(PART_SUFFIX));
        if is_part && entry.file_type()?.is_file() {
            debug!(file = ?file_name, "removing stale part");
            fs::remove_file(entry.path())?;
        }
    }

    Ok(())
}

pub(crate) fn write(
    path: &Path,
    format: PackageFormat,
    version: u32,
    parts: &BTreeMap<String, Node>,
    charset: Charset,
) -> Result<(), Error> {
    match format {
        PackageFormat::Directory => {
            clear_parts(path)?;
            fs::create_dir_all(path)?;
            for (name, node) in parts {
                let file = fs::File::create(path.join(part_file(name)))?;
                let mut writer = BufWriter::new(file);
                node.json(charset).to_writer_pretty(&mut writer)?;
                writer.flush()?;
            }
            fs::write(path.join(VERSION_FILE), version.to_string())?;
        }
        PackageFormat::Zip => {
            let mut zip = ZipBuilder::new();
            for (name, node) in parts {
                let entry = zip.start(&part_file(name))?;
                node.json(charset).to_writer_pretty(entry)?;
            }
            zip.add(VERSION_FILE, version.to_string().as_bytes())?;
            fs::write(path, zip.finish()?)?;
        }
    }

    debug!(path = %path.display(), ?format, parts = parts.len(), "wrote intermediate package");
    Ok(())
}

fn parse_version(data: &[u8]) -> Result<u32, Error> {
    let text = String::from_utf8_lossy(data);
    text.trim()
        .parse::<u32>()
        .map_err(|_| FormatError::InvalidVersion(String::from(text.trim())).into())
}

pub(crate) fn read_version(path: &Path) -> Result<u32, Error> {
    if path.is_dir() {
        parse_version(&fs::read(path.join(VERSION_FILE))?)
    } else {
        let data = fs::read(path)?;
        let mut zip = ZipReader::new(&data)?;
        zip_version(&mut zip)
    }
}

fn zip_version(zip: &mut ZipReader<'_>) -> Result<u32, Error> {
    let data = zip
        .read(VERSION_FILE)?
        .ok_or_else(|| FormatError::MissingPart(String::from(VERSION_FILE)))?;
    parse_version(&data)
}

fn check_version(found: u32, expected: u32) -> Result<(), Error> {
    if found != expected {
        return Err(Error::new(ErrorKind::Version { found, expected }));
    }

    Ok(())
}

fn check_name(family: GameFamily, name: &str) -> Result<(), Error> {
    if !is_known_part(family, name) {
        return Err(FormatError::UnexpectedPart(String::from(name)).into());
    }

    Ok(())
}

/// Reads the parts of the package, failing before any part is read when
/// the version differs from the expected one.
///
/// With `only`, just the named parts are read and each of them must be
/// present. Otherwise every part is read and each must belong to the family.
pub(crate) fn read(
    path: &Path,
    expected: u32,
    family: GameFamily,
    only: Option<&[&str]>,
) -> Result<BTreeMap<String, Node>, Error> {
    let charset = family.charset();
    if let Some(names) = only {
        for name in names {
            check_name(family, name)?;
        }
    }

    let mut parts = BTreeMap::new();
    if path.is_dir() {
        check_version(read_version(path)?, expected)?;
        let names: Vec<String> = match only {
            Some(names) => names.iter().map(|x| String::from(*x)).collect(),
            None => {
                let mut names = Vec::new();
                for entry in fs::read_dir(path)? {
                    let file_name = entry?.file_name();
                    if let Some(name) = file_name.to_str().and_then(|x| x.strip_suffix(PART_SUFFIX)) {
                        check_name(family, name)?;
                        names.push(String::from(name));
                    }
                }
                names
            }
        };

        for name in names {
            let file = path.join(part_file(&name));
            if !file.is_file() {
                return Err(FormatError::MissingPart(name).into());
            }

            let data = fs::read(file)?;
            let node = json::from_slice(&data, charset)?;
            parts.insert(name, node);
        }
    } else {
        let data = fs::read(path)?;
        let mut zip = ZipReader::new(&data)?;
        check_version(zip_version(&mut zip)?, expected)?;
        let names: Vec<String> = match only {
            Some(names) => names.iter().map(|x| String::from(*x)).collect(),
            None => {
                let mut names = Vec::new();
                for file_name in zip.names() {
                    if let Some(name) = file_name.strip_suffix(PART_SUFFIX) {
                        check_name(family, name)?;
                        names.push(String::from(name));
                    }
                }
                names
            }
        };

        for name in names {
            let data = zip
                .read(&part_file(&name))?
                .ok_or_else(|| FormatError::MissingPart(name.clone()))?;
            let node = json::from_slice(&data, charset)?;
            parts.insert(name, node);
        }
    }

    debug!(path = %path.display(), %family, parts = parts.len(), "read intermediate package");
    Ok(parts)
}
