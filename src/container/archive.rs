use crate::util::find_within;
use crate::{Error, ErrorKind};
use std::io::{Cursor, Read, Write};
use tracing::warn;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// The zip local file header signature
pub const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// How many leading bytes are scanned for [`ZIP_MAGIC`] when a header
/// declares the wrong metadata length
pub const MAX_SEARCH: usize = 150_000;

/// Returns true if the data starts with a zip local file header
pub fn is_zip(data: &[u8]) -> bool {
    data.starts_with(ZIP_MAGIC)
}

/// Returns the offset of the zip body. The body is expected at `declared`;
/// when the signature is not there the first [`MAX_SEARCH`] bytes are
/// scanned instead.
pub(crate) fn locate_zip(data: &[u8], declared: usize) -> Result<usize, Error> {
    if data.get(declared..).map_or(false, is_zip) {
        return Ok(declared);
    }

    let scanned = MAX_SEARCH.min(data.len());
    match find_within(data, ZIP_MAGIC, MAX_SEARCH) {
        Some(found) => {
            warn!(
                declared,
                found, "declared metadata length is wrong, zip located by scanning"
            );
            Ok(found)
        }
        None => Err(Error::new(ErrorKind::Integrity { declared, scanned })),
    }
}

/// Random access to the entries of an in-memory zip
pub(crate) struct ZipReader<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> ZipReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Result<Self, Error> {
        let archive = ZipArchive::new(Cursor::new(data))?;
        Ok(ZipReader { archive })
    }

    /// Entry names in archive order
    pub(crate) fn names(&self) -> Vec<String> {
        self.archive.file_names().map(String::from).collect()
    }

    /// Inflates the named entry, `None` if there is no such entry
    pub(crate) fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>, Error> {
        let mut file = match self.archive.by_name(name) {
            Ok(x) => x,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut buf = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    /// Inflates every file entry in archive order
    pub(crate) fn into_entries(mut self) -> Result<Vec<(String, Vec<u8>)>, Error> {
        let mut result = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let mut file = self.archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }

            let name = String::from(file.name());
            let mut buf = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut buf)?;
            result.push((name, buf));
        }

        Ok(result)
    }
}

/// Builds a deflated zip in memory
pub(crate) struct ZipBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipBuilder {
    pub(crate) fn new() -> Self {
        ZipBuilder {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Starts an entry; the data for it is written through the returned
    /// writer
    pub(crate) fn start(&mut self, name: &str) -> Result<&mut ZipWriter<Cursor<Vec<u8>>>, Error> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer.start_file(name, options)?;
        Ok(&mut self.writer)
    }

    pub(crate) fn add(&mut self, name: &str, data: &[u8]) -> Result<(), Error> {
        self.start(name)?.write_all(data)?;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<Vec<u8>, Error> {
        let cursor = self.writer.finish()?;
        Ok(cursor.into_inner())
    }
}
