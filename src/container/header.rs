use crate::{Error, FormatError};
use std::io::Write;

/// The kind of save declared by the header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveHeaderKind {
    /// uncompressed text
    Text,

    /// uncompressed binary
    Binary,

    /// uncompressed text metadata followed by a compressed text gamestate
    UnifiedText,

    /// uncompressed binary metadata followed by a compressed binary gamestate
    UnifiedBinary,

    /// metadata is stored within the zip file
    SplitText,

    /// metadata is stored within the zip file
    SplitBinary,

    /// An unknown kind
    Other(u16),
}

impl SaveHeaderKind {
    /// Creates a kind from its numeric value
    pub fn new(kind: u16) -> SaveHeaderKind {
        match kind {
            0 => SaveHeaderKind::Text,
            1 => SaveHeaderKind::Binary,
            2 => SaveHeaderKind::UnifiedText,
            3 => SaveHeaderKind::UnifiedBinary,
            4 => SaveHeaderKind::SplitText,
            5 => SaveHeaderKind::SplitBinary,
            x => SaveHeaderKind::Other(x),
        }
    }

    /// The numeric value written into the header
    pub fn value(&self) -> u16 {
        match self {
            SaveHeaderKind::Text => 0,
            SaveHeaderKind::Binary => 1,
            SaveHeaderKind::UnifiedText => 2,
            SaveHeaderKind::UnifiedBinary => 3,
            SaveHeaderKind::SplitText => 4,
            SaveHeaderKind::SplitBinary => 5,
            SaveHeaderKind::Other(x) => *x,
        }
    }

    /// Returns true if the body is binary encoded
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            SaveHeaderKind::Binary | SaveHeaderKind::UnifiedBinary | SaveHeaderKind::SplitBinary
        )
    }

    /// Returns true if the body is text
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            SaveHeaderKind::Text | SaveHeaderKind::UnifiedText | SaveHeaderKind::SplitText
        )
    }

    /// Returns true if the gamestate sits in a zip after the header
    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            SaveHeaderKind::UnifiedText
                | SaveHeaderKind::UnifiedBinary
                | SaveHeaderKind::SplitText
                | SaveHeaderKind::SplitBinary
        )
    }
}

/// The `SAV` line that starts a headered save.
///
/// Layout: `SAV`, 2 version bytes, the kind as 2 hex digits, 8 opaque bytes,
/// the metadata length as 8 hex digits and a `\n` or `\r\n` terminator.
///
/// ```
/// use clausewitz_save::container::{SaveHeader, SaveHeaderKind};
/// let header = SaveHeader::from_slice(b"SAV0102a40f789f000067c4\nmeta_data={")?;
/// assert_eq!(header.kind(), SaveHeaderKind::UnifiedText);
/// assert_eq!(header.metadata_len(), 26564);
/// assert_eq!(header.to_string(), "SAV0102a40f789f000067c4\n");
/// # Ok::<(), clausewitz_save::Error>(())
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SaveHeader {
    unknown: [u8; 2],
    kind: SaveHeaderKind,
    random: [u8; 8],
    meta_len: u64,
    header_len: usize,
}

impl SaveHeader {
    pub(crate) const SIZE: usize = 24;

    /// A `\n` terminated header with the given kind and metadata length
    pub fn new(kind: SaveHeaderKind, meta_len: u64) -> Self {
        SaveHeader {
            unknown: *b"01",
            kind,
            random: *b"00000000",
            meta_len,
            header_len: Self::SIZE,
        }
    }

    /// Parses the header from the start of the data
    pub fn from_slice(data: &[u8]) -> Result<Self, Error> {
        let invalid = || Error::from(FormatError::InvalidHeader);
        let line: &[u8; Self::SIZE] = data.first_chunk().ok_or_else(invalid)?;

        if &line[..3] != b"SAV" {
            return Err(invalid());
        }

        let unknown = [line[3], line[4]];
        let kind = hex_field(&line[5..7]).ok_or_else(invalid)?;
        let mut random = [0u8; 8];
        random.copy_from_slice(&line[7..15]);
        let meta_len = hex_field(&line[15..23]).ok_or_else(invalid)?;

        let header_len = match (line[23], data.get(Self::SIZE)) {
            (b'\r', Some(b'\n')) => Self::SIZE + 1,
            (b'\n', _) => Self::SIZE,
            _ => return Err(invalid()),
        };

        let kind = u16::try_from(kind).map_err(|_| invalid())?;
        Ok(SaveHeader {
            unknown,
            kind: SaveHeaderKind::new(kind),
            random,
            meta_len,
            header_len,
        })
    }

    /// The save kind (encoding and compression)
    pub fn kind(&self) -> SaveHeaderKind {
        self.kind
    }

    /// Sets the save kind
    pub fn set_kind(&mut self, kind: SaveHeaderKind) {
        self.kind = kind;
    }

    /// Length of the header line in bytes, terminator included
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Declared length of the metadata section in bytes
    pub fn metadata_len(&self) -> u64 {
        self.meta_len
    }

    /// Sets the declared metadata length
    pub fn set_metadata_len(&mut self, len: u64) {
        self.meta_len = len
    }

    /// Writes the header line
    pub fn write<W>(&self, mut writer: W) -> std::io::Result<()>
    where
        W: Write,
    {
        writer.write_all(b"SAV")?;
        writer.write_all(&self.unknown)?;
        write!(writer, "{0:02x}", self.kind.value())?;
        writer.write_all(&self.random)?;
        write!(writer, "{0:08x}", self.meta_len)?;
        if self.header_len == Self::SIZE + 1 {
            writer.write_all(b"\r")?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn hex_field(data: &[u8]) -> Option<u64> {
    let text = std::str::from_utf8(data).ok()?;
    u64::from_str_radix(text, 16).ok()
}

impl std::fmt::Display for SaveHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buf = Vec::new();
        self.write(&mut buf).map_err(|_| std::fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}
