use std::fmt;

/// An error that can occur when processing savegame data
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    pub(crate) fn parse(offset: usize, msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::Parse {
            offset,
            msg: msg.into(),
        })
    }

    /// Return the specific type of error
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Consume the error and return the specific type of error
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns the byte offset that the error occurs (if available)
    pub fn offset(&self) -> Option<usize> {
        self.0.offset()
    }
}

/// Specific type of error
#[derive(Debug)]
pub enum ErrorKind {
    /// The byte stream could not be tokenized
    Lex(LexErrorKind),

    /// The token stream is inconsistent with the grammar
    Parse { offset: usize, msg: String },

    /// Unrecognized or unsupported envelope
    Format(FormatError),

    /// The declared metadata length is wrong and the zip signature could not
    /// be found within the scan window either
    Integrity { declared: usize, scanned: usize },

    /// An intermediate package was written by a different format version
    Version { found: u32, expected: u32 },

    /// An I/O error
    Io(std::io::Error),

    /// A zip archive could not be read or written
    Zip(zip::result::ZipError),

    /// A part could not be converted to or from JSON
    #[cfg(feature = "json")]
    Json(serde_json::Error),
}

impl ErrorKind {
    pub fn offset(&self) -> Option<usize> {
        match *self {
            ErrorKind::Lex(ref kind) => Some(kind.offset()),
            ErrorKind::Parse { offset, .. } => Some(offset),
            ErrorKind::Integrity { declared, .. } => Some(declared),
            _ => None,
        }
    }
}

/// Specific type of tokenizer error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// More tokens than the precomputed capacity allows
    TokenCapacity { offset: usize },

    /// More scalars than the precomputed capacity allows
    ScalarCapacity { offset: usize },

    /// More groups than the precomputed capacity allows
    GroupCapacity { offset: usize },

    /// A close group with no matching open group
    UnmatchedClose { offset: usize },

    /// A group that was still open at the end of input
    UnclosedGroup { offset: usize },
}

impl LexErrorKind {
    /// The byte offset where tokenizing stopped
    pub fn offset(&self) -> usize {
        match *self {
            LexErrorKind::TokenCapacity { offset }
            | LexErrorKind::ScalarCapacity { offset }
            | LexErrorKind::GroupCapacity { offset }
            | LexErrorKind::UnmatchedClose { offset }
            | LexErrorKind::UnclosedGroup { offset } => offset,
        }
    }
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LexErrorKind::TokenCapacity { offset } => {
                write!(f, "token capacity exceeded (offset: {})", offset)
            }
            LexErrorKind::ScalarCapacity { offset } => {
                write!(f, "scalar capacity exceeded (offset: {})", offset)
            }
            LexErrorKind::GroupCapacity { offset } => {
                write!(f, "group capacity exceeded (offset: {})", offset)
            }
            LexErrorKind::UnmatchedClose { offset } => write!(
                f,
                "stack empty, too many close tokens encountered (offset: {})",
                offset
            ),
            LexErrorKind::UnclosedGroup { offset } => {
                write!(f, "group left open at end of input (offset: {})", offset)
            }
        }
    }
}

/// The savegame envelope was not understood
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The body is in the binary format, which is not supported
    BinaryUnsupported,

    /// An expected part was not found
    MissingPart(String),

    /// A part was found that the game family does not know
    UnexpectedPart(String),

    /// The save header line is malformed
    InvalidHeader,

    /// The save header declares an unknown kind
    UnknownHeaderKind(u16),

    /// The data does not start with the expected magic
    UnknownMagic,

    /// The version marker of an intermediate package is not a number
    InvalidVersion(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormatError::BinaryUnsupported => write!(f, "binary saves are not supported"),
            FormatError::MissingPart(x) => write!(f, "missing part: {}", x),
            FormatError::UnexpectedPart(x) => write!(f, "unexpected part: {}", x),
            FormatError::InvalidHeader => write!(f, "invalid save header"),
            FormatError::UnknownHeaderKind(x) => write!(f, "unknown save header kind: {}", x),
            FormatError::UnknownMagic => write!(f, "unrecognized file magic"),
            FormatError::InvalidVersion(x) => write!(f, "invalid package version: {}", x),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self.0 {
            ErrorKind::Io(ref err) => Some(err),
            ErrorKind::Zip(ref err) => Some(err),
            #[cfg(feature = "json")]
            ErrorKind::Json(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::Lex(ref kind) => write!(f, "lex error: {}", kind),
            ErrorKind::Parse { offset, ref msg } => {
                write!(f, "parse error: {} (offset: {})", msg, offset)
            }
            ErrorKind::Format(ref err) => write!(f, "format error: {}", err),
            ErrorKind::Integrity { declared, scanned } => write!(f,
                "zip data not found at declared offset {} nor within the first {} bytes",
                declared, scanned
            ),
            ErrorKind::Version { found, expected } => write!(f,
                "incompatible intermediate format version {} (expected {})",
                found, expected
            ),
            ErrorKind::Io(ref err) => write!(f, "io error: {}", err),
            ErrorKind::Zip(ref err) => write!(f, "zip error: {}", err),
            #[cfg(feature = "json")]
            ErrorKind::Json(ref err) => write!(f, "json error: {}", err),
        }
    }
}

impl From<LexErrorKind> for Error {
    fn from(kind: LexErrorKind) -> Self {
        Error::new(ErrorKind::Lex(kind))
    }
}

impl From<FormatError> for Error {
    fn from(error: FormatError) -> Self {
        Error::new(ErrorKind::Format(error))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::new(ErrorKind::Io(error))
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(error: zip::result::ZipError) -> Self {
        Error::new(ErrorKind::Zip(error))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::new(ErrorKind::Json(error))
    }
}
