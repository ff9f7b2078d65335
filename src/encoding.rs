use crate::{
    data::is_whitespace, data::WINDOWS_1252, util::contains_zero_byte, util::le_u64,
    util::repeat_byte,
};
use std::borrow::Cow;

/// The character set a game family writes its text documents in.
///
/// EU4 era titles write windows-1252 while the newer titles write UTF-8. The
/// charset is needed whenever scalar bytes cross into `str` land (display,
/// JSON) and on the way back.
///
/// ```
/// use clausewitz_save::Charset;
///
/// let charset = Charset::Windows1252;
/// assert_eq!(charset.decode(b"Common Sense"), "Common Sense");
/// assert_eq!(
///     charset.decode(b"\xa7GRichard Plantagenet\xa7 ( 2 / 4 / 3 / 0 )"),
///     "§GRichard Plantagenet§ ( 2 / 4 / 3 / 0 )"
/// );
/// assert_eq!(charset.decode(br#"Captain \"Joe\" Rogers"#), r#"Captain "Joe" Rogers"#);
/// assert_eq!(charset.decode(b"1444.11.11\n"), "1444.11.11");
/// assert_eq!(Charset::Utf8.decode(b"J\xc3\xa5hk\xc3\xa5m\xc3\xa5hkke"), "Jåhkåmåhkke");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    /// Windows code page 1252
    Windows1252,

    /// UTF-8
    #[default]
    Utf8,
}

impl Charset {
    /// Decodes scalar bytes for display: escape sequences are resolved and
    /// trailing whitespace is trimmed. Allocates only when necessary.
    pub fn decode<'a>(&self, data: &'a [u8]) -> Cow<'a, str> {
        match self {
            Charset::Windows1252 => decode_windows1252(data),
            Charset::Utf8 => decode_utf8(data),
        }
    }

    /// Transcodes scalar bytes verbatim, keeping any escape sequences.
    /// Every byte survives windows-1252. Malformed UTF-8 is replaced with
    /// U+FFFD, so use [`Charset::transcode_exact`] when the bytes must be
    /// recovered.
    pub fn transcode<'a>(&self, data: &'a [u8]) -> Cow<'a, str> {
        match self {
            Charset::Windows1252 => {
                let (cow, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(data);
                cow
            }
            Charset::Utf8 => String::from_utf8_lossy(data),
        }
    }

    /// Transcodes scalar bytes verbatim or returns `None` when the text
    /// would not encode back to the same bytes
    ///
    /// ```
    /// use clausewitz_save::Charset;
    /// assert_eq!(Charset::Utf8.transcode_exact(b"K\xc3\xb6ln").as_deref(), Some("Köln"));
    /// assert_eq!(Charset::Utf8.transcode_exact(b"K\xf6ln"), None);
    /// assert_eq!(Charset::Windows1252.transcode_exact(b"K\xf6ln").as_deref(), Some("Köln"));
    /// ```
    pub fn transcode_exact<'a>(&self, data: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            Charset::Windows1252 => Some(self.transcode(data)),
            Charset::Utf8 => std::str::from_utf8(data).ok().map(Cow::Borrowed),
        }
    }

    /// The inverse of [`Charset::transcode`]. Characters that windows-1252
    /// cannot represent are replaced with numeric character references.
    pub fn encode<'a>(&self, data: &'a str) -> Cow<'a, [u8]> {
        match self {
            Charset::Windows1252 => {
                let (cow, _, _) = encoding_rs::WINDOWS_1252.encode(data);
                cow
            }
            Charset::Utf8 => Cow::Borrowed(data.as_bytes()),
        }
    }
}

#[inline]
fn trim_trailing_index(d: &[u8]) -> usize {
    d.iter()
        .rev()
        .position(|x| !is_whitespace(*x))
        .unwrap_or(d.len())
}

#[inline]
fn trim_trailing_whitespace(d: &[u8]) -> &[u8] {
    &d[..d.len() - trim_trailing_index(d)]
}

/// Resolves `\x` into `x`, the only escape sequence the text format knows.
fn unescape(d: &[u8]) -> impl Iterator<Item = u8> + '_ {
    let mut escaped = false;
    d.iter().filter_map(move |&c| {
        if !escaped && c == b'\\' {
            escaped = true;
            None
        } else {
            escaped = false;
            Some(c)
        }
    })
}

#[inline]
pub(crate) fn decode_windows1252(d: &[u8]) -> Cow<str> {
    let d = trim_trailing_whitespace(d);

    // Iterate through the data in 8 byte chunks and ensure that each chunk
    // is contained of ascii characters with no escape characters
    let mut chunk_iter = d.chunks_exact(8);
    for n in &mut chunk_iter {
        let wide = le_u64(n);
        if wide & 0x8080_8080_8080_8080 != 0 || contains_zero_byte(wide ^ repeat_byte(b'\\')) {
            return Cow::Owned(windows_1252_create(d));
        }
    }

    if chunk_iter
        .remainder()
        .iter()
        .any(|&byte| !byte.is_ascii() || byte == b'\\')
    {
        return Cow::Owned(windows_1252_create(d));
    }

    // This is safe as we just checked that the data is ascii and ascii is a subset of utf8
    debug_assert!(std::str::from_utf8(d).is_ok());
    let s = unsafe { std::str::from_utf8_unchecked(d) };
    Cow::Borrowed(s)
}

fn windows_1252_create(d: &[u8]) -> String {
    unescape(d).map(|c| WINDOWS_1252[c as usize]).collect()
}

#[inline]
pub(crate) fn decode_utf8(d: &[u8]) -> Cow<str> {
    let d = trim_trailing_whitespace(d);
    if d.contains(&b'\\') {
        let bytes: Vec<u8> = unescape(d).collect();
        let s = String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(&e.into_bytes()).into_owned());
        return Cow::Owned(s);
    }

    String::from_utf8_lossy(d)
}
