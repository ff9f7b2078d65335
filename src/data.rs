const fn create_windows_1252_table() -> [char; 256] {
    let mut table = [0 as char; 256];
    let mut i = 0usize;
    while i < 256 {
        let c = match i {
            128 => '\u{20ac}',
            129 => '\u{81}',
            130 => '\u{201a}',
            131 => '\u{0192}',
            132 => '\u{201e}',
            133 => '\u{2026}',
            134 => '\u{2020}',
            135 => '\u{2021}',
            136 => '\u{02c6}',
            137 => '\u{2030}',
            138 => '\u{0160}',
            139 => '\u{2039}',
            140 => '\u{0152}',
            141 => '\u{8d}',
            142 => '\u{017d}',
            143 => '\u{8f}',
            144 => '\u{90}',
            145 => '\u{2018}',
            146 => '\u{2019}',
            147 => '\u{201c}',
            148 => '\u{201d}',
            149 => '\u{2022}',
            150 => '\u{2013}',
            151 => '\u{2014}',
            152 => '\u{02dc}',
            153 => '\u{2122}',
            154 => '\u{0161}',
            155 => '\u{203a}',
            156 => '\u{0153}',
            157 => '\u{9d}',
            158 => '\u{017e}',
            159 => '\u{0178}',
            i => i as u8 as char,
        };
        table[i] = c;
        i += 1;
    }
    table
}

pub(crate) static WINDOWS_1252: [char; 256] = create_windows_1252_table();

/// Byte terminates a scalar: `\n`, `\r`, ` ` or `\t`
pub(crate) const WHITESPACE: u8 = 1;

/// Byte is one of the group or assignment punctuation tokens
pub(crate) const PUNCTUATION: u8 = 2;

/// Byte toggles quoted scalar mode
pub(crate) const QUOTE: u8 = 4;

/// Byte starts a line comment
pub(crate) const COMMENT: u8 = 8;

#[inline]
pub(crate) fn class(b: u8) -> u8 {
    CHARACTER_CLASS[usize::from(b)]
}

#[inline]
pub(crate) fn is_whitespace(b: u8) -> bool {
    class(b) & WHITESPACE != 0
}

const fn create_character_class_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    table[b'\t' as usize] = WHITESPACE;
    table[b'\n' as usize] = WHITESPACE;
    table[b'\r' as usize] = WHITESPACE;
    table[b' ' as usize] = WHITESPACE;
    table[b'{' as usize] = PUNCTUATION;
    table[b'}' as usize] = PUNCTUATION;
    table[b'=' as usize] = PUNCTUATION;
    table[b'"' as usize] = QUOTE;
    table[b'#' as usize] = COMMENT;
    table
}

/// This table serves as a way to encode multiple attributes of a character in a
/// single place. This way we increase the likelihood that the table is in the
/// cache as it is used in multiple call sites.
pub(crate) static CHARACTER_CLASS: [u8; 256] = create_character_class_table();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_classes() {
        assert!(is_whitespace(b' '));
        assert!(is_whitespace(b'\r'));
        assert!(!is_whitespace(b'a'));
        assert_eq!(class(b'{'), PUNCTUATION);
        assert_eq!(class(b'"'), QUOTE);
        assert_eq!(class(b'#'), COMMENT);
        assert_eq!(class(b'\x0b'), 0);
    }

    #[test]
    fn test_windows_1252_upper_half() {
        assert_eq!(WINDOWS_1252[0x80], '\u{20ac}');
        assert_eq!(WINDOWS_1252[0x8a], '\u{0160}');
        assert_eq!(WINDOWS_1252[0xff], '\u{ff}');
        assert_eq!(WINDOWS_1252[b'a' as usize], 'a');
    }
}
