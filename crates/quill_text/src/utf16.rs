//! UTF-16 helpers
//!
//! Paragraph offsets are UTF-16 code units while the Unicode crates work on
//! `str` byte offsets, so text handed to them goes through [`Utf16Text`].

use std::char::REPLACEMENT_CHARACTER;

pub(crate) const OBJECT_REPLACEMENT: u16 = 0xFFFC;

/// A lossy `String` decoding of UTF-16 text with an offset map back to code units
#[derive(Debug, Clone)]
pub(crate) struct Utf16Text {
    string: String,
    /// Code unit offset of every byte, plus one entry for the end
    byte_to_unit: Vec<usize>,
}

impl Utf16Text {
    pub(crate) fn new(units: &[u16]) -> Self {
        let mut string = String::with_capacity(units.len());
        let mut byte_to_unit = Vec::with_capacity(units.len() + 1);
        let mut unit = 0;
        for decoded in char::decode_utf16(units.iter().copied()) {
            let (ch, width) = match decoded {
                Ok(ch) => (ch, ch.len_utf16()),
                // Unpaired surrogates occupy one unit
                Err(_) => (REPLACEMENT_CHARACTER, 1),
            };
            string.push(ch);
            byte_to_unit.extend(std::iter::repeat(unit).take(ch.len_utf8()));
            unit += width;
        }
        byte_to_unit.push(unit);
        Self {
            string,
            byte_to_unit,
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.string
    }

    pub(crate) fn unit_at(&self, byte: usize) -> usize {
        self.byte_to_unit
            .get(byte)
            .copied()
            .unwrap_or_else(|| self.byte_to_unit.last().copied().unwrap_or(0))
    }
}

pub(crate) fn unit_char(unit: u16) -> Option<char> {
    char::from_u32(u32::from(unit))
}

pub(crate) fn is_whitespace(unit: u16) -> bool {
    unit_char(unit).is_some_and(char::is_whitespace)
}

pub(crate) fn is_space(unit: u16) -> bool {
    unit == u16::from(b' ')
}

/// Units that end a paragraph line outright
pub(crate) fn is_newline(unit: u16) -> bool {
    matches!(unit, 0x0A | 0x0B | 0x0C | 0x0D | 0x85 | 0x2028 | 0x2029)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn test_offsets_map_back_to_units() {
        let text = Utf16Text::new(&units("a\u{e9}\u{1F600}b"));
        // 'a' 1 byte, 'é' 2 bytes, emoji 4 bytes
        assert_eq!(text.unit_at(0), 0);
        assert_eq!(text.unit_at(1), 1);
        assert_eq!(text.unit_at(3), 2);
        assert_eq!(text.unit_at(7), 4);
        assert_eq!(text.unit_at(8), 5);
    }

    #[test]
    fn test_unpaired_surrogate_is_one_unit() {
        let text = Utf16Text::new(&[0xD800, u16::from(b'x')]);
        assert_eq!(text.as_str(), "\u{FFFD}x");
        assert_eq!(text.unit_at(3), 1);
        assert_eq!(text.unit_at(4), 2);
    }
}
