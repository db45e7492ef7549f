// ABOUTME: GSM 03.38 default 7-bit alphabet and single-shift extension table
// ABOUTME: Decides encodability, counts septets and converts between text and unpacked septets

use crate::codec::CodecError;

/// Escape to the extension table
pub const ESCAPE: u8 = 0x1B;

/// Default alphabet indexed by septet value; 0x1B is the escape slot
const DEFAULT_ALPHABET: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1B}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

/// Extension table entries reachable through [`ESCAPE`]
const EXTENSION_TABLE: [(u8, char); 10] = [
    (0x0A, '\u{0C}'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

/// Position of a character in the 7-bit alphabet
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GsmChar {
    /// Single septet in the default table
    Basic(u8),
    /// Escape septet followed by this extension septet
    Extended(u8),
}

impl GsmChar {
    /// Number of septets this character occupies
    pub fn septets(&self) -> usize {
        match self {
            GsmChar::Basic(_) => 1,
            GsmChar::Extended(_) => 2,
        }
    }
}

/// Look up a character in the default alphabet, then the extension table
pub fn lookup(c: char) -> Option<GsmChar> {
    if c == '\u{1B}' {
        return None;
    }
    if let Some(pos) = DEFAULT_ALPHABET.iter().position(|&a| a == c) {
        return Some(GsmChar::Basic(pos as u8));
    }
    EXTENSION_TABLE
        .iter()
        .find(|(_, e)| *e == c)
        .map(|(code, _)| GsmChar::Extended(*code))
}

/// Septet count for `text`, or `None` if any character needs UCS-2
pub fn septet_count(text: &str) -> Option<usize> {
    text.chars()
        .map(|c| lookup(c).map(|g| g.septets()))
        .sum()
}

/// Whether `text` can be sent with the 7-bit alphabet
pub fn is_encodable(text: &str) -> bool {
    septet_count(text).is_some()
}

/// Convert text to unpacked septets
pub fn encode(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut septets = Vec::with_capacity(text.len());
    for c in text.chars() {
        match lookup(c) {
            Some(GsmChar::Basic(code)) => septets.push(code),
            Some(GsmChar::Extended(code)) => {
                septets.push(ESCAPE);
                septets.push(code);
            }
            None => return Err(CodecError::UnencodableCharacter(c)),
        }
    }
    Ok(septets)
}

/// Convert unpacked septets back to text
///
/// Unknown extension codes decode as a space, matching the GSM 03.38
/// fallback rule.
pub fn decode(septets: &[u8]) -> String {
    let mut text = String::with_capacity(septets.len());
    let mut escaped = false;

    for &septet in septets {
        let septet = septet & 0x7F;
        if escaped {
            escaped = false;
            let c = EXTENSION_TABLE
                .iter()
                .find(|(code, _)| *code == septet)
                .map(|(_, c)| *c)
                .unwrap_or(' ');
            text.push(c);
        } else if septet == ESCAPE {
            escaped = true;
        } else {
            text.push(DEFAULT_ALPHABET[septet as usize]);
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_and_extended_lookup() {
        assert_eq!(lookup('@'), Some(GsmChar::Basic(0x00)));
        assert_eq!(lookup('A'), Some(GsmChar::Basic(0x41)));
        assert_eq!(lookup('à'), Some(GsmChar::Basic(0x7F)));
        assert_eq!(lookup('€'), Some(GsmChar::Extended(0x65)));
        assert_eq!(lookup('中'), None);
        assert_eq!(lookup('\u{1B}'), None);
    }

    #[test]
    fn septet_count_includes_escapes() {
        assert_eq!(septet_count("test sms"), Some(8));
        assert_eq!(septet_count("[x]"), Some(5));
        assert_eq!(septet_count("привет"), None);
    }

    #[test]
    fn encode_decode_extension_characters() {
        let septets = encode("a{b}€").unwrap();
        assert_eq!(septets, vec![0x61, 0x1B, 0x28, 0x62, 0x1B, 0x29, 0x1B, 0x65]);
        assert_eq!(decode(&septets), "a{b}€");
    }

    #[test]
    fn encode_rejects_unicode() {
        assert!(matches!(
            encode("hi 😀"),
            Err(CodecError::UnencodableCharacter('😀'))
        ));
    }
}
