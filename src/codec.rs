// GSM 03.40 TPDU codec - separates wire-format helpers from the TPDU models
//
// Each TPDU type implements Encodable/Decodable rather than having all parsing
// logic in one monolithic parser. The helpers here cover the primitive field
// shapes the TPDUs share: single octets, semi-octet (BCD) digit strings and
// 7-bit septet packing.

use crate::datatypes::AddressError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Maximum TP-User-Data length in octets (GSM 03.40 §9.2.3.24)
pub const MAX_USER_DATA_OCTETS: usize = 140;

/// Maximum TP-User-Data length in septets when the 7-bit alphabet is used
pub const MAX_USER_DATA_SEPTETS: usize = 160;

/// Trait for TPDUs that can be encoded to bytes
pub trait Encodable {
    /// Encode this TPDU to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Convert this TPDU to bytes (convenience method)
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Trait for TPDUs that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this TPDU starting at the first octet (TP-MTI and flags)
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Decode from a complete byte slice
    fn from_slice(data: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(data);
        Self::decode(&mut cursor)
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete TPDU: need more data")]
    Incomplete,

    #[error("Unexpected message type indicator: {0:#04x}")]
    UnexpectedMessageType(u8),

    #[error("User data too long: {length} units, maximum is {max}")]
    UserDataTooLong { length: usize, max: usize },

    #[error("Character {0:?} cannot be represented in the GSM 7-bit alphabet")]
    UnencodableCharacter(char),

    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },
}

/// Decode a single octet
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a fixed number of octets
pub fn decode_bytes(buf: &mut Cursor<&[u8]>, len: usize) -> Result<Bytes, CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.copy_to_bytes(len))
}

/// Encode a single octet
pub fn encode_u8(buf: &mut BytesMut, value: u8) {
    buf.put_u8(value);
}

/// Map a dialable character to its semi-octet value
pub fn digit_to_semi_octet(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        '*' => Some(0x0A),
        '#' => Some(0x0B),
        'a' | 'A' => Some(0x0C),
        'b' | 'B' => Some(0x0D),
        'c' | 'C' => Some(0x0E),
        _ => None,
    }
}

/// Map a semi-octet value back to its dialable character (0xF is filler)
pub fn semi_octet_to_digit(value: u8) -> Option<char> {
    match value {
        0..=9 => Some((b'0' + value) as char),
        0x0A => Some('*'),
        0x0B => Some('#'),
        0x0C => Some('a'),
        0x0D => Some('b'),
        0x0E => Some('c'),
        _ => None,
    }
}

/// Encode digits as swapped semi-octets, padding an odd count with 0xF
///
/// Callers validate the digits first; anything unmapped is written as filler.
pub fn encode_semi_octets(buf: &mut BytesMut, digits: &str) {
    let values: Vec<u8> = digits
        .chars()
        .map(|c| digit_to_semi_octet(c).unwrap_or(0x0F))
        .collect();

    for pair in values.chunks(2) {
        let low = pair[0];
        let high = pair.get(1).copied().unwrap_or(0x0F);
        buf.put_u8((high << 4) | low);
    }
}

/// Decode `count` swapped semi-octet digits from `octets`
pub fn decode_semi_octets(octets: &[u8], count: usize) -> String {
    let mut digits = String::with_capacity(count);
    for i in 0..count {
        let Some(octet) = octets.get(i / 2) else {
            break;
        };
        let value = if i % 2 == 0 { octet & 0x0F } else { octet >> 4 };
        match semi_octet_to_digit(value) {
            Some(c) => digits.push(c),
            None => break,
        }
    }
    digits
}

/// Pack 7-bit septets LSB first, leaving `fill_bits` zero bits at the start
///
/// The fill bits align the first septet on a septet boundary after a user
/// data header.
pub fn pack_septets(septets: &[u8], fill_bits: usize) -> Vec<u8> {
    let total_bits = fill_bits + septets.len() * 7;
    let mut out = vec![0u8; total_bits.div_ceil(8)];

    for (i, &septet) in septets.iter().enumerate() {
        let bit_pos = fill_bits + i * 7;
        let index = bit_pos / 8;
        let shift = bit_pos % 8;
        let value = u16::from(septet & 0x7F) << shift;

        out[index] |= (value & 0xFF) as u8;
        if shift > 1 {
            out[index + 1] |= (value >> 8) as u8;
        }
    }

    out
}

/// Unpack `count` septets from LSB-first packed octets
pub fn unpack_septets(octets: &[u8], count: usize, fill_bits: usize) -> Vec<u8> {
    let mut septets = Vec::with_capacity(count);

    for i in 0..count {
        let bit_pos = fill_bits + i * 7;
        let index = bit_pos / 8;
        let shift = bit_pos % 8;
        let Some(&low) = octets.get(index) else {
            break;
        };

        let mut value = u16::from(low) >> shift;
        if shift > 1 {
            if let Some(&high) = octets.get(index + 1) {
                value |= u16::from(high) << (8 - shift);
            }
        }
        septets.push((value & 0x7F) as u8);
    }

    septets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semi_octets_swap_and_pad() {
        let mut buf = BytesMut::new();
        encode_semi_octets(&mut buf, "6501002000");
        assert_eq!(buf.as_ref(), &[0x56, 0x10, 0x00, 0x02, 0x00]);

        let mut buf = BytesMut::new();
        encode_semi_octets(&mut buf, "911");
        assert_eq!(buf.as_ref(), &[0x19, 0xF1]);
    }

    #[test]
    fn semi_octets_decode_stops_at_filler() {
        assert_eq!(decode_semi_octets(&[0x19, 0xF1], 3), "911");
        assert_eq!(decode_semi_octets(&[0x19, 0xF1], 4), "911");
        assert_eq!(decode_semi_octets(&[0xBA], 2), "*#");
    }

    #[test]
    fn pack_septets_matches_reference_vector() {
        // "hellohello" in the default alphabet
        let septets = b"hellohello";
        let packed = pack_septets(septets, 0);
        assert_eq!(
            packed,
            vec![0xE8, 0x32, 0x9B, 0xFD, 0x46, 0x97, 0xD9, 0xEC, 0x37]
        );
    }

    #[test]
    fn pack_septets_with_fill_bits() {
        // One fill bit after a 6-octet concatenation header
        let packed = pack_septets(&[0x41], 1);
        assert_eq!(packed, vec![0x82]);

        let unpacked = unpack_septets(&packed, 1, 1);
        assert_eq!(unpacked, vec![0x41]);
    }

    #[test]
    fn unpack_reads_what_pack_wrote() {
        let text = b"The quick brown fox";
        let packed = pack_septets(text, 0);
        assert_eq!(packed.len(), (text.len() * 7).div_ceil(8));
        assert_eq!(unpack_septets(&packed, text.len(), 0), text.to_vec());
    }

    #[test]
    fn decode_u8_reports_incomplete() {
        let data: [u8; 0] = [];
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(decode_u8(&mut cursor), Err(CodecError::Incomplete)));
    }
}
