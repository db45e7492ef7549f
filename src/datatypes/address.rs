// ABOUTME: Strongly-typed GSM addresses with type-of-number / numbering-plan validation
// ABOUTME: Encodes destination and service-centre addresses as swapped semi-octets per GSM 03.40 §9.1.2.5

use crate::codec::{
    decode_bytes, decode_semi_octets, decode_u8, digit_to_semi_octet, encode_semi_octets,
    encode_u8, unpack_septets, CodecError,
};
use crate::datatypes::gsm_alphabet;
use bytes::{Bytes, BytesMut};
use num_enum::TryFromPrimitive;
use std::fmt;
use std::io::Cursor;

/// Maximum number of digits in a TP address field
pub const MAX_ADDRESS_DIGITS: usize = 20;

/// Type of number, bits 6..4 of the type-of-address octet
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeOfNumber {
    Unknown = 0b000,
    International = 0b001,
    National = 0b010,
    NetworkSpecific = 0b011,
    SubscriberNumber = 0b100,
    Alphanumeric = 0b101,
    Abbreviated = 0b110,
}

/// Numbering plan identification, bits 3..0 of the type-of-address octet
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NumberingPlan {
    Unknown = 0b0000,
    Isdn = 0b0001,
    Data = 0b0011,
    Telex = 0b0100,
    ServiceCentreSpecific = 0b0101,
    National = 0b1000,
    Private = 0b1001,
    Ermes = 0b1010,
}

/// Address validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,

    #[error("Address too long: {actual_len} digits (max {max_len})")]
    TooLong { max_len: usize, actual_len: usize },

    #[error("Address contains a character that cannot be dialled: {0:?}")]
    InvalidDigit(char),
}

/// A validated GSM address ready for semi-octet encoding
///
/// Visual separators (spaces, dashes, dots, parentheses) are dropped on
/// parse. A leading `+` selects the international type of number.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GsmAddress {
    ton: TypeOfNumber,
    npi: NumberingPlan,
    digits: String,
}

impl GsmAddress {
    /// Parse a dialable address string
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let mut digits = String::with_capacity(address.len());
        let mut ton = TypeOfNumber::Unknown;

        for (i, c) in address.trim().chars().enumerate() {
            match c {
                '+' if i == 0 => ton = TypeOfNumber::International,
                ' ' | '-' | '.' | '(' | ')' => {}
                _ if digit_to_semi_octet(c).is_some() => digits.push(c.to_ascii_lowercase()),
                _ => return Err(AddressError::InvalidDigit(c)),
            }
        }

        if digits.is_empty() {
            return Err(AddressError::Empty);
        }
        if digits.len() > MAX_ADDRESS_DIGITS {
            return Err(AddressError::TooLong {
                max_len: MAX_ADDRESS_DIGITS,
                actual_len: digits.len(),
            });
        }

        Ok(Self {
            ton,
            npi: NumberingPlan::Isdn,
            digits,
        })
    }

    pub fn type_of_number(&self) -> TypeOfNumber {
        self.ton
    }

    pub fn numbering_plan(&self) -> NumberingPlan {
        self.npi
    }

    /// The dialable digits, without any `+` prefix
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Type-of-address octet: extension bit, TON, NPI
    pub fn type_of_address(&self) -> u8 {
        0x80 | ((self.ton as u8) << 4) | (self.npi as u8)
    }

    /// Encode as a TP address: digit count, type-of-address, semi-octets
    pub fn encode_tp(&self, buf: &mut BytesMut) {
        encode_u8(buf, self.digits.len() as u8);
        encode_u8(buf, self.type_of_address());
        encode_semi_octets(buf, &self.digits);
    }

    /// Encode as an RP service-centre address: octet count, type-of-address, semi-octets
    pub fn encode_service_centre(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + self.digits.len().div_ceil(2));
        encode_u8(&mut buf, (1 + self.digits.len().div_ceil(2)) as u8);
        encode_u8(&mut buf, self.type_of_address());
        encode_semi_octets(&mut buf, &self.digits);
        buf.freeze()
    }

    /// Decode a TP address (the length octet counts useful semi-octets)
    pub fn decode_tp(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let digit_count = decode_u8(buf)? as usize;
        let toa = decode_u8(buf)?;
        let octets = decode_bytes(buf, digit_count.div_ceil(2))?;

        let ton = TypeOfNumber::try_from((toa >> 4) & 0x07).unwrap_or(TypeOfNumber::Unknown);
        let npi = NumberingPlan::try_from(toa & 0x0F).unwrap_or(NumberingPlan::Unknown);

        let digits = if ton == TypeOfNumber::Alphanumeric {
            let septets = unpack_septets(&octets, digit_count * 4 / 7, 0);
            gsm_alphabet::decode(&septets)
        } else {
            decode_semi_octets(&octets, digit_count)
        };

        Ok(Self { ton, npi, digits })
    }
}

impl fmt::Debug for GsmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GsmAddress")
            .field("ton", &self.ton)
            .field("npi", &self.npi)
            .field("digits", &self.digits)
            .finish()
    }
}

impl fmt::Display for GsmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ton == TypeOfNumber::International {
            write!(f, "+{}", self.digits)
        } else {
            f.write_str(&self.digits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_separators() {
        let addr = GsmAddress::parse("(650) 100-2000").unwrap();
        assert_eq!(addr.digits(), "6501002000");
        assert_eq!(addr.type_of_number(), TypeOfNumber::Unknown);
        assert_eq!(addr.type_of_address(), 0x81);
    }

    #[test]
    fn parse_international() {
        let addr = GsmAddress::parse("+1 650 100 2000").unwrap();
        assert_eq!(addr.digits(), "16501002000");
        assert_eq!(addr.type_of_address(), 0x91);
        assert_eq!(addr.to_string(), "+16501002000");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(GsmAddress::parse("  "), Err(AddressError::Empty));
        assert_eq!(GsmAddress::parse("12x4"), Err(AddressError::InvalidDigit('x')));
        assert!(matches!(
            GsmAddress::parse(&"1".repeat(21)),
            Err(AddressError::TooLong { actual_len: 21, .. })
        ));
        // '+' is only meaningful as a prefix
        assert_eq!(GsmAddress::parse("12+4"), Err(AddressError::InvalidDigit('+')));
    }

    #[test]
    fn tp_address_encoding() {
        let addr = GsmAddress::parse("911").unwrap();
        let mut buf = BytesMut::new();
        addr.encode_tp(&mut buf);
        assert_eq!(buf.as_ref(), &[0x03, 0x81, 0x19, 0xF1]);

        let mut cursor = Cursor::new(buf.as_ref());
        let decoded = GsmAddress::decode_tp(&mut cursor).unwrap();
        assert_eq!(decoded, addr);
    }

    #[test]
    fn service_centre_encoding_counts_octets() {
        let addr = GsmAddress::parse("121").unwrap();
        assert_eq!(addr.encode_service_centre().as_ref(), &[0x03, 0x81, 0x21, 0xF1]);
    }

    #[test]
    fn decode_tp_reports_truncation() {
        let data = [0x0A, 0x81, 0x56];
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            GsmAddress::decode_tp(&mut cursor),
            Err(CodecError::Incomplete)
        ));
    }
}
