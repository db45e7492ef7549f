// ABOUTME: Strongly-typed TP-Data-Coding-Scheme covering the three GSM character sets
// ABOUTME: Carries the per-alphabet single and concatenated segment capacities used for division

use std::fmt;

/// TP-DCS alphabet selection (GSM 03.38 §4, general data coding group)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataCoding {
    /// GSM 7-bit default alphabet
    #[default]
    Gsm7Bit,
    /// 8-bit binary data
    EightBit,
    /// UCS-2 (UTF-16 big-endian code units)
    Ucs2,
}

impl DataCoding {
    /// Decode a TP-DCS octet; reserved alphabets fall back to 8-bit
    pub fn from_byte(value: u8) -> Self {
        match value >> 4 {
            // General data coding groups, alphabet in bits 3..2
            0x0..=0x7 => match (value >> 2) & 0x03 {
                0b00 => DataCoding::Gsm7Bit,
                0b10 => DataCoding::Ucs2,
                _ => DataCoding::EightBit,
            },
            // Data coding / message class group, alphabet in bit 2
            0xF => {
                if value & 0x04 == 0 {
                    DataCoding::Gsm7Bit
                } else {
                    DataCoding::EightBit
                }
            }
            // Message waiting groups
            0xC | 0xD => DataCoding::Gsm7Bit,
            0xE => DataCoding::Ucs2,
            _ => DataCoding::EightBit,
        }
    }

    /// The TP-DCS octet written into SMS-SUBMIT
    pub fn to_byte(&self) -> u8 {
        match self {
            DataCoding::Gsm7Bit => 0x00,
            DataCoding::EightBit => 0x04,
            DataCoding::Ucs2 => 0x08,
        }
    }

    /// Returns true if user data is counted in septets
    pub fn is_7bit(&self) -> bool {
        matches!(self, DataCoding::Gsm7Bit)
    }

    /// Capacity of a single un-headed segment, in this alphabet's units
    ///
    /// Septets for 7-bit, octets for 8-bit, UTF-16 code units for UCS-2.
    pub fn single_segment_capacity(&self) -> usize {
        match self {
            DataCoding::Gsm7Bit => 160,
            DataCoding::EightBit => 140,
            DataCoding::Ucs2 => 70,
        }
    }

    /// Capacity of one segment carrying an 8-bit concatenation header
    pub fn concatenated_segment_capacity(&self) -> usize {
        match self {
            DataCoding::Gsm7Bit => 153,
            DataCoding::EightBit => 134,
            DataCoding::Ucs2 => 67,
        }
    }
}

impl fmt::Debug for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataCoding::Gsm7Bit => write!(f, "DataCoding::Gsm7Bit(0x00)"),
            DataCoding::EightBit => write!(f, "DataCoding::EightBit(0x04)"),
            DataCoding::Ucs2 => write!(f, "DataCoding::Ucs2(0x08)"),
        }
    }
}

impl fmt::Display for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataCoding::Gsm7Bit => "GSM 7-bit",
            DataCoding::EightBit => "8-bit data",
            DataCoding::Ucs2 => "UCS-2",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_group_alphabets() {
        assert_eq!(DataCoding::from_byte(0x00), DataCoding::Gsm7Bit);
        assert_eq!(DataCoding::from_byte(0x04), DataCoding::EightBit);
        assert_eq!(DataCoding::from_byte(0x08), DataCoding::Ucs2);
        // Class 0 flash, 7-bit
        assert_eq!(DataCoding::from_byte(0x10), DataCoding::Gsm7Bit);
    }

    #[test]
    fn message_class_group() {
        assert_eq!(DataCoding::from_byte(0xF0), DataCoding::Gsm7Bit);
        assert_eq!(DataCoding::from_byte(0xF5), DataCoding::EightBit);
    }

    #[test]
    fn capacities() {
        assert_eq!(DataCoding::Gsm7Bit.single_segment_capacity(), 160);
        assert_eq!(DataCoding::Ucs2.concatenated_segment_capacity(), 67);
        assert!(DataCoding::default().is_7bit());
    }
}
