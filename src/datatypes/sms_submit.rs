// ABOUTME: SMS-SUBMIT TPDU encoding and decoding for the octets handed to the radio
// ABOUTME: User data is packed as GSM 7-bit septets or 8-bit octets, with an optional header

use crate::codec::{
    decode_bytes, decode_u8, encode_u8, pack_septets, unpack_septets, CodecError, Decodable,
    Encodable, MAX_USER_DATA_OCTETS, MAX_USER_DATA_SEPTETS,
};
use crate::datatypes::{DataCoding, GsmAddress, RelativeValidity, UserDataHeader};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// First-octet flag bits of SMS-SUBMIT (GSM 03.40 §9.2.2.2)
pub mod flags {
    /// TP-MTI value for SMS-SUBMIT
    pub const MTI_SUBMIT: u8 = 0x01;
    pub const MTI_MASK: u8 = 0x03;
    /// TP-Reject-Duplicates
    pub const REJECT_DUPLICATES: u8 = 0x04;
    /// TP-VPF = relative (bits 4..3 = 10)
    pub const VPF_RELATIVE: u8 = 0x10;
    pub const VPF_MASK: u8 = 0x18;
    /// TP-Status-Report-Request
    pub const STATUS_REPORT_REQUEST: u8 = 0x20;
    /// TP-User-Data-Header-Indicator
    pub const UDHI: u8 = 0x40;
    /// TP-Reply-Path
    pub const REPLY_PATH: u8 = 0x80;
}

/// User data body, in the unit the data coding counts
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserData {
    /// Unpacked 7-bit septets (GSM default alphabet, escapes included)
    Septets(Vec<u8>),
    /// Raw octets (8-bit data or UTF-16BE for UCS-2)
    Octets(Bytes),
}

impl UserData {
    /// Length in the unit TP-UDL counts for this body, excluding any header
    pub fn len(&self) -> usize {
        match self {
            UserData::Septets(s) => s.len(),
            UserData::Octets(o) => o.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The SMS-SUBMIT TPDU sent from the handset to the service centre
///
/// Only the relative validity-period format is produced; absolute and
/// enhanced formats are skipped on decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmsSubmit {
    /// 9.2.3.25 TP-RD: ask the service centre to drop a duplicate of an
    ///          earlier submission with the same TP-MR and TP-DA. Set on resends.
    pub reject_duplicates: bool,

    /// 9.2.3.5 TP-SRR: a status report is requested
    pub status_report_request: bool,

    /// 9.2.3.17 TP-RP
    pub reply_path: bool,

    /// 9.2.3.6 TP-MR: 0..255, normally assigned by the modem. Resends
    ///         carry the reference the modem reported for the first attempt.
    pub message_reference: u8,

    /// 9.2.3.8 TP-DA
    pub destination: GsmAddress,

    /// 9.2.3.9 TP-PID, zero for plain short messages
    pub protocol_id: u8,

    /// 9.2.3.10 TP-DCS
    pub data_coding: DataCoding,

    /// 9.2.3.12 TP-VP in relative format; `None` leaves TP-VPF at "not present"
    pub validity: Option<RelativeValidity>,

    /// 9.2.3.24 TP-UDH, written when non-empty and announced through TP-UDHI
    pub user_data_header: Option<UserDataHeader>,

    /// 9.2.3.24 TP-UD body following the header
    pub user_data: UserData,
}

impl SmsSubmit {
    pub fn new(destination: GsmAddress, data_coding: DataCoding, user_data: UserData) -> Self {
        Self {
            reject_duplicates: false,
            status_report_request: false,
            reply_path: false,
            message_reference: 0,
            destination,
            protocol_id: 0,
            data_coding,
            validity: None,
            user_data_header: None,
            user_data,
        }
    }

    pub fn with_status_report_request(mut self, requested: bool) -> Self {
        self.status_report_request = requested;
        self
    }

    pub fn with_validity(mut self, validity: Option<RelativeValidity>) -> Self {
        self.validity = validity;
        self
    }

    pub fn with_user_data_header(mut self, header: UserDataHeader) -> Self {
        self.user_data_header = (!header.is_empty()).then_some(header);
        self
    }

    /// First octet: MTI plus the RD, VPF, SRR, UDHI and RP flags
    pub fn first_octet(&self) -> u8 {
        let mut octet = flags::MTI_SUBMIT;
        if self.reject_duplicates {
            octet |= flags::REJECT_DUPLICATES;
        }
        if self.validity.is_some() {
            octet |= flags::VPF_RELATIVE;
        }
        if self.status_report_request {
            octet |= flags::STATUS_REPORT_REQUEST;
        }
        if self.user_data_header.is_some() {
            octet |= flags::UDHI;
        }
        if self.reply_path {
            octet |= flags::REPLY_PATH;
        }
        octet
    }

    fn header_len(&self) -> usize {
        self.user_data_header
            .as_ref()
            .map_or(0, UserDataHeader::encoded_len)
    }

    /// Header length in septets and the fill bits that pad it to a septet boundary
    fn header_septets(header_len: usize) -> (usize, usize) {
        let septets = (header_len * 8).div_ceil(7);
        (septets, septets * 7 - header_len * 8)
    }
}

impl Encodable for SmsSubmit {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header_len = self.header_len();

        let (udl, body) = match (&self.user_data, self.data_coding.is_7bit()) {
            (UserData::Septets(septets), true) => {
                let (header_septets, fill_bits) = Self::header_septets(header_len);
                let udl = header_septets + septets.len();
                if udl > MAX_USER_DATA_SEPTETS {
                    return Err(CodecError::UserDataTooLong {
                        length: udl,
                        max: MAX_USER_DATA_SEPTETS,
                    });
                }
                (udl, pack_septets(septets, fill_bits))
            }
            (UserData::Octets(octets), false) => {
                let udl = header_len + octets.len();
                if udl > MAX_USER_DATA_OCTETS {
                    return Err(CodecError::UserDataTooLong {
                        length: udl,
                        max: MAX_USER_DATA_OCTETS,
                    });
                }
                (udl, octets.to_vec())
            }
            _ => {
                return Err(CodecError::FieldValidation {
                    field: "user_data",
                    reason: format!("body does not match data coding {}", self.data_coding),
                });
            }
        };

        encode_u8(buf, self.first_octet());
        encode_u8(buf, self.message_reference);
        self.destination.encode_tp(buf);
        encode_u8(buf, self.protocol_id);
        encode_u8(buf, self.data_coding.to_byte());
        if let Some(vp) = self.validity {
            encode_u8(buf, vp.octet());
        }
        encode_u8(buf, udl as u8);
        if let Some(header) = &self.user_data_header {
            header.encode(buf);
        }
        buf.put_slice(&body);

        Ok(())
    }
}

impl Decodable for SmsSubmit {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let first = decode_u8(buf)?;
        if first & flags::MTI_MASK != flags::MTI_SUBMIT {
            return Err(CodecError::UnexpectedMessageType(first & flags::MTI_MASK));
        }

        let message_reference = decode_u8(buf)?;
        let destination = GsmAddress::decode_tp(buf)?;
        let protocol_id = decode_u8(buf)?;
        let data_coding = DataCoding::from_byte(decode_u8(buf)?);

        let validity = match first & flags::VPF_MASK {
            0 => None,
            flags::VPF_RELATIVE => Some(RelativeValidity::from_octet(decode_u8(buf)?)),
            _ => {
                // Enhanced or absolute: seven octets we do not interpret
                decode_bytes(buf, 7)?;
                None
            }
        };

        let udl = decode_u8(buf)? as usize;
        let has_header = first & flags::UDHI != 0;

        let (user_data_header, user_data) = if data_coding.is_7bit() {
            let packed = decode_bytes(buf, (udl * 7).div_ceil(8))?;
            let (header, header_len) = if has_header {
                let mut inner = Cursor::new(packed.as_ref());
                let header = UserDataHeader::decode(&mut inner)?;
                (Some(header), inner.position() as usize)
            } else {
                (None, 0)
            };
            let (header_septets, fill_bits) = Self::header_septets(header_len);
            let count = udl.saturating_sub(header_septets);
            let septets = unpack_septets(&packed[header_len..], count, fill_bits);
            (header, UserData::Septets(septets))
        } else {
            let mut data = decode_bytes(buf, udl)?;
            let header = if has_header {
                let mut inner = Cursor::new(data.as_ref());
                let header = UserDataHeader::decode(&mut inner)?;
                let consumed = inner.position() as usize;
                data.advance(consumed);
                Some(header)
            } else {
                None
            };
            (header, UserData::Octets(data))
        };

        Ok(Self {
            reject_duplicates: first & flags::REJECT_DUPLICATES != 0,
            status_report_request: first & flags::STATUS_REPORT_REQUEST != 0,
            reply_path: first & flags::REPLY_PATH != 0,
            message_reference,
            destination,
            protocol_id,
            data_coding,
            validity,
            user_data_header,
            user_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::gsm_alphabet;

    fn address(s: &str) -> GsmAddress {
        GsmAddress::parse(s).unwrap()
    }

    #[test]
    fn plain_text_submit_layout() {
        let submit = SmsSubmit::new(
            address("6501002000"),
            DataCoding::Gsm7Bit,
            UserData::Septets(gsm_alphabet::encode("hellohello").unwrap()),
        );
        let bytes = submit.to_bytes().unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x01, 0x00, 0x0A, 0x81, 0x56, 0x10, 0x00, 0x02, 0x00, 0x00, 0x00, 0x0A, 0xE8,
                0x32, 0x9B, 0xFD, 0x46, 0x97, 0xD9, 0xEC, 0x37
            ]
        );
    }

    #[test]
    fn flags_follow_fields() {
        let mut submit = SmsSubmit::new(
            address("911"),
            DataCoding::Gsm7Bit,
            UserData::Septets(vec![0x41]),
        )
        .with_status_report_request(true)
        .with_validity(RelativeValidity::from_minutes(100));
        submit.reject_duplicates = true;

        let bytes = submit.to_bytes().unwrap();
        assert_eq!(bytes[0], 0x01 | 0x04 | 0x10 | 0x20);
        // MR, DA(4 octets), PID, DCS, then VP
        assert_eq!(bytes[8], 19);
    }

    #[test]
    fn septet_header_alignment() {
        let septets = gsm_alphabet::encode("abc").unwrap();
        let submit = SmsSubmit::new(
            address("5551234"),
            DataCoding::Gsm7Bit,
            UserData::Septets(septets.clone()),
        )
        .with_user_data_header(UserDataHeader::new().with_concat(9, 2, 1));

        let bytes = submit.to_bytes().unwrap();
        assert_eq!(bytes[0] & flags::UDHI, flags::UDHI);

        let decoded = SmsSubmit::from_slice(&bytes).unwrap();
        // 6 header octets occupy 7 septets
        assert_eq!(decoded.user_data, UserData::Septets(septets));
        assert_eq!(decoded.user_data_header, submit.user_data_header);
        // UDL precedes 6 header octets and 3 packed body octets
        assert_eq!(bytes[bytes.len() - 9 - 1], 7 + 3);
    }

    #[test]
    fn ucs2_body_is_counted_in_octets() {
        let body = Bytes::from_static(&[0x04, 0x3F, 0x04, 0x40]);
        let submit = SmsSubmit::new(address("5551234"), DataCoding::Ucs2, UserData::Octets(body.clone()));
        let decoded = SmsSubmit::from_slice(&submit.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.data_coding, DataCoding::Ucs2);
        assert_eq!(decoded.user_data, UserData::Octets(body));
    }

    #[test]
    fn oversize_body_is_rejected() {
        let submit = SmsSubmit::new(
            address("5551234"),
            DataCoding::EightBit,
            UserData::Octets(Bytes::from(vec![0u8; 141])),
        );
        assert!(matches!(
            submit.to_bytes(),
            Err(CodecError::UserDataTooLong { length: 141, max: 140 })
        ));
    }

    #[test]
    fn mismatched_body_is_rejected() {
        let submit = SmsSubmit::new(
            address("5551234"),
            DataCoding::Ucs2,
            UserData::Septets(vec![0x41]),
        );
        assert!(matches!(
            submit.to_bytes(),
            Err(CodecError::FieldValidation { field: "user_data", .. })
        ));
    }

    #[test]
    fn decode_rejects_other_message_types() {
        assert!(matches!(
            SmsSubmit::from_slice(&[0x02, 0x00]),
            Err(CodecError::UnexpectedMessageType(0x02))
        ));
    }
}
