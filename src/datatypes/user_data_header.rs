// ABOUTME: TP-User-Data-Header information elements for concatenation and application ports
// ABOUTME: Encodes and decodes the UDHL-prefixed header that precedes user data when TP-UDHI is set

use crate::codec::{decode_bytes, decode_u8, CodecError};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Information element identifiers used by the dispatcher (GSM 03.40 §9.2.3.24)
pub mod iei {
    pub const CONCAT_8BIT_REF: u8 = 0x00;
    pub const APPLICATION_PORT_16BIT: u8 = 0x05;
    pub const CONCAT_16BIT_REF: u8 = 0x08;
}

/// Concatenation details carried by either concat IE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConcatInfo {
    pub reference: u16,
    pub total: u8,
    pub sequence: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InformationElement {
    /// Concatenated short message, 8-bit reference
    Concat8 { reference: u8, total: u8, sequence: u8 },
    /// Concatenated short message, 16-bit reference
    Concat16 { reference: u16, total: u8, sequence: u8 },
    /// Application port addressing, 16-bit ports
    ApplicationPort16 { destination: u16, origin: u16 },
    /// Anything else, kept verbatim
    Other { id: u8, data: Bytes },
}

impl InformationElement {
    fn id(&self) -> u8 {
        match self {
            InformationElement::Concat8 { .. } => iei::CONCAT_8BIT_REF,
            InformationElement::Concat16 { .. } => iei::CONCAT_16BIT_REF,
            InformationElement::ApplicationPort16 { .. } => iei::APPLICATION_PORT_16BIT,
            InformationElement::Other { id, .. } => *id,
        }
    }

    fn data_len(&self) -> usize {
        match self {
            InformationElement::Concat8 { .. } => 3,
            InformationElement::Concat16 { .. } | InformationElement::ApplicationPort16 { .. } => 4,
            InformationElement::Other { data, .. } => data.len(),
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.id());
        buf.put_u8(self.data_len() as u8);
        match self {
            InformationElement::Concat8 {
                reference,
                total,
                sequence,
            } => {
                buf.put_u8(*reference);
                buf.put_u8(*total);
                buf.put_u8(*sequence);
            }
            InformationElement::Concat16 {
                reference,
                total,
                sequence,
            } => {
                buf.put_u16(*reference);
                buf.put_u8(*total);
                buf.put_u8(*sequence);
            }
            InformationElement::ApplicationPort16 {
                destination,
                origin,
            } => {
                buf.put_u16(*destination);
                buf.put_u16(*origin);
            }
            InformationElement::Other { data, .. } => buf.put_slice(data),
        }
    }

    fn from_parts(id: u8, data: Bytes) -> Self {
        match (id, data.as_ref()) {
            (iei::CONCAT_8BIT_REF, &[reference, total, sequence]) => InformationElement::Concat8 {
                reference,
                total,
                sequence,
            },
            (iei::CONCAT_16BIT_REF, &[hi, lo, total, sequence]) => InformationElement::Concat16 {
                reference: u16::from_be_bytes([hi, lo]),
                total,
                sequence,
            },
            (iei::APPLICATION_PORT_16BIT, &[dh, dl, oh, ol]) => {
                InformationElement::ApplicationPort16 {
                    destination: u16::from_be_bytes([dh, dl]),
                    origin: u16::from_be_bytes([oh, ol]),
                }
            }
            _ => InformationElement::Other { id, data },
        }
    }
}

/// A parsed TP-User-Data-Header
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserDataHeader {
    pub elements: Vec<InformationElement>,
}

impl UserDataHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concat(mut self, reference: u8, total: u8, sequence: u8) -> Self {
        self.elements.push(InformationElement::Concat8 {
            reference,
            total,
            sequence,
        });
        self
    }

    pub fn with_port(mut self, destination: u16, origin: u16) -> Self {
        self.elements.push(InformationElement::ApplicationPort16 {
            destination,
            origin,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Encoded length in octets, including the UDHL octet itself
    pub fn encoded_len(&self) -> usize {
        1 + self
            .elements
            .iter()
            .map(|ie| 2 + ie.data_len())
            .sum::<usize>()
    }

    /// Write UDHL followed by each element
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8((self.encoded_len() - 1) as u8);
        for ie in &self.elements {
            ie.encode(buf);
        }
    }

    /// Read UDHL and the elements it covers
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let udhl = decode_u8(buf)? as usize;
        let body = decode_bytes(buf, udhl)?;

        let mut elements = Vec::new();
        let mut rest = body.as_ref();
        while !rest.is_empty() {
            let [id, len, tail @ ..] = rest else {
                return Err(CodecError::FieldValidation {
                    field: "user_data_header",
                    reason: "truncated information element".to_string(),
                });
            };
            let len = *len as usize;
            if tail.len() < len {
                return Err(CodecError::FieldValidation {
                    field: "user_data_header",
                    reason: format!("element {id:#04x} claims {len} octets, {} left", tail.len()),
                });
            }
            elements.push(InformationElement::from_parts(
                *id,
                Bytes::copy_from_slice(&tail[..len]),
            ));
            rest = &tail[len..];
        }

        Ok(Self { elements })
    }

    /// Concatenation info, from whichever concat element is present
    pub fn concat(&self) -> Option<ConcatInfo> {
        self.elements.iter().find_map(|ie| match ie {
            InformationElement::Concat8 {
                reference,
                total,
                sequence,
            } => Some(ConcatInfo {
                reference: u16::from(*reference),
                total: *total,
                sequence: *sequence,
            }),
            InformationElement::Concat16 {
                reference,
                total,
                sequence,
            } => Some(ConcatInfo {
                reference: *reference,
                total: *total,
                sequence: *sequence,
            }),
            _ => None,
        })
    }

    /// Destination and origin ports, if an application port element is present
    pub fn ports(&self) -> Option<(u16, u16)> {
        self.elements.iter().find_map(|ie| match ie {
            InformationElement::ApplicationPort16 {
                destination,
                origin,
            } => Some((*destination, *origin)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_header_layout() {
        let udh = UserDataHeader::new().with_concat(0x2A, 3, 1);
        let mut buf = BytesMut::new();
        udh.encode(&mut buf);
        assert_eq!(buf.as_ref(), &[0x05, 0x00, 0x03, 0x2A, 0x03, 0x01]);
        assert_eq!(udh.encoded_len(), 6);
    }

    #[test]
    fn port_header_layout() {
        let udh = UserDataHeader::new().with_port(2948, 0);
        let mut buf = BytesMut::new();
        udh.encode(&mut buf);
        assert_eq!(buf.as_ref(), &[0x06, 0x05, 0x04, 0x0B, 0x84, 0x00, 0x00]);
    }

    #[test]
    fn decode_mixed_header() {
        let data = [
            0x0B, 0x00, 0x03, 0x07, 0x02, 0x02, 0x05, 0x04, 0x0B, 0x84, 0x23, 0xF0,
        ];
        let mut cursor = Cursor::new(&data[..]);
        let udh = UserDataHeader::decode(&mut cursor).unwrap();
        assert_eq!(
            udh.concat(),
            Some(ConcatInfo {
                reference: 7,
                total: 2,
                sequence: 2
            })
        );
        assert_eq!(udh.ports(), Some((2948, 9200)));
    }

    #[test]
    fn unknown_elements_are_kept() {
        let data = [0x03, 0x70, 0x01, 0xAA];
        let mut cursor = Cursor::new(&data[..]);
        let udh = UserDataHeader::decode(&mut cursor).unwrap();
        assert_eq!(
            udh.elements,
            vec![InformationElement::Other {
                id: 0x70,
                data: Bytes::from_static(&[0xAA])
            }]
        );
    }

    #[test]
    fn decode_rejects_overlong_element() {
        let data = [0x03, 0x00, 0x05, 0x01];
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            UserDataHeader::decode(&mut cursor),
            Err(CodecError::FieldValidation { .. })
        ));
    }
}
