// ABOUTME: SMS-STATUS-REPORT TPDU decoding and the TP-Status classification it carries
// ABOUTME: Accepts modem octets prefixed with the SMSC address, which is skipped

use crate::codec::{decode_bytes, decode_u8, CodecError, Decodable};
use crate::datatypes::GsmAddress;
use std::fmt;
use std::io::Cursor;

/// TP-MTI value for SMS-STATUS-REPORT
pub const MTI_STATUS_REPORT: u8 = 0x02;

/// TP-Status (GSM 03.40 §9.2.3.15)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TpStatus(pub u8);

impl TpStatus {
    /// Short message received by the recipient
    pub const RECEIVED: TpStatus = TpStatus(0x00);

    /// The service centre has finished with this message
    pub fn is_final(&self) -> bool {
        !self.is_temporary()
    }

    /// Delivered, forwarded or replaced
    pub fn is_success(&self) -> bool {
        self.0 <= 0x02
    }

    /// Temporary error, service centre still trying
    pub fn is_temporary(&self) -> bool {
        (0x20..0x40).contains(&self.0)
    }

    /// Final and not a success
    pub fn is_failure(&self) -> bool {
        self.is_final() && !self.is_success()
    }
}

impl fmt::Debug for TpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_success() {
            "delivered"
        } else if self.is_temporary() {
            "pending"
        } else {
            "failed"
        };
        write!(f, "TpStatus({:#04x} {kind})", self.0)
    }
}

/// A 7-octet service centre timestamp (GSM 03.40 §9.2.3.11)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServiceCentreTimestamp {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Offset from GMT in quarter hours
    pub timezone_quarters: i8,
}

impl ServiceCentreTimestamp {
    fn swapped_bcd(octet: u8) -> u8 {
        (octet & 0x0F) * 10 + (octet >> 4)
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let raw = decode_bytes(buf, 7)?;
        let tz = raw[6];
        // Sign lives in bit 3 of the low (first) semi-octet
        let magnitude = Self::swapped_bcd(tz & 0xF7) as i8;
        let timezone_quarters = if tz & 0x08 != 0 { -magnitude } else { magnitude };

        Ok(Self {
            year: Self::swapped_bcd(raw[0]),
            month: Self::swapped_bcd(raw[1]),
            day: Self::swapped_bcd(raw[2]),
            hour: Self::swapped_bcd(raw[3]),
            minute: Self::swapped_bcd(raw[4]),
            second: Self::swapped_bcd(raw[5]),
            timezone_quarters,
        })
    }
}

/// SMS-STATUS-REPORT sent by the service centre about an earlier submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmsStatusReport {
    /// TP-MR of the SMS-SUBMIT this report is about
    pub message_reference: u8,
    /// TP-RA: recipient of the original message
    pub recipient: GsmAddress,
    /// TP-SCTS: when the service centre received the original message
    pub sc_timestamp: ServiceCentreTimestamp,
    /// TP-DT: when the status below was reached
    pub discharge_time: ServiceCentreTimestamp,
    pub status: TpStatus,
}

impl SmsStatusReport {
    /// Decode the octets a modem hands up: SMSC address (length-prefixed) then TPDU
    pub fn decode_from_modem(octets: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(octets);
        let smsc_len = decode_u8(&mut cursor)? as usize;
        decode_bytes(&mut cursor, smsc_len)?;
        Self::decode(&mut cursor)
    }
}

impl Decodable for SmsStatusReport {
    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let first = decode_u8(buf)?;
        if first & 0x03 != MTI_STATUS_REPORT {
            return Err(CodecError::UnexpectedMessageType(first & 0x03));
        }

        let message_reference = decode_u8(buf)?;
        let recipient = GsmAddress::decode_tp(buf)?;
        let sc_timestamp = ServiceCentreTimestamp::decode(buf)?;
        let discharge_time = ServiceCentreTimestamp::decode(buf)?;
        let status = TpStatus(decode_u8(buf)?);

        // TP-PI and anything after it are optional and not needed here
        Ok(Self {
            message_reference,
            recipient,
            sc_timestamp,
            discharge_time,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: [u8; 24] = [
        0x00, // no SMSC
        0x06, 0x2A, // SMS-STATUS-REPORT, MR 42
        0x0A, 0x81, 0x56, 0x10, 0x00, 0x02, 0x00, // 6501002000
        0x21, 0x01, 0x31, 0x21, 0x43, 0x65, 0x8A, // SCTS, GMT-7h
        0x21, 0x01, 0x31, 0x21, 0x53, 0x65, 0x8A, // DT
    ];

    fn report_with_status(status: u8) -> Vec<u8> {
        let mut octets = REPORT.to_vec();
        octets.push(status);
        octets
    }

    #[test]
    fn decodes_delivered_report() {
        let report = SmsStatusReport::decode_from_modem(&report_with_status(0x00)).unwrap();
        assert_eq!(report.message_reference, 42);
        assert_eq!(report.recipient.digits(), "6501002000");
        assert!(report.status.is_success());
        assert!(report.status.is_final());
        assert_eq!(report.sc_timestamp.year, 12);
        assert_eq!(report.sc_timestamp.month, 10);
        assert_eq!(report.sc_timestamp.minute, 34);
        assert_eq!(report.sc_timestamp.timezone_quarters, -28);
        assert_eq!(report.discharge_time.minute, 35);
    }

    #[test]
    fn skips_smsc_prefix() {
        let mut octets = vec![0x03, 0x81, 0x21, 0xF1];
        octets.extend_from_slice(&report_with_status(0x41)[1..]);
        let report = SmsStatusReport::decode_from_modem(&octets).unwrap();
        assert_eq!(report.message_reference, 42);
        assert!(report.status.is_failure());
    }

    #[test]
    fn status_classes() {
        assert!(TpStatus(0x20).is_temporary());
        assert!(!TpStatus(0x3F).is_final());
        assert!(TpStatus(0x40).is_failure());
        assert!(TpStatus(0x60).is_failure());
        assert!(TpStatus(0x02).is_success());
        assert!(TpStatus(0x03).is_failure());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(SmsStatusReport::decode_from_modem(&[0xFF, 0xFF, 0xFF]).is_err());
        assert!(SmsStatusReport::decode_from_modem(&[]).is_err());
        assert!(matches!(
            SmsStatusReport::decode_from_modem(&[0x00, 0x01, 0x00]),
            Err(CodecError::UnexpectedMessageType(0x01))
        ));
    }
}
