// ABOUTME: Message division and SMS-SUBMIT construction for text and port-addressed data
// ABOUTME: Picks GSM 7-bit when the whole message fits the alphabet and UCS-2 otherwise

use crate::codec::{CodecError, MAX_USER_DATA_OCTETS};
use crate::datatypes::{
    gsm_alphabet, DataCoding, GsmAddress, RelativeValidity, SmsSubmit, UserData, UserDataHeader,
};
use bytes::Bytes;

/// Largest data payload that fits beside a 16-bit application port header
pub const MAX_PORT_DATA_OCTETS: usize = MAX_USER_DATA_OCTETS - 7;

/// Most segments a concatenated message can have
pub const MAX_SEGMENTS: usize = 255;

/// Fields shared by every SMS-SUBMIT built for one send
#[derive(Clone, Debug)]
pub struct SubmitTemplate {
    pub destination: GsmAddress,
    pub status_report_request: bool,
    pub validity: Option<RelativeValidity>,
}

impl SubmitTemplate {
    fn submit(&self, data_coding: DataCoding, user_data: UserData) -> SmsSubmit {
        SmsSubmit::new(self.destination.clone(), data_coding, user_data)
            .with_status_report_request(self.status_report_request)
            .with_validity(self.validity)
    }
}

/// Alphabet that can carry every part
pub fn choose_coding<S: AsRef<str>>(parts: &[S]) -> DataCoding {
    if parts.iter().all(|p| gsm_alphabet::is_encodable(p.as_ref())) {
        DataCoding::Gsm7Bit
    } else {
        DataCoding::Ucs2
    }
}

/// Split text into parts that each fit one segment
///
/// A message that fits a single segment comes back whole. Longer messages
/// are cut at the concatenated capacity without separating an escape
/// sequence from its character or a surrogate pair from its partner.
/// Empty text gives no parts.
pub fn divide_message(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let coding = choose_coding(&[text]);
    let units = |c: char| match coding {
        DataCoding::Gsm7Bit => gsm_alphabet::lookup(c).map_or(1, |g| g.septets()),
        _ => c.len_utf16(),
    };

    let total: usize = text.chars().map(units).sum();
    if total <= coding.single_segment_capacity() {
        return vec![text.to_string()];
    }

    let capacity = coding.concatenated_segment_capacity();
    let mut parts = Vec::with_capacity(total.div_ceil(capacity));
    let mut current = String::new();
    let mut used = 0;

    for c in text.chars() {
        let n = units(c);
        if used + n > capacity {
            parts.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(c);
        used += n;
    }
    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn encode_part(text: &str, coding: DataCoding) -> Result<UserData, CodecError> {
    match coding {
        DataCoding::Gsm7Bit => Ok(UserData::Septets(gsm_alphabet::encode(text)?)),
        _ => {
            let octets: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
            Ok(UserData::Octets(Bytes::from(octets)))
        }
    }
}

/// Build one SMS-SUBMIT per text part
///
/// All parts share one alphabet. More than one part adds a concatenation
/// header carrying `concat_ref`, the part count and a 1-based sequence.
pub fn text_submits(
    template: &SubmitTemplate,
    parts: &[String],
    concat_ref: u8,
) -> Result<Vec<SmsSubmit>, CodecError> {
    if parts.is_empty() {
        return Err(CodecError::FieldValidation {
            field: "parts",
            reason: "no message parts".to_string(),
        });
    }
    if parts.len() > MAX_SEGMENTS {
        return Err(CodecError::FieldValidation {
            field: "parts",
            reason: format!("{} parts, maximum is {MAX_SEGMENTS}", parts.len()),
        });
    }

    let coding = choose_coding(parts);
    let total = parts.len() as u8;

    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let user_data = encode_part(part, coding)?;
            let submit = template.submit(coding, user_data);
            if total == 1 {
                return Ok(submit);
            }
            let header = UserDataHeader::new().with_concat(concat_ref, total, i as u8 + 1);
            Ok(submit.with_user_data_header(header))
        })
        .collect()
}

/// Build the single SMS-SUBMIT for a port-addressed data message
pub fn data_submit(
    template: &SubmitTemplate,
    dest_port: u16,
    data: &[u8],
) -> Result<SmsSubmit, CodecError> {
    if data.len() > MAX_PORT_DATA_OCTETS {
        return Err(CodecError::UserDataTooLong {
            length: data.len(),
            max: MAX_PORT_DATA_OCTETS,
        });
    }

    let header = UserDataHeader::new().with_port(dest_port, 0);
    Ok(template
        .submit(DataCoding::EightBit, UserData::Octets(Bytes::copy_from_slice(data)))
        .with_user_data_header(header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encodable;

    fn template() -> SubmitTemplate {
        SubmitTemplate {
            destination: GsmAddress::parse("6501002000").unwrap(),
            status_report_request: false,
            validity: None,
        }
    }

    #[test]
    fn short_text_is_one_part() {
        assert_eq!(divide_message("test sms"), vec!["test sms".to_string()]);
        assert_eq!(divide_message(&"a".repeat(160)).len(), 1);
        assert!(divide_message("").is_empty());
    }

    #[test]
    fn long_gsm_text_splits_at_153() {
        let parts = divide_message(&"a".repeat(161));
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 153);
        assert_eq!(parts[1].len(), 8);
    }

    #[test]
    fn escapes_are_not_split() {
        // 152 plain septets then a two-septet character
        let text = format!("{}€{}", "a".repeat(152), "a".repeat(10));
        let parts = divide_message(&text);
        assert_eq!(parts[0], "a".repeat(152));
        assert!(parts[1].starts_with('€'));
    }

    #[test]
    fn ucs2_splits_at_67_units() {
        let text = "ж".repeat(71);
        let parts = divide_message(&text);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].chars().count(), 67);
        assert_eq!(divide_message(&"ж".repeat(70)).len(), 1);
    }

    #[test]
    fn surrogate_pairs_stay_together() {
        let text = format!("{}{}", "ж".repeat(66), "😀".repeat(3));
        let parts = divide_message(&text);
        assert_eq!(parts[0].chars().count(), 66);
        assert!(parts[1].starts_with('😀'));
    }

    #[test]
    fn multipart_submits_carry_concat_headers() {
        let parts = vec!["first".to_string(), "second".to_string()];
        let submits = text_submits(&template(), &parts, 0x11).unwrap();
        assert_eq!(submits.len(), 2);
        for (i, submit) in submits.iter().enumerate() {
            let concat = submit.user_data_header.as_ref().unwrap().concat().unwrap();
            assert_eq!(concat.reference, 0x11);
            assert_eq!(concat.total, 2);
            assert_eq!(concat.sequence as usize, i + 1);
            assert!(submit.to_bytes().is_ok());
        }
    }

    #[test]
    fn single_part_has_no_header() {
        let submits = text_submits(&template(), &["hi".to_string()], 1).unwrap();
        assert!(submits[0].user_data_header.is_none());
    }

    #[test]
    fn mixed_parts_share_ucs2() {
        let parts = vec!["plain".to_string(), "ж".to_string()];
        let submits = text_submits(&template(), &parts, 1).unwrap();
        assert!(submits.iter().all(|s| s.data_coding == DataCoding::Ucs2));
        assert_eq!(
            submits[1].user_data,
            UserData::Octets(Bytes::from_static(&[0x04, 0x36]))
        );
    }

    #[test]
    fn oversized_part_fails_to_encode() {
        let parts = vec!["a".repeat(154), "b".to_string()];
        let submit = &text_submits(&template(), &parts, 1).unwrap()[0];
        assert!(matches!(
            submit.to_bytes(),
            Err(CodecError::UserDataTooLong { .. })
        ));
    }

    #[test]
    fn data_submit_limits() {
        let submit = data_submit(&template(), 2948, &[0u8; 133]).unwrap();
        assert_eq!(submit.data_coding, DataCoding::EightBit);
        assert_eq!(submit.user_data_header.as_ref().unwrap().ports(), Some((2948, 0)));
        assert!(submit.to_bytes().is_ok());

        assert!(matches!(
            data_submit(&template(), 2948, &[0u8; 134]),
            Err(CodecError::UserDataTooLong { length: 134, max: 133 })
        ));
    }

    #[test]
    fn empty_parts_rejected() {
        assert!(text_submits(&template(), &[], 1).is_err());
    }
}
