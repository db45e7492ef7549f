// ABOUTME: GSM 03.40 §9.2.3.12.1 relative validity period encoding
// ABOUTME: Maps validity minutes onto the single TP-VP octet, with -1 meaning "omit the field"

use std::fmt;

/// Minutes per relative-validity band boundary
const TWELVE_HOURS: i32 = 12 * 60;
const ONE_DAY: i32 = 24 * 60;
const THIRTY_DAYS: i32 = 30 * ONE_DAY;
const ONE_WEEK: i32 = 7 * ONE_DAY;
const SIXTY_THREE_WEEKS: i32 = 63 * ONE_WEEK;

/// Encode a validity period in minutes as the relative TP-VP octet
///
/// Returns `-1` when the value falls outside the representable window
/// (including every negative input), which tells the encoder to leave the
/// TP-VP field out so the service centre applies its default. Otherwise the
/// result is in `0..=255`:
///
/// | minutes          | octet               |
/// |------------------|---------------------|
/// | 5 ..= 720        | `m / 5 - 1`         |
/// | 721 ..= 1440     | `(m - 720) / 30 + 143` |
/// | 1441 ..= 43200   | `m / 1440 + 166`    |
/// | 43201 ..= 635040 | `m / 10080 + 192`   |
pub fn encode_relative_validity_minutes(minutes: i32) -> i32 {
    match minutes {
        5..=TWELVE_HOURS => minutes / 5 - 1,
        721..=ONE_DAY => (minutes - TWELVE_HOURS) / 30 + 143,
        1441..=THIRTY_DAYS => minutes / ONE_DAY + 166,
        43201..=SIXTY_THREE_WEEKS => minutes / ONE_WEEK + 192,
        _ => -1,
    }
}

/// A relative TP-VP octet that is known to be present
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativeValidity(u8);

impl RelativeValidity {
    /// Build from minutes; `None` when the field should be omitted
    pub fn from_minutes(minutes: i32) -> Option<Self> {
        u8::try_from(encode_relative_validity_minutes(minutes))
            .ok()
            .map(RelativeValidity)
    }

    pub fn from_octet(octet: u8) -> Self {
        RelativeValidity(octet)
    }

    pub fn octet(&self) -> u8 {
        self.0
    }

    /// Validity period this octet stands for, in minutes
    pub fn minutes(&self) -> i32 {
        let v = i32::from(self.0);
        match self.0 {
            0..=143 => (v + 1) * 5,
            144..=167 => TWELVE_HOURS + (v - 143) * 30,
            168..=196 => (v - 166) * ONE_DAY,
            _ => (v - 192) * ONE_WEEK,
        }
    }
}

impl fmt::Debug for RelativeValidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelativeValidity({:#04x} = {} min)", self.0, self.minutes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_minutes_omit_the_field() {
        assert_eq!(encode_relative_validity_minutes(-5), -1);
        assert_eq!(encode_relative_validity_minutes(-1), -1);
        assert_eq!(encode_relative_validity_minutes(i32::MIN), -1);
        assert_eq!(RelativeValidity::from_minutes(-5), None);
    }

    #[test]
    fn five_minute_band() {
        assert_eq!(encode_relative_validity_minutes(100), 100 / 5 - 1);
        assert_eq!(encode_relative_validity_minutes(5), 0);
        assert_eq!(encode_relative_validity_minutes(720), 143);
        // Below one unit of granularity there is nothing to encode
        assert_eq!(encode_relative_validity_minutes(0), -1);
        assert_eq!(encode_relative_validity_minutes(4), -1);
        // Fractions of a unit floor
        assert_eq!(encode_relative_validity_minutes(104), 19);
    }

    #[test]
    fn half_hour_day_and_week_bands() {
        assert_eq!(encode_relative_validity_minutes(721), 143);
        assert_eq!(encode_relative_validity_minutes(750), 144);
        assert_eq!(encode_relative_validity_minutes(1440), 167);
        assert_eq!(encode_relative_validity_minutes(1441), 167);
        assert_eq!(encode_relative_validity_minutes(2 * 1440), 168);
        assert_eq!(encode_relative_validity_minutes(43200), 196);
        assert_eq!(encode_relative_validity_minutes(5 * 10080), 197);
        assert_eq!(encode_relative_validity_minutes(635040), 255);
        assert_eq!(encode_relative_validity_minutes(635041), -1);
        assert_eq!(encode_relative_validity_minutes(i32::MAX), -1);
    }

    #[test]
    fn encoder_is_total() {
        for minutes in (-2000..700_000).step_by(7) {
            let vp = encode_relative_validity_minutes(minutes);
            assert!(vp == -1 || (0..=255).contains(&vp), "{minutes} -> {vp}");
        }
    }

    #[test]
    fn every_octet_decodes_to_minutes_that_encode_back() {
        for octet in 0..=255u8 {
            let vp = RelativeValidity::from_octet(octet);
            assert_eq!(RelativeValidity::from_minutes(vp.minutes()), Some(vp));
        }
    }
}
