// ABOUTME: Message priority levels attached to outgoing radio commands
// ABOUTME: Negative caller values mean "unspecified" and produce no priority at all

use num_enum::TryFromPrimitive;

/// Priority requested by the sending application
///
/// GSM SMS-SUBMIT has no priority field of its own; the level travels with
/// the radio command so modems that support prioritised submission can use
/// it. A send without a priority carries nothing.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Normal handling (default)
    Normal = 0,
    /// Interactive traffic
    Interactive = 1,
    /// Urgent traffic
    Urgent = 2,
    /// Emergency traffic
    Emergency = 3,
}

impl Priority {
    /// Interpret a raw caller value: negative or unknown values are unspecified
    pub fn from_raw(value: i32) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .and_then(|v| Priority::try_from(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_is_unspecified() {
        assert_eq!(Priority::from_raw(-1), None);
        assert_eq!(Priority::from_raw(i32::MIN), None);
    }

    #[test]
    fn known_levels() {
        assert_eq!(Priority::from_raw(0), Some(Priority::Normal));
        assert_eq!(Priority::from_raw(3), Some(Priority::Emergency));
        assert_eq!(Priority::from_raw(4), None);
    }
}
