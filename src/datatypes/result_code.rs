// ABOUTME: Result codes for finished sends, radio failures and status notification acks
// ABOUTME: Radio failures map onto sent results and decide whether a retry is allowed

use num_enum::TryFromPrimitive;

/// Outcome delivered to a sent sink.
///
/// Exactly one of these reaches the sent sink of every accepted send. The
/// numeric values are stable so they can cross process boundaries.
#[derive(TryFromPrimitive)]
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SmsResult {
    /// Accepted by the network
    Ok = 0,

    /// Generic failure, including exhausted retries
    GenericFailure = 1,

    /// Radio is powered off or not available
    RadioOff = 2,

    /// No TPDU could be built for the request
    NullPdu = 3,

    /// Not registered on a network
    NoService = 4,

    /// The originating package exceeded its sending quota and the user declined
    LimitExceeded = 5,

    /// Destination is not on the fixed dialing list
    FdnCheckFailure = 6,

    /// User declined a premium short code send
    ShortCodeNotAllowed = 7,

    /// Premium short code sends are permanently denied for this package
    ShortCodeNeverAllowed = 8,

    /// The send deadline expired before a verdict arrived
    Timeout = 9,
}

impl SmsResult {
    pub fn is_success(&self) -> bool {
        *self == SmsResult::Ok
    }
}

/// Failure kinds the radio reports for a `send_sms` command
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RadioFailure {
    /// Transient modem or network error
    GenericFailure = 1,

    /// The radio cannot currently take commands
    RadioNotAvailable = 2,

    /// The network rejected the submission
    NetworkReject = 3,

    /// The modem asks that the command not be repeated
    NoRetryFailure = 4,
}

impl RadioFailure {
    /// Whether the dispatcher may re-issue the command
    ///
    /// `RadioNotAvailable` is never retried: without a reachability signal a
    /// resend cannot succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RadioFailure::GenericFailure | RadioFailure::NetworkReject
        )
    }
}

impl From<RadioFailure> for SmsResult {
    fn from(failure: RadioFailure) -> Self {
        match failure {
            RadioFailure::RadioNotAvailable => SmsResult::RadioOff,
            RadioFailure::GenericFailure
            | RadioFailure::NetworkReject
            | RadioFailure::NoRetryFailure => SmsResult::GenericFailure,
        }
    }
}

/// Result code carried by `acknowledge_last_incoming_sms`
#[derive(TryFromPrimitive)]
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AckResult {
    /// The message was handled
    SmsHandled = 1,

    /// The message could not be processed
    GenericError = 2,

    /// No storage was available for the message
    OutOfMemory = 3,

    /// The message type is not supported
    Unsupported = 4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_codes_are_wire_stable() {
        assert_eq!(AckResult::SmsHandled as i32, 1);
        assert_eq!(AckResult::GenericError as i32, 2);
        assert_eq!(AckResult::try_from(1), Ok(AckResult::SmsHandled));
        assert!(AckResult::try_from(0).is_err());
    }

    #[test]
    fn retryable_failures() {
        assert!(RadioFailure::GenericFailure.is_retryable());
        assert!(RadioFailure::NetworkReject.is_retryable());
        assert!(!RadioFailure::RadioNotAvailable.is_retryable());
        assert!(!RadioFailure::NoRetryFailure.is_retryable());
    }

    #[test]
    fn radio_failures_map_to_sent_results() {
        assert_eq!(SmsResult::from(RadioFailure::RadioNotAvailable), SmsResult::RadioOff);
        assert_eq!(SmsResult::from(RadioFailure::NetworkReject), SmsResult::GenericFailure);
        assert_eq!(SmsResult::try_from(9), Ok(SmsResult::Timeout));
    }
}
