// ABOUTME: Verdicts for status reports pushed up by the modem
// ABOUTME: Every notification gets exactly one acknowledgement; only empty input is refused

use crate::datatypes::{AckResult, SmsStatusReport};
use tracing::{debug, warn};

/// How to acknowledge one status notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusVerdict {
    pub success: bool,
    pub result: AckResult,
    /// Decoded report, when the octets could be read
    pub report: Option<SmsStatusReport>,
}

/// Counters for status notifications seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusReportStatistics {
    /// Notifications acknowledged as handled
    pub handled: u64,
    /// Handled notifications whose contents could not be decoded
    pub undecodable: u64,
    /// Notifications acknowledged with an error
    pub rejected: u64,
}

impl StatusVerdict {
    fn handled(report: Option<SmsStatusReport>) -> Self {
        Self {
            success: true,
            result: AckResult::SmsHandled,
            report,
        }
    }

    fn rejected() -> Self {
        Self {
            success: false,
            result: AckResult::GenericError,
            report: None,
        }
    }
}

/// Decides the acknowledgement for incoming status reports
///
/// A non-empty report that cannot be decoded is still acknowledged as
/// handled; it just matches no pending send.
#[derive(Debug, Default)]
pub struct InboundStatusHandler {
    handled: u64,
    undecodable: u64,
    rejected: u64,
}

impl InboundStatusHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, pdu: &[u8]) -> StatusVerdict {
        if pdu.is_empty() {
            self.rejected += 1;
            warn!("Empty status report from modem");
            return StatusVerdict::rejected();
        }

        self.handled += 1;
        match SmsStatusReport::decode_from_modem(pdu) {
            Ok(report) => {
                debug!(
                    message_ref = report.message_reference,
                    status = ?report.status,
                    "Status report received"
                );
                StatusVerdict::handled(Some(report))
            }
            Err(e) => {
                self.undecodable += 1;
                debug!(error = %e, len = pdu.len(), "Status report could not be decoded");
                StatusVerdict::handled(None)
            }
        }
    }

    pub fn statistics(&self) -> StatusReportStatistics {
        StatusReportStatistics {
            handled: self.handled,
            undecodable: self.undecodable,
            rejected: self.rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_still_handled() {
        let mut handler = InboundStatusHandler::new();
        let verdict = handler.process(&[0xFF, 0xFF, 0xFF]);
        assert!(verdict.success);
        assert_eq!(verdict.result, AckResult::SmsHandled);
        assert_eq!(verdict.report, None);
        assert_eq!(handler.statistics().undecodable, 1);
    }

    #[test]
    fn empty_is_rejected() {
        let mut handler = InboundStatusHandler::new();
        let verdict = handler.process(&[]);
        assert!(!verdict.success);
        assert_eq!(verdict.result, AckResult::GenericError);
        let stats = handler.statistics();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.handled, 0);
    }

    #[test]
    fn valid_report_is_decoded() {
        let octets = [
            0x00, 0x06, 0x05, 0x03, 0x81, 0x19, 0xF1, 0x21, 0x01, 0x31, 0x21, 0x43, 0x65, 0x00,
            0x21, 0x01, 0x31, 0x21, 0x43, 0x65, 0x00, 0x00,
        ];
        let mut handler = InboundStatusHandler::new();
        let verdict = handler.process(&octets);
        assert!(verdict.success);
        let report = verdict.report.unwrap();
        assert_eq!(report.message_reference, 5);
        assert_eq!(report.recipient.digits(), "911");
    }
}
