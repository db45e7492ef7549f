// ABOUTME: Bookkeeping for sends in progress: the parent send, its segments and delivery watches
// ABOUTME: Terminal states are sticky so late completions, retries and timeouts are ignored

use crate::datatypes::{SmsSubmit, TpStatus};
use crate::dispatcher::confirm::ConfirmationKind;
use crate::dispatcher::looper::Token;
use crate::dispatcher::types::{
    DeliveryReport, DeliveryStatus, OutboundSms, SendId, SendSinks,
};
use crate::radio::SubmitPdu;
use std::collections::HashSet;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Queued,
    AwaitingUserConfirm(ConfirmationKind),
    InFlight,
    Complete,
    Failed,
}

impl SendState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SendState::Complete | SendState::Failed)
    }
}

/// Where the pre-radio checks resume after a prompt is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Stage {
    ShortCode,
    Quota,
    Ims,
}

impl Stage {
    /// The stage that follows an allowed prompt of this kind
    pub(crate) fn after(kind: ConfirmationKind) -> Stage {
        match kind {
            ConfirmationKind::PremiumShortCode => Stage::Quota,
            ConfirmationKind::RateLimitExceeded => Stage::Ims,
        }
    }
}

/// One accepted send and the sinks it must signal
pub(crate) struct ParentSend {
    pub sms: OutboundSms,
    pub sinks: SendSinks,
    pub state: SendState,
    pub country: Option<String>,
    pub emergency: bool,
    /// Segments the payload divides into
    pub message_count: usize,
    pub segments: Vec<Token>,
    pub completed: usize,
    pub last_message_ref: Option<u8>,
    pub deadline: Option<JoinHandle<()>>,
}

impl ParentSend {
    pub fn new(sms: OutboundSms, sinks: SendSinks, message_count: usize) -> Self {
        Self {
            sms,
            sinks,
            state: SendState::Queued,
            country: None,
            emergency: false,
            message_count,
            segments: Vec::new(),
            completed: 0,
            last_message_ref: None,
            deadline: None,
        }
    }

    /// Move to `next` unless already terminal; returns whether it moved
    pub fn transition(&mut self, next: SendState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = next;
        true
    }

    pub fn awaiting(&self, kind: ConfirmationKind) -> bool {
        self.state == SendState::AwaitingUserConfirm(kind)
    }

    pub fn all_segments_complete(&self) -> bool {
        !self.segments.is_empty() && self.completed == self.segments.len()
    }
}

/// One SMS-SUBMIT on its way through the radio
pub(crate) struct PendingSend {
    pub parent: SendId,
    pub index: usize,
    pub submit: SmsSubmit,
    pub pdu: SubmitPdu,
    pub attempts: u32,
    pub message_ref: Option<u8>,
    pub state: SendState,
    pub retry_timer: Option<JoinHandle<()>>,
}

impl PendingSend {
    pub fn new(parent: SendId, index: usize, submit: SmsSubmit, pdu: SubmitPdu) -> Self {
        Self {
            parent,
            index,
            submit,
            pdu,
            attempts: 0,
            message_ref: None,
            state: SendState::Queued,
            retry_timer: None,
        }
    }
}

/// Waits for status reports covering every segment of a completed send
pub(crate) struct DeliveryWatch {
    pub send_id: SendId,
    pub message_id: Option<u64>,
    expected: usize,
    pending: HashSet<u8>,
    delivered: usize,
    sink: Option<oneshot::Sender<DeliveryReport>>,
}

impl DeliveryWatch {
    pub fn new(
        send_id: SendId,
        message_id: Option<u64>,
        expected: usize,
        sink: oneshot::Sender<DeliveryReport>,
    ) -> Self {
        Self {
            send_id,
            message_id,
            expected,
            pending: HashSet::new(),
            delivered: 0,
            sink: Some(sink),
        }
    }

    pub fn register(&mut self, message_ref: u8) {
        self.pending.insert(message_ref);
    }

    pub fn refs(&self) -> impl Iterator<Item = u8> + '_ {
        self.pending.iter().copied()
    }

    /// Apply a status report; returns true once the watch is finished
    pub fn on_status(&mut self, message_ref: u8, status: TpStatus) -> bool {
        if !self.pending.contains(&message_ref) || status.is_temporary() {
            return false;
        }

        if status.is_success() {
            self.pending.remove(&message_ref);
            self.delivered += 1;
            if self.delivered == self.expected {
                self.signal(DeliveryStatus::Delivered);
                return true;
            }
            false
        } else {
            self.signal(DeliveryStatus::Failed(status));
            true
        }
    }

    fn signal(&mut self, status: DeliveryStatus) {
        if let Some(sink) = self.sink.take() {
            let _ = sink.send(DeliveryReport {
                send_id: self.send_id,
                status,
                message_id: self.message_id,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_waits_for_every_segment() {
        let (tx, mut rx) = oneshot::channel();
        let mut watch = DeliveryWatch::new(SendId(1), Some(9), 2, tx);
        watch.register(10);
        watch.register(11);

        assert!(!watch.on_status(10, TpStatus(0x00)));
        assert!(rx.try_recv().is_err());
        // Still trying does not count
        assert!(!watch.on_status(11, TpStatus(0x20)));
        assert!(watch.on_status(11, TpStatus(0x00)));

        let report = rx.try_recv().unwrap();
        assert_eq!(report.status, DeliveryStatus::Delivered);
        assert_eq!(report.message_id, Some(9));
    }

    #[test]
    fn first_permanent_failure_finishes() {
        let (tx, mut rx) = oneshot::channel();
        let mut watch = DeliveryWatch::new(SendId(1), None, 2, tx);
        watch.register(10);
        watch.register(11);

        assert!(watch.on_status(11, TpStatus(0x41)));
        assert_eq!(rx.try_recv().unwrap().status, DeliveryStatus::Failed(TpStatus(0x41)));
    }

    #[test]
    fn unknown_reference_is_ignored() {
        let (tx, _rx) = oneshot::channel();
        let mut watch = DeliveryWatch::new(SendId(1), None, 1, tx);
        watch.register(10);
        assert!(!watch.on_status(99, TpStatus(0x00)));
    }

    #[test]
    fn stage_after_prompt() {
        assert_eq!(Stage::after(ConfirmationKind::PremiumShortCode), Stage::Quota);
        assert_eq!(Stage::after(ConfirmationKind::RateLimitExceeded), Stage::Ims);
    }
}
