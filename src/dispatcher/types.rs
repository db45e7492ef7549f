// ABOUTME: Caller-facing types for outbound SMS: payloads, per-send options and result sinks
// ABOUTME: Sinks are one-shot channels so each outcome can be signalled at most once

use crate::datatypes::{Priority, SmsResult, TpStatus};
use crate::inbound::StatusReportStatistics;
use crate::policy::UsageStatistics;
use bytes::Bytes;
use std::fmt;
use tokio::sync::oneshot;

/// Identifier the dispatcher assigns to every accepted send
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SendId(pub u64);

impl fmt::Debug for SendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SendId({})", self.0)
    }
}

impl fmt::Display for SendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What is being sent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Text, divided into segments as needed
    Text(String),
    /// Text the caller already divided; each part becomes one segment
    MultipartText(Vec<String>),
    /// Binary data addressed to an application port
    Data { dest_port: u16, data: Bytes },
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Text(text) => text.is_empty(),
            Payload::MultipartText(parts) => parts.is_empty() || parts.iter().all(String::is_empty),
            Payload::Data { data, .. } => data.is_empty(),
        }
    }
}

/// Per-send options with sensible defaults
///
/// ```rust
/// use gsm_sms::dispatcher::SendOptions;
/// use gsm_sms::datatypes::Priority;
///
/// let options = SendOptions::new()
///     .with_package("com.example.messaging")
///     .with_priority(Priority::Urgent)
///     .with_validity_minutes(100);
/// ```
#[derive(Clone, Debug)]
pub struct SendOptions {
    /// Identity of the sending application, used for quota and premium checks
    pub calling_package: String,
    /// `None` sends no priority with the radio command
    pub priority: Option<Priority>,
    /// Hint that another message follows soon
    pub expect_more: bool,
    /// Requested validity; out-of-range values leave TP-VP out
    pub validity_minutes: Option<i32>,
    /// Caller tag echoed in reports
    pub message_id: Option<u64>,
    /// Caller tag echoed in reports
    pub message_uri: Option<String>,
    /// Whether the caller wants the message kept in its sent box
    pub persist: bool,
    pub sub_id: i32,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            calling_package: String::new(),
            priority: None,
            expect_more: false,
            validity_minutes: None,
            message_id: None,
            message_uri: None,
            persist: true,
            sub_id: 0,
        }
    }
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.calling_package = package.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set priority from a raw value; negative means unspecified
    pub fn with_raw_priority(mut self, priority: i32) -> Self {
        self.priority = Priority::from_raw(priority);
        self
    }

    pub fn with_expect_more(mut self, expect_more: bool) -> Self {
        self.expect_more = expect_more;
        self
    }

    pub fn with_validity_minutes(mut self, minutes: i32) -> Self {
        self.validity_minutes = Some(minutes);
        self
    }

    pub fn with_message_id(mut self, message_id: u64) -> Self {
        self.message_id = Some(message_id);
        self
    }

    pub fn with_message_uri(mut self, uri: impl Into<String>) -> Self {
        self.message_uri = Some(uri.into());
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_sub_id(mut self, sub_id: i32) -> Self {
        self.sub_id = sub_id;
        self
    }
}

/// An accepted outbound message, immutable once submitted
#[derive(Clone, Debug)]
pub struct OutboundSms {
    pub id: SendId,
    pub destination: String,
    /// Passed to the radio exactly as given
    pub service_centre: Option<String>,
    pub payload: Payload,
    /// Set when the caller supplied a delivered sink
    pub status_report_requested: bool,
    pub options: SendOptions,
}

/// Terminal outcome of a send, delivered to the sent sink
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentReport {
    pub send_id: SendId,
    pub result: SmsResult,
    /// Reference the modem assigned to the last completed segment
    pub message_ref: Option<u8>,
    pub message_id: Option<u64>,
    pub message_uri: Option<String>,
    pub persist: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Every segment reached the recipient
    Delivered,
    /// The service centre gave up on a segment
    Failed(TpStatus),
}

/// Outcome of a delivery report, delivered to the delivered sink
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReport {
    pub send_id: SendId,
    pub status: DeliveryStatus,
    pub message_id: Option<u64>,
}

/// One-shot result sinks supplied with a send
#[derive(Debug, Default)]
pub struct SendSinks {
    sent: Option<oneshot::Sender<SentReport>>,
    delivered: Option<oneshot::Sender<DeliveryReport>>,
}

impl SendSinks {
    /// No sinks: the caller does not care about the outcome
    pub fn none() -> Self {
        Self::default()
    }

    /// Sent sink only
    pub fn sent() -> (Self, oneshot::Receiver<SentReport>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sent: Some(tx),
                delivered: None,
            },
            rx,
        )
    }

    /// Sent and delivered sinks; requests a status report from the network
    pub fn sent_and_delivered() -> (
        Self,
        oneshot::Receiver<SentReport>,
        oneshot::Receiver<DeliveryReport>,
    ) {
        let (sent_tx, sent_rx) = oneshot::channel();
        let (delivered_tx, delivered_rx) = oneshot::channel();
        (
            Self {
                sent: Some(sent_tx),
                delivered: Some(delivered_tx),
            },
            sent_rx,
            delivered_rx,
        )
    }

    pub fn from_parts(
        sent: Option<oneshot::Sender<SentReport>>,
        delivered: Option<oneshot::Sender<DeliveryReport>>,
    ) -> Self {
        Self { sent, delivered }
    }

    pub fn wants_delivery_report(&self) -> bool {
        self.delivered.is_some()
    }

    /// Signal the sent sink; later calls do nothing
    pub fn signal_sent(&mut self, report: SentReport) {
        if let Some(sink) = self.sent.take() {
            // Receiver may be gone, which is fine
            let _ = sink.send(report);
        }
    }

    /// Detach the delivered sink so it can outlive the send record
    pub fn take_delivered(&mut self) -> Option<oneshot::Sender<DeliveryReport>> {
        self.delivered.take()
    }
}

/// Snapshot of dispatcher counters, taken on the loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherStatistics {
    /// Sends accepted but not yet finished
    pub pending_sends: usize,
    /// Sends still waiting for a delivery report
    pub tracked_deliveries: usize,
    pub usage: UsageStatistics,
    pub status_reports: StatusReportStatistics,
}
