// ABOUTME: Interface to the cellular radio: SMS submission, incoming-SMS acknowledgement and status events
// ABOUTME: Completions and status events are posted back onto the dispatcher loop, never handled inline

use crate::datatypes::{AckResult, Priority, RadioFailure};
use crate::dispatcher::looper::{Handler, Message, Token};
use bytes::Bytes;
use std::fmt;
use tracing::debug;

/// One `send_sms` command
#[derive(Clone, PartialEq, Eq)]
pub struct SubmitPdu {
    /// Service centre exactly as the caller gave it; `None` means modem default
    pub sc_address: Option<String>,
    /// Length-prefixed semi-octet form of `sc_address`
    pub encoded_sc_address: Option<Bytes>,
    /// SMS-SUBMIT TPDU
    pub tpdu: Bytes,
    /// `None` sends no priority at all
    pub priority: Option<Priority>,
    /// More segments or messages follow; the modem may keep the link up
    pub expect_more: bool,
}

impl fmt::Debug for SubmitPdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitPdu")
            .field("sc_address", &self.sc_address)
            .field("tpdu_len", &self.tpdu.len())
            .field("priority", &self.priority)
            .field("expect_more", &self.expect_more)
            .finish()
    }
}

/// Successful submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendAck {
    /// TP-MR the modem used
    pub message_ref: u8,
    /// RP-ACK PDU, when the modem passes it up
    pub ack_pdu: Option<Bytes>,
}

/// Failed submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendFailure {
    pub failure: RadioFailure,
    /// TP-MR the modem used, when it got that far
    pub message_ref: Option<u8>,
}

impl From<RadioFailure> for SendFailure {
    fn from(failure: RadioFailure) -> Self {
        Self {
            failure,
            message_ref: None,
        }
    }
}

pub type SendOutcome = Result<SendAck, SendFailure>;

/// Handle the radio uses to report the outcome of one `send_sms`
///
/// Consumed on completion, so an outcome is reported at most once.
pub struct SendCompletion {
    token: Token,
    handler: Handler,
}

impl SendCompletion {
    pub(crate) fn new(token: Token, handler: Handler) -> Self {
        Self { token, handler }
    }

    pub fn complete(self, outcome: SendOutcome) {
        let token = self.token;
        if self
            .handler
            .post(Message::SendComplete { token, outcome })
            .is_err()
        {
            debug!(?token, "Dropping send completion after shutdown");
        }
    }
}

impl fmt::Debug for SendCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendCompletion")
            .field("token", &self.token)
            .finish()
    }
}

/// Channel through which the radio pushes SMS-STATUS-REPORT octets
#[derive(Clone, Debug)]
pub struct StatusSink {
    handler: Handler,
}

impl StatusSink {
    pub(crate) fn new(handler: Handler) -> Self {
        Self { handler }
    }

    /// Queue a status notification; each one is acknowledged exactly once
    pub fn notify(&self, pdu: Bytes) {
        if self.handler.post(Message::NewSmsStatus(pdu)).is_err() {
            debug!("Dropping status report after shutdown");
        }
    }
}

/// Registration state the radio reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServiceState {
    #[default]
    InService,
    OutOfService,
    /// Only emergency calls and messages are possible
    EmergencyOnly,
    /// Radio is off
    PowerOff,
}

/// Commands the dispatcher issues to the modem
///
/// Implementations must not block: `send_sms` queues the command and
/// reports through the completion later (or immediately).
pub trait RadioInterface: Send + Sync {
    /// Submit one SMS-SUBMIT TPDU
    fn send_sms(&self, pdu: SubmitPdu, completion: SendCompletion);

    /// Acknowledge the most recent incoming SMS or status report
    fn acknowledge_last_incoming_sms(&self, success: bool, result: AckResult, pdu: Option<Bytes>);

    /// Register where incoming status reports go
    fn set_on_sms_status(&self, sink: StatusSink);

    fn service_state(&self) -> ServiceState {
        ServiceState::InService
    }
}
