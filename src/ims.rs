// ABOUTME: IMS preemption gate: an IMS stack may take over a send instead of the GSM radio path
// ABOUTME: Consulted exactly once per accepted send; a claimed send is no longer tracked here

use crate::dispatcher::{OutboundSms, SendSinks};

/// Hook for an IMS dispatcher that can carry SMS over IMS
pub trait ImsGate: Send + Sync {
    /// Whether the IMS path will carry this send
    fn will_handle(&self, sms: &OutboundSms) -> bool;

    /// Take sole responsibility for the send and its sinks
    fn hand_off(&self, sms: OutboundSms, sinks: SendSinks);
}

/// Gate for devices without IMS; never claims a send
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImsGate;

impl ImsGate for NoImsGate {
    fn will_handle(&self, _sms: &OutboundSms) -> bool {
        false
    }

    fn hand_off(&self, _sms: OutboundSms, _sinks: SendSinks) {}
}
