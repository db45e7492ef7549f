// ABOUTME: The dispatcher loop: owns every tracker and reacts to submissions, completions and timers
// ABOUTME: Runs the pre-radio checks in order, sends segments, retries, enforces deadlines and acks status reports

use crate::codec::{CodecError, Encodable};
use crate::datatypes::{GsmAddress, RelativeValidity, SmsResult, SmsStatusReport, SmsSubmit};
use crate::dispatcher::config::DispatcherConfig;
use crate::dispatcher::confirm::{
    ConfirmationKind, ConfirmationReply, ConfirmationRequest, UserPrompt,
};
use crate::dispatcher::looper::{Handler, Looper, Message, Token};
use crate::dispatcher::tracker::{DeliveryWatch, ParentSend, PendingSend, SendState, Stage};
use crate::dispatcher::types::{
    DispatcherStatistics, OutboundSms, Payload, SendId, SendSinks, SentReport,
};
use crate::ims::ImsGate;
use crate::inbound::InboundStatusHandler;
use crate::policy::{
    BlockedNumberNotifier, CountryDetector, EmergencyPolicyContext, PremiumSmsPermission,
    PropertySource, SmsUsageMonitor,
};
use crate::radio::{RadioInterface, SendCompletion, SendOutcome, ServiceState, SubmitPdu};
use crate::segment::{self, SubmitTemplate};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

/// External components the loop talks to
pub(crate) struct Collaborators {
    pub radio: Arc<dyn RadioInterface>,
    pub ims: Arc<dyn ImsGate>,
    pub prompt: Arc<dyn UserPrompt>,
    pub country_detector: Arc<dyn CountryDetector>,
    pub properties: Arc<dyn PropertySource>,
    pub notifier: BlockedNumberNotifier,
}

pub(crate) struct Engine {
    config: DispatcherConfig,
    deps: Collaborators,
    handler: Handler,
    looper: Looper,
    inbound: InboundStatusHandler,
    usage: SmsUsageMonitor,
    parents: HashMap<SendId, ParentSend>,
    segments: HashMap<Token, PendingSend>,
    deliveries: HashMap<SendId, DeliveryWatch>,
    delivery_refs: HashMap<u8, SendId>,
    concat_refs: HashMap<String, u8>,
    next_token: u64,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

fn sent_report(sms: &OutboundSms, result: SmsResult, message_ref: Option<u8>) -> SentReport {
    SentReport {
        send_id: sms.id,
        result,
        message_ref,
        message_id: sms.options.message_id,
        message_uri: sms.options.message_uri.clone(),
        persist: sms.options.persist,
    }
}

/// Segments the payload will be sent as
fn message_count(payload: &Payload) -> usize {
    match payload {
        Payload::Text(text) => segment::divide_message(text).len().max(1),
        Payload::MultipartText(parts) => parts.len(),
        Payload::Data { .. } => 1,
    }
}

/// Build every SMS-SUBMIT for a send
fn build_submits(sms: &OutboundSms, concat_ref: u8) -> Result<Vec<SmsSubmit>, CodecError> {
    let template = SubmitTemplate {
        destination: GsmAddress::parse(&sms.destination)?,
        status_report_request: sms.status_report_requested,
        validity: sms
            .options
            .validity_minutes
            .and_then(RelativeValidity::from_minutes),
    };

    match &sms.payload {
        Payload::Text(text) => {
            let parts = segment::divide_message(text);
            segment::text_submits(&template, &parts, concat_ref)
        }
        Payload::MultipartText(parts) => segment::text_submits(&template, parts, concat_ref),
        Payload::Data { dest_port, data } => {
            Ok(vec![segment::data_submit(&template, *dest_port, data)?])
        }
    }
}

/// Encode every segment into a radio command, or fail as a whole
fn build_pdus(sms: &OutboundSms, concat_ref: u8) -> Result<Vec<(SmsSubmit, SubmitPdu)>, CodecError> {
    // A blank service centre means the modem default, same as none
    let encoded_sc_address = match sms.service_centre.as_deref().map(str::trim) {
        Some(sc) if !sc.is_empty() => Some(GsmAddress::parse(sc)?.encode_service_centre()),
        _ => None,
    };

    let submits = build_submits(sms, concat_ref)?;
    let last = submits.len().saturating_sub(1);

    submits
        .into_iter()
        .enumerate()
        .map(|(index, submit)| {
            let pdu = SubmitPdu {
                sc_address: sms.service_centre.clone(),
                encoded_sc_address: encoded_sc_address.clone(),
                tpdu: submit.to_bytes()?,
                priority: sms.options.priority,
                expect_more: index < last || sms.options.expect_more,
            };
            Ok((submit, pdu))
        })
        .collect()
}

impl Engine {
    pub(crate) fn new(
        config: DispatcherConfig,
        deps: Collaborators,
        handler: Handler,
        looper: Looper,
    ) -> Self {
        let mut usage = SmsUsageMonitor::new(config.usage_limits, config.short_codes.clone());
        for (package, permission) in &config.premium_permissions {
            usage.set_premium_permission(package.clone(), *permission);
        }

        Self {
            config,
            deps,
            handler,
            looper,
            inbound: InboundStatusHandler::new(),
            usage,
            parents: HashMap::new(),
            segments: HashMap::new(),
            deliveries: HashMap::new(),
            delivery_refs: HashMap::new(),
            concat_refs: HashMap::new(),
            next_token: 0,
            idle_waiters: Vec::new(),
        }
    }

    /// Drain the loop until shutdown
    pub(crate) async fn run(mut self) {
        info!(sub_id = self.config.sub_id, "SMS dispatcher started");

        while let Some(message) = self.looper.next().await {
            trace!(?message, "Dispatching");
            match message {
                Message::Shutdown(ack) => {
                    self.shutdown();
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                    break;
                }
                message => self.handle(message),
            }
            self.release_idle_waiters();
        }

        info!(sub_id = self.config.sub_id, "SMS dispatcher stopped");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Submit(sms, sinks) => self.on_submit(*sms, sinks),
            Message::SendComplete { token, outcome } => self.on_send_complete(token, outcome),
            Message::Retry { token } => self.on_retry(token),
            Message::ConfirmReply { send, kind, allow } => self.on_confirm_reply(send, kind, allow),
            Message::Deadline { send } => self.on_deadline(send),
            Message::NewSmsStatus(pdu) => self.on_sms_status(pdu),
            Message::Sync(reply) => self.idle_waiters.push(reply),
            Message::Statistics(reply) => {
                let _ = reply.send(self.statistics());
            }
            Message::Shutdown(_) => {}
        }
    }

    fn statistics(&self) -> DispatcherStatistics {
        DispatcherStatistics {
            pending_sends: self.parents.len(),
            tracked_deliveries: self.deliveries.len(),
            usage: self.usage.statistics().clone(),
            status_reports: self.inbound.statistics(),
        }
    }

    fn is_idle(&self) -> bool {
        self.parents.is_empty() && self.looper.is_drained()
    }

    fn release_idle_waiters(&mut self) {
        if self.idle_waiters.is_empty() || !self.is_idle() {
            return;
        }
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    /// Next concatenation reference for a package, never repeating back to back
    fn next_concat_ref(&mut self, package: &str) -> u8 {
        let reference = self.concat_refs.entry(package.to_string()).or_insert(0);
        *reference = reference.wrapping_add(1);
        *reference
    }

    fn on_submit(&mut self, sms: OutboundSms, sinks: SendSinks) {
        let id = sms.id;
        let count = message_count(&sms.payload);

        let policy = EmergencyPolicyContext::resolve(
            self.deps.country_detector.as_ref(),
            self.deps.properties.as_ref(),
        );
        let emergency = policy.is_emergency_number(&sms.destination);
        if emergency {
            info!(send = %id, "Emergency number messaged, notifying blocked number provider");
            self.deps.notifier.notify_emergency_contact();
        }

        let fdn_permits = emergency || self.config.fixed_dialing.permits(&sms.destination);

        debug!(
            send = %id,
            segments = count,
            package = %sms.options.calling_package,
            "Accepted outbound SMS"
        );

        let mut parent = ParentSend::new(sms, sinks, count);
        parent.country = policy.country_iso().map(String::from);
        parent.emergency = emergency;
        parent.deadline = Some(
            self.handler
                .post_delayed(Message::Deadline { send: id }, self.config.send_timeout),
        );
        self.parents.insert(id, parent);

        if !fdn_permits {
            warn!(send = %id, "Destination not on the fixed dialing list");
            self.finish(id, SmsResult::FdnCheckFailure);
            return;
        }

        self.advance(id, Stage::ShortCode);
    }

    /// Run the remaining pre-radio checks starting at `stage`
    fn advance(&mut self, id: SendId, stage: Stage) {
        let Some(parent) = self.parents.get(&id) else {
            return;
        };
        let package = parent.sms.options.calling_package.clone();
        let count = parent.message_count;
        let exempt = parent.emergency;

        if stage <= Stage::ShortCode && !exempt {
            let category = self
                .usage
                .check_destination(parent.country.as_deref(), &parent.sms.destination);
            if category.is_premium() {
                match self.usage.premium_permission(&package) {
                    PremiumSmsPermission::NeverAllow => {
                        warn!(send = %id, %package, "Premium short code sending never allowed");
                        self.finish(id, SmsResult::ShortCodeNeverAllowed);
                        return;
                    }
                    PremiumSmsPermission::Ask => {
                        self.request_confirmation(id, ConfirmationKind::PremiumShortCode);
                        return;
                    }
                    PremiumSmsPermission::AlwaysAllow => {}
                }
            }
        }

        if stage <= Stage::Quota && !exempt && !self.usage.check(&package, count) {
            info!(send = %id, %package, "Sending quota exceeded, asking user");
            self.request_confirmation(id, ConfirmationKind::RateLimitExceeded);
            return;
        }

        self.dispatch(id);
    }

    fn request_confirmation(&mut self, id: SendId, kind: ConfirmationKind) {
        let Some(parent) = self.parents.get_mut(&id) else {
            return;
        };
        parent.transition(SendState::AwaitingUserConfirm(kind));

        let request = ConfirmationRequest {
            send_id: id,
            kind,
            calling_package: parent.sms.options.calling_package.clone(),
            destination: parent.sms.destination.clone(),
            message_count: parent.message_count,
        };
        let reply = ConfirmationReply::new(id, kind, self.handler.clone());
        self.deps.prompt.request_confirmation(request, reply);
    }

    fn on_confirm_reply(&mut self, id: SendId, kind: ConfirmationKind, allow: bool) {
        let Some(parent) = self.parents.get_mut(&id) else {
            debug!(send = %id, "Ignoring confirmation for finished send");
            return;
        };
        if !parent.awaiting(kind) {
            debug!(send = %id, ?kind, "Ignoring unexpected confirmation");
            return;
        }

        if !allow {
            let result = match kind {
                ConfirmationKind::PremiumShortCode => SmsResult::ShortCodeNotAllowed,
                ConfirmationKind::RateLimitExceeded => SmsResult::LimitExceeded,
            };
            info!(send = %id, ?kind, "User declined send");
            self.finish(id, result);
            return;
        }

        parent.transition(SendState::Queued);
        if kind == ConfirmationKind::RateLimitExceeded {
            let package = parent.sms.options.calling_package.clone();
            let count = parent.message_count;
            self.usage.record(&package, count);
        }
        self.advance(id, Stage::after(kind));
    }

    /// IMS gate, service state, encoding, then the radio
    fn dispatch(&mut self, id: SendId) {
        let Some(parent) = self.parents.get(&id) else {
            return;
        };

        if self.deps.ims.will_handle(&parent.sms) {
            if let Some(mut parent) = self.parents.remove(&id) {
                if let Some(deadline) = parent.deadline.take() {
                    deadline.abort();
                }
                info!(send = %id, "Send handed off to IMS");
                self.deps.ims.hand_off(parent.sms, parent.sinks);
            }
            return;
        }

        let refusal = match self.deps.radio.service_state() {
            ServiceState::InService => None,
            ServiceState::EmergencyOnly if parent.emergency => None,
            ServiceState::EmergencyOnly | ServiceState::OutOfService => Some(SmsResult::NoService),
            ServiceState::PowerOff => Some(SmsResult::RadioOff),
        };
        if let Some(result) = refusal {
            warn!(send = %id, ?result, "Radio cannot send");
            self.finish(id, result);
            return;
        }

        let package = parent.sms.options.calling_package.clone();
        let concat_ref = if parent.message_count > 1 {
            self.next_concat_ref(&package)
        } else {
            0
        };

        let Some(parent) = self.parents.get_mut(&id) else {
            return;
        };
        let pdus = match build_pdus(&parent.sms, concat_ref) {
            Ok(pdus) => pdus,
            Err(e) => {
                warn!(send = %id, error = %e, "Failed to encode SMS");
                self.finish(id, SmsResult::NullPdu);
                return;
            }
        };

        if let Some(sink) = parent.sinks.take_delivered() {
            let watch = DeliveryWatch::new(id, parent.sms.options.message_id, pdus.len(), sink);
            self.deliveries.insert(id, watch);
        }
        parent.transition(SendState::InFlight);

        let mut tokens = Vec::with_capacity(pdus.len());
        for (index, (submit, pdu)) in pdus.into_iter().enumerate() {
            self.next_token += 1;
            let token = Token(self.next_token);
            self.segments
                .insert(token, PendingSend::new(id, index, submit, pdu));
            tokens.push(token);
        }
        parent.segments = tokens.clone();

        for token in tokens {
            self.issue(token);
        }
    }

    fn issue(&mut self, token: Token) {
        let Some(segment) = self.segments.get_mut(&token) else {
            return;
        };
        segment.attempts += 1;
        segment.state = SendState::InFlight;
        segment.retry_timer = None;

        debug!(
            send = %segment.parent,
            segment = segment.index,
            attempt = segment.attempts,
            "Sending SMS segment"
        );
        let pdu = segment.pdu.clone();
        self.deps
            .radio
            .send_sms(pdu, SendCompletion::new(token, self.handler.clone()));
    }

    fn on_send_complete(&mut self, token: Token, outcome: SendOutcome) {
        let Some(segment) = self.segments.get_mut(&token) else {
            debug!(?token, "Ignoring completion for finished send");
            return;
        };
        if segment.state != SendState::InFlight {
            debug!(?token, state = ?segment.state, "Ignoring duplicate completion");
            return;
        }
        let id = segment.parent;

        match outcome {
            Ok(ack) => {
                segment.state = SendState::Complete;
                segment.message_ref = Some(ack.message_ref);

                if let Some(watch) = self.deliveries.get_mut(&id) {
                    watch.register(ack.message_ref);
                    if let Some(previous) = self.delivery_refs.insert(ack.message_ref, id) {
                        if previous != id {
                            // The older send can no longer see its report
                            warn!(
                                send = %previous,
                                reused_by = %id,
                                message_ref = ack.message_ref,
                                "Message reference reassigned, dropping delivery tracking"
                            );
                            self.drop_delivery(previous);
                        }
                    }
                }

                let Some(parent) = self.parents.get_mut(&id) else {
                    return;
                };
                parent.completed += 1;
                parent.last_message_ref = Some(ack.message_ref);
                if parent.all_segments_complete() {
                    self.finish(id, SmsResult::Ok);
                }
            }
            Err(failure) => {
                if failure.message_ref.is_some() {
                    segment.message_ref = failure.message_ref;
                }

                let retry = failure.failure.is_retryable()
                    && self.config.retry.allows_another(segment.attempts);
                if !retry {
                    segment.state = SendState::Failed;
                    warn!(
                        send = %id,
                        segment = segment.index,
                        attempts = segment.attempts,
                        failure = ?failure.failure,
                        "SMS segment failed"
                    );
                    self.finish(id, SmsResult::from(failure.failure));
                    return;
                }

                // Resends ask the service centre to drop duplicates of the last attempt
                segment.submit.reject_duplicates = true;
                if let Some(message_ref) = segment.message_ref {
                    segment.submit.message_reference = message_ref;
                }
                match segment.submit.to_bytes() {
                    Ok(tpdu) => segment.pdu.tpdu = tpdu,
                    Err(e) => {
                        warn!(send = %id, error = %e, "Failed to re-encode SMS for retry");
                        segment.state = SendState::Failed;
                        self.finish(id, SmsResult::GenericFailure);
                        return;
                    }
                }

                segment.state = SendState::Queued;
                let delay = self.config.retry.delay_before_attempt(segment.attempts + 1);
                info!(
                    send = %id,
                    segment = segment.index,
                    failure = ?failure.failure,
                    ?delay,
                    "Retrying SMS segment"
                );
                if delay.is_zero() {
                    let _ = self.handler.post(Message::Retry { token });
                } else {
                    segment.retry_timer =
                        Some(self.handler.post_delayed(Message::Retry { token }, delay));
                }
            }
        }
    }

    fn on_retry(&mut self, token: Token) {
        match self.segments.get(&token) {
            Some(segment) if segment.state == SendState::Queued => self.issue(token),
            _ => debug!(?token, "Ignoring retry for finished send"),
        }
    }

    fn on_deadline(&mut self, id: SendId) {
        if self.parents.contains_key(&id) {
            warn!(send = %id, "Send timed out");
            self.finish(id, SmsResult::Timeout);
        }
    }

    fn on_sms_status(&mut self, pdu: Bytes) {
        let verdict = self.inbound.process(&pdu);
        self.deps
            .radio
            .acknowledge_last_incoming_sms(verdict.success, verdict.result, None);

        if let Some(report) = verdict.report {
            self.resolve_delivery(&report);
        }
    }

    fn resolve_delivery(&mut self, report: &SmsStatusReport) {
        let message_ref = report.message_reference;
        let Some(&id) = self.delivery_refs.get(&message_ref) else {
            debug!(message_ref, "Status report matches no pending delivery");
            return;
        };
        let Some(watch) = self.deliveries.get_mut(&id) else {
            self.delivery_refs.remove(&message_ref);
            return;
        };

        let finished = watch.on_status(message_ref, report.status);
        if report.status.is_final() {
            self.delivery_refs.remove(&message_ref);
        }
        if finished {
            info!(send = %id, status = ?report.status, "Delivery resolved");
            self.drop_delivery(id);
        }
    }

    fn drop_delivery(&mut self, id: SendId) {
        if let Some(watch) = self.deliveries.remove(&id) {
            for message_ref in watch.refs() {
                if self.delivery_refs.get(&message_ref) == Some(&id) {
                    self.delivery_refs.remove(&message_ref);
                }
            }
        }
    }

    /// Move a send to its terminal state and signal its sent sink once
    fn finish(&mut self, id: SendId, result: SmsResult) {
        let Some(mut parent) = self.parents.remove(&id) else {
            return;
        };
        let terminal = if result.is_success() {
            SendState::Complete
        } else {
            SendState::Failed
        };
        if !parent.transition(terminal) {
            return;
        }

        if let Some(deadline) = parent.deadline.take() {
            deadline.abort();
        }
        for token in &parent.segments {
            if let Some(timer) = self
                .segments
                .remove(token)
                .and_then(|segment| segment.retry_timer)
            {
                timer.abort();
            }
        }
        if !result.is_success() {
            self.drop_delivery(id);
        }

        if result.is_success() {
            info!(send = %id, segments = parent.segments.len(), "SMS sent");
        } else {
            info!(send = %id, ?result, "SMS send failed");
        }

        let report = sent_report(&parent.sms, result, parent.last_message_ref);
        parent.sinks.signal_sent(report);
    }

    fn shutdown(&mut self) {
        let pending: Vec<SendId> = self.parents.keys().copied().collect();
        if !pending.is_empty() {
            warn!(count = pending.len(), "Failing pending sends on shutdown");
        }
        for id in pending {
            self.finish(id, SmsResult::GenericFailure);
        }
        self.deliveries.clear();
        self.delivery_refs.clear();

        self.looper.close();
        while let Some(message) = self.looper.try_next() {
            match message {
                Message::Submit(sms, mut sinks) => {
                    sinks.signal_sent(sent_report(&sms, SmsResult::GenericFailure, None));
                }
                Message::NewSmsStatus(pdu) => {
                    let verdict = self.inbound.process(&pdu);
                    self.deps
                        .radio
                        .acknowledge_last_incoming_sms(verdict.success, verdict.result, None);
                }
                Message::Sync(reply) => self.idle_waiters.push(reply),
                Message::Shutdown(Some(ack)) => {
                    let _ = ack.send(());
                }
                _ => {}
            }
        }

        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }
}
