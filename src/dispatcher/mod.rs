// ABOUTME: Public face of the outbound SMS dispatcher: validate, assign an id, hand to the loop
// ABOUTME: Results arrive later through the sinks supplied with each send

mod builder;
mod config;
mod confirm;
mod engine;
mod error;
pub(crate) mod looper;
mod tracker;
mod types;

pub use builder::DispatcherBuilder;
pub use config::{DispatcherConfig, RetryPolicy};
pub use confirm::{
    ConfirmationKind, ConfirmationReply, ConfirmationRequest, DenyAllPrompt, UserPrompt,
};
pub use error::{DispatchError, DispatchResult};
pub use tracker::SendState;
pub use types::{
    DeliveryReport, DeliveryStatus, DispatcherStatistics, OutboundSms, Payload, SendId,
    SendOptions, SendSinks, SentReport,
};

use crate::policy::BlockedNumberNotifier;
use crate::segment;
use bytes::Bytes;
use looper::{Handler, Message};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

/// GSM SMS dispatcher for one subscription
///
/// Every send is validated synchronously, then runs on the dispatcher loop.
/// Each accepted send signals its sent sink exactly once.
///
/// ```rust,no_run
/// use gsm_sms::dispatcher::{DispatcherBuilder, SendOptions, SendSinks};
/// # use gsm_sms::radio::RadioInterface;
/// # use std::sync::Arc;
/// # async fn example(radio: Arc<dyn RadioInterface>) -> Result<(), Box<dyn std::error::Error>> {
/// let dispatcher = DispatcherBuilder::new(radio).build();
///
/// let (sinks, sent) = SendSinks::sent();
/// dispatcher.send_text("6501002000", None, "test sms", sinks, SendOptions::default())?;
///
/// let report = sent.await?;
/// println!("{:?}", report.result);
/// # Ok(())
/// # }
/// ```
pub struct GsmSmsDispatcher {
    handler: Handler,
    notifier: BlockedNumberNotifier,
    next_id: AtomicU64,
    task: JoinHandle<()>,
}

impl GsmSmsDispatcher {
    pub(crate) fn new(
        handler: Handler,
        notifier: BlockedNumberNotifier,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            handler,
            notifier,
            next_id: AtomicU64::new(1),
            task,
        }
    }

    /// Send text, dividing it into segments as needed
    pub fn send_text(
        &self,
        destination: &str,
        service_centre: Option<&str>,
        text: &str,
        sinks: SendSinks,
        options: SendOptions,
    ) -> DispatchResult<SendId> {
        if text.is_empty() {
            return Err(DispatchError::InvalidArguments("message body is empty".into()));
        }
        self.submit(
            destination,
            service_centre,
            Payload::Text(text.to_string()),
            sinks,
            options,
        )
    }

    /// Send text already divided into parts, one segment per part
    pub fn send_multipart_text(
        &self,
        destination: &str,
        service_centre: Option<&str>,
        parts: Vec<String>,
        sinks: SendSinks,
        options: SendOptions,
    ) -> DispatchResult<SendId> {
        let payload = Payload::MultipartText(parts);
        if payload.is_empty() {
            return Err(DispatchError::InvalidArguments("no message parts".into()));
        }
        self.submit(destination, service_centre, payload, sinks, options)
    }

    /// Send binary data to an application port
    pub fn send_data(
        &self,
        destination: &str,
        service_centre: Option<&str>,
        dest_port: u16,
        data: &[u8],
        sinks: SendSinks,
        options: SendOptions,
    ) -> DispatchResult<SendId> {
        if data.is_empty() {
            return Err(DispatchError::InvalidArguments("data is empty".into()));
        }
        let payload = Payload::Data {
            dest_port,
            data: Bytes::copy_from_slice(data),
        };
        self.submit(destination, service_centre, payload, sinks, options)
    }

    /// Split text into the parts it would be sent as
    pub fn divide_message(&self, text: &str) -> Vec<String> {
        segment::divide_message(text)
    }

    fn submit(
        &self,
        destination: &str,
        service_centre: Option<&str>,
        payload: Payload,
        sinks: SendSinks,
        options: SendOptions,
    ) -> DispatchResult<SendId> {
        if destination.trim().is_empty() {
            return Err(DispatchError::InvalidArguments(
                "destination address is empty".into(),
            ));
        }

        let id = SendId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let sms = OutboundSms {
            id,
            destination: destination.to_string(),
            service_centre: service_centre.map(String::from),
            payload,
            status_report_requested: sinks.wants_delivery_report(),
            options,
        };

        debug!(send = %id, "Submitting SMS");
        self.handler.post(Message::Submit(Box::new(sms), sinks))?;
        Ok(id)
    }

    /// Resolve once no send is outstanding, the loop is drained and no
    /// blocked-number notification is running
    pub async fn wait_idle(&self) {
        let (tx, rx) = oneshot::channel();
        if self.handler.post(Message::Sync(tx)).is_ok() {
            // A stopped loop drops the sender, which also means idle
            let _ = rx.await;
        }
        self.notifier.wait_idle().await;
    }

    /// Stop the loop; sends still pending fail with `GenericFailure`
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.handler.post(Message::Shutdown(Some(tx))).is_ok() {
            let _ = rx.await;
        }
    }

    /// Counters for sends, quota checks and status reports
    pub async fn statistics(&self) -> DispatchResult<DispatcherStatistics> {
        let (tx, rx) = oneshot::channel();
        self.handler.post(Message::Statistics(tx))?;
        rx.await.map_err(|_| DispatchError::Shutdown)
    }

    pub fn is_running(&self) -> bool {
        !self.handler.is_closed() && !self.task.is_finished()
    }
}

impl Drop for GsmSmsDispatcher {
    fn drop(&mut self) {
        let _ = self.handler.post(Message::Shutdown(None));
    }
}

impl std::fmt::Debug for GsmSmsDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GsmSmsDispatcher")
            .field("running", &self.is_running())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}
