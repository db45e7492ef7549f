// ABOUTME: Message loop plumbing: every event the dispatcher reacts to is a message on one channel
// ABOUTME: Handlers post immediately or after a delay; a single task drains the queue and owns all state

use crate::dispatcher::confirm::ConfirmationKind;
use crate::dispatcher::error::{DispatchError, DispatchResult};
use crate::dispatcher::types::{DispatcherStatistics, OutboundSms, SendId, SendSinks};
use crate::radio::SendOutcome;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Identifies one segment tracker for the lifetime of the dispatcher
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(pub(crate) u64);

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

/// Everything the loop can be asked to do
pub(crate) enum Message {
    /// A new accepted send
    Submit(Box<OutboundSms>, SendSinks),
    /// The radio finished a `send_sms` command
    SendComplete { token: Token, outcome: SendOutcome },
    /// Re-issue a segment after a retryable failure
    Retry { token: Token },
    /// The user answered a confirmation prompt
    ConfirmReply {
        send: SendId,
        kind: ConfirmationKind,
        allow: bool,
    },
    /// The send deadline expired
    Deadline { send: SendId },
    /// The modem pushed a status report
    NewSmsStatus(Bytes),
    /// Reply once no send is outstanding and the queue is empty
    Sync(oneshot::Sender<()>),
    /// Reply with a snapshot of the counters
    Statistics(oneshot::Sender<DispatcherStatistics>),
    /// Stop the loop, failing what is still pending
    Shutdown(Option<oneshot::Sender<()>>),
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Submit(sms, _) => write!(f, "Submit({})", sms.id),
            Message::SendComplete { token, outcome } => {
                write!(f, "SendComplete({token:?}, ok={})", outcome.is_ok())
            }
            Message::Retry { token } => write!(f, "Retry({token:?})"),
            Message::ConfirmReply { send, kind, allow } => {
                write!(f, "ConfirmReply({send}, {kind:?}, allow={allow})")
            }
            Message::Deadline { send } => write!(f, "Deadline({send})"),
            Message::NewSmsStatus(pdu) => write!(f, "NewSmsStatus({} octets)", pdu.len()),
            Message::Sync(_) => write!(f, "Sync"),
            Message::Statistics(_) => write!(f, "Statistics"),
            Message::Shutdown(_) => write!(f, "Shutdown"),
        }
    }
}

/// Posts messages onto the dispatcher loop
#[derive(Clone)]
pub(crate) struct Handler {
    tx: mpsc::UnboundedSender<Message>,
}

impl Handler {
    /// Post for processing after everything already queued
    pub(crate) fn post(&self, message: Message) -> DispatchResult<()> {
        self.tx.send(message).map_err(|_| DispatchError::Shutdown)
    }

    /// Post after `delay`; abort the returned handle to cancel
    pub(crate) fn post_delayed(&self, message: Message, delay: Duration) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Loop may have stopped meanwhile
            let _ = tx.send(message);
        })
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Receiving side of the loop
pub(crate) struct Looper {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Looper {
    pub(crate) fn new() -> (Handler, Looper) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Handler { tx }, Looper { rx })
    }

    pub(crate) async fn next(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// No message is waiting
    pub(crate) fn is_drained(&self) -> bool {
        self.rx.is_empty()
    }

    /// Stop accepting posts; queued messages can still be drained
    pub(crate) fn close(&mut self) {
        self.rx.close();
    }

    pub(crate) fn try_next(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_arrive_in_post_order() {
        let (handler, mut looper) = Looper::new();
        handler.post(Message::Deadline { send: SendId(1) }).unwrap();
        handler.post(Message::Deadline { send: SendId(2) }).unwrap();

        assert!(matches!(looper.next().await, Some(Message::Deadline { send: SendId(1) })));
        assert!(matches!(looper.next().await, Some(Message::Deadline { send: SendId(2) })));
        assert!(looper.is_drained());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_post_waits() {
        let (handler, mut looper) = Looper::new();
        handler.post_delayed(Message::Retry { token: Token(7) }, Duration::from_secs(2));

        assert!(looper.try_next().is_none());
        let message = looper.next().await;
        assert!(matches!(message, Some(Message::Retry { token: Token(7) })));
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_delayed_post_never_arrives() {
        let (handler, mut looper) = Looper::new();
        let timer = handler.post_delayed(Message::Retry { token: Token(1) }, Duration::from_secs(1));
        timer.abort();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(looper.try_next().is_none());
    }

    #[tokio::test]
    async fn post_after_close_reports_shutdown() {
        let (handler, mut looper) = Looper::new();
        looper.close();
        assert!(matches!(
            handler.post(Message::Deadline { send: SendId(1) }),
            Err(DispatchError::Shutdown)
        ));
        assert!(handler.is_closed());
    }
}
