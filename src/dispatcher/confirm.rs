// ABOUTME: User confirmation prompts for over-quota sends and premium short codes
// ABOUTME: Replies are posted back onto the dispatcher loop like any other event

use crate::dispatcher::looper::{Handler, Message};
use crate::dispatcher::types::SendId;
use tracing::debug;

/// Why the user is being asked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationKind {
    /// The package has used up its sending quota
    RateLimitExceeded,
    /// The destination is a premium short code
    PremiumShortCode,
}

/// What the prompt shows the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub send_id: SendId,
    pub kind: ConfirmationKind,
    pub calling_package: String,
    pub destination: String,
    /// Segments the send will use
    pub message_count: usize,
}

/// The answer channel for one prompt
///
/// Consumed by [`allow`](Self::allow) or [`deny`](Self::deny), so each
/// prompt is answered at most once. A prompt that is never answered
/// resolves when the send deadline expires.
pub struct ConfirmationReply {
    send: SendId,
    kind: ConfirmationKind,
    handler: Handler,
}

impl ConfirmationReply {
    pub(crate) fn new(send: SendId, kind: ConfirmationKind, handler: Handler) -> Self {
        Self {
            send,
            kind,
            handler,
        }
    }

    pub fn allow(self) {
        self.answer(true);
    }

    pub fn deny(self) {
        self.answer(false);
    }

    fn answer(self, allow: bool) {
        let message = Message::ConfirmReply {
            send: self.send,
            kind: self.kind,
            allow,
        };
        if self.handler.post(message).is_err() {
            debug!(send = %self.send, "Dropping confirmation reply after shutdown");
        }
    }
}

impl std::fmt::Debug for ConfirmationReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationReply")
            .field("send", &self.send)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Asks the user to confirm a send
///
/// Called on the dispatcher loop; implementations must return promptly and
/// answer through `reply`, possibly later from another task.
pub trait UserPrompt: Send + Sync {
    fn request_confirmation(&self, request: ConfirmationRequest, reply: ConfirmationReply);
}

/// Headless prompt that denies every request
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAllPrompt;

impl UserPrompt for DenyAllPrompt {
    fn request_confirmation(&self, request: ConfirmationRequest, reply: ConfirmationReply) {
        debug!(send = %request.send_id, kind = ?request.kind, "No user to ask, denying");
        reply.deny();
    }
}
