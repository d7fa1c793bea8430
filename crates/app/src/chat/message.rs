use snafu::{Snafu, ensure};

/// Placeholder text shown while a reply is outstanding.
pub const PENDING_MARKER: &str = "🤖 Typing...";
/// Reply text used when the backend answered without a usable `reply`.
pub const FALLBACK_REPLY_TEXT: &str = "Hmm... I didn’t get that.";
/// System line appended when a round trip fails.
pub const BACKEND_UNREACHABLE_TEXT: &str = "⚠️ Could not reach backend.";

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Lifecycle status for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageStatus {
    Final,
    /// Assistant placeholder awaiting reconciliation.
    Pending,
    /// Placeholder whose round trip failed; never resolved.
    Stalled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub status: MessageStatus,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            role,
            text: text.into(),
            status,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text, MessageStatus::Final)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text, MessageStatus::Final)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text, MessageStatus::Final)
    }

    pub fn pending_assistant() -> Self {
        Self::new(Role::Assistant, PENDING_MARKER, MessageStatus::Pending)
    }

    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }

    /// True for any message still carrying the placeholder text, stalled ones included.
    pub fn shows_pending_marker(&self) -> bool {
        self.text == PENDING_MARKER
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TranscriptError {
    #[snafu(display("cannot append at position {len} while a pending placeholder is open"))]
    PendingStillOpen { stage: &'static str, len: usize },
    #[snafu(display("no pending placeholder to settle on `{stage}`"))]
    NoPendingPlaceholder { stage: &'static str },
}

pub type TranscriptResult<T> = Result<T, TranscriptError>;

/// Ordered, append-only message log.
///
/// At most one [`MessageStatus::Pending`] message exists, and when it does it
/// is the last element. Appending behind it is rejected, so the placeholder
/// must be resolved or stalled first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn has_pending(&self) -> bool {
        self.last().is_some_and(Message::is_pending)
    }

    pub fn push(&mut self, message: Message) -> TranscriptResult<()> {
        ensure!(
            !self.has_pending(),
            PendingStillOpenSnafu {
                stage: "transcript-push",
                len: self.messages.len(),
            }
        );

        self.messages.push(message);
        Ok(())
    }

    /// Replaces the pending placeholder in place with a final assistant reply.
    pub fn resolve_pending(&mut self, reply: impl Into<String>) -> TranscriptResult<()> {
        let placeholder = self.pending_slot("transcript-resolve-pending")?;
        *placeholder = Message::assistant(reply);
        Ok(())
    }

    /// Leaves the placeholder text in place but closes it for good.
    pub fn stall_pending(&mut self) -> TranscriptResult<()> {
        let placeholder = self.pending_slot("transcript-stall-pending")?;
        placeholder.status = MessageStatus::Stalled;
        Ok(())
    }

    fn pending_slot(&mut self, stage: &'static str) -> TranscriptResult<&mut Message> {
        match self.messages.last_mut() {
            Some(message) if message.is_pending() => Ok(message),
            _ => NoPendingPlaceholderSnafu { stage }.fail(),
        }
    }
}
