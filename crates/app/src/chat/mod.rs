/// Commands and completions exchanged with the coordinator.
pub mod events;
/// Messages and the transcript invariants.
pub mod message;
pub mod session;

pub use events::{ChatCompletion, Command, OutboundChat, SendTicket};
pub use message::{
    BACKEND_UNREACHABLE_TEXT, FALLBACK_REPLY_TEXT, Message, MessageStatus, PENDING_MARKER, Role,
    Transcript, TranscriptError, TranscriptResult,
};
pub use session::{ChatSession, Reconciliation};
