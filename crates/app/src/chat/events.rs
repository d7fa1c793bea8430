use empath_backend::{BackendResult, ChatReply, ChatRequest};
use tokio::sync::oneshot;

/// Identifier for one chat round trip.
///
/// Allocated per accepted submit so a completion can be matched to its send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SendTicket(pub u64);

impl SendTicket {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// User intents delivered to the coordinator.
#[derive(Debug)]
pub enum Command {
    SetDraft(String),
    /// Submit whatever the input draft currently holds.
    SubmitDraft,
    Submit(String),
    /// Answered once every earlier command is applied and no reply is outstanding.
    WhenIdle(oneshot::Sender<()>),
}

/// Request produced by an accepted submit, ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundChat {
    pub ticket: SendTicket,
    pub request: ChatRequest,
}

/// Outcome of one round trip, routed back to the session that sent it.
#[derive(Debug)]
pub struct ChatCompletion {
    pub ticket: SendTicket,
    pub result: BackendResult<ChatReply>,
}

impl ChatCompletion {
    pub fn new(ticket: SendTicket, result: BackendResult<ChatReply>) -> Self {
        Self { ticket, result }
    }
}
