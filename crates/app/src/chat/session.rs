use empath_affect::EmotionLabel;
use empath_backend::ChatRequest;

use super::events::{ChatCompletion, OutboundChat, SendTicket};
use super::message::{
    BACKEND_UNREACHABLE_TEXT, FALLBACK_REPLY_TEXT, Message, Transcript, TranscriptResult,
};

/// How a completion was folded into the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Replied,
    /// The backend answered without a usable reply.
    Fallback,
    /// The round trip failed; a system line was appended.
    Failed,
    /// The completion did not belong to the in-flight send and was dropped.
    Stale,
}

/// Request/response state for one chat session.
///
/// `is_busy` holds from an accepted submit until its completion is applied,
/// and gates every further submit. Only one round trip is ever in flight, so
/// reconciliation always targets the last transcript element.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    transcript: Transcript,
    current_emotion: Option<EmotionLabel>,
    input_draft: String,
    in_flight: Option<SendTicket>,
    next_ticket: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn current_emotion(&self) -> Option<EmotionLabel> {
        self.current_emotion
    }

    /// Label sent with the next request; neutral until the first sample.
    pub fn effective_emotion(&self) -> EmotionLabel {
        self.current_emotion.unwrap_or_default()
    }

    pub fn input_draft(&self) -> &str {
        &self.input_draft
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<SendTicket> {
        self.in_flight
    }

    pub fn set_current_emotion(&mut self, emotion: Option<EmotionLabel>) {
        self.current_emotion = emotion;
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.input_draft = draft.into();
    }

    pub fn submit_draft(&mut self) -> Option<OutboundChat> {
        let text = self.input_draft.clone();
        self.submit(text)
    }

    /// Applies the optimistic half of a send and returns the request to dispatch.
    ///
    /// Returns `None` without touching any state when the text is blank or a
    /// round trip is already in flight.
    pub fn submit(&mut self, text: impl Into<String>) -> Option<OutboundChat> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }

        if let Some(active) = self.in_flight {
            tracing::debug!(ticket = active.0, "submit ignored while a reply is outstanding");
            return None;
        }

        if let Err(error) = self.append_exchange(&text) {
            tracing::error!(error = %error, "transcript rejected optimistic append");
            return None;
        }

        self.input_draft.clear();
        let ticket = self.alloc_ticket();
        self.in_flight = Some(ticket);

        let emotion = self.effective_emotion();
        tracing::debug!(ticket = ticket.0, emotion = %emotion, "chat submit accepted");

        Some(OutboundChat {
            ticket,
            request: ChatRequest::new(text, emotion.as_str()),
        })
    }

    /// Folds a finished round trip into the transcript and releases the busy gate.
    pub fn complete(&mut self, completion: ChatCompletion) -> Reconciliation {
        let ChatCompletion { ticket, result } = completion;

        if self.in_flight != Some(ticket) {
            tracing::warn!(
                ticket = ticket.0,
                in_flight = ?self.in_flight,
                "dropping completion for a send that is not in flight"
            );
            return Reconciliation::Stale;
        }

        let (settled, outcome) = match result {
            Ok(reply) => {
                let outcome = if reply.reply.is_some() {
                    Reconciliation::Replied
                } else {
                    Reconciliation::Fallback
                };
                let text = reply
                    .reply
                    .unwrap_or_else(|| FALLBACK_REPLY_TEXT.to_string());
                (self.transcript.resolve_pending(text), outcome)
            }
            Err(error) => {
                tracing::error!(ticket = ticket.0, error = %error, "chat round trip failed");
                (self.record_failure(), Reconciliation::Failed)
            }
        };

        if let Err(error) = settled {
            tracing::error!(ticket = ticket.0, error = %error, "failed to reconcile transcript");
        }

        self.in_flight = None;
        outcome
    }

    fn append_exchange(&mut self, text: &str) -> TranscriptResult<()> {
        self.transcript.push(Message::user(text))?;
        self.transcript.push(Message::pending_assistant())
    }

    fn record_failure(&mut self) -> TranscriptResult<()> {
        self.transcript.stall_pending()?;
        self.transcript.push(Message::system(BACKEND_UNREACHABLE_TEXT))
    }

    fn alloc_ticket(&mut self) -> SendTicket {
        self.next_ticket = self.next_ticket.saturating_add(1);
        SendTicket::new(self.next_ticket)
    }
}

#[cfg(test)]
mod tests {
    use empath_backend::{BackendError, ChatReply};

    use super::*;
    use crate::chat::message::{MessageStatus, PENDING_MARKER, Role};

    fn decode_failure() -> BackendError {
        BackendError::DecodeBody {
            stage: "test",
            status: 502,
            source: serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
        }
    }

    fn assert_single_trailing_pending(session: &ChatSession) {
        let messages = session.transcript().messages();
        let pending = messages.iter().filter(|message| message.is_pending()).count();
        assert!(pending <= 1);
        if pending == 1 {
            assert!(messages.last().unwrap().is_pending());
        }
    }

    #[test]
    fn submit_appends_user_and_placeholder_synchronously() {
        let mut session = ChatSession::new();
        session.set_current_emotion(Some(EmotionLabel::Happy));
        session.set_draft("hello");

        let outbound = session.submit_draft().unwrap();

        assert_eq!(
            session.transcript().messages(),
            &[Message::user("hello"), Message::pending_assistant()]
        );
        assert_eq!(session.input_draft(), "");
        assert!(session.is_busy());
        assert_eq!(outbound.request, ChatRequest::new("hello", "happy"));
        assert_eq!(session.in_flight(), Some(outbound.ticket));
        assert_single_trailing_pending(&session);
    }

    #[test]
    fn submit_keeps_literal_input() {
        let mut session = ChatSession::new();
        let outbound = session.submit("  spaced out \n").unwrap();

        assert_eq!(outbound.request.message, "  spaced out \n");
        assert_eq!(outbound.request.emotion, "neutral");
        assert_eq!(session.transcript().messages()[0].text, "  spaced out \n");
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut session = ChatSession::new();
        session.set_draft("   ");

        assert!(session.submit_draft().is_none());
        assert!(session.submit("\n\t").is_none());
        assert!(session.transcript().is_empty());
        assert_eq!(session.input_draft(), "   ");
        assert!(!session.is_busy());
    }

    #[test]
    fn submit_while_busy_changes_nothing() {
        let mut session = ChatSession::new();
        let first = session.submit("first").unwrap();
        session.set_draft("second");
        let before = session.transcript().clone();

        assert!(session.submit_draft().is_none());
        assert!(session.submit("third").is_none());

        assert_eq!(session.transcript(), &before);
        assert_eq!(session.input_draft(), "second");
        assert_eq!(session.in_flight(), Some(first.ticket));
    }

    #[test]
    fn reply_replaces_placeholder_in_place() {
        let mut session = ChatSession::new();
        let outbound = session.submit("hello").unwrap();
        let len_before = session.transcript().len();

        let outcome = session.complete(ChatCompletion::new(
            outbound.ticket,
            Ok(ChatReply::with_reply("hi!")),
        ));

        assert_eq!(outcome, Reconciliation::Replied);
        assert_eq!(session.transcript().len(), len_before);
        assert_eq!(
            session.transcript().messages(),
            &[Message::user("hello"), Message::assistant("hi!")]
        );
        assert!(!session.is_busy());
    }

    #[test]
    fn missing_reply_resolves_to_fallback() {
        let mut session = ChatSession::new();
        let outbound = session.submit("hello").unwrap();

        let outcome = session.complete(ChatCompletion::new(outbound.ticket, Ok(ChatReply::default())));

        assert_eq!(outcome, Reconciliation::Fallback);
        assert_eq!(
            session.transcript().last(),
            Some(&Message::assistant(FALLBACK_REPLY_TEXT))
        );
        assert!(!session.is_busy());
    }

    #[test]
    fn failure_appends_system_line_after_stalled_placeholder() {
        let mut session = ChatSession::new();
        let outbound = session.submit("hello").unwrap();

        let outcome = session.complete(ChatCompletion::new(outbound.ticket, Err(decode_failure())));

        assert_eq!(outcome, Reconciliation::Failed);
        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].text, PENDING_MARKER);
        assert_eq!(messages[1].status, MessageStatus::Stalled);
        assert_eq!(messages[2], Message::system(BACKEND_UNREACHABLE_TEXT));
        assert!(!session.is_busy());
        assert_single_trailing_pending(&session);

        // The session stays usable after a failure.
        let next = session.submit("again").unwrap();
        assert_eq!(session.transcript().len(), 5);
        assert_ne!(next.ticket, outbound.ticket);
    }

    #[test]
    fn stale_completion_is_dropped() {
        let mut session = ChatSession::new();
        let outbound = session.submit("hello").unwrap();

        let outcome = session.complete(ChatCompletion::new(
            SendTicket::new(outbound.ticket.0 + 7),
            Ok(ChatReply::with_reply("not yours")),
        ));

        assert_eq!(outcome, Reconciliation::Stale);
        assert!(session.is_busy());
        assert!(session.transcript().has_pending());
    }

    #[test]
    fn emotion_is_snapshotted_at_submit() {
        let mut session = ChatSession::new();
        session.set_current_emotion(Some(EmotionLabel::Angry));
        let outbound = session.submit("hello").unwrap();
        session.set_current_emotion(Some(EmotionLabel::Happy));

        assert_eq!(outbound.request.emotion, "angry");
    }
}
