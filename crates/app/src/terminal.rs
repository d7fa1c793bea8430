//! Line-oriented rendering of view updates for the terminal front end.

use crate::view::{MessageView, ViewModel};

/// Turns successive view models into the lines that changed since the last one.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    last: Option<ViewModel>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &ViewModel) -> Vec<String> {
        let mut lines = Vec::new();
        let previous = self.last.as_ref();

        if previous.is_none_or(|prev| prev.sampler_status != view.sampler_status) {
            lines.push(format!("[camera] {}", view.sampler_status));
        }

        if view.emotion_detected
            && previous.is_none_or(|prev| prev.emotion != view.emotion || !prev.emotion_detected)
        {
            lines.push(format!(
                "[emotion] {} {} ({})",
                crate::view::legend_icon(view.emotion),
                view.emotion,
                view.theme.token()
            ));
        }

        let seen = previous.map(|prev| prev.messages.as_slice()).unwrap_or(&[]);
        for (index, message) in view.messages.iter().enumerate() {
            if seen.get(index) != Some(message) {
                lines.push(message_line(message));
            }
        }

        self.last = Some(view.clone());
        lines
    }
}

fn message_line(message: &MessageView) -> String {
    format!("{}: {}", message.role.as_str(), message.text)
}

#[cfg(test)]
mod tests {
    use empath_affect::{EmotionLabel, SamplerStatus};
    use empath_backend::ChatReply;

    use super::*;
    use crate::chat::{ChatCompletion, ChatSession, PENDING_MARKER};
    use crate::view::compose;

    #[test]
    fn first_frame_prints_status_only() {
        let mut renderer = TerminalRenderer::new();
        let lines = renderer.render(&compose(&ChatSession::new(), SamplerStatus::LoadingModels));

        assert_eq!(lines, vec!["[camera] Loading models...".to_string()]);
    }

    #[test]
    fn unchanged_view_prints_nothing() {
        let mut renderer = TerminalRenderer::new();
        let view = compose(&ChatSession::new(), SamplerStatus::Ready);
        renderer.render(&view);

        assert!(renderer.render(&view).is_empty());
    }

    #[test]
    fn placeholder_and_its_replacement_are_both_printed() {
        let mut renderer = TerminalRenderer::new();
        let mut session = ChatSession::new();
        renderer.render(&compose(&session, SamplerStatus::Ready));

        let outbound = session.submit("hello").unwrap();
        assert_eq!(
            renderer.render(&compose(&session, SamplerStatus::Ready)),
            vec!["user: hello".to_string(), format!("assistant: {PENDING_MARKER}")]
        );

        session.complete(ChatCompletion::new(
            outbound.ticket,
            Ok(ChatReply::with_reply("hi!")),
        ));
        assert_eq!(
            renderer.render(&compose(&session, SamplerStatus::Ready)),
            vec!["assistant: hi!".to_string()]
        );
    }

    #[test]
    fn emotion_changes_are_announced() {
        let mut renderer = TerminalRenderer::new();
        let mut session = ChatSession::new();
        renderer.render(&compose(&session, SamplerStatus::Ready));

        session.set_current_emotion(Some(EmotionLabel::Happy));
        assert_eq!(
            renderer.render(&compose(&session, SamplerStatus::Ready)),
            vec!["[emotion] 😊 happy (from-yellow-100 to-yellow-50)".to_string()]
        );
    }
}
