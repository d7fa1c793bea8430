use empath_affect::{EmotionLabel, SamplerStatus};

use crate::chat::{ChatSession, Message, Role};

mod theme;

pub use theme::{Theme, legend_icon};

pub const SEND_LABEL: &str = "Send";
pub const BUSY_SEND_LABEL: &str = "...";

/// One row of the transcript as the presentation layer draws it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub role: Role,
    pub text: String,
    /// Draw the typing treatment instead of plain text.
    pub in_progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendEntry {
    pub emotion: EmotionLabel,
    pub icon: &'static str,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputView {
    pub draft: String,
    pub enabled: bool,
    pub send_label: &'static str,
}

/// Everything the page shell needs to render one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub theme: Theme,
    pub emotion: EmotionLabel,
    /// False until the sampler has published a first label.
    pub emotion_detected: bool,
    pub legend: Vec<LegendEntry>,
    pub messages: Vec<MessageView>,
    pub sampler_status: &'static str,
    pub input: InputView,
}

impl ViewModel {
    pub fn highlighted(&self) -> Option<EmotionLabel> {
        self.legend
            .iter()
            .find(|entry| entry.highlighted)
            .map(|entry| entry.emotion)
    }
}

/// Derives the render output from session state and sampler status.
pub fn compose(session: &ChatSession, sampler_status: SamplerStatus) -> ViewModel {
    let emotion = session.effective_emotion();

    ViewModel {
        theme: Theme::for_emotion(session.current_emotion()),
        emotion,
        emotion_detected: session.current_emotion().is_some(),
        legend: legend(emotion),
        messages: session.transcript().iter().map(message_view).collect(),
        sampler_status: sampler_status.message(),
        input: InputView {
            draft: session.input_draft().to_string(),
            enabled: !session.is_busy(),
            send_label: if session.is_busy() {
                BUSY_SEND_LABEL
            } else {
                SEND_LABEL
            },
        },
    }
}

fn legend(current: EmotionLabel) -> Vec<LegendEntry> {
    EmotionLabel::ALL
        .into_iter()
        .map(|emotion| LegendEntry {
            emotion,
            icon: legend_icon(emotion),
            highlighted: emotion == current,
        })
        .collect()
}

fn message_view(message: &Message) -> MessageView {
    MessageView {
        role: message.role,
        text: message.text.clone(),
        in_progress: message.shows_pending_marker(),
    }
}
