use empath_affect::EmotionLabel;

/// Background gradient keyed by the current emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub emotion: EmotionLabel,
    pub gradient_from: &'static str,
    pub gradient_to: &'static str,
}

impl Theme {
    /// Resolves the theme; no label yet means the neutral gradient.
    pub fn for_emotion(emotion: Option<EmotionLabel>) -> Self {
        let emotion = emotion.unwrap_or_default();
        let (gradient_from, gradient_to) = match emotion {
            EmotionLabel::Happy => ("yellow-100", "yellow-50"),
            EmotionLabel::Sad => ("blue-100", "blue-50"),
            EmotionLabel::Angry => ("red-100", "red-50"),
            EmotionLabel::Fearful => ("purple-100", "purple-50"),
            EmotionLabel::Disgusted => ("green-100", "green-50"),
            EmotionLabel::Surprised => ("pink-100", "pink-50"),
            EmotionLabel::Neutral => ("gray-100", "gray-50"),
        };

        Self {
            emotion,
            gradient_from,
            gradient_to,
        }
    }

    pub fn token(&self) -> String {
        format!("from-{} to-{}", self.gradient_from, self.gradient_to)
    }
}

pub fn legend_icon(emotion: EmotionLabel) -> &'static str {
    match emotion {
        EmotionLabel::Neutral => "😐",
        EmotionLabel::Happy => "😊",
        EmotionLabel::Sad => "😢",
        EmotionLabel::Angry => "😡",
        EmotionLabel::Fearful => "😨",
        EmotionLabel::Disgusted => "🤢",
        EmotionLabel::Surprised => "😲",
    }
}
