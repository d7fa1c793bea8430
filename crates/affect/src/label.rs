use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AffectError, AffectResult, UnknownLabelSnafu};

/// Dominant facial affect reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl EmotionLabel {
    /// Every label, in legend order.
    pub const ALL: [EmotionLabel; 7] = [
        Self::Neutral,
        Self::Happy,
        Self::Sad,
        Self::Angry,
        Self::Fearful,
        Self::Disgusted,
        Self::Surprised,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fearful => "fearful",
            Self::Disgusted => "disgusted",
            Self::Surprised => "surprised",
        }
    }

    pub fn parse(raw: &str) -> AffectResult<Self> {
        let normalized = raw.trim();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| {
                UnknownLabelSnafu {
                    stage: "parse-emotion-label",
                    raw: raw.to_string(),
                }
                .build()
            })
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = AffectError;

    fn from_str(raw: &str) -> AffectResult<Self> {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_classifier_names_case_insensitively() {
        assert_eq!(EmotionLabel::parse("happy").unwrap(), EmotionLabel::Happy);
        assert_eq!(EmotionLabel::parse(" Surprised ").unwrap(), EmotionLabel::Surprised);
        assert_eq!("DISGUSTED".parse::<EmotionLabel>().unwrap(), EmotionLabel::Disgusted);
    }

    #[test]
    fn rejects_names_outside_the_closed_set() {
        assert!(matches!(
            EmotionLabel::parse("contempt"),
            Err(AffectError::UnknownLabel { .. })
        ));
    }

    #[test]
    fn display_matches_wire_name() {
        for label in EmotionLabel::ALL {
            assert_eq!(label.to_string(), label.as_str());
            assert_eq!(label.as_str().parse::<EmotionLabel>().unwrap(), label);
        }
    }
}
