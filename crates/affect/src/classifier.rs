use std::fmt;

use futures::future::BoxFuture;

use crate::camera::VideoFrame;
use crate::error::AffectResult;
use crate::label::EmotionLabel;

/// Model assets the classifier needs before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    FaceDetector,
    ExpressionNet,
}

impl ModelKind {
    /// Load order: faces must be found before expressions can be scored.
    pub const LOAD_ORDER: [ModelKind; 2] = [Self::FaceDetector, Self::ExpressionNet];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FaceDetector => "tiny_face_detector",
            Self::ExpressionNet => "face_expression_net",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Per-affect confidence scores for one detected face.
///
/// Entries keep the order the classifier produced them in; that order is
/// the tie-break order for [`ExpressionScores::dominant`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpressionScores {
    entries: Vec<(String, f32)>,
}

impl ExpressionScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(name, score)| (name.into(), score))
                .collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, score: f32) {
        self.entries.push((name.into(), score));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(name, score)| (name.as_str(), *score))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the label with the highest score.
    ///
    /// Only a strictly greater score displaces the current best, so equal
    /// scores keep the earliest entry. Unknown names and NaN scores are skipped.
    pub fn dominant(&self) -> Option<EmotionLabel> {
        let mut best: Option<(EmotionLabel, f32)> = None;

        for (name, score) in self.iter() {
            if score.is_nan() {
                continue;
            }
            let Ok(label) = EmotionLabel::parse(name) else {
                continue;
            };

            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((label, score)),
            }
        }

        best.map(|(label, _)| label)
    }
}

/// One detected subject in a frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceDetection {
    pub expressions: ExpressionScores,
}

impl FaceDetection {
    pub fn new(expressions: ExpressionScores) -> Self {
        Self { expressions }
    }
}

/// Black-box facial expression classifier.
pub trait ExpressionClassifier: Send + Sync {
    fn load_model<'a>(
        &'a self,
        kind: ModelKind,
        asset_root: &'a str,
    ) -> BoxFuture<'a, AffectResult<()>>;

    /// Detects every face in `frame`; an empty list means no subject.
    fn detect<'a>(&'a self, frame: &'a VideoFrame) -> BoxFuture<'a, AffectResult<Vec<FaceDetection>>>;
}
