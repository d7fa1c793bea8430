use futures::FutureExt;
use futures::future::{self, BoxFuture};

use crate::camera::{Camera, ReadyState, VideoFrame, VideoStream};
use crate::classifier::{ExpressionClassifier, ExpressionScores, FaceDetection, ModelKind};
use crate::error::{AffectResult, CameraAccessSnafu, ModelLoadSnafu};
use crate::label::EmotionLabel;

/// Camera for hosts without a capture device; every request is denied.
#[derive(Debug, Clone, Default)]
pub struct UnavailableCamera;

impl Camera for UnavailableCamera {
    fn acquire<'a>(&'a self) -> BoxFuture<'a, AffectResult<Box<dyn VideoStream>>> {
        future::ready(
            CameraAccessSnafu {
                stage: "acquire-unavailable-camera",
                details: "no video capture device is available on this host".to_string(),
            }
            .fail(),
        )
        .boxed()
    }
}

/// Classifier for builds without a model runtime; loading always fails.
#[derive(Debug, Clone, Default)]
pub struct UnavailableClassifier;

impl ExpressionClassifier for UnavailableClassifier {
    fn load_model<'a>(
        &'a self,
        kind: ModelKind,
        asset_root: &'a str,
    ) -> BoxFuture<'a, AffectResult<()>> {
        future::ready(
            ModelLoadSnafu {
                stage: "load-unavailable-model",
                model: kind,
                asset_root: asset_root.to_string(),
                details: "no expression model runtime is linked into this build".to_string(),
            }
            .fail(),
        )
        .boxed()
    }

    fn detect<'a>(&'a self, _frame: &'a VideoFrame) -> BoxFuture<'a, AffectResult<Vec<FaceDetection>>> {
        future::ready(Ok(Vec::new())).boxed()
    }
}

/// Always-ready stream of blank frames, for headless runs.
#[derive(Debug, Clone, Default)]
pub struct SyntheticCamera;

struct SyntheticStream {
    frame: VideoFrame,
    released: bool,
}

impl VideoStream for SyntheticStream {
    fn ready_state(&self) -> ReadyState {
        if self.released {
            ReadyState::HaveNothing
        } else {
            ReadyState::HaveEnoughData
        }
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        (!self.released).then(|| self.frame.clone())
    }

    fn release(&mut self) {
        self.released = true;
    }
}

impl Camera for SyntheticCamera {
    fn acquire<'a>(&'a self) -> BoxFuture<'a, AffectResult<Box<dyn VideoStream>>> {
        let stream: Box<dyn VideoStream> = Box::new(SyntheticStream {
            frame: VideoFrame::new(1, 1, vec![0u8; 4]),
            released: false,
        });
        future::ready(Ok(stream)).boxed()
    }
}

/// Reports one face wearing the same expression on every frame.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    label: EmotionLabel,
}

impl FixedClassifier {
    pub fn new(label: EmotionLabel) -> Self {
        Self { label }
    }

    fn scores(&self) -> ExpressionScores {
        ExpressionScores::from_pairs(EmotionLabel::ALL.into_iter().map(|label| {
            let score = if label == self.label { 1.0 } else { 0.0 };
            (label.as_str(), score)
        }))
    }
}

impl ExpressionClassifier for FixedClassifier {
    fn load_model<'a>(
        &'a self,
        _kind: ModelKind,
        _asset_root: &'a str,
    ) -> BoxFuture<'a, AffectResult<()>> {
        future::ready(Ok(())).boxed()
    }

    fn detect<'a>(&'a self, _frame: &'a VideoFrame) -> BoxFuture<'a, AffectResult<Vec<FaceDetection>>> {
        future::ready(Ok(vec![FaceDetection::new(self.scores())])).boxed()
    }
}
