//! Facial-affect sampling: the closed emotion label set, the black-box
//! classifier and camera ports, and the periodic sampler that publishes the
//! dominant label.

mod camera;
mod classifier;
mod error;
mod label;
pub mod sampler;
mod sources;

pub use camera::{Camera, CameraLease, ReadyState, VideoFrame, VideoStream};
pub use classifier::{ExpressionClassifier, ExpressionScores, FaceDetection, ModelKind};
pub use error::{AffectError, AffectResult};
pub use label::EmotionLabel;
pub use sampler::{
    DEFAULT_MODEL_ASSET_ROOT, DEFAULT_SAMPLE_INTERVAL, EmotionSampler, SamplerConfig,
    SamplerHandle, SamplerStatus, TickOutcome,
};
pub use sources::{FixedClassifier, SyntheticCamera, UnavailableCamera, UnavailableClassifier};
