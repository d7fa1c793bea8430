use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::camera::{Camera, CameraLease};
use crate::classifier::{ExpressionClassifier, ModelKind};
use crate::label::EmotionLabel;

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MODEL_ASSET_ROOT: &str = "/models/";

/// Human-readable setup state of the sampler.
///
/// Independent of per-tick classification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerStatus {
    #[default]
    LoadingModels,
    ModelsUnavailable,
    RequestingCamera,
    CameraDenied,
    Ready,
}

impl SamplerStatus {
    pub const fn message(self) -> &'static str {
        match self {
            Self::LoadingModels => "Loading models...",
            Self::ModelsUnavailable => "❌ Failed to load models",
            Self::RequestingCamera => "Models loaded ✅, waiting for camera...",
            Self::CameraDenied => "❌ Camera access denied",
            Self::Ready => "Models loaded ✅",
        }
    }

    /// Terminal failures never start the sampling loop.
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::ModelsUnavailable | Self::CameraDenied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    pub interval: Duration,
    pub model_asset_root: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SAMPLE_INTERVAL,
            model_asset_root: DEFAULT_MODEL_ASSET_ROOT.to_string(),
        }
    }
}

/// Result of one sampling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The stream has no decodable frame yet.
    NotReady,
    NoSubject,
    /// Treated exactly like [`TickOutcome::NoSubject`].
    ClassifierFailed,
    Detected(EmotionLabel),
}

impl TickOutcome {
    pub fn label(self) -> Option<EmotionLabel> {
        match self {
            Self::Detected(label) => Some(label),
            Self::NotReady | Self::NoSubject | Self::ClassifierFailed => None,
        }
    }
}

pub struct EmotionSampler {
    config: SamplerConfig,
    classifier: Arc<dyn ExpressionClassifier>,
    camera: Arc<dyn Camera>,
}

impl EmotionSampler {
    pub fn new(
        config: SamplerConfig,
        classifier: Arc<dyn ExpressionClassifier>,
        camera: Arc<dyn Camera>,
    ) -> Self {
        Self {
            config,
            classifier,
            camera,
        }
    }

    /// Starts setup and sampling on the current tokio runtime.
    pub fn spawn(self) -> SamplerHandle {
        let (emotion_tx, emotion_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(SamplerStatus::LoadingModels);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let task = tokio::spawn(self.run(emotion_tx, status_tx, cancel_rx));

        SamplerHandle {
            emotion: emotion_rx,
            status: status_rx,
            cancel_tx: Some(cancel_tx),
            task: Some(task),
        }
    }

    async fn run(
        self,
        emotion_tx: watch::Sender<Option<EmotionLabel>>,
        status_tx: watch::Sender<SamplerStatus>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        let lease = tokio::select! {
            _ = &mut cancel_rx => {
                tracing::debug!("sampler cancelled during setup");
                return;
            }
            lease = self.setup(&status_tx) => lease,
        };

        let Some(lease) = lease else {
            return;
        };

        self.sample_loop(&lease, &emotion_tx, cancel_rx).await;
        lease.release();
        tracing::info!("emotion sampler stopped");
    }

    /// Loads models then acquires the camera. Neither step is retried.
    async fn setup(&self, status_tx: &watch::Sender<SamplerStatus>) -> Option<CameraLease> {
        status_tx.send_replace(SamplerStatus::LoadingModels);

        for kind in ModelKind::LOAD_ORDER {
            if let Err(error) = self
                .classifier
                .load_model(kind, &self.config.model_asset_root)
                .await
            {
                tracing::warn!(
                    model = %kind,
                    asset_root = %self.config.model_asset_root,
                    error = %error,
                    "model load failed; emotion sampling disabled"
                );
                status_tx.send_replace(SamplerStatus::ModelsUnavailable);
                return None;
            }
        }

        status_tx.send_replace(SamplerStatus::RequestingCamera);

        match self.camera.acquire().await {
            Ok(stream) => {
                status_tx.send_replace(SamplerStatus::Ready);
                tracing::info!(
                    interval_ms = self.config.interval.as_millis() as u64,
                    "emotion sampler ready"
                );
                Some(CameraLease::new(stream))
            }
            Err(error) => {
                tracing::warn!(error = %error, "camera access failed; emotion sampling disabled");
                status_tx.send_replace(SamplerStatus::CameraDenied);
                None
            }
        }
    }

    async fn sample_loop(
        &self,
        lease: &CameraLease,
        emotion_tx: &watch::Sender<Option<EmotionLabel>>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(self.config.interval);
        // A slow classification skips the ticks it overlapped instead of bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; sampling starts one interval after setup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut cancel_rx => break,
                _ = ticker.tick() => {}
            }

            // Classification runs inline so ticks never overlap; a slow one skips ticks.
            let outcome = tokio::select! {
                _ = &mut cancel_rx => break,
                outcome = sample_tick(self.classifier.as_ref(), lease) => outcome,
            };

            if let Some(label) = outcome.label() {
                publish(emotion_tx, label);
            }
        }
    }
}

/// Runs one classification against the lease's current frame.
pub async fn sample_tick(classifier: &dyn ExpressionClassifier, lease: &CameraLease) -> TickOutcome {
    if !lease.ready_state().can_sample() {
        return TickOutcome::NotReady;
    }
    let Some(frame) = lease.current_frame() else {
        return TickOutcome::NotReady;
    };

    match classifier.detect(&frame).await {
        Ok(detections) => detections
            .first()
            .and_then(|detection| detection.expressions.dominant())
            .map(TickOutcome::Detected)
            .unwrap_or(TickOutcome::NoSubject),
        Err(error) => {
            tracing::debug!(error = %error, "frame classification failed; holding last label");
            TickOutcome::ClassifierFailed
        }
    }
}

fn publish(emotion_tx: &watch::Sender<Option<EmotionLabel>>, label: EmotionLabel) {
    let changed = emotion_tx.send_if_modified(|current| {
        if *current == Some(label) {
            return false;
        }
        *current = Some(label);
        true
    });

    if changed {
        tracing::debug!(emotion = %label, "published emotion label");
    }
}

/// Owner of a running sampler. Dropping it stops sampling and releases the camera.
pub struct SamplerHandle {
    emotion: watch::Receiver<Option<EmotionLabel>>,
    status: watch::Receiver<SamplerStatus>,
    cancel_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    pub fn emotion(&self) -> watch::Receiver<Option<EmotionLabel>> {
        self.emotion.clone()
    }

    pub fn status(&self) -> watch::Receiver<SamplerStatus> {
        self.status.clone()
    }

    pub fn current_emotion(&self) -> Option<EmotionLabel> {
        *self.emotion.borrow()
    }

    pub fn current_status(&self) -> SamplerStatus {
        *self.status.borrow()
    }

    /// Stops the loop and waits until the camera has been released.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take()
            && let Err(error) = task.await
        {
            tracing::warn!(error = %error, "emotion sampler task ended abnormally");
        }
    }

    fn cancel(&mut self) -> bool {
        self.cancel_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
