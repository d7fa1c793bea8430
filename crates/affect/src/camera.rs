use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::AffectResult;

/// Readiness of a live video source, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// Frames are only decodable once enough data is buffered.
    pub fn can_sample(self) -> bool {
        self == Self::HaveEnoughData
    }
}

/// One decoded frame handed to the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }
}

pub trait VideoStream: Send + Sync {
    fn ready_state(&self) -> ReadyState;
    fn current_frame(&self) -> Option<VideoFrame>;
    /// Stops every track of the stream. Called exactly once by [`CameraLease`].
    fn release(&mut self);
}

/// User-media capability.
pub trait Camera: Send + Sync {
    fn acquire<'a>(&'a self) -> BoxFuture<'a, AffectResult<Box<dyn VideoStream>>>;
}

/// Scoped ownership of an acquired stream; releases it when dropped.
pub struct CameraLease {
    stream: Option<Box<dyn VideoStream>>,
}

impl CameraLease {
    pub fn new(stream: Box<dyn VideoStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub fn ready_state(&self) -> ReadyState {
        self.stream
            .as_ref()
            .map(|stream| stream.ready_state())
            .unwrap_or_default()
    }

    pub fn current_frame(&self) -> Option<VideoFrame> {
        self.stream.as_ref().and_then(|stream| stream.current_frame())
    }

    pub fn release(mut self) {
        self.release_stream();
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            tracing::debug!("camera stream released");
        }
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.release_stream();
    }
}
