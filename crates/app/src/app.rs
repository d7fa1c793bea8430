use std::sync::Arc;

use empath_affect::{
    Camera, EmotionLabel, EmotionSampler, ExpressionClassifier, FixedClassifier, SamplerStatus,
    SyntheticCamera, UnavailableCamera, UnavailableClassifier,
};
use empath_backend::ChatBackend;
use snafu::Snafu;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::chat::{ChatCompletion, ChatSession, Command, OutboundChat, Reconciliation};
use crate::settings::{SamplerSettings, SamplerSource};
use crate::view::{ViewModel, compose};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("chat coordinator is no longer running on `{stage}`"))]
    Closed { stage: &'static str },
}

pub type AppResult<T> = Result<T, AppError>;

/// Owns the chat session and folds user commands, backend completions and
/// sampler updates into one published [`ViewModel`].
pub struct App {
    session: ChatSession,
    backend: Arc<dyn ChatBackend>,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

enum LoopEvent {
    Command(Command),
    Completion(ChatCompletion),
    EmotionChanged { open: bool },
    StatusChanged { open: bool },
    Stop,
}

impl App {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            session: ChatSession::new(),
            backend,
            idle_waiters: Vec::new(),
        }
    }

    /// Starts the coordinator on the current tokio runtime.
    pub fn spawn(
        self,
        emotion: watch::Receiver<Option<EmotionLabel>>,
        status: watch::Receiver<SamplerStatus>,
    ) -> AppHandle {
        let initial = compose(&self.session, *status.borrow());
        let (view_tx, view_rx) = watch::channel(initial);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(self.run(command_rx, emotion, status, view_tx));

        AppHandle {
            commands: command_tx,
            view: view_rx,
            task: Some(task),
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut emotion: watch::Receiver<Option<EmotionLabel>>,
        mut status: watch::Receiver<SamplerStatus>,
        view_tx: watch::Sender<ViewModel>,
    ) {
        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<ChatCompletion>();
        let mut emotion_open = true;
        let mut status_open = true;

        self.session
            .set_current_emotion(*emotion.borrow_and_update());
        let mut sampler_status = *status.borrow_and_update();
        publish_view(&view_tx, &self.session, sampler_status);

        tracing::info!(backend = self.backend.name(), "chat coordinator started");

        loop {
            let event = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => LoopEvent::Command(command),
                    None => LoopEvent::Stop,
                },
                Some(completion) = completion_rx.recv() => LoopEvent::Completion(completion),
                changed = emotion.changed(), if emotion_open => {
                    LoopEvent::EmotionChanged { open: changed.is_ok() }
                }
                changed = status.changed(), if status_open => {
                    LoopEvent::StatusChanged { open: changed.is_ok() }
                }
            };

            match event {
                LoopEvent::Stop => break,
                LoopEvent::Command(command) => {
                    // The sampler may have published since the last wakeup.
                    self.session.set_current_emotion(*emotion.borrow());
                    self.handle_command(command, &completion_tx);
                }
                LoopEvent::Completion(completion) => {
                    let ticket = completion.ticket;
                    let outcome = self.session.complete(completion);
                    if outcome != Reconciliation::Stale {
                        tracing::debug!(ticket = ticket.0, outcome = ?outcome, "chat round trip settled");
                    }
                }
                LoopEvent::EmotionChanged { open } => {
                    emotion_open = open;
                    self.session.set_current_emotion(*emotion.borrow_and_update());
                }
                LoopEvent::StatusChanged { open } => {
                    status_open = open;
                    sampler_status = *status.borrow_and_update();
                }
            }

            publish_view(&view_tx, &self.session, sampler_status);
            self.notify_idle();
        }

        if self.session.is_busy() {
            tracing::warn!("chat coordinator stopped with a reply outstanding");
        }
        tracing::info!("chat coordinator stopped");
    }

    fn handle_command(
        &mut self,
        command: Command,
        completion_tx: &mpsc::UnboundedSender<ChatCompletion>,
    ) {
        let outbound = match command {
            Command::SetDraft(draft) => {
                self.session.set_draft(draft);
                None
            }
            Command::SubmitDraft => self.session.submit_draft(),
            Command::Submit(text) => self.session.submit(text),
            Command::WhenIdle(waiter) => {
                self.idle_waiters.push(waiter);
                None
            }
        };

        if let Some(outbound) = outbound {
            self.dispatch(outbound, completion_tx.clone());
        }
    }

    fn notify_idle(&mut self) {
        if self.session.is_busy() {
            return;
        }
        for waiter in self.idle_waiters.drain(..) {
            // The waiter may have stopped listening.
            let _ = waiter.send(());
        }
    }

    fn dispatch(
        &self,
        outbound: OutboundChat,
        completion_tx: mpsc::UnboundedSender<ChatCompletion>,
    ) {
        let backend = Arc::clone(&self.backend);
        let OutboundChat { ticket, request } = outbound;

        tokio::spawn(async move {
            let result = backend.send_chat(request).await;
            if completion_tx
                .send(ChatCompletion::new(ticket, result))
                .is_err()
            {
                tracing::debug!(ticket = ticket.0, "coordinator gone before completion arrived");
            }
        });
    }
}

fn publish_view(view_tx: &watch::Sender<ViewModel>, session: &ChatSession, status: SamplerStatus) {
    let next = compose(session, status);
    view_tx.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

/// Wires the configured classifier and camera into a sampler.
pub fn build_sampler(settings: &SamplerSettings) -> EmotionSampler {
    let (classifier, camera): (Arc<dyn ExpressionClassifier>, Arc<dyn Camera>) =
        match settings.source {
            SamplerSource::Unavailable => {
                (Arc::new(UnavailableClassifier), Arc::new(UnavailableCamera))
            }
            SamplerSource::Fixed => {
                let label = settings.fixed_emotion.unwrap_or_default();
                tracing::info!(emotion = %label, "using fixed emotion source");
                (Arc::new(FixedClassifier::new(label)), Arc::new(SyntheticCamera))
            }
        };

    EmotionSampler::new(settings.to_sampler_config(), classifier, camera)
}

pub struct AppHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<ViewModel>,
    task: Option<JoinHandle<()>>,
}

impl AppHandle {
    pub fn view(&self) -> watch::Receiver<ViewModel> {
        self.view.clone()
    }

    pub fn current_view(&self) -> ViewModel {
        self.view.borrow().clone()
    }

    pub fn set_draft(&self, draft: impl Into<String>) -> AppResult<()> {
        self.send(Command::SetDraft(draft.into()), "set-draft")
    }

    pub fn submit_draft(&self) -> AppResult<()> {
        self.send(Command::SubmitDraft, "submit-draft")
    }

    pub fn submit(&self, text: impl Into<String>) -> AppResult<()> {
        self.send(Command::Submit(text.into()), "submit")
    }

    /// Resolves once every command sent before it has been applied and no
    /// reply is outstanding.
    ///
    /// The request is queued when this is called, not when the future is first
    /// polled, so it is ordered after any command already sent.
    pub fn wait_idle(&self) -> impl Future<Output = AppResult<()>> {
        let (tx, rx) = oneshot::channel();
        let queued = self.send(Command::WhenIdle(tx), "wait-idle");
        async move {
            queued?;
            rx.await.map_err(|_| ClosedSnafu { stage: "wait-idle" }.build())
        }
    }

    /// Closes the command channel and waits for the coordinator to finish.
    pub async fn shutdown(mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        drop(self);
        if let Err(error) = task.await {
            tracing::warn!(error = %error, "chat coordinator ended abnormally");
        }
    }

    fn send(&self, command: Command, stage: &'static str) -> AppResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ClosedSnafu { stage }.build())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use empath_backend::{BackendError, BackendResult, ChatReply, ChatRequest, HealthStatus};
    use futures::FutureExt;
    use futures::future::BoxFuture;

    use super::*;
    use crate::chat::{BACKEND_UNREACHABLE_TEXT, PENDING_MARKER, Role};
    use crate::view::Theme;

    /// Backend that records requests and answers only when a reply is released.
    struct GatedBackend {
        requests: Mutex<Vec<ChatRequest>>,
        replies: tokio::sync::Mutex<mpsc::UnboundedReceiver<BackendResult<ChatReply>>>,
    }

    impl GatedBackend {
        fn new() -> (Arc<Self>, mpsc::UnboundedSender<BackendResult<ChatReply>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let backend = Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                replies: tokio::sync::Mutex::new(rx),
            });
            (backend, tx)
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl ChatBackend for GatedBackend {
        fn name(&self) -> &str {
            "gated"
        }

        fn send_chat<'a>(&'a self, request: ChatRequest) -> BoxFuture<'a, BackendResult<ChatReply>> {
            async move {
                self.requests.lock().unwrap().push(request);
                let mut replies = self.replies.lock().await;
                replies
                    .recv()
                    .await
                    .unwrap_or_else(|| Ok(ChatReply::default()))
            }
            .boxed()
        }

        fn health<'a>(&'a self) -> BoxFuture<'a, BackendResult<HealthStatus>> {
            async move {
                Ok(HealthStatus {
                    status: 200,
                    message: Some("ok".to_string()),
                })
            }
            .boxed()
        }
    }

    struct Harness {
        backend: Arc<GatedBackend>,
        replies: mpsc::UnboundedSender<BackendResult<ChatReply>>,
        emotion_tx: watch::Sender<Option<EmotionLabel>>,
        status_tx: watch::Sender<SamplerStatus>,
        handle: AppHandle,
    }

    fn harness(emotion: Option<EmotionLabel>) -> Harness {
        let (backend, replies) = GatedBackend::new();
        let (emotion_tx, emotion_rx) = watch::channel(emotion);
        let (status_tx, status_rx) = watch::channel(SamplerStatus::Ready);
        let handle = App::new(backend.clone()).spawn(emotion_rx, status_rx);

        Harness {
            backend,
            replies,
            emotion_tx,
            status_tx,
            handle,
        }
    }

    async fn wait_view(
        view: &mut watch::Receiver<ViewModel>,
        predicate: impl FnMut(&ViewModel) -> bool,
    ) -> ViewModel {
        tokio::time::timeout(Duration::from_secs(5), view.wait_for(predicate))
            .await
            .expect("view did not reach the expected state")
            .expect("coordinator stopped")
            .clone()
    }

    #[tokio::test]
    async fn submit_shows_placeholder_then_reply() {
        let h = harness(Some(EmotionLabel::Happy));
        let mut view = h.handle.view();

        h.handle.set_draft("hello").unwrap();
        h.handle.submit_draft().unwrap();

        let busy = wait_view(&mut view, |v| v.messages.len() == 2).await;
        assert_eq!(busy.messages[0].text, "hello");
        assert_eq!(busy.messages[1].text, PENDING_MARKER);
        assert!(busy.messages[1].in_progress);
        assert!(!busy.input.enabled);
        assert_eq!(busy.input.draft, "");

        h.replies.send(Ok(ChatReply::with_reply("hi!"))).unwrap();

        let settled = wait_view(&mut view, |v| v.input.enabled && !v.messages.is_empty()).await;
        assert_eq!(settled.messages.len(), 2);
        assert_eq!(settled.messages[1].role, Role::Assistant);
        assert_eq!(settled.messages[1].text, "hi!");
        assert!(!settled.messages[1].in_progress);
        assert_eq!(
            h.backend.requests(),
            vec![ChatRequest::new("hello", "happy")]
        );

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn wait_idle_holds_until_the_queued_submit_settles() {
        let h = harness(None);
        let mut view = h.handle.view();

        h.handle.set_draft("hello").unwrap();
        h.handle.submit_draft().unwrap();
        let mut idle = Box::pin(h.handle.wait_idle());

        wait_view(&mut view, |v| !v.input.enabled).await;
        assert!(
            tokio::time::timeout(Duration::from_millis(50), &mut idle)
                .await
                .is_err()
        );

        h.replies.send(Ok(ChatReply::with_reply("hi!"))).unwrap();
        idle.await.unwrap();

        let settled = h.handle.current_view();
        assert!(settled.input.enabled);
        assert_eq!(settled.messages.len(), 2);
        assert_eq!(settled.messages[1].text, "hi!");

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn wait_idle_returns_at_once_when_nothing_is_in_flight() {
        let h = harness(None);

        tokio::time::timeout(Duration::from_secs(5), h.handle.wait_idle())
            .await
            .expect("idle wait should not block")
            .unwrap();

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn lines_sent_between_idle_waits_all_reach_the_backend() {
        let h = harness(None);
        h.replies.send(Ok(ChatReply::with_reply("one"))).unwrap();
        h.replies.send(Ok(ChatReply::with_reply("two"))).unwrap();

        for line in ["first", "second"] {
            h.handle.set_draft(line).unwrap();
            h.handle.submit_draft().unwrap();
            h.handle.wait_idle().await.unwrap();
        }

        let texts = h
            .handle
            .current_view()
            .messages
            .into_iter()
            .map(|message| message.text)
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["first", "one", "second", "two"]);
        assert_eq!(
            h.backend.requests(),
            vec![
                ChatRequest::new("first", "neutral"),
                ChatRequest::new("second", "neutral"),
            ]
        );

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn second_submit_while_busy_sends_nothing() {
        let h = harness(None);
        let mut view = h.handle.view();

        h.handle.submit("first").unwrap();
        h.handle.submit("second").unwrap();
        h.handle.set_draft("marker").unwrap();

        let busy = wait_view(&mut view, |v| v.input.draft == "marker").await;
        assert_eq!(busy.messages.len(), 2);
        assert_eq!(busy.messages[0].text, "first");

        h.replies.send(Ok(ChatReply::with_reply("one"))).unwrap();
        let settled = wait_view(&mut view, |v| v.input.enabled).await;

        assert_eq!(settled.messages.len(), 2);
        assert_eq!(h.backend.requests(), vec![ChatRequest::new("first", "neutral")]);

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn failed_round_trip_appends_system_line_and_unlocks_input() {
        let h = harness(None);
        let mut view = h.handle.view();

        h.handle.submit("hello").unwrap();
        wait_view(&mut view, |v| !v.input.enabled).await;

        h.replies
            .send(Err(BackendError::UnhealthyStatus {
                stage: "test",
                status: 503,
                body: String::new(),
            }))
            .unwrap();

        let failed = wait_view(&mut view, |v| v.messages.len() == 3).await;
        assert!(failed.input.enabled);
        assert_eq!(failed.messages[2].role, Role::System);
        assert_eq!(failed.messages[2].text, BACKEND_UNREACHABLE_TEXT);

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn sampler_updates_flow_into_view_and_requests() {
        let h = harness(None);
        let mut view = h.handle.view();

        h.emotion_tx.send(Some(EmotionLabel::Sad)).unwrap();
        let themed = wait_view(&mut view, |v| v.emotion == EmotionLabel::Sad).await;
        assert!(themed.emotion_detected);
        assert_eq!(themed.theme, Theme::for_emotion(Some(EmotionLabel::Sad)));
        assert_eq!(themed.highlighted(), Some(EmotionLabel::Sad));

        h.status_tx.send(SamplerStatus::CameraDenied).unwrap();
        wait_view(&mut view, |v| {
            v.sampler_status == SamplerStatus::CameraDenied.message()
        })
        .await;

        h.handle.submit("hello").unwrap();
        wait_view(&mut view, |v| !v.input.enabled).await;
        h.replies.send(Ok(ChatReply::default())).unwrap();
        wait_view(&mut view, |v| v.input.enabled && v.messages.len() == 2).await;

        assert_eq!(h.backend.requests(), vec![ChatRequest::new("hello", "sad")]);

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_the_view_channel() {
        let h = harness(None);
        let view = h.handle.view();
        h.handle.shutdown().await;

        assert!(view.has_changed().is_err());
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_source_publishes_its_label() {
        let settings = SamplerSettings {
            source: SamplerSource::Fixed,
            fixed_emotion: Some(EmotionLabel::Surprised),
            ..SamplerSettings::default()
        };
        let sampler = build_sampler(&settings).spawn();
        let mut emotion = sampler.emotion();

        let label = *emotion
            .wait_for(|label| label.is_some())
            .await
            .unwrap();

        assert_eq!(label, Some(EmotionLabel::Surprised));
        assert_eq!(sampler.current_status(), SamplerStatus::Ready);
        sampler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_source_reports_model_failure() {
        let sampler = build_sampler(&SamplerSettings::default()).spawn();
        let mut status = sampler.status();

        let reached = *status.wait_for(|status| status.is_failure()).await.unwrap();

        assert_eq!(reached, SamplerStatus::ModelsUnavailable);
        assert_eq!(sampler.current_emotion(), None);
        sampler.shutdown().await;
    }
}
