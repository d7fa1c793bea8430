use std::sync::Arc;

use empath::app::{App, build_sampler};
use empath::settings::SettingsStore;
use empath::terminal::TerminalRenderer;
use empath_backend::{BackendConfig, ChatBackend, create_backend};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Terminal front end.
///
/// 1. Loads settings (defaults, JSON file, `EMPATH_*` environment)
/// 2. Starts the emotion sampler and the chat coordinator
/// 3. Submits each stdin line and prints view changes until EOF
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let store = SettingsStore::load();
    let settings = store.settings().clone();
    tracing::info!(config = ?store.config_path(), backend_url = %settings.backend_url, "settings loaded");

    let Some(backend) = open_backend(settings.to_backend_config()) else {
        return;
    };

    match backend.health().await {
        Ok(health) => tracing::info!(
            status = health.status,
            detail = health.message.as_deref().unwrap_or_default(),
            "chat backend reachable"
        ),
        Err(error) => tracing::warn!(error = %error, "chat backend health probe failed"),
    }

    let sampler = build_sampler(&settings.sampler).spawn();
    let app = App::new(backend).spawn(sampler.emotion(), sampler.status());

    let mut view = app.view();
    let renderer = tokio::spawn(async move {
        let mut renderer = TerminalRenderer::new();
        loop {
            let snapshot = view.borrow_and_update().clone();
            for line in renderer.render(&snapshot) {
                println!("{line}");
            }
            if view.changed().await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Err(error) = app.set_draft(line).and_then(|()| app.submit_draft()) {
                    tracing::error!(error = %error, "failed to submit input");
                    break;
                }
                // One line per round trip; a line sent while busy would be dropped.
                if let Err(error) = app.wait_idle().await {
                    tracing::error!(error = %error, "coordinator stopped while a reply was outstanding");
                    break;
                }
            }
            Ok(None) => break,
            Err(error) => {
                tracing::warn!(error = %error, "failed to read stdin");
                break;
            }
        }
    }

    // Let an outstanding reply land before tearing down.
    if let Err(error) = app.wait_idle().await {
        tracing::debug!(error = %error, "coordinator stopped before the last reply settled");
    }

    app.shutdown().await;
    sampler.shutdown().await;
    if let Err(error) = renderer.await {
        tracing::warn!(error = %error, "renderer task ended abnormally");
    }
}

fn open_backend(config: BackendConfig) -> Option<Arc<dyn ChatBackend>> {
    match create_backend(config) {
        Ok(backend) => Some(backend),
        Err(error) => {
            tracing::warn!(error = %error, "invalid backend settings. using default backend");
            create_backend(BackendConfig::default())
                .inspect_err(|error| tracing::error!(error = %error, "failed to build chat backend"))
                .ok()
        }
    }
}
