//! Server-Sent Events stream and snapshot watcher.

use std::convert::Infallible;
use std::path::Path;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures::stream::Stream;
use notify::{Event as NotifyEvent, EventKind, PollWatcher, RecursiveMode, Watcher};
use panel::io::engine::load_snapshot;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::{AppState, ChangeEvent};

#[derive(Serialize)]
struct SsePayload {
    #[serde(rename = "type")]
    event_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage_id: Option<String>,
}

impl From<&ChangeEvent> for SsePayload {
    fn from(event: &ChangeEvent) -> Self {
        let (event_type, run_id, stage_id) = match event {
            ChangeEvent::SnapshotChanged => ("snapshot_changed", None, None),
            ChangeEvent::RunFinished { run_id } => ("run_finished", Some(run_id.clone()), None),
            ChangeEvent::FeedbackSent { stage_id } => {
                ("feedback_sent", None, Some(stage_id.clone()))
            }
            ChangeEvent::SettingsChanged => ("settings_changed", None, None),
        };
        SsePayload {
            event_type,
            run_id,
            stage_id,
        }
    }
}

/// SSE endpoint handler.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_tx.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(change_event) => {
                    let payload = SsePayload::from(&change_event);
                    if let Ok(json) = serde_json::to_string(&payload) {
                        yield Ok(Event::default().event("change").data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Load the current snapshot once, then watch for replacements in the background.
pub fn start_snapshot_watcher(state: AppState) {
    tokio::spawn(async move {
        reload_snapshot(&state).await;
        if let Err(e) = run_snapshot_watcher(state).await {
            warn!(error = %e, "snapshot watcher failed");
        }
    });
}

async fn run_snapshot_watcher(state: AppState) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel::<NotifyEvent>(100);

    let mut watcher = PollWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.try_send(event);
            }
        },
        notify::Config::default().with_poll_interval(state.poll_interval),
    )?;

    // The engine may start after the panel; the directory must exist to be watched.
    std::fs::create_dir_all(&state.paths.engine_dir)?;
    watcher.watch(&state.paths.engine_dir, RecursiveMode::NonRecursive)?;
    info!(path = %state.paths.engine_dir.display(), "watching engine directory");

    let mut pending_events: Vec<NotifyEvent> = Vec::new();
    let mut flush_tick = tokio::time::interval(state.poll_interval);
    flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                pending_events.push(event);
            }
            _ = flush_tick.tick() => {
                if pending_events.is_empty() {
                    continue;
                }
                if snapshot_touched(&state.paths.snapshot_path, &pending_events) {
                    reload_snapshot(&state).await;
                }
                pending_events.clear();
            }
        }
    }
}

/// Whether any create/modify event in the batch names the snapshot file.
fn snapshot_touched(snapshot_path: &Path, events: &[NotifyEvent]) -> bool {
    events
        .iter()
        .filter(|event| matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)))
        .any(|event| event.paths.iter().any(|path| path == snapshot_path))
}

/// Feed the published snapshot to the panel and notify clients.
///
/// An unreadable snapshot is skipped; the previous one stays in place.
pub async fn reload_snapshot(state: &AppState) {
    let snapshot = match load_snapshot(&state.paths.snapshot_path) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "snapshot skipped");
            return;
        }
    };
    state.panel.lock().await.observe(snapshot);
    debug!("broadcasting snapshot change");
    state.broadcast(ChangeEvent::SnapshotChanged);
}
