//! Shared application state for the panel server.

use std::sync::Arc;
use std::time::Duration;

use panel::io::init::PanelPaths;
use panel::panel::Panel;
use tokio::sync::{Mutex, broadcast};

use crate::engine::DirEngine;

/// Events broadcast to SSE clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The engine published a new snapshot.
    SnapshotChanged,
    /// A start request settled (finished, stopped or failed).
    RunFinished { run_id: String },
    FeedbackSent { stage_id: String },
    SettingsChanged,
}

/// Shared state accessible from all request handlers.
///
/// Handlers never hold the panel lock across an engine call.
#[derive(Clone)]
pub struct AppState {
    pub paths: PanelPaths,
    pub panel: Arc<Mutex<Panel>>,
    pub engine: Arc<DirEngine>,
    /// Broadcast sender for change events.
    pub event_tx: Arc<broadcast::Sender<ChangeEvent>>,
    pub poll_interval: Duration,
}

impl AppState {
    pub fn new(panel: Panel) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let paths = panel.paths().clone();
        let poll_interval = Duration::from_millis(panel.config().poll_interval_ms);
        Self {
            engine: Arc::new(DirEngine::new(&paths, poll_interval)),
            paths,
            panel: Arc::new(Mutex::new(panel)),
            event_tx: Arc::new(event_tx),
            poll_interval,
        }
    }

    /// Send to all subscribers; no subscribers is fine.
    pub fn broadcast(&self, event: ChangeEvent) {
        let _ = self.event_tx.send(event);
    }
}
