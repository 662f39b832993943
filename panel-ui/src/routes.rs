//! HTTP route handlers for the panel API.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use panel::core::types::RunInputs;
use panel::feedback::{FeedbackOutcome, deliver};
use panel::io::engine::Engine;
use panel::io::settings::{Credentials, CredentialsPatch};
use panel::view::PanelView;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::state::{AppState, ChangeEvent};

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/view", get(get_view))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/runs", post(post_run))
        .route("/feedback/draft", put(put_feedback_draft))
        .route("/feedback", post(post_feedback))
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/view - everything the UI renders.
async fn get_view(State(state): State<AppState>) -> Json<PanelView> {
    Json(state.panel.lock().await.view())
}

/// GET /api/settings - stored credentials, for the settings form.
async fn get_settings(State(state): State<AppState>) -> Json<Credentials> {
    Json(state.panel.lock().await.credentials().clone())
}

/// PUT /api/settings - merge a partial update and persist it.
async fn put_settings(
    State(state): State<AppState>,
    Json(patch): Json<CredentialsPatch>,
) -> Response {
    let changed = !patch.is_empty();
    let mut panel = state.panel.lock().await;
    match panel.update_credentials(patch) {
        Ok(()) => {
            let credentials = panel.credentials().clone();
            drop(panel);
            if changed {
                state.broadcast(ChangeEvent::SettingsChanged);
            }
            Json(credentials).into_response()
        }
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunAccepted {
    run_id: String,
}

/// POST /api/runs - pass the gate, then run the engine in the background.
async fn post_run(State(state): State<AppState>, Json(inputs): Json<RunInputs>) -> Response {
    let ticket = match state.panel.lock().await.begin_run(inputs) {
        Ok(ticket) => ticket,
        Err(rejected) => return error_response(StatusCode::CONFLICT, rejected.to_string()),
    };
    let run_id = ticket.run_id.clone();

    let task_state = state.clone();
    tokio::spawn(async move {
        let outcome = task_state.engine.start(&ticket.inputs).await;
        let run_id = ticket.run_id.clone();
        task_state.panel.lock().await.finish_run(ticket, outcome);
        info!(run_id = %run_id, "run settled");
        task_state.broadcast(ChangeEvent::RunFinished { run_id });
    });

    (StatusCode::ACCEPTED, Json(RunAccepted { run_id })).into_response()
}

#[derive(Deserialize)]
struct DraftBody {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DraftState {
    feedback_enabled: bool,
}

/// PUT /api/feedback/draft - replace the operator's draft.
async fn put_feedback_draft(
    State(state): State<AppState>,
    Json(body): Json<DraftBody>,
) -> Json<DraftState> {
    let mut panel = state.panel.lock().await;
    panel.set_feedback_draft(body.text);
    Json(DraftState {
        feedback_enabled: panel.feedback_enabled(),
    })
}

/// POST /api/feedback - submit the draft to the stage blocked right now.
async fn post_feedback(State(state): State<AppState>) -> Response {
    let request = match state.panel.lock().await.capture_feedback() {
        Ok(request) => request,
        Err(skip) => {
            debug!(reason = %skip, "feedback skipped");
            return (StatusCode::CONFLICT, Json(FeedbackOutcome::skipped(skip))).into_response();
        }
    };

    let outcome = deliver(state.engine.as_ref(), &request).await;
    state.panel.lock().await.settle_feedback(&request, &outcome);

    let status = match &outcome {
        FeedbackOutcome::Delivered { stage_id } => {
            state.broadcast(ChangeEvent::FeedbackSent {
                stage_id: stage_id.clone(),
            });
            StatusCode::OK
        }
        FeedbackOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
        FeedbackOutcome::Skipped { .. } => StatusCode::CONFLICT,
    };
    (status, Json(outcome)).into_response()
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
