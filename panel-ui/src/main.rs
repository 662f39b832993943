//! Panel UI server - web control surface for a curation engine.

mod engine;
mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::Router;
use axum::routing::get;
use clap::Parser;
use panel::panel::Panel;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "panel-ui")]
#[command(about = "Web control panel for starting runs and steering blocked stages")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Project directory (contains .panel/)
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Directory containing UI static files (defaults to ./ui/dist under the project)
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    panel::logging::init_with_default(panel::logging::SERVER_DIRECTIVES);

    let args = Args::parse();
    let project_dir = args.project_dir.canonicalize().unwrap_or(args.project_dir);
    info!(project_dir = %project_dir.display(), "starting panel-ui");

    let state = AppState::new(Panel::open(&project_dir)?);
    sse::start_snapshot_watcher(state.clone());

    let ui_dir = args
        .ui_dir
        .unwrap_or_else(|| project_dir.join("ui").join("dist"));
    let app = build_app(state, &ui_dir);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// API under `/api`, SSE at `/events`, static UI as fallback when present.
fn build_app(state: AppState, ui_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", routes::api_router())
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    if !ui_dir.exists() {
        info!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
        return app;
    }
    info!(ui_dir = %ui_dir.display(), "serving static UI files");
    app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true))
}
