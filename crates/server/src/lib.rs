//! opengin-x web server.
//!
//! Proxies the knowledge-graph read API, explores entity categories and
//! serves the legislative acts viewer with its PDFs.

pub mod routes;
pub mod state;

use anyhow::Context;
use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use core_types::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use routes::{
    analyze_act, clear_calls, explore_entity, get_act, get_acts_stats, get_attribute_value,
    list_acts, list_calls, proxy, proxy_preflight, run_query,
};
pub use state::AppState;

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    // The proxy sets its own CORS headers, including on errors.
    let proxy_routes = Router::new().route(
        "/proxy/*path",
        get(proxy).post(proxy).options(proxy_preflight),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/query", post(run_query))
        .route("/explore/:id", get(explore_entity))
        .route("/entities/:id/attributes/:name", get(get_attribute_value))
        .route("/acts", get(list_acts))
        .route("/acts/stats", get(get_acts_stats))
        .route("/acts/:id", get(get_act))
        .route("/acts/:id/analyze", post(analyze_act))
        .route("/calls", get(list_calls).delete(clear_calls))
        .layer(cors)
        .merge(proxy_routes);

    let app = Router::new()
        .nest("/api", api_routes)
        .nest_service("/pdfs", ServeDir::new(&state.config.acts.pdf_dir));

    // Serve a prebuilt front end for everything else, when configured
    let app = match &state.config.server.static_dir {
        Some(dir) => {
            app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        None => app,
    };

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Bind the configured address and serve until the process is stopped.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    let state = AppState::from_config(config)?;
    info!(
        upstream = %state.read_api.base_url(),
        analysis = state.analysis.base_url(),
        acts = state.acts.len(),
        "Starting server"
    );

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Server listening on http://{}", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
