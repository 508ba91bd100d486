pub mod error;
pub mod gateway;
pub mod hub;
pub mod ledger;
pub mod mirror;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod sweep;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use courier_core::config::{Config, StorageBackend};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use state::{AppState, Backends};

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let storage = &app_state.config.storage;
    // Room for every file plus multipart framing.
    let upload_limit = storage
        .max_files
        .saturating_mul(storage.max_file_bytes)
        .saturating_add(64 * 1024);

    let mut router = Router::new()
        // Orders
        .route("/api/orders", post(routes::orders::create_order))
        .route("/api/orders/{id}", get(routes::orders::get_order))
        .route("/api/riders", get(routes::riders::list_riders))
        // Attachments
        .route(
            "/api/upload",
            post(routes::uploads::upload_files).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/delete", post(routes::uploads::delete_file))
        .route("/api/uploads", get(routes::uploads::list_files))
        // Payments
        .route(
            "/api/payment/initialize",
            post(routes::payments::initialize),
        )
        .route("/api/paypal/capture", get(routes::payments::capture))
        .route("/api/paypal/cancel", get(routes::payments::cancel))
        .route(
            "/api/payment/status/{order_id}",
            get(routes::payments::status),
        )
        .route(
            "/api/payment/history/{order_id}",
            get(routes::payments::history),
        )
        .route(
            "/api/payment/check/{order_id}",
            get(routes::payments::check),
        )
        .route(
            "/api/webhooks/paypal",
            post(routes::webhooks::paypal_webhook),
        )
        // Live updates
        .route("/ws", get(routes::ws::ws_handler));

    let public_base = storage.public_base.trim_end_matches('/');
    if storage.backend == StorageBackend::Local && public_base.starts_with('/') {
        router = router.nest_service(public_base, ServeDir::new(&storage.local_dir));
    }
    if let Some(dir) = &app_state.config.server.public_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the courier server on `config.server.host:port`.
pub async fn serve(config: Config, open_browser: bool) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(config, listener, open_browser).await
}

/// Start the courier server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(
    config: Config,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app_state = AppState::from_config(config)?;

    let sweep = sweep::spawn_abandonment_sweep(
        app_state.payments.clone(),
        app_state.orders.clone(),
        app_state.config.payments.sweep_interval(),
        app_state.config.payments.abandon_after(),
    );
    let progress = app_state.progress.clone();
    let app = build_router(app_state);

    tracing::info!("courier server listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}");
        let _ = open::that(&url);
    }

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    progress.shutdown();
    sweep.abort();
    tracing::info!("courier server stopped");
    result?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
