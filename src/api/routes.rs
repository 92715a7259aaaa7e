use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::api::{ai, copyleaks};

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/ai-provider", get(ai::get_provider).post(ai::set_provider))
        .route("/generate/lead", post(ai::generate_lead))
        .route("/generate/narrative-story", post(ai::generate_narrative))
        .route("/copyleaks/scan", post(copyleaks::scan))
        .route("/copyleaks/scan-article", post(copyleaks::scan_article))
        .route("/copyleaks/test-scan", post(copyleaks::test_scan))
        .route("/copyleaks/export", post(copyleaks::export))
        .route("/copyleaks/export-data", get(copyleaks::export_data))
        .route(
            "/copyleaks/export/completed/:scan_id",
            get(copyleaks::completed_status).post(copyleaks::completed_webhook),
        )
        .route(
            "/copyleaks/export/source/:scan_id",
            get(copyleaks::source_status).post(copyleaks::source_webhook),
        )
        .route(
            "/copyleaks/export/result/:scan_id/:result_id",
            post(copyleaks::result_webhook),
        )
        .route("/copyleaks/export/done/:scan_id", post(copyleaks::export_done_webhook))
        .route("/copyleaks/detailed-result", get(copyleaks::detailed_result))
        .route("/copyleaks/correlation-keys", get(copyleaks::correlation_keys))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}
