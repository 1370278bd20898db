//! HTTP API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//! Each route also answers with a trailing slash.
//! Layers (outermost → innermost): CORS → request log → no-store header.

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router over shared state.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    let ml_models = Router::new();
    let ml_models = route_both(ml_models, "/info", get(endpoints::info::model_info));
    let ml_models = route_both(ml_models, "/symptom-checker", post(endpoints::symptoms::check));
    let ml_models = route_both(ml_models, "/symptom-checks", get(endpoints::symptoms::list));
    let ml_models = route_both(
        ml_models,
        "/disease-prediction",
        post(endpoints::disease::predict),
    );
    let ml_models = route_both(ml_models, "/disease-predictions", get(endpoints::disease::list));
    let ml_models = route_both(ml_models, "/treatment-info", post(endpoints::treatment::lookup));
    let ml_models = route_both(ml_models, "/treatment-list", get(endpoints::treatment::list));

    let chatbot = Router::new();
    let chatbot = route_both(chatbot, "/chat", post(endpoints::chatbot::chat));
    let chatbot = route_both(chatbot, "/history", get(endpoints::chatbot::history));

    let api = route_both(Router::new(), "/health", get(endpoints::health::check))
        .nest("/ml-models", ml_models)
        .nest("/chatbot", chatbot)
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(axum::middleware::from_fn(middleware::request_log::log_request))
        .layer(CorsLayer::permissive())
}

/// Register `path` and `path/` on the same handler.
fn route_both(
    router: Router<ApiContext>,
    path: &str,
    method_router: MethodRouter<ApiContext>,
) -> Router<ApiContext> {
    router
        .route(path, method_router.clone())
        .route(&format!("{path}/"), method_router)
}
