//! HTTP surface: the JSON API under `/api` and local media under `/media`.

mod auth;
mod error;
mod form;
mod handlers;
mod middleware;
mod models;
mod rate_limit;
mod state;

use std::path::PathBuf;

use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, patch, post, put};
use axum::{Router, middleware as axum_middleware};

use crate::domain::resources::ResourceKind;

pub use auth::{AdminTokens, hash_token};
pub use error::{ApiError, codes};
pub use middleware::METRIC_RATE_LIMITED;
pub use rate_limit::{ApiRateLimiter, RateDecision};
pub use state::{HealthCheck, HttpState};

use handlers::MediaRoot;
use middleware::{api_rate_limit, log_responses, require_admin, set_request_context};

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub body_limit_bytes: usize,
    /// Directory served under `/media` when files are kept locally.
    pub media_dir: Option<PathBuf>,
}

pub fn build_router(state: HttpState, options: RouterOptions) -> Router {
    let mut api = Router::new().route("/api/health", get(handlers::health));

    for kind in ResourceKind::ALL {
        api = api.merge(resource_routes(&state, kind));
    }
    api = api.merge(contact_routes(&state));

    let api = api
        .fallback(route_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            api_rate_limit,
        ))
        .layer(DefaultBodyLimit::max(options.body_limit_bytes))
        .with_state(state);

    let app = match options.media_dir {
        Some(dir) => Router::new()
            .route("/media/{*path}", get(handlers::serve_media))
            .layer(Extension(MediaRoot(dir)))
            .merge(api),
        None => api,
    };

    app.layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

fn resource_routes(state: &HttpState, kind: ResourceKind) -> Router<HttpState> {
    let base = format!("/api/{}", kind.segment());

    let mut public = Router::new()
        .route(&base, get(handlers::list_resources))
        .route(&format!("{base}/active"), get(handlers::list_active_resources));
    if !kind.stats_groups().is_empty() {
        public = public.route(&format!("{base}/stats"), get(handlers::resource_stats));
    }
    let public = public.route(&format!("{base}/{{id}}"), get(handlers::get_resource));

    let admin = Router::new()
        .route(&base, post(handlers::create_resource))
        .route(
            &format!("{base}/reorder"),
            put(handlers::reorder_resources).patch(handlers::reorder_resources),
        )
        .route(
            &format!("{base}/{{id}}"),
            put(handlers::update_resource).delete(handlers::delete_resource),
        )
        .route(
            &format!("{base}/{{id}}/toggle"),
            patch(handlers::toggle_resource),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    public.merge(admin).layer(Extension(kind))
}

fn contact_routes(state: &HttpState) -> Router<HttpState> {
    let public = Router::new().route("/api/contacts", post(handlers::submit_contact));

    let admin = Router::new()
        .route("/api/contacts", get(handlers::list_contacts))
        .route(
            "/api/contacts/{id}",
            get(handlers::get_contact).delete(handlers::delete_contact),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    public.merge(admin)
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
