use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{elevated, protected, public};
use crate::middleware::{verify_admin, verify_principal};
use crate::state::AppState;

/// Full application router: the three security tiers merged under shared
/// CORS and request tracing
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::health::root))
        .route("/health", get(public::health::health))
        .route("/public-lessons", get(public::lessons::public_lessons))
        .route("/lessons/featured", get(public::lessons::featured))
        .route("/lessons/most-favorites", get(public::lessons::most_favorites))
        .route("/users/top-contributors", get(public::lessons::top_contributors))
        .route("/analytics/accessLevel", get(public::analytics::access_level))
        .route("/users", post(public::users::register))
        .route("/users/:id/role", get(public::users::role))
        .route("/session-status", patch(public::payments::session_status))
        .route("/webhooks/payment", post(public::payments::webhook))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/lessons",
            post(protected::lessons::create).get(protected::lessons::list),
        )
        .route(
            "/lessons/:id",
            get(protected::lessons::get)
                .patch(protected::lessons::update)
                .delete(protected::lessons::delete),
        )
        .route("/lesson/:id/likes", patch(protected::reactions::toggle_like))
        .route("/lesson/:id/favorites", patch(protected::reactions::toggle_favorite))
        .route("/lesson/:id/comments", patch(protected::reactions::add_comment))
        .route("/report/:id", patch(protected::reactions::add_report))
        .route(
            "/users",
            get(protected::users::list).patch(protected::users::update_profile),
        )
        .route("/create-checkout-session", post(protected::payments::create_checkout))
        .route_layer(from_fn_with_state(state, verify_principal))
}

fn elevated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/overview", get(elevated::overview::overview))
        .route("/lessons/:id/featured", patch(elevated::lessons::set_featured))
        .route("/lessons/:id/reports", get(elevated::lessons::reports))
        .route("/users/:id/role", patch(elevated::users::update_role))
        .route("/user/:id", patch(elevated::users::update_user))
        // Outermost layer runs first: principal, then admin
        .route_layer(from_fn_with_state(state.clone(), verify_admin))
        .route_layer(from_fn_with_state(state, verify_principal))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Skipping invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}
