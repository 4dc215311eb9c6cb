use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{auth::require_hr_or_admin, rate_limit};
use crate::{routes, AppState};

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct RouterLimits {
    pub admin_rps: u32,
    pub public_rps: u32,
}

pub fn build_router(state: AppState, limits: RouterLimits) -> Router {
    let base_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/health/ready", get(routes::health::ready));

    let public_api = Router::new()
        .route("/api/public/tests", get(routes::public::list_active_tests))
        .route("/api/public/tests/:id", get(routes::public::get_public_test))
        .route(
            "/api/public/tests/:id/attempts",
            post(routes::public::start_attempt),
        )
        .route(
            "/api/public/attempts/:token",
            get(routes::public::get_attempt_status),
        )
        .route(
            "/api/public/attempts/:token/submit",
            post(routes::public::submit_attempt),
        )
        .route(
            "/api/public/attempts/:token/abandon",
            post(routes::public::abandon_attempt),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new("public", limits.public_rps),
            rate_limit::rps_middleware,
        ));

    let admin_api = Router::new()
        .route(
            "/api/admin/tests",
            get(routes::admin::list_tests).post(routes::admin::create_test),
        )
        .route(
            "/api/admin/tests/:id",
            get(routes::admin::get_test)
                .patch(routes::admin::update_test)
                .delete(routes::admin::delete_test),
        )
        .route(
            "/api/admin/tests/:id/questions",
            get(routes::admin::list_questions).post(routes::admin::add_question),
        )
        .route(
            "/api/admin/tests/:id/attempts/export",
            get(routes::export::export_test_attempts),
        )
        .route(
            "/api/admin/questions/:id",
            patch(routes::admin::update_question).delete(routes::admin::delete_question),
        )
        .route("/api/admin/attempts", get(routes::admin::list_attempts))
        .route("/api/admin/attempts/stats", get(routes::admin::attempt_stats))
        .route("/api/admin/attempts/:id", get(routes::admin::get_attempt))
        .route(
            "/api/admin/attempts/:id/rescore",
            post(routes::admin::rescore_attempt),
        )
        .route(
            "/api/admin/onboarding-items/:id",
            get(routes::admin::get_onboarding_item),
        )
        .route(
            "/api/admin/recommendation-rules",
            get(routes::admin::recommendation_rules),
        )
        .layer(axum::middleware::from_fn(require_hr_or_admin))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new("admin", limits.admin_rps),
            rate_limit::rps_middleware,
        ));

    base_routes
        .merge(public_api)
        .merge(admin_api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
