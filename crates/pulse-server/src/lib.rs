pub mod auth;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health::health))
        // Session
        .route("/api/auth/sign-in", post(routes::session::sign_in))
        .route("/api/me", get(routes::session::me))
        .route(
            "/api/me/onboarding",
            get(routes::session::onboarding_status).post(routes::session::complete_onboarding),
        )
        // Users
        .route("/api/users/{id}", get(routes::users::get_user))
        .route("/api/users/{id}/targets", put(routes::users::update_targets))
        .route(
            "/api/users/{id}/targets/monthly",
            get(routes::users::monthly_targets),
        )
        .route("/api/users/{id}/progress", get(routes::users::progress))
        .route("/api/users/{id}/entries", get(routes::users::list_entries))
        .route("/api/users/{id}/goals", get(routes::users::list_goals))
        .route(
            "/api/users/{id}/reflections",
            get(routes::users::list_reflections),
        )
        // Own records
        .route("/api/entries", post(routes::entries::record_entry))
        .route(
            "/api/goals/current",
            get(routes::goals::get_current).put(routes::goals::set_current),
        )
        .route("/api/goals/review", post(routes::goals::review))
        .route("/api/reflections", post(routes::reflections::add_reflection))
        // Questions
        .route("/api/questions/today", get(routes::questions::today))
        .route("/api/questions/{weekday}", get(routes::questions::by_weekday))
        // Team
        .route("/api/team/members", get(routes::team::members))
        .route("/api/team/{team_id}/analytics", get(routes::team::analytics))
        .route("/api/team/{team_id}/targets", get(routes::team::team_targets))
        // Admin
        .route("/api/admin/users", get(routes::admin::list_users))
        .route("/api/admin/users/{id}/role", put(routes::admin::change_role))
        .route(
            "/api/admin/users/{id}/leader",
            put(routes::admin::assign_leader),
        )
        .route(
            "/api/admin/questions/{weekday}",
            put(routes::admin::put_questions),
        )
        .route(
            "/api/admin/maintenance/migrate",
            post(routes::admin::migrate),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Bind `bind:port` and serve until the process is stopped.
pub async fn serve(app_state: AppState, bind: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(app_state, listener).await
}

/// Serve on an already-bound listener so callers can read the actual port
/// first (useful with port 0).
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let local = listener.local_addr()?;
    let app = build_router(app_state);
    tracing::info!("pulse server listening on http://{local}");
    axum::serve(listener, app).await?;
    Ok(())
}
