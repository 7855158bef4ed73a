//! API layer - HTTP handlers and routing
//!
//! JSON endpoints under `/api`:
//! - Sign-up, credential login/logout, session lookup
//! - OAuth sign-in and callback
//! - Post listing, detail and owner-only edits
//! - Profile edits
//! - Image uploads (served back under `/uploads`)

pub mod auth;
pub mod common;
pub mod middleware;
pub mod posts;
pub mod profile;
pub mod responses;
pub mod upload;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use middleware::{ApiError, ApiJson, AppState, AuthenticatedUser, CurrentUser};

/// Multipart framing allowance on top of the configured file size
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let upload_limit = state.config.upload.max_file_size as usize + MULTIPART_OVERHEAD;

    // Protected routes (need a session)
    let protected_routes = Router::new()
        .route("/post", post(posts::create_post))
        .route(
            "/post/{id}",
            patch(posts::update_post).delete(posts::delete_post),
        )
        .route("/profile", patch(profile::update_profile))
        .route(
            "/upload",
            post(upload::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Session lookup resolves the user when there is one
    let session_routes = Router::new()
        .route("/auth/session", get(auth::session))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ));

    // Public routes
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/signin/{provider}", get(auth::oauth_signin))
        .route("/auth/callback/{provider}", get(auth::oauth_callback))
        .route("/post", get(posts::list_posts))
        .route("/post/{id}", get(posts::get_post))
        .merge(session_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let origin = state
        .config
        .server
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", state.config.server.cors_origin))?;

    // Cookie-based auth needs credentials allowed for the UI origin
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    let uploads = ServeDir::new(&state.config.upload.path);

    Ok(Router::new()
        .nest("/api", build_api_router(state.clone()))
        .nest_service("/uploads", uploads)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
