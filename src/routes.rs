use axum::routing::get;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers;
use crate::AppState;

/// Builds the API router. Listing and detail accept anonymous callers;
/// everything that writes requires a bearer token.
pub fn api_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let api = Router::new()
        .route(
            "/polls",
            get(handlers::list_polls).post(handlers::create_poll),
        )
        .route(
            "/polls/{id}",
            get(handlers::poll_detail)
                .put(handlers::update_poll)
                .delete(handlers::delete_poll),
        )
        .route(
            "/polls/{id}/vote",
            get(handlers::vote_status).post(handlers::cast_vote),
        )
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::upsert_profile),
        );

    Router::new().nest("/api", api).layer(cors).with_state(state)
}
