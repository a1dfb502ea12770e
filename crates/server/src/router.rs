//! Routers for the four listeners.
//!
//! Each front-end binds its own address, so each gets its own router with
//! the shared state and the common tracing and CORS layers.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppState;
use crate::handlers;

pub fn rest(state: AppState) -> Router {
    let routes = Router::new()
        .route(
            "/api/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/api/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/health", get(health_check));
    finish(routes, state)
}

pub fn soap(state: AppState) -> Router {
    finish(Router::new().route("/soap", post(handlers::soap_handler)), state)
}

pub fn graphql(state: AppState) -> Router {
    let routes = Router::new().route(
        "/graphql",
        get(handlers::graphiql).post(handlers::graphql_handler),
    );
    finish(routes, state)
}

pub fn ws(state: AppState) -> Router {
    finish(Router::new().route("/ws", get(handlers::ws_handler)), state)
}

fn finish(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}
