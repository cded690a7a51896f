use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, TokenVerifier};
use crate::routes::{accounts, health};
use crate::state::AppState;

pub fn create_app(state: AppState, verifier: Option<TokenVerifier>) -> Router {
    let mut account_routes = accounts::router();
    if let Some(verifier) = verifier {
        account_routes = account_routes
            .route_layer(middleware::from_fn_with_state(verifier, auth::require_token));
    }

    Router::<AppState>::new()
        .nest("/health", health::router())
        .merge(account_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
