pub mod cards;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

/// The `/v1` API.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/users", post(users::create))
        .route("/v1/users/ids", post(users::find_by_ids))
        .route("/v1/users/email/{email}", get(users::find_by_email))
        .route(
            "/v1/users/{id}",
            get(users::find_by_id)
                .put(users::update)
                .delete(users::delete),
        )
        .route("/v1/cards", post(cards::create))
        .route("/v1/cards/ids", post(cards::find_by_ids))
        .route(
            "/v1/cards/{id}",
            get(cards::find_by_id)
                .put(cards::update)
                .delete(cards::delete),
        )
}
