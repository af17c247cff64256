//! Router assembly: common routes plus the `/users` and `/group-example` groups.

mod common;
mod entity;

pub use common::common_routes;
pub use entity::entity_routes;

use crate::entity::{GroupExample, GroupExampleFilters, GroupExampleOrders, User, UserBrief, UserFilters, UserOrders};
use crate::handlers::generic::{group, query_as};
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::post, Router};
use tower_http::trace::TraceLayer;

pub fn user_routes() -> Router<AppState> {
    entity_routes::<User, UserFilters, UserOrders>()
        .route("/query2", post(query_as::<User, UserBrief, UserFilters, UserOrders>))
}

pub fn group_example_routes() -> Router<AppState> {
    entity_routes::<GroupExample, GroupExampleFilters, GroupExampleOrders>()
        .route("/group", post(group::<GroupExample, GroupExampleFilters>))
}

/// The full application with request tracing and a body size cap. Oversized bodies fail
/// the JSON extractor, so they are answered with the `Invalid request` envelope.
pub fn app(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .merge(common_routes())
        .nest("/users", user_routes())
        .nest("/group-example", group_example_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
