//! Per-entity route group. Every endpoint is a JSON POST.

use crate::entity::Entity;
use crate::handlers::generic::{
    batch_create, batch_delete, batch_update, batch_update_by_filters, create, delete as delete_handler,
    one, query, query_extended, stats, update, Shape,
};
use crate::query::{FilterSet, OrderSet};
use crate::state::AppState;
use axum::{routing::post, Router};

/// Query, get-one, create, update, delete, batch and stats endpoints for `E`, meant to be
/// nested under a prefix such as `/users`.
pub fn entity_routes<E, F, O>() -> Router<AppState>
where
    E: Entity,
    F: FilterSet + Shape,
    O: OrderSet + Shape,
{
    Router::new()
        .route("/", post(create::<E>))
        .route("/query", post(query::<E, F, O>))
        .route("/query-or", post(query_extended::<E, F, O>))
        .route("/one", post(one::<E, F, O>))
        .route("/update", post(update::<E, F>))
        .route("/delete", post(delete_handler::<E, F>))
        .route("/batch", post(batch_create::<E>))
        .route("/batch-update", post(batch_update::<E>))
        .route("/batch-update-by-filters", post(batch_update_by_filters::<E, F>))
        .route("/batch-delete", post(batch_delete::<E>))
        .route("/stats", post(stats::<E, F>))
}
