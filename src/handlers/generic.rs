//! Handlers generic over the entity and its filter/order shapes. Mounted per entity with
//! turbofish, e.g. `post(query::<User, UserFilters, UserOrders>)`.
//!
//! Every handler takes `Result<Json<_>, JsonRejection>` so a malformed body becomes an
//! `Invalid request: ...` envelope rather than axum's plain-text rejection.

use crate::entity::{Entity, Projection};
use crate::error::AppError;
use crate::query::{
    BatchDeleteRequest, BatchUpdateByFilterItem, BatchUpdateItem, DeleteRequest, ExtendedQueryRequest,
    FilterSet, GroupQueryRequest, OrderSet, QueryRequest, StatsRequest, UpdateRequest,
};
use crate::response::{success, success_with_page, Affected, Created, PageResponse, Response};
use crate::service::{batch, CrudService, QueryStats};
use crate::state::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A request shape the handlers can decode and hold across awaits.
pub trait Shape: DeserializeOwned + Send + Sync + 'static {}

impl<T: DeserializeOwned + Send + Sync + 'static> Shape for T {}

type Body<T> = Result<Json<T>, JsonRejection>;
type Reply<T> = Result<Json<Response<T>>, AppError>;

pub async fn query<E, F, O>(
    State(state): State<AppState>,
    body: Body<QueryRequest<F, O>>,
) -> Result<Json<PageResponse<E>>, AppError>
where
    E: Entity,
    F: FilterSet + Shape,
    O: OrderSet + Shape,
{
    let Json(req) = body?;
    let (rows, total) = CrudService::query::<E, F, O>(&state.pool, &req).await?;
    Ok(success_with_page(rows, req.page, total))
}

/// Same request as `query`, rows decoded into the projection `R`.
pub async fn query_as<E, R, F, O>(
    State(state): State<AppState>,
    body: Body<QueryRequest<F, O>>,
) -> Result<Json<PageResponse<R>>, AppError>
where
    E: Entity,
    R: Projection,
    F: FilterSet + Shape,
    O: OrderSet + Shape,
{
    let Json(req) = body?;
    let (rows, total) = CrudService::query_as::<E, R, F, O>(&state.pool, &req).await?;
    Ok(success_with_page(rows, req.page, total))
}

pub async fn query_extended<E, F, O>(
    State(state): State<AppState>,
    body: Body<ExtendedQueryRequest<F, O>>,
) -> Result<Json<PageResponse<E>>, AppError>
where
    E: Entity,
    F: FilterSet + Shape,
    O: OrderSet + Shape,
{
    let Json(req) = body?;
    let (rows, total) = CrudService::query_extended::<E, F, O>(&state.pool, &req).await?;
    Ok(success_with_page(rows, req.page, total))
}

pub async fn one<E, F, O>(State(state): State<AppState>, body: Body<QueryRequest<F, O>>) -> Reply<E>
where
    E: Entity,
    F: FilterSet + Shape,
    O: OrderSet + Shape,
{
    let Json(req) = body?;
    let row = CrudService::first::<E, F, O>(&state.pool, &req)
        .await?
        .ok_or_else(|| AppError::NotFound(E::TABLE.to_string()))?;
    Ok(success(row))
}

pub async fn create<E: Entity>(State(state): State<AppState>, body: Body<E>) -> Reply<E> {
    let Json(entity) = body?;
    let created = CrudService::create(&state.pool, entity).await?;
    Ok(success(created))
}

pub async fn update<E, F>(State(state): State<AppState>, body: Body<UpdateRequest<F>>) -> Reply<Affected>
where
    E: Entity,
    F: FilterSet + Shape,
{
    let Json(req) = body?;
    let affected = CrudService::update::<E, F>(&state.pool, req.filters.as_ref(), &req.updates).await?;
    Ok(success(Affected { affected }))
}

pub async fn delete<E, F>(State(state): State<AppState>, body: Body<DeleteRequest<F>>) -> Reply<Affected>
where
    E: Entity,
    F: FilterSet + Shape,
{
    let Json(req) = body?;
    let affected = CrudService::delete::<E, F>(&state.pool, req.filters.as_ref()).await?;
    Ok(success(Affected { affected }))
}

pub async fn batch_create<E: Entity>(State(state): State<AppState>, body: Body<Vec<E>>) -> Reply<Created<E>> {
    let Json(rows) = body?;
    let stored = batch::batch_create(&state.pool, rows, state.batch_size).await?;
    Ok(success(Created::new(stored)))
}

pub async fn batch_update<E: Entity>(State(state): State<AppState>, body: Body<Vec<BatchUpdateItem>>) -> Reply<Affected> {
    let Json(items) = body?;
    let affected = batch::batch_update_by_id::<E>(&state.pool, &items).await?;
    Ok(success(Affected { affected }))
}

pub async fn batch_update_by_filters<E, F>(
    State(state): State<AppState>,
    body: Body<Vec<BatchUpdateByFilterItem<F>>>,
) -> Reply<Affected>
where
    E: Entity,
    F: FilterSet + Shape,
{
    let Json(items) = body?;
    let affected = batch::batch_update_by_filters::<E, F>(&state.pool, &items).await?;
    Ok(success(Affected { affected }))
}

pub async fn batch_delete<E: Entity>(State(state): State<AppState>, body: Body<BatchDeleteRequest>) -> Reply<Affected> {
    let Json(req) = body?;
    let affected = batch::batch_delete::<E>(&state.pool, &req.ids).await?;
    Ok(success(Affected { affected }))
}

pub async fn stats<E, F>(State(state): State<AppState>, body: Body<StatsRequest<F>>) -> Reply<QueryStats>
where
    E: Entity,
    F: FilterSet + Shape,
{
    let Json(req) = body?;
    let result = crate::service::stats::stats::<E, F>(&state.pool, req.filters.as_ref(), &req.stats_config).await?;
    Ok(success(result))
}

pub async fn group<E, F>(State(state): State<AppState>, body: Body<GroupQueryRequest<F>>) -> Reply<Vec<Value>>
where
    E: Entity,
    F: FilterSet + Shape,
{
    let Json(req) = body?;
    let rows = CrudService::group_query::<E, F>(&state.pool, &req).await?;
    Ok(success(rows))
}
