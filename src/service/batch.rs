//! Batch insert, update and delete. Multi-statement operations share one transaction;
//! dropping it on error rolls every statement back.

use crate::entity::{insert_columns, Entity};
use crate::error::AppError;
use crate::query::{has_any_filter, BatchUpdateByFilterItem, BatchUpdateItem, FilterSet};
use crate::sql::exec::{execute, fetch_all_as};
use crate::sql::{insert_rows_returning, PgBindValue, QueryBuf, QueryBuilder, MAX_BIND_PARAMS};
use sqlx::PgPool;

pub const DEFAULT_BATCH_SIZE: i64 = 100;

/// Rows per INSERT: `batch_size` (default when not positive), clamped so a chunk stays
/// under the bind parameter cap.
pub fn effective_chunk_size<E: Entity>(batch_size: i64) -> usize {
    let requested = if batch_size <= 0 { DEFAULT_BATCH_SIZE } else { batch_size };
    let per_row = insert_columns::<E>().count().max(1);
    let cap = (MAX_BIND_PARAMS / per_row).max(1);
    usize::try_from(requested).unwrap_or(cap).min(cap)
}

/// One multi-row INSERT ... RETURNING per chunk. Rows are prepared (ids assigned) in place.
pub fn plan_batch_create<E: Entity>(rows: &mut [E], batch_size: i64) -> Vec<QueryBuf> {
    for row in rows.iter_mut() {
        row.prepare_insert();
    }
    rows.chunks(effective_chunk_size::<E>(batch_size))
        .map(insert_rows_returning)
        .collect()
}

/// Insert all rows in one transaction. Returns the stored rows with their ids.
pub async fn batch_create<E: Entity>(pool: &PgPool, mut rows: Vec<E>, batch_size: i64) -> Result<Vec<E>, AppError> {
    if rows.is_empty() {
        return Ok(rows);
    }
    let statements = plan_batch_create(&mut rows, batch_size);
    let mut stored = Vec::with_capacity(rows.len());
    let mut tx = pool.begin().await?;
    for q in &statements {
        stored.extend(fetch_all_as::<E, _>(&mut *tx, q).await?);
    }
    tx.commit().await?;
    tracing::debug!(table = E::TABLE, rows = stored.len(), chunks = statements.len(), "batch create");
    Ok(stored)
}

/// `UPDATE ... WHERE pk = id` per item. Items with an empty update map are skipped.
pub fn plan_update_by_id<E: Entity>(items: &[BatchUpdateItem]) -> Result<Vec<QueryBuf>, AppError> {
    items
        .iter()
        .filter(|item| !item.updates.is_empty())
        .map(|item| {
            QueryBuilder::<E>::new()
                .where_eq(E::PRIMARY_KEY, PgBindValue::from_json(&item.id))
                .update_query(&item.updates)
        })
        .collect()
}

/// Items lacking a present filter or carrying no updates are skipped.
pub fn plan_update_by_filters<E, F>(items: &[BatchUpdateByFilterItem<F>]) -> Result<Vec<QueryBuf>, AppError>
where
    E: Entity,
    F: FilterSet,
{
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if item.updates.is_empty() || !has_any_filter(item.filters.as_ref()) {
            continue;
        }
        let qb = QueryBuilder::<E>::new().apply_filters(item.filters.as_ref());
        if !qb.has_predicates() {
            continue;
        }
        out.push(qb.update_query(&item.updates)?);
    }
    Ok(out)
}

/// Run the statements in one transaction and sum rows affected. Nothing to run means
/// no transaction is opened.
async fn run_in_transaction(pool: &PgPool, statements: &[QueryBuf]) -> Result<u64, AppError> {
    if statements.is_empty() {
        return Ok(0);
    }
    let mut tx = pool.begin().await?;
    let mut affected = 0;
    for q in statements {
        affected += execute(&mut *tx, q).await?;
    }
    tx.commit().await?;
    Ok(affected)
}

pub async fn batch_update_by_id<E: Entity>(pool: &PgPool, items: &[BatchUpdateItem]) -> Result<u64, AppError> {
    let statements = plan_update_by_id::<E>(items)?;
    run_in_transaction(pool, &statements).await
}

pub async fn batch_update_by_filters<E, F>(pool: &PgPool, items: &[BatchUpdateByFilterItem<F>]) -> Result<u64, AppError>
where
    E: Entity,
    F: FilterSet,
{
    let statements = plan_update_by_filters::<E, F>(items)?;
    run_in_transaction(pool, &statements).await
}

/// `DELETE ... WHERE pk IN (...)`, one statement per `MAX_BIND_PARAMS` ids.
pub fn plan_batch_delete<E: Entity>(ids: &[serde_json::Value]) -> Vec<QueryBuf> {
    ids.chunks(MAX_BIND_PARAMS)
        .map(|chunk| {
            let values = chunk.iter().map(PgBindValue::from_json).collect();
            QueryBuilder::<E>::new()
                .where_in(E::PRIMARY_KEY, values)
                .delete_query()
        })
        .collect()
}

/// Hard delete by primary key. An empty id list deletes nothing.
pub async fn batch_delete<E: Entity>(pool: &PgPool, ids: &[serde_json::Value]) -> Result<u64, AppError> {
    let statements = plan_batch_delete::<E>(ids);
    run_in_transaction(pool, &statements).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{GroupExample, User, UserFilters};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn users(n: usize) -> Vec<User> {
        (0..n)
            .map(|i| User {
                id: String::new(),
                name: format!("u{}", i),
                age: i as i32,
            })
            .collect()
    }

    #[test]
    fn create_is_chunked_by_batch_size() {
        let mut rows = users(250);
        let plan = plan_batch_create(&mut rows, 100);
        let params: Vec<usize> = plan.iter().map(|q| q.params.len()).collect();
        assert_eq!(params, vec![300, 300, 150]);
        assert!(plan[0].sql.ends_with(r#" RETURNING "id", "name", "age""#), "{}", plan[0].sql);
        assert!(rows.iter().all(|u| u.id.len() == 32));
    }

    #[test]
    fn non_positive_batch_size_uses_default() {
        let mut rows = users(150);
        assert_eq!(plan_batch_create(&mut rows, 0).len(), 2);
        assert_eq!(plan_batch_create(&mut rows, -5).len(), 2);
        assert!(plan_batch_create(&mut Vec::<User>::new(), 10).is_empty());
    }

    #[test]
    fn chunk_size_respects_bind_limit() {
        assert_eq!(effective_chunk_size::<User>(1_000_000), 65535 / 3);
        assert_eq!(effective_chunk_size::<GroupExample>(1_000_000), 65535 / 2);
        assert_eq!(effective_chunk_size::<User>(7), 7);
    }

    #[test]
    fn delete_is_split_at_the_bind_limit() {
        let ids: Vec<serde_json::Value> = (0..70_000).map(|i| json!(i.to_string())).collect();
        let plan = plan_batch_delete::<User>(&ids);
        let params: Vec<usize> = plan.iter().map(|q| q.params.len()).collect();
        assert_eq!(params, vec![MAX_BIND_PARAMS, 70_000 - MAX_BIND_PARAMS]);
        assert!(plan.iter().all(|q| q.check_bind_limit().is_ok()));

        assert_eq!(plan_batch_delete::<User>(&ids[..MAX_BIND_PARAMS]).len(), 1);
        assert!(plan_batch_delete::<User>(&[]).is_empty());
    }

    #[test]
    fn update_by_id_skips_empty_maps() {
        let items: Vec<BatchUpdateItem> = serde_json::from_value(json!([
            {"id": "1", "updates": {"age": 31}},
            {"id": "2", "updates": {}}
        ]))
        .unwrap();
        let plan = plan_update_by_id::<User>(&items).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan[0].sql,
            r#"UPDATE "user" SET "age" = $2::int4 WHERE "id" = $1::varchar"#
        );
    }

    #[test]
    fn unknown_update_column_fails_before_any_statement() {
        let items: Vec<BatchUpdateItem> = serde_json::from_value(json!([
            {"id": "1", "updates": {"age": 31}},
            {"id": "2", "updates": {"salary": 1}}
        ]))
        .unwrap();
        assert!(matches!(
            plan_update_by_id::<User>(&items),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn update_by_filters_skips_unfiltered_items() {
        let items: Vec<BatchUpdateByFilterItem<UserFilters>> = serde_json::from_value(json!([
            {"filters": {"age": 18}, "updates": {"name": "adult"}},
            {"filters": {}, "updates": {"name": "everyone"}},
            {"updates": {"name": "everyone"}},
            {"filters": {"id": "x"}, "updates": {}}
        ]))
        .unwrap();
        let plan = plan_update_by_filters::<User, UserFilters>(&items).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan[0].sql,
            r#"UPDATE "user" SET "name" = $2::varchar WHERE "age" >= $1::int4"#
        );
    }
}
