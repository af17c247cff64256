//! Runs built statements through sqlx and decodes rows.

use crate::entity::Entity;
use crate::error::AppError;
use crate::sql::{QueryBuf, QueryBuilder};
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::{Executor, FromRow};

/// Execute a statement; returns rows affected.
pub async fn execute<'c, X>(executor: X, q: &QueryBuf) -> Result<u64, AppError>
where
    X: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
    q.check_bind_limit()?;
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

pub async fn fetch_all_as<'c, T, X>(executor: X, q: &QueryBuf) -> Result<Vec<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    X: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    q.check_bind_limit()?;
    let mut query = sqlx::query_as::<_, T>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    Ok(query.fetch_all(executor).await?)
}

pub async fn fetch_optional_as<'c, T, X>(executor: X, q: &QueryBuf) -> Result<Option<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    X: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    q.check_bind_limit()?;
    let mut query = sqlx::query_as::<_, T>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    Ok(query.fetch_optional(executor).await?)
}

pub async fn fetch_one_row<'c, X>(executor: X, q: &QueryBuf) -> Result<PgRow, AppError>
where
    X: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    q.check_bind_limit()?;
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    Ok(query.fetch_one(executor).await?)
}

pub async fn fetch_all_json<'c, X>(executor: X, q: &QueryBuf) -> Result<Vec<serde_json::Value>, AppError>
where
    X: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    q.check_bind_limit()?;
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    let rows = query.fetch_all(executor).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

pub async fn count<'c, X>(executor: X, q: &QueryBuf) -> Result<i64, AppError>
where
    X: Executor<'c, Database = Postgres>,
{
    tracing::debug!(sql = %q.sql, params = ?q.params, "count");
    q.check_bind_limit()?;
    let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    Ok(query.fetch_one(executor).await?)
}

impl<E: Entity> QueryBuilder<E> {
    pub async fn query(&self, pool: &PgPool) -> Result<Vec<E>, AppError> {
        fetch_all_as(pool, &self.select_query()).await
    }

    /// COUNT over the predicates, then the ordered and paged fetch. The count never sees LIMIT/OFFSET.
    pub async fn query_with_count(&self, pool: &PgPool) -> Result<(Vec<E>, i64), AppError> {
        let total = count(pool, &self.count_query()).await?;
        let rows = fetch_all_as(pool, &self.select_query()).await?;
        Ok((rows, total))
    }

    pub async fn first(&self, pool: &PgPool) -> Result<Option<E>, AppError> {
        fetch_optional_as(pool, &self.first_query()).await
    }
}

pub(crate) fn row_to_json(row: &PgRow) -> serde_json::Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    serde_json::Value::Object(map)
}

/// Decode one cell into JSON by trying the column types the toolkit produces. NULL and
/// undecodable cells become `Value::Null`.
pub(crate) fn cell_to_value(row: &PgRow, name: &str) -> serde_json::Value {
    use serde_json::Value;
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(f64::from(n)) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
