//! Generic CRUD execution against PostgreSQL.

use crate::entity::{Entity, Projection};
use crate::error::AppError;
use crate::query::{
    has_any_filter, ExtendedQueryRequest, FilterSet, GroupQueryRequest, OrderSet, QueryRequest,
};
use crate::sql::exec::{execute, fetch_all_as, fetch_all_json, fetch_optional_as};
use crate::sql::{insert_returning, QueryBuilder};
use serde_json::{Map, Value};
use sqlx::PgPool;

pub struct CrudService;

impl CrudService {
    /// Filters, then orders, then pagination. Returns the page and the total matching count.
    pub async fn query<E, F, O>(pool: &PgPool, req: &QueryRequest<F, O>) -> Result<(Vec<E>, i64), AppError>
    where
        E: Entity,
        F: FilterSet,
        O: OrderSet,
    {
        QueryBuilder::<E>::new()
            .apply_filters(req.filters.as_ref())
            .apply_orders(req.orders.as_ref())?
            .apply_pagination(req.page.as_ref())
            .query_with_count(pool)
            .await
    }

    /// Like `query`, with `{and, or}` filters.
    pub async fn query_extended<E, F, O>(
        pool: &PgPool,
        req: &ExtendedQueryRequest<F, O>,
    ) -> Result<(Vec<E>, i64), AppError>
    where
        E: Entity,
        F: FilterSet,
        O: OrderSet,
    {
        QueryBuilder::<E>::new()
            .apply_extended_filters(&req.filters)
            .apply_orders(req.orders.as_ref())?
            .apply_pagination(req.page.as_ref())
            .query_with_count(pool)
            .await
    }

    /// Query `E`'s table but decode into the projection `R`.
    pub async fn query_as<E, R, F, O>(pool: &PgPool, req: &QueryRequest<F, O>) -> Result<(Vec<R>, i64), AppError>
    where
        E: Entity,
        R: Projection,
        F: FilterSet,
        O: OrderSet,
    {
        let qb = QueryBuilder::<E>::new()
            .apply_filters(req.filters.as_ref())
            .apply_orders(req.orders.as_ref())?
            .apply_pagination(req.page.as_ref());
        let total = crate::sql::exec::count(pool, &qb.count_query()).await?;
        let rows = fetch_all_as(pool, &qb.projection_query(R::columns())).await?;
        Ok((rows, total))
    }

    pub async fn first<E, F, O>(pool: &PgPool, req: &QueryRequest<F, O>) -> Result<Option<E>, AppError>
    where
        E: Entity,
        F: FilterSet,
        O: OrderSet,
    {
        QueryBuilder::<E>::new()
            .apply_filters(req.filters.as_ref())
            .apply_orders(req.orders.as_ref())?
            .first(pool)
            .await
    }

    /// Insert one row and return it as stored.
    pub async fn create<E: Entity>(pool: &PgPool, mut entity: E) -> Result<E, AppError> {
        entity.prepare_insert();
        let q = insert_returning(&entity);
        fetch_optional_as(pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update every row matching `filters`. An empty update map is refused first, then a
    /// missing filter.
    pub async fn update<E, F>(pool: &PgPool, filters: Option<&F>, updates: &Map<String, Value>) -> Result<u64, AppError>
    where
        E: Entity,
        F: FilterSet,
    {
        if updates.is_empty() {
            return Err(AppError::NoUpdates);
        }
        let qb = guarded_builder::<E, F>(filters)?;
        let q = qb.update_query(updates)?;
        execute(pool, &q).await
    }

    /// Hard delete of every row matching `filters`. Refuses to run without a filter.
    pub async fn delete<E, F>(pool: &PgPool, filters: Option<&F>) -> Result<u64, AppError>
    where
        E: Entity,
        F: FilterSet,
    {
        let qb = guarded_builder::<E, F>(filters)?;
        execute(pool, &qb.delete_query()).await
    }

    /// GROUP BY query returning loosely typed rows. Without a select list the group
    /// columns and `COUNT(*) AS count` are returned.
    pub async fn group_query<E, F>(pool: &PgPool, req: &GroupQueryRequest<F>) -> Result<Vec<Value>, AppError>
    where
        E: Entity,
        F: FilterSet,
    {
        if req.group_by.is_empty() {
            return Err(AppError::Validation("group_by is required".into()));
        }
        let select: Vec<String> = if req.select.is_empty() {
            req.group_by
                .iter()
                .cloned()
                .chain(std::iter::once("COUNT(*) AS count".to_string()))
                .collect()
        } else {
            req.select.clone()
        };
        let qb = QueryBuilder::<E>::new()
            .apply_filters(req.filters.as_ref())
            .apply_group_by(&req.group_by)?
            .apply_select(&select)?
            .apply_having(req.having.as_deref().unwrap_or(""))?;
        fetch_all_json(pool, &qb.select_query()).await
    }
}

/// Builder with the filters applied, or `FilterRequired` when nothing would restrict the statement.
pub(crate) fn guarded_builder<E, F>(filters: Option<&F>) -> Result<QueryBuilder<E>, AppError>
where
    E: Entity,
    F: FilterSet,
{
    if !has_any_filter(filters) {
        return Err(AppError::FilterRequired);
    }
    let qb = QueryBuilder::<E>::new().apply_filters(filters);
    // e.g. a between field with neither bound set
    if !qb.has_predicates() {
        return Err(AppError::FilterRequired);
    }
    Ok(qb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{User, UserFilters};
    use crate::query::Range;

    #[test]
    fn mutations_need_a_present_filter() {
        assert!(matches!(
            guarded_builder::<User, UserFilters>(None),
            Err(AppError::FilterRequired)
        ));
        assert!(matches!(
            guarded_builder::<User, UserFilters>(Some(&UserFilters::default())),
            Err(AppError::FilterRequired)
        ));
    }

    #[test]
    fn empty_range_does_not_count_as_a_restriction() {
        let f = UserFilters {
            age_between: Some(Range::default()),
            ..Default::default()
        };
        assert!(f.has_any_filter());
        assert!(matches!(
            guarded_builder::<User, UserFilters>(Some(&f)),
            Err(AppError::FilterRequired)
        ));
    }

    #[test]
    fn zero_value_filter_is_accepted() {
        let f = UserFilters {
            age: Some(0),
            ..Default::default()
        };
        let qb = guarded_builder::<User, UserFilters>(Some(&f)).unwrap();
        assert_eq!(qb.delete_query().sql, r#"DELETE FROM "user" WHERE "age" >= $1::int4"#);
    }
}
