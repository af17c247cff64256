//! COUNT plus optional SUM/AVG/MIN/MAX over the filtered rows, in one statement.

use crate::entity::Entity;
use crate::error::AppError;
use crate::query::{FilterSet, StatsConfig};
use crate::sql::exec::{cell_to_value, count, fetch_one_row};
use crate::sql::expr::AggregateFn;
use crate::sql::{aggregate, QueryBuilder};
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryStats {
    pub count: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sum: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub avg: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub min: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub max: BTreeMap<String, Value>,
}

/// One requested aggregate: which map it lands in, under which key, read from which alias.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StatColumn {
    pub function: AggregateFn,
    pub field: String,
    pub alias: String,
}

/// `COUNT(*) AS "count"` followed by one aliased aggregate per configured field.
/// Every field must be a declared column.
pub(crate) fn aggregate_projection<E: Entity>(config: &StatsConfig) -> Result<(Vec<String>, Vec<StatColumn>), AppError> {
    let mut select = vec![format!("COUNT(*) AS {}", crate::sql::quoted("count"))];
    let mut stats = Vec::new();
    let groups = [
        (AggregateFn::Sum, &config.sum_fields),
        (AggregateFn::Avg, &config.avg_fields),
        (AggregateFn::Min, &config.min_fields),
        (AggregateFn::Max, &config.max_fields),
    ];
    for (function, fields) in groups {
        for field in fields.iter() {
            let alias = function.default_alias(Some(field.as_str()));
            select.push(aggregate::<E>(function, field, &alias)?);
            stats.push(StatColumn {
                function,
                field: field.clone(),
                alias,
            });
        }
    }
    Ok((select, stats))
}

fn read_stats(row: &sqlx::postgres::PgRow, columns: &[StatColumn]) -> Result<QueryStats, AppError> {
    let mut out = QueryStats {
        count: row.try_get::<i64, _>("count")?,
        ..Default::default()
    };
    for c in columns {
        match c.function {
            AggregateFn::Sum | AggregateFn::Avg => {
                // NULL when no rows matched
                let Some(v) = row.try_get::<Option<f64>, _>(c.alias.as_str())? else {
                    continue;
                };
                let target = if c.function == AggregateFn::Sum { &mut out.sum } else { &mut out.avg };
                target.insert(c.field.clone(), v);
            }
            AggregateFn::Min | AggregateFn::Max => {
                let v = cell_to_value(row, &c.alias);
                if v.is_null() {
                    continue;
                }
                let target = if c.function == AggregateFn::Min { &mut out.min } else { &mut out.max };
                target.insert(c.field.clone(), v);
            }
            AggregateFn::Count => {}
        }
    }
    Ok(out)
}

/// Stats over the rows matching `filters`. An empty config yields only the count.
pub async fn stats<E, F>(pool: &PgPool, filters: Option<&F>, config: &StatsConfig) -> Result<QueryStats, AppError>
where
    E: Entity,
    F: FilterSet,
{
    let qb = QueryBuilder::<E>::new().apply_filters(filters);
    if config.is_empty() {
        let total = count(pool, &qb.count_query()).await?;
        return Ok(QueryStats {
            count: total,
            ..Default::default()
        });
    }
    let (select, columns) = aggregate_projection::<E>(config)?;
    let row = fetch_one_row(pool, &qb.with_projection(select).select_query()).await?;
    read_stats(&row, &columns)
}

/// Sum and average of the same fields.
pub async fn simple_stats<E, F>(pool: &PgPool, filters: Option<&F>, fields: &[String]) -> Result<QueryStats, AppError>
where
    E: Entity,
    F: FilterSet,
{
    let config = StatsConfig {
        sum_fields: fields.to_vec(),
        avg_fields: fields.to_vec(),
        ..Default::default()
    };
    stats::<E, F>(pool, filters, &config).await
}
