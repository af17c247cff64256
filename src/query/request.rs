//! Request bodies decoded by the generic handlers.

use crate::query::Page;
use serde::Deserialize;
use serde_json::{Map, Value};

/// `{page?, filters?, orders?}` for list, get-one and stats endpoints.
#[derive(Debug, Deserialize)]
pub struct QueryRequest<F, O> {
    #[serde(default)]
    pub page: Option<Page>,
    pub filters: Option<F>,
    pub orders: Option<O>,
}

impl<F, O> Default for QueryRequest<F, O> {
    fn default() -> Self {
        QueryRequest {
            page: None,
            filters: None,
            orders: None,
        }
    }
}

/// One AND group plus OR groups: `and AND ((or[0]) OR (or[1]) ...)`.
#[derive(Debug, Deserialize)]
pub struct ExtendedFilters<F> {
    pub and: Option<F>,
    #[serde(default = "Vec::new")]
    pub or: Vec<F>,
}

impl<F> Default for ExtendedFilters<F> {
    fn default() -> Self {
        ExtendedFilters { and: None, or: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtendedQueryRequest<F, O> {
    #[serde(default)]
    pub page: Option<Page>,
    #[serde(default = "ExtendedFilters::default")]
    pub filters: ExtendedFilters<F>,
    pub orders: Option<O>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest<F> {
    pub filters: Option<F>,
    #[serde(default)]
    pub updates: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest<F> {
    pub filters: Option<F>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BatchUpdateItem {
    pub id: Value,
    #[serde(default)]
    pub updates: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct BatchUpdateByFilterItem<F> {
    pub filters: Option<F>,
    #[serde(default)]
    pub updates: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub ids: Vec<Value>,
}

/// Column lists per aggregate kind.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatsConfig {
    #[serde(default)]
    pub sum_fields: Vec<String>,
    #[serde(default)]
    pub avg_fields: Vec<String>,
    #[serde(default)]
    pub min_fields: Vec<String>,
    #[serde(default)]
    pub max_fields: Vec<String>,
}

impl StatsConfig {
    pub fn is_empty(&self) -> bool {
        self.sum_fields.is_empty()
            && self.avg_fields.is_empty()
            && self.min_fields.is_empty()
            && self.max_fields.is_empty()
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsRequest<F> {
    pub filters: Option<F>,
    #[serde(default)]
    pub stats_config: StatsConfig,
}

/// GROUP BY query, e.g. `{"group_by": ["department"], "select": ["department", "COUNT(*) AS count"], "having": "COUNT(*) > 1"}`.
#[derive(Debug, Deserialize)]
pub struct GroupQueryRequest<F> {
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub select: Vec<String>,
    #[serde(default)]
    pub having: Option<String>,
    pub filters: Option<F>,
}
