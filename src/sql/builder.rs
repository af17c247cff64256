//! Builds parameterized SELECT, COUNT, INSERT, UPDATE and DELETE statements for an entity.
//!
//! Identifiers come from entity declarations (or are checked against them); values are
//! always bound as parameters. Each `apply_*` consumes the builder and returns it, so calls
//! chain; the fallible ones return `Result` and stop composition at the first invalid input.

use crate::entity::{column_info, insert_columns, known_column, Entity};
use crate::error::AppError;
use crate::query::{Direction, FilterOp, FilterSet, FilterValue, OrderSet, Page};
use crate::sql::expr::{AggregateFn, HavingExpr, SelectExpr};
use crate::sql::PgBindValue;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// PostgreSQL caps a statement at 65535 bind parameters.
pub const MAX_BIND_PARAMS: usize = 65535;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    /// Statements over the bind parameter cap are refused before they reach the driver.
    pub fn check_bind_limit(&self) -> Result<(), AppError> {
        if self.params.len() > MAX_BIND_PARAMS {
            return Err(AppError::Validation(format!(
                "too many values: statement needs {} parameters, at most {} allowed",
                self.params.len(),
                MAX_BIND_PARAMS
            )));
        }
        Ok(())
    }
}

/// `$n` with a cast to the column's declared type when the column is known.
fn placeholder<E: Entity>(column: &str, n: usize) -> String {
    match column_info::<E>(column) {
        Some(c) => format!("${}::{}", n, c.pg_type),
        None => format!("${}", n),
    }
}

fn push_param<E: Entity>(column: &str, value: PgBindValue, params: &mut Vec<PgBindValue>) -> String {
    params.push(value);
    placeholder::<E>(column, params.len())
}

fn like_pattern(value: &PgBindValue) -> String {
    let inner = match value {
        PgBindValue::String(s) => s.clone(),
        PgBindValue::I64(n) => n.to_string(),
        PgBindValue::F64(n) => n.to_string(),
        PgBindValue::Bool(b) => b.to_string(),
        PgBindValue::Json(v) => v.to_string(),
        PgBindValue::Null => String::new(),
    };
    format!("%{}%", inner)
}

/// Compile one present field into zero or more predicates.
fn compile_field<E: Entity>(
    column: &str,
    op: FilterOp,
    value: FilterValue,
    params: &mut Vec<PgBindValue>,
    out: &mut Vec<String>,
) {
    let col = quoted(column);
    match (op, value) {
        (FilterOp::IsNull, _) => out.push(format!("{} IS NULL", col)),
        (FilterOp::IsNotNull, _) => out.push(format!("{} IS NOT NULL", col)),
        (FilterOp::Between, FilterValue::Range { min, max }) => {
            if let Some(min) = min {
                let ph = push_param::<E>(column, min, params);
                out.push(format!("{} >= {}", col, ph));
            }
            if let Some(max) = max {
                let ph = push_param::<E>(column, max, params);
                out.push(format!("{} <= {}", col, ph));
            }
        }
        (FilterOp::Like, FilterValue::Scalar(v)) => {
            params.push(PgBindValue::String(like_pattern(&v)));
            out.push(format!("{}::text LIKE ${}", col, params.len()));
        }
        (FilterOp::In | FilterOp::NotIn, value @ (FilterValue::List(_) | FilterValue::Scalar(_))) => {
            let items = match value {
                FilterValue::List(items) => items,
                FilterValue::Scalar(v) => vec![v],
                FilterValue::Range { .. } => Vec::new(),
            };
            let negate = op == FilterOp::NotIn;
            if items.is_empty() {
                if !negate {
                    out.push("1 = 0".to_string());
                }
                return;
            }
            let phs: Vec<String> = items
                .into_iter()
                .map(|v| push_param::<E>(column, v, params))
                .collect();
            let kw = if negate { "NOT IN" } else { "IN" };
            out.push(format!("{} {} ({})", col, kw, phs.join(", ")));
        }
        (op, FilterValue::Scalar(v)) if op.comparison().is_some() => {
            let sym = op.comparison().unwrap_or("=");
            let ph = push_param::<E>(column, v, params);
            out.push(format!("{} {} {}", col, sym, ph));
        }
        (op, value) => {
            tracing::warn!(column = %column, op = ?op, value = ?value, "filter value does not fit operator; field ignored");
        }
    }
}

/// AND-composed predicates of every present field in `filters`.
fn compile_filters<E: Entity, F: FilterSet>(filters: &F, params: &mut Vec<PgBindValue>) -> Vec<String> {
    let mut out = Vec::new();
    for field in F::fields() {
        if let Some(value) = (field.value)(filters) {
            compile_field::<E>(field.column, field.op, value, params, &mut out);
        }
    }
    out
}

pub struct QueryBuilder<E> {
    select: Vec<String>,
    predicates: Vec<String>,
    params: Vec<PgBindValue>,
    orders: Vec<String>,
    group_by: Vec<String>,
    having: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> QueryBuilder<E> {
    pub fn new() -> Self {
        QueryBuilder {
            select: Vec::new(),
            predicates: Vec::new(),
            params: Vec::new(),
            orders: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    /// AND every present field of `filters`. `None` or an all-absent shape adds nothing.
    pub fn apply_filters<F: FilterSet>(mut self, filters: Option<&F>) -> Self {
        if let Some(filters) = filters {
            let parts = compile_filters::<E, F>(filters, &mut self.params);
            self.predicates.extend(parts);
        }
        self
    }

    /// Each group is AND-composed on its own; the groups are ORed and the result ANDed in.
    /// Groups without present fields are skipped.
    pub fn apply_or_conditions<F: FilterSet>(mut self, groups: &[F]) -> Self {
        let mut ors = Vec::new();
        for group in groups {
            let parts = compile_filters::<E, F>(group, &mut self.params);
            if !parts.is_empty() {
                ors.push(format!("({})", parts.join(" AND ")));
            }
        }
        match ors.len() {
            0 => {}
            1 => self.predicates.extend(ors),
            _ => self.predicates.push(format!("({})", ors.join(" OR "))),
        }
        self
    }

    pub fn apply_extended_filters<F: FilterSet>(self, filters: &crate::query::ExtendedFilters<F>) -> Self {
        self.apply_filters(filters.and.as_ref())
            .apply_or_conditions(&filters.or)
    }

    /// Empty directions are skipped; anything else must trim to asc/desc or the call fails
    /// naming the field.
    pub fn apply_orders<O: OrderSet>(mut self, orders: Option<&O>) -> Result<Self, AppError> {
        let Some(orders) = orders else {
            return Ok(self);
        };
        for field in O::fields() {
            let Some(raw) = (field.direction)(orders) else { continue };
            if raw.is_empty() {
                continue;
            }
            let direction = Direction::parse(raw).ok_or_else(|| {
                AppError::Validation(format!(
                    "order field {} must be 'asc' or 'desc', got '{}'",
                    field.column, raw
                ))
            })?;
            self.orders
                .push(format!("{} {}", quoted(field.column), direction.as_sql()));
        }
        Ok(self)
    }

    pub fn apply_pagination(mut self, page: Option<&Page>) -> Self {
        if let Some(page) = page.filter(|p| p.is_valid()) {
            self.limit = Some(page.limit());
            self.offset = Some(page.offset());
        }
        self
    }

    pub fn apply_group_by<S: AsRef<str>>(mut self, columns: &[S]) -> Result<Self, AppError> {
        for c in columns {
            let info = known_column::<E>(c.as_ref())?;
            self.group_by.push(quoted(info.name));
        }
        Ok(self)
    }

    /// `FUNC(col|*) op number`; an empty condition is a no-op.
    pub fn apply_having(mut self, condition: &str) -> Result<Self, AppError> {
        if condition.trim().is_empty() {
            return Ok(self);
        }
        let expr = HavingExpr::parse(condition)?;
        if let Some(col) = &expr.column {
            known_column::<E>(col)?;
        }
        self.params.push(expr.value.clone());
        let rendered = format!(
            "{} {} ${}",
            expr.function.render(expr.column.as_deref()),
            expr.op,
            self.params.len()
        );
        self.having.push(rendered);
        Ok(self)
    }

    /// Projection of plain columns and `FUNC(col|*) [AS alias]`.
    pub fn apply_select<S: AsRef<str>>(mut self, expressions: &[S]) -> Result<Self, AppError> {
        for raw in expressions {
            let rendered = match SelectExpr::parse(raw.as_ref())? {
                SelectExpr::Column(c) => quoted(known_column::<E>(&c)?.name),
                SelectExpr::Aggregate {
                    function,
                    column,
                    alias,
                } => {
                    if let Some(c) = &column {
                        known_column::<E>(c)?;
                    }
                    let alias = alias.unwrap_or_else(|| function.default_alias(column.as_deref()));
                    format!("{} AS {}", function.render(column.as_deref()), quoted(&alias))
                }
            };
            self.select.push(rendered);
        }
        Ok(self)
    }

    /// `pk = value`, used by update-by-id.
    pub fn where_eq(mut self, column: &str, value: PgBindValue) -> Self {
        let mut parts = Vec::new();
        compile_field::<E>(column, FilterOp::Eq, FilterValue::Scalar(value), &mut self.params, &mut parts);
        self.predicates.extend(parts);
        self
    }

    pub fn where_in(mut self, column: &str, values: Vec<PgBindValue>) -> Self {
        let mut parts = Vec::new();
        compile_field::<E>(column, FilterOp::In, FilterValue::List(values), &mut self.params, &mut parts);
        self.predicates.extend(parts);
        self
    }

    pub(crate) fn with_projection(mut self, expressions: Vec<String>) -> Self {
        self.select = expressions;
        self
    }

    pub fn has_predicates(&self) -> bool {
        !self.predicates.is_empty()
    }

    pub fn has_projection(&self) -> bool {
        !self.select.is_empty()
    }

    fn table() -> String {
        quoted(E::TABLE)
    }

    fn default_columns() -> String {
        E::columns()
            .iter()
            .map(|c| quoted(c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }

    fn group_clause(&self) -> String {
        let mut s = String::new();
        if !self.group_by.is_empty() {
            s.push_str(&format!(" GROUP BY {}", self.group_by.join(", ")));
        }
        if !self.having.is_empty() {
            s.push_str(&format!(" HAVING {}", self.having.join(" AND ")));
        }
        s
    }

    fn order_clause(&self) -> String {
        if self.orders.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", self.orders.join(", "))
        }
    }

    fn render_select(&self, columns: String, limit: Option<i64>, offset: Option<i64>) -> QueryBuf {
        let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
        let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
        QueryBuf {
            sql: format!(
                "SELECT {} FROM {}{}{}{}{}{}",
                columns,
                Self::table(),
                self.where_clause(),
                self.group_clause(),
                self.order_clause(),
                limit_clause,
                offset_clause
            ),
            params: self.params.clone(),
        }
    }

    /// Filtered, grouped, ordered and paged SELECT.
    pub fn select_query(&self) -> QueryBuf {
        let columns = if self.select.is_empty() {
            Self::default_columns()
        } else {
            self.select.join(", ")
        };
        self.render_select(columns, self.limit, self.offset)
    }

    /// SELECT of an explicit column list (projections), same clauses as `select_query`.
    pub fn projection_query(&self, columns: &[&str]) -> QueryBuf {
        let columns = columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ");
        self.render_select(columns, self.limit, self.offset)
    }

    /// First row honoring filters and orders; pagination is ignored.
    pub fn first_query(&self) -> QueryBuf {
        self.render_select(Self::default_columns(), Some(1), None)
    }

    /// COUNT over the same predicates, ignoring order and pagination. Grouped queries count groups.
    pub fn count_query(&self) -> QueryBuf {
        let sql = if self.group_by.is_empty() {
            format!("SELECT COUNT(*) FROM {}{}", Self::table(), self.where_clause())
        } else {
            format!(
                "SELECT COUNT(*) FROM (SELECT 1 FROM {}{}{}) AS grouped",
                Self::table(),
                self.where_clause(),
                self.group_clause()
            )
        };
        QueryBuf {
            sql,
            params: self.params.clone(),
        }
    }

    /// UPDATE the filtered rows. Update keys must be declared columns.
    pub fn update_query(&self, updates: &Map<String, Value>) -> Result<QueryBuf, AppError> {
        if updates.is_empty() {
            return Err(AppError::NoUpdates);
        }
        let mut params = self.params.clone();
        let mut sets = Vec::with_capacity(updates.len());
        for (k, v) in updates {
            let info = known_column::<E>(k)?;
            let ph = push_param::<E>(info.name, PgBindValue::from_json(v), &mut params);
            sets.push(format!("{} = {}", quoted(info.name), ph));
        }
        Ok(QueryBuf {
            sql: format!(
                "UPDATE {} SET {}{}",
                Self::table(),
                sets.join(", "),
                self.where_clause()
            ),
            params,
        })
    }

    pub fn delete_query(&self) -> QueryBuf {
        QueryBuf {
            sql: format!("DELETE FROM {}{}", Self::table(), self.where_clause()),
            params: self.params.clone(),
        }
    }
}

/// Multi-row INSERT of the entity's non-generated columns.
pub fn insert_rows<E: Entity>(rows: &[E]) -> QueryBuf {
    let mut q = QueryBuf::default();
    let cols: Vec<&str> = insert_columns::<E>().map(|c| c.name).collect();
    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        let phs: Vec<String> = cols
            .iter()
            .zip(row.insert_values())
            .map(|(col, v)| push_param::<E>(col, v, &mut q.params))
            .collect();
        tuples.push(format!("({})", phs.join(", ")));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        quoted(E::TABLE),
        cols.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", "),
        tuples.join(", ")
    );
    q
}

/// Multi-row INSERT returning the stored rows (generated columns filled in).
pub fn insert_rows_returning<E: Entity>(rows: &[E]) -> QueryBuf {
    let mut q = insert_rows(rows);
    let returning = E::columns()
        .iter()
        .map(|c| quoted(c.name))
        .collect::<Vec<_>>()
        .join(", ");
    q.sql.push_str(&format!(" RETURNING {}", returning));
    q
}

pub fn insert_returning<E: Entity>(row: &E) -> QueryBuf {
    insert_rows_returning(std::slice::from_ref(row))
}

/// Aggregate expression over a column, e.g. for stats and group queries.
pub fn aggregate<E: Entity>(function: AggregateFn, column: &str, alias: &str) -> Result<String, AppError> {
    let info = known_column::<E>(column)?;
    Ok(format!("{} AS {}", function.render(Some(info.name)), quoted(alias)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{GroupExample, User, UserFilters, UserOrders};
    use crate::query::{FilterField, NoOrders, Range};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Exercises every operator against the user table.
    #[derive(Default)]
    struct AllOps {
        ne: Option<String>,
        gt: Option<i32>,
        lt: Option<i32>,
        lte: Option<i32>,
        ids: Option<Vec<String>>,
        not_ids: Option<Vec<String>>,
        no_name: Option<bool>,
        has_name: Option<bool>,
        age: Option<Range<i32>>,
    }

    static ALL_OPS_FIELDS: &[FilterField<AllOps>] = &[
        FilterField::new("name", FilterOp::Ne, |f| crate::query::present(&f.ne)),
        FilterField::new("age", FilterOp::Gt, |f| crate::query::present(&f.gt)),
        FilterField::new("age", FilterOp::Lt, |f| crate::query::present(&f.lt)),
        FilterField::new("age", FilterOp::Lte, |f| crate::query::present(&f.lte)),
        FilterField::new("id", FilterOp::In, |f| crate::query::present(&f.ids)),
        FilterField::new("id", FilterOp::NotIn, |f| crate::query::present(&f.not_ids)),
        FilterField::new("name", FilterOp::IsNull, |f| crate::query::present(&f.no_name)),
        FilterField::new("name", FilterOp::IsNotNull, |f| crate::query::present(&f.has_name)),
        FilterField::new("age", FilterOp::Between, |f| crate::query::present(&f.age)),
    ];

    impl FilterSet for AllOps {
        fn fields() -> &'static [FilterField<Self>] {
            ALL_OPS_FIELDS
        }
    }

    fn user_filters() -> UserFilters {
        UserFilters::default()
    }

    #[test]
    fn absent_filters_select_all_rows() {
        let q = QueryBuilder::<User>::new()
            .apply_filters(Some(&user_filters()))
            .select_query();
        assert_eq!(q.sql, r#"SELECT "id", "name", "age" FROM "user""#);
        assert!(q.params.is_empty());

        let q = QueryBuilder::<User>::new()
            .apply_filters::<UserFilters>(None)
            .count_query();
        assert_eq!(q.sql, r#"SELECT COUNT(*) FROM "user""#);
    }

    #[test]
    fn declared_operators_compile_to_predicates() {
        let f = UserFilters {
            id: Some("abc".into()),
            age: Some(30),
            name: Some("li".into()),
            ..Default::default()
        };
        let q = QueryBuilder::<User>::new().apply_filters(Some(&f)).select_query();
        assert_eq!(
            q.sql,
            r#"SELECT "id", "name", "age" FROM "user" WHERE "id" = $1::varchar AND "age" >= $2::int4 AND "name"::text LIKE $3"#
        );
        assert_eq!(
            q.params,
            vec![
                PgBindValue::String("abc".into()),
                PgBindValue::I64(30),
                PgBindValue::String("%li%".into()),
            ]
        );
    }

    #[test]
    fn between_with_only_min_emits_lower_bound() {
        let f = AllOps {
            age: Some(Range {
                min: Some(18),
                max: None,
            }),
            ..Default::default()
        };
        let q = QueryBuilder::<User>::new().apply_filters(Some(&f)).count_query();
        assert_eq!(q.sql, r#"SELECT COUNT(*) FROM "user" WHERE "age" >= $1::int4"#);
        assert_eq!(q.params, vec![PgBindValue::I64(18)]);
    }

    #[test]
    fn between_with_both_or_neither_bound() {
        let both = AllOps {
            age: Some(Range {
                min: Some(18),
                max: Some(65),
            }),
            ..Default::default()
        };
        let q = QueryBuilder::<User>::new().apply_filters(Some(&both)).count_query();
        assert_eq!(
            q.sql,
            r#"SELECT COUNT(*) FROM "user" WHERE "age" >= $1::int4 AND "age" <= $2::int4"#
        );

        let neither = AllOps {
            age: Some(Range::default()),
            ..Default::default()
        };
        let b = QueryBuilder::<User>::new().apply_filters(Some(&neither));
        assert!(!b.has_predicates());
    }

    #[test]
    fn remaining_operators() {
        let f = AllOps {
            ne: Some("x".into()),
            gt: Some(1),
            lt: Some(9),
            lte: Some(8),
            ids: Some(vec!["a".into(), "b".into()]),
            not_ids: Some(vec!["c".into()]),
            no_name: Some(false),
            has_name: Some(true),
            age: None,
        };
        let q = QueryBuilder::<User>::new().apply_filters(Some(&f)).delete_query();
        assert_eq!(
            q.sql,
            concat!(
                r#"DELETE FROM "user" WHERE "name" != $1::varchar AND "age" > $2::int4 AND "age" < $3::int4"#,
                r#" AND "age" <= $4::int4 AND "id" IN ($5::varchar, $6::varchar) AND "id" NOT IN ($7::varchar)"#,
                r#" AND "name" IS NULL AND "name" IS NOT NULL"#
            )
        );
        assert_eq!(q.params.len(), 7);
    }

    #[test]
    fn empty_in_matches_nothing_and_empty_not_in_is_ignored() {
        let f = AllOps {
            ids: Some(vec![]),
            not_ids: Some(vec![]),
            ..Default::default()
        };
        let q = QueryBuilder::<User>::new().apply_filters(Some(&f)).count_query();
        assert_eq!(q.sql, r#"SELECT COUNT(*) FROM "user" WHERE 1 = 0"#);
    }

    #[test]
    fn oversized_in_list_is_refused_at_the_bind_limit() {
        let ids = |n: usize| (0..n).map(|i| PgBindValue::String(i.to_string())).collect::<Vec<_>>();
        let at_limit = QueryBuilder::<User>::new()
            .where_in(User::PRIMARY_KEY, ids(MAX_BIND_PARAMS))
            .delete_query();
        assert!(at_limit.check_bind_limit().is_ok());

        let over = QueryBuilder::<User>::new()
            .where_in(User::PRIMARY_KEY, ids(MAX_BIND_PARAMS + 1))
            .delete_query();
        assert!(matches!(over.check_bind_limit(), Err(AppError::Validation(_))));
    }

    #[test]
    fn or_groups_are_isolated_and_ored() {
        let g1 = UserFilters {
            age: Some(30),
            ..Default::default()
        };
        let g2 = UserFilters {
            name: Some("admin".into()),
            id: Some("x".into()),
            ..Default::default()
        };
        let q = QueryBuilder::<User>::new()
            .apply_or_conditions(&[g1, UserFilters::default(), g2])
            .count_query();
        assert_eq!(
            q.sql,
            r#"SELECT COUNT(*) FROM "user" WHERE (("age" >= $1::int4) OR ("id" = $2::varchar AND "name"::text LIKE $3))"#
        );
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn or_groups_are_anded_with_existing_predicates() {
        let and = UserFilters {
            id: Some("x".into()),
            ..Default::default()
        };
        let or = vec![UserFilters {
            age: Some(1),
            ..Default::default()
        }];
        let ext = crate::query::ExtendedFilters { and: Some(and), or };
        let q = QueryBuilder::<User>::new().apply_extended_filters(&ext).count_query();
        assert_eq!(
            q.sql,
            r#"SELECT COUNT(*) FROM "user" WHERE "id" = $1::varchar AND ("age" >= $2::int4)"#
        );
    }

    #[test]
    fn orders_are_normalized() {
        let o = UserOrders {
            age: Some(" DESC ".into()),
            id: Some("asc".into()),
        };
        let q = QueryBuilder::<User>::new()
            .apply_orders(Some(&o))
            .unwrap()
            .select_query();
        assert_eq!(
            q.sql,
            r#"SELECT "id", "name", "age" FROM "user" ORDER BY "age" DESC, "id" ASC"#
        );
    }

    #[test]
    fn invalid_order_direction_names_the_field() {
        let o = UserOrders {
            age: Some("ascending".into()),
            id: None,
        };
        let err = QueryBuilder::<User>::new()
            .apply_orders(Some(&o))
            .err()
            .expect("invalid direction must fail");
        let msg = err.to_string();
        assert!(msg.contains("order field age"), "{}", msg);
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn whitespace_direction_is_rejected() {
        let o = UserOrders {
            age: Some("   ".into()),
            id: None,
        };
        let err = QueryBuilder::<User>::new()
            .apply_orders(Some(&o))
            .err()
            .expect("whitespace direction must fail");
        assert!(err.to_string().contains("order field age must be 'asc' or 'desc'"), "{}", err);
    }

    #[test]
    fn empty_direction_and_no_orders_are_no_ops() {
        let o = UserOrders {
            age: Some(String::new()),
            id: None,
        };
        let q = QueryBuilder::<User>::new()
            .apply_orders(Some(&o))
            .unwrap()
            .apply_orders(Some(&NoOrders {}))
            .unwrap()
            .apply_orders::<UserOrders>(None)
            .unwrap()
            .select_query();
        assert!(!q.sql.contains("ORDER BY"));
    }

    #[test]
    fn count_is_independent_of_pagination() {
        let f = UserFilters {
            age: Some(20),
            ..Default::default()
        };
        let counts: Vec<QueryBuf> = (1..=3)
            .map(|n| {
                QueryBuilder::<User>::new()
                    .apply_filters(Some(&f))
                    .apply_pagination(Some(&Page::new(n, 10)))
                    .count_query()
            })
            .collect();
        assert_eq!(counts[0], counts[1]);
        assert_eq!(counts[1], counts[2]);
        assert!(!counts[0].sql.contains("LIMIT"));

        let page2 = QueryBuilder::<User>::new()
            .apply_filters(Some(&f))
            .apply_pagination(Some(&Page::new(2, 10)))
            .select_query();
        assert!(page2.sql.ends_with(" LIMIT 10 OFFSET 10"), "{}", page2.sql);
    }

    #[test]
    fn invalid_page_is_unbounded() {
        let q = QueryBuilder::<User>::new()
            .apply_pagination(Some(&Page::new(0, 10)))
            .select_query();
        assert!(!q.sql.contains("LIMIT"));
    }

    #[test]
    fn first_query_limits_to_one_and_keeps_order() {
        let o = UserOrders {
            age: Some("desc".into()),
            id: None,
        };
        let q = QueryBuilder::<User>::new()
            .apply_pagination(Some(&Page::new(3, 5)))
            .apply_orders(Some(&o))
            .unwrap()
            .first_query();
        assert_eq!(
            q.sql,
            r#"SELECT "id", "name", "age" FROM "user" ORDER BY "age" DESC LIMIT 1"#
        );
    }

    #[test]
    fn update_binds_set_values_after_predicates() {
        let updates = json!({"age": 31, "name": "n"});
        let q = QueryBuilder::<User>::new()
            .where_eq("id", PgBindValue::String("1".into()))
            .update_query(updates.as_object().unwrap())
            .unwrap();
        assert_eq!(
            q.sql,
            r#"UPDATE "user" SET "age" = $2::int4, "name" = $3::varchar WHERE "id" = $1::varchar"#
        );
        assert_eq!(
            q.params,
            vec![
                PgBindValue::String("1".into()),
                PgBindValue::I64(31),
                PgBindValue::String("n".into()),
            ]
        );
    }

    #[test]
    fn update_rejects_unknown_columns_and_empty_maps() {
        let b = QueryBuilder::<User>::new().where_eq("id", PgBindValue::I64(1));
        let bad = json!({"age = 0, name": 1});
        assert!(matches!(
            b.update_query(bad.as_object().unwrap()),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(b.update_query(&Map::new()), Err(AppError::NoUpdates)));
    }

    #[test]
    fn insert_rows_skips_generated_columns() {
        let rows = vec![
            GroupExample {
                id: 0,
                name: "a".into(),
                department: "x".into(),
            },
            GroupExample {
                id: 0,
                name: "b".into(),
                department: "y".into(),
            },
        ];
        let q = insert_rows(&rows);
        assert_eq!(
            q.sql,
            r#"INSERT INTO "group_example" ("name", "department") VALUES ($1::varchar, $2::varchar), ($3::varchar, $4::varchar)"#
        );
        assert_eq!(q.params.len(), 4);

        let q = insert_returning(&rows[0]);
        assert!(q.sql.ends_with(r#" RETURNING "id", "name", "department""#));
    }

    #[test]
    fn group_by_having_and_select() {
        let q = QueryBuilder::<GroupExample>::new()
            .apply_group_by(&["department"])
            .unwrap()
            .apply_select(&["department", "count(*) as total", "MAX(id)"])
            .unwrap()
            .apply_having("COUNT(*) > 1")
            .unwrap()
            .select_query();
        assert_eq!(
            q.sql,
            r#"SELECT "department", COUNT(*) AS "total", MAX("id") AS "max_id" FROM "group_example" GROUP BY "department" HAVING COUNT(*) > $1"#
        );
        assert_eq!(q.params, vec![PgBindValue::I64(1)]);

        let count = QueryBuilder::<GroupExample>::new()
            .apply_group_by(&["department"])
            .unwrap()
            .count_query();
        assert_eq!(
            count.sql,
            r#"SELECT COUNT(*) FROM (SELECT 1 FROM "group_example" GROUP BY "department") AS grouped"#
        );
    }

    #[test]
    fn group_inputs_are_checked_against_columns() {
        assert!(QueryBuilder::<GroupExample>::new()
            .apply_group_by(&["department; drop table x"])
            .is_err());
        assert!(QueryBuilder::<GroupExample>::new()
            .apply_select(&["SUM(salary)"])
            .is_err());
        assert!(QueryBuilder::<GroupExample>::new()
            .apply_having("COUNT(*) > 1 OR 1=1")
            .is_err());
        assert!(QueryBuilder::<GroupExample>::new().apply_having("").is_ok());
    }
}
