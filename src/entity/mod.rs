//! Entity metadata: table, primary key and column list declared once per entity type.

mod group_example;
mod user;

pub use group_example::{GroupExample, GroupExampleFilters, GroupExampleOrders};
pub use user::{User, UserBrief, UserFilters, UserOrders};

use crate::error::AppError;
use crate::sql::PgBindValue;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::postgres::PgRow;
use sqlx::FromRow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: &'static str,
    /// PostgreSQL type used to cast placeholders (e.g. `$1::int4`).
    pub pg_type: &'static str,
    /// Filled by the database (serial, default); left out of INSERT column lists.
    pub generated: bool,
}

impl ColumnInfo {
    pub const fn new(name: &'static str, pg_type: &'static str) -> Self {
        ColumnInfo {
            name,
            pg_type,
            generated: false,
        }
    }

    pub const fn generated(name: &'static str, pg_type: &'static str) -> Self {
        ColumnInfo {
            name,
            pg_type,
            generated: true,
        }
    }
}

/// A table-backed type the generic query, batch and handler layers operate on.
pub trait Entity:
    for<'r> FromRow<'r, PgRow> + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static
{
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";

    fn columns() -> &'static [ColumnInfo];

    /// Values for every non-generated column, in `columns()` order.
    fn insert_values(&self) -> Vec<PgBindValue>;

    /// Called on each row before INSERT (server-side id assignment).
    fn prepare_insert(&mut self) {}
}

/// A read model selecting a subset of an entity's columns.
pub trait Projection: for<'r> FromRow<'r, PgRow> + Serialize + Send + Unpin + 'static {
    fn columns() -> &'static [&'static str];
}

pub fn column_info<E: Entity>(name: &str) -> Option<&'static ColumnInfo> {
    E::columns().iter().find(|c| c.name == name)
}

/// Resolve a user-supplied column name against the entity's declared columns.
pub fn known_column<E: Entity>(name: &str) -> Result<&'static ColumnInfo, AppError> {
    column_info::<E>(name)
        .ok_or_else(|| AppError::Validation(format!("unknown column '{}' for {}", name, E::TABLE)))
}

pub fn insert_columns<E: Entity>() -> impl Iterator<Item = &'static ColumnInfo> {
    E::columns().iter().filter(|c| !c.generated)
}

/// 32 hex chars: a v4 uuid without dashes.
pub fn generate_id32() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_32_hex_chars() {
        let id = generate_id32();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_id32());
    }

    #[test]
    fn unknown_column_is_a_validation_error() {
        assert!(known_column::<User>("age").is_ok());
        let err = known_column::<User>("age; drop table x").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn serial_pk_is_not_inserted() {
        let cols: Vec<_> = insert_columns::<GroupExample>().map(|c| c.name).collect();
        assert_eq!(cols, vec!["name", "department"]);
        let cols: Vec<_> = insert_columns::<User>().map(|c| c.name).collect();
        assert_eq!(cols, vec!["id", "name", "age"]);
    }
}
