use crate::entity::{generate_id32, ColumnInfo, Entity, Projection};
use crate::query::{present, FilterField, FilterOp, FilterSet, OrderField, OrderSet, Range};
use crate::sql::PgBindValue;
use serde::{Deserialize, Serialize};

/// Row of the `"user"` table. The id is assigned on create.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub name: String,
    pub age: i32,
}

static USER_COLUMNS: &[ColumnInfo] = &[
    ColumnInfo::new("id", "varchar"),
    ColumnInfo::new("name", "varchar"),
    ColumnInfo::new("age", "int4"),
];

impl Entity for User {
    const TABLE: &'static str = "user";

    fn columns() -> &'static [ColumnInfo] {
        USER_COLUMNS
    }

    fn insert_values(&self) -> Vec<PgBindValue> {
        vec![
            PgBindValue::from(&self.id),
            PgBindValue::from(&self.name),
            PgBindValue::from(self.age),
        ]
    }

    fn prepare_insert(&mut self) {
        if self.id.is_empty() {
            self.id = generate_id32();
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserFilters {
    pub id: Option<String>,
    /// Minimum age.
    pub age: Option<i32>,
    /// Substring of the name.
    pub name: Option<String>,
    pub age_between: Option<Range<i32>>,
    pub ids: Option<Vec<String>>,
}

static USER_FILTER_FIELDS: &[FilterField<UserFilters>] = &[
    FilterField::new("id", FilterOp::Eq, |f| present(&f.id)),
    FilterField::new("age", FilterOp::Gte, |f| present(&f.age)),
    FilterField::new("name", FilterOp::Like, |f| present(&f.name)),
    FilterField::new("age", FilterOp::Between, |f| present(&f.age_between)),
    FilterField::new("id", FilterOp::In, |f| present(&f.ids)),
];

impl FilterSet for UserFilters {
    fn fields() -> &'static [FilterField<Self>] {
        USER_FILTER_FIELDS
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserOrders {
    pub age: Option<String>,
    pub id: Option<String>,
}

static USER_ORDER_FIELDS: &[OrderField<UserOrders>] = &[
    OrderField::new("age", |o| o.age.as_deref()),
    OrderField::new("id", |o| o.id.as_deref()),
];

impl OrderSet for UserOrders {
    fn fields() -> &'static [OrderField<Self>] {
        USER_ORDER_FIELDS
    }
}

/// Id and name only, for list views.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct UserBrief {
    pub id: String,
    pub name: String,
}

impl Projection for UserBrief {
    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }
}
