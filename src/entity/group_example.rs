use crate::entity::{ColumnInfo, Entity};
use crate::query::{present, FilterField, FilterOp, FilterSet, OrderField, OrderSet};
use crate::sql::PgBindValue;
use serde::{Deserialize, Serialize};

/// Row of `group_example`, used by the GROUP BY endpoint. `id` is a serial.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(default)]
pub struct GroupExample {
    pub id: i32,
    pub name: String,
    pub department: String,
}

static GROUP_EXAMPLE_COLUMNS: &[ColumnInfo] = &[
    ColumnInfo::generated("id", "int4"),
    ColumnInfo::new("name", "varchar"),
    ColumnInfo::new("department", "varchar"),
];

impl Entity for GroupExample {
    const TABLE: &'static str = "group_example";

    fn columns() -> &'static [ColumnInfo] {
        GROUP_EXAMPLE_COLUMNS
    }

    fn insert_values(&self) -> Vec<PgBindValue> {
        vec![PgBindValue::from(&self.name), PgBindValue::from(&self.department)]
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GroupExampleFilters {
    pub id: Option<i32>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub departments: Option<Vec<String>>,
    pub exclude_departments: Option<Vec<String>>,
}

static GROUP_EXAMPLE_FILTER_FIELDS: &[FilterField<GroupExampleFilters>] = &[
    FilterField::new("id", FilterOp::Eq, |f| present(&f.id)),
    FilterField::new("name", FilterOp::Like, |f| present(&f.name)),
    FilterField::new("department", FilterOp::Eq, |f| present(&f.department)),
    FilterField::new("department", FilterOp::In, |f| present(&f.departments)),
    FilterField::new("department", FilterOp::NotIn, |f| present(&f.exclude_departments)),
];

impl FilterSet for GroupExampleFilters {
    fn fields() -> &'static [FilterField<Self>] {
        GROUP_EXAMPLE_FILTER_FIELDS
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GroupExampleOrders {
    pub id: Option<String>,
    pub name: Option<String>,
    pub department: Option<String>,
}

static GROUP_EXAMPLE_ORDER_FIELDS: &[OrderField<GroupExampleOrders>] = &[
    OrderField::new("id", |o| o.id.as_deref()),
    OrderField::new("name", |o| o.name.as_deref()),
    OrderField::new("department", |o| o.department.as_deref()),
];

impl OrderSet for GroupExampleOrders {
    fn fields() -> &'static [OrderField<Self>] {
        GROUP_EXAMPLE_ORDER_FIELDS
    }
}
