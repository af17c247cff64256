//! Declarative filter shapes: each request type lists its fields once as (column, operator, accessor).

use crate::sql::PgBindValue;
use serde::{Deserialize, Serialize};

/// Comparison applied between a column and a filter field's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring match: the value is wrapped as `%value%`.
    Like,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    /// Expects a [`Range`]; either bound may be absent.
    Between,
}

impl FilterOp {
    /// SQL operator for the plain comparison operators.
    pub fn comparison(self) -> Option<&'static str> {
        match self {
            FilterOp::Eq => Some("="),
            FilterOp::Ne => Some("!="),
            FilterOp::Gt => Some(">"),
            FilterOp::Gte => Some(">="),
            FilterOp::Lt => Some("<"),
            FilterOp::Lte => Some("<="),
            _ => None,
        }
    }
}

/// Inclusive range for `between` fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Range<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Range<T> {
    pub fn is_valid(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }
}

/// The value carried by a present filter field.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Scalar(PgBindValue),
    List(Vec<PgBindValue>),
    Range {
        min: Option<PgBindValue>,
        max: Option<PgBindValue>,
    },
}

pub trait ToFilterValue {
    fn to_filter_value(&self) -> FilterValue;
}

macro_rules! scalar_filter_value {
    ($($t:ty),*) => {
        $(
            impl ToFilterValue for $t {
                fn to_filter_value(&self) -> FilterValue {
                    FilterValue::Scalar(PgBindValue::from(self))
                }
            }
        )*
    };
}

scalar_filter_value!(String, i32, i64, f64, bool);

impl<T> ToFilterValue for Vec<T>
where
    for<'a> &'a T: Into<PgBindValue>,
{
    fn to_filter_value(&self) -> FilterValue {
        FilterValue::List(self.iter().map(Into::into).collect())
    }
}

impl<T> ToFilterValue for Range<T>
where
    for<'a> &'a T: Into<PgBindValue>,
{
    fn to_filter_value(&self) -> FilterValue {
        FilterValue::Range {
            min: self.min.as_ref().map(Into::into),
            max: self.max.as_ref().map(Into::into),
        }
    }
}

/// Accessor helper for field declarations: `None` means the field is absent.
pub fn present<T: ToFilterValue>(field: &Option<T>) -> Option<FilterValue> {
    field.as_ref().map(ToFilterValue::to_filter_value)
}

/// One declared filter field.
pub struct FilterField<F> {
    pub column: &'static str,
    pub op: FilterOp,
    pub value: fn(&F) -> Option<FilterValue>,
}

impl<F> FilterField<F> {
    pub const fn new(column: &'static str, op: FilterOp, value: fn(&F) -> Option<FilterValue>) -> Self {
        FilterField { column, op, value }
    }
}

/// A filter shape. Implementors return a `static` table of their fields.
pub trait FilterSet: Sized + 'static {
    fn fields() -> &'static [FilterField<Self>];

    /// True when at least one declared field is present, even if it holds a zero value.
    fn has_any_filter(&self) -> bool {
        Self::fields().iter().any(|f| (f.value)(self).is_some())
    }
}

pub fn has_any_filter<F: FilterSet>(filters: Option<&F>) -> bool {
    filters.map(FilterSet::has_any_filter).unwrap_or(false)
}
