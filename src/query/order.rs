//! Declarative order shapes: optional "asc"/"desc" strings keyed by column.

use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Case-insensitive, surrounding whitespace ignored. Anything but asc/desc is rejected.
    pub fn parse(raw: &str) -> Option<Direction> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

pub struct OrderField<O> {
    pub column: &'static str,
    pub direction: fn(&O) -> Option<&str>,
}

impl<O> OrderField<O> {
    pub const fn new(column: &'static str, direction: fn(&O) -> Option<&str>) -> Self {
        OrderField { column, direction }
    }
}

/// An order shape. Fields are applied in declaration order.
pub trait OrderSet: Sized + 'static {
    fn fields() -> &'static [OrderField<Self>];
}

/// Order shape for endpoints that take no ordering; accepts `{}`.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct NoOrders {}

impl OrderSet for NoOrders {
    fn fields() -> &'static [OrderField<Self>] {
        &[]
    }
}
