//! Restricted expression grammar for user-supplied SELECT items and HAVING conditions.
//! Only identifiers and a fixed set of aggregate functions are accepted; numbers are bound.

use crate::error::AppError;
use crate::sql::builder::quoted;
use crate::sql::PgBindValue;
use regex::Regex;
use std::sync::OnceLock;

const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*";

fn column_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"^\s*({})\s*$", IDENT)).expect("static regex"))
}

fn aggregate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^\s*(COUNT|SUM|AVG|MIN|MAX)\s*\(\s*(\*|{ident})\s*\)(?:\s+AS\s+({ident}))?\s*$",
            ident = IDENT
        ))
        .expect("static regex")
    })
}

fn having_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)^\s*(COUNT|SUM|AVG|MIN|MAX)\s*\(\s*(\*|{})\s*\)\s*(>=|<=|<>|!=|=|>|<)\s*(-?\d+(?:\.\d+)?)\s*$",
            IDENT
        ))
        .expect("static regex")
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateFn::Count),
            "SUM" => Some(AggregateFn::Sum),
            "AVG" => Some(AggregateFn::Avg),
            "MIN" => Some(AggregateFn::Min),
            "MAX" => Some(AggregateFn::Max),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
        }
    }

    /// SUM and AVG are cast to float8 so integer and numeric columns decode the same way.
    pub fn render(self, column: Option<&str>) -> String {
        let arg = column.map(quoted).unwrap_or_else(|| "*".to_string());
        match self {
            AggregateFn::Sum | AggregateFn::Avg => format!("{}({})::float8", self.name(), arg),
            _ => format!("{}({})", self.name(), arg),
        }
    }

    pub fn default_alias(self, column: Option<&str>) -> String {
        let f = self.name().to_ascii_lowercase();
        match column {
            Some(c) => format!("{}_{}", f, c),
            None => f,
        }
    }
}

/// Split `FUNC(arg)` captures into function and optional column (`*` means none).
fn function_and_column(func: &str, arg: &str, raw: &str) -> Result<(AggregateFn, Option<String>), AppError> {
    let function = AggregateFn::parse(func)
        .ok_or_else(|| AppError::Validation(format!("unsupported aggregate in '{}'", raw)))?;
    if arg == "*" {
        if function != AggregateFn::Count {
            return Err(AppError::Validation(format!("only COUNT accepts '*': '{}'", raw)));
        }
        return Ok((function, None));
    }
    Ok((function, Some(arg.to_string())))
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectExpr {
    Column(String),
    Aggregate {
        function: AggregateFn,
        column: Option<String>,
        alias: Option<String>,
    },
}

impl SelectExpr {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if let Some(c) = column_re().captures(raw) {
            return Ok(SelectExpr::Column(c[1].to_string()));
        }
        let c = aggregate_re()
            .captures(raw)
            .ok_or_else(|| AppError::Validation(format!("invalid select expression '{}'", raw)))?;
        let (function, column) = function_and_column(&c[1], &c[2], raw)?;
        Ok(SelectExpr::Aggregate {
            function,
            column,
            alias: c.get(3).map(|m| m.as_str().to_string()),
        })
    }
}

/// `FUNC(col|*) op number`.
#[derive(Clone, Debug, PartialEq)]
pub struct HavingExpr {
    pub function: AggregateFn,
    pub column: Option<String>,
    pub op: &'static str,
    pub value: PgBindValue,
}

impl HavingExpr {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let c = having_re()
            .captures(raw)
            .ok_or_else(|| AppError::Validation(format!("invalid having condition '{}'", raw)))?;
        let (function, column) = function_and_column(&c[1], &c[2], raw)?;
        let op = match &c[3] {
            ">=" => ">=",
            "<=" => "<=",
            "<>" | "!=" => "<>",
            "=" => "=",
            ">" => ">",
            _ => "<",
        };
        let number = &c[4];
        let value = match number.parse::<i64>() {
            Ok(n) => PgBindValue::I64(n),
            Err(_) => number
                .parse::<f64>()
                .map(PgBindValue::F64)
                .map_err(|_| AppError::Validation(format!("invalid number in having '{}'", raw)))?,
        };
        Ok(HavingExpr {
            function,
            column,
            op,
            value,
        })
    }
}
