//! crudkit: generic CRUD over PostgreSQL. Entities declare their columns once; filter and
//! order shapes declare `column + operator` tables; generic axum handlers turn request
//! bodies into parameterized SQL and answer with a `{code, msg, data}` envelope.

pub mod config;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use entity::{Entity, Projection};
pub use error::{AppError, ConfigError};
pub use query::{FilterSet, OrderSet, Page};
pub use response::{success, success_with_page, PageResponse, Response};
pub use routes::{app, common_routes, entity_routes};
pub use service::{CrudService, QueryStats};
pub use sql::QueryBuilder;
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_example_tables};
