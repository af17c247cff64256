//! Shared application state for all routes.

use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Rows per INSERT for batch create.
    pub batch_size: i64,
}

impl AppState {
    pub fn new(pool: PgPool, batch_size: i64) -> Self {
        AppState { pool, batch_size }
    }
}
