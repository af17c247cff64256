//! Services executing built statements: CRUD, batch operations and statistics.

pub mod batch;
mod crud;
pub mod stats;

pub use crud::CrudService;
pub use stats::QueryStats;
