//! Filter, order and page descriptors consumed by the query builder.

mod filter;
mod order;
mod page;
mod request;

pub use filter::*;
pub use order::*;
pub use page::*;
pub use request::*;
