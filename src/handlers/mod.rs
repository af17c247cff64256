//! HTTP handlers generic over entity, filter and order types.

pub mod generic;
pub use generic::*;
