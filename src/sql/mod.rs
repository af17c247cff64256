//! Safe SQL builder: identifiers from entity declarations only, values as parameters.

mod builder;
pub mod exec;
pub mod expr;
pub mod params;
pub use builder::*;
pub use params::*;
