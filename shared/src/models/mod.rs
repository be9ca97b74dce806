//! Data models
//!
//! Shared between freight-engine and the outer API layer.
//! Entity IDs are `i64` except containers, which are keyed by container number.
//! Volumes and money are `Decimal`, timestamps are Unix millis.

pub mod cargo;
pub mod container;
pub mod container_cargo;
pub mod offer;
pub mod request;

// Re-exports
pub use cargo::*;
pub use container::*;
pub use container_cargo::*;
pub use offer::*;
pub use request::*;
