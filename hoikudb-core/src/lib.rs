//! Core types and session wiring for the hoikudb childcare vacancy map.

/// Vacancy filter over facility collections.
pub mod filter;
/// Domain models and identifiers shared by all crates.
pub mod model;
/// Mutually exclusive overlay panels and their broadcast channel.
pub mod overlay;
/// Traits describing the facility source, clock and map renderer.
pub mod ports;
/// Session facade used by clients.
pub mod service;
/// Time-limited statistics cache partitioned by area.
pub mod stats;
/// Ward name to bounding box lookup.
pub mod wards;

pub use filter::{AgeConstraint, FilterCriteria};
pub use model::*;
pub use overlay::*;
pub use ports::*;
pub use service::*;
pub use stats::*;
pub use wards::*;
