//! Client-side monitoring state.
//!
//! DESIGN
//! ======
//! State is split by concern (`series`, `registry`, `time_range`, `servers`,
//! `status`) so the router and fallback can depend on small focused models.

pub mod registry;
pub mod series;
pub mod servers;
pub mod status;
pub mod time_range;
