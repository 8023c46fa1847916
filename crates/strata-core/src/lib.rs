//! Strata Core
//!
//! Allocation, logging, profiling and math utilities shared by the Strata crates.

pub mod alloc;
pub mod logging;
pub mod math;
pub mod profiling;
