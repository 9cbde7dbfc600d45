//! Defines the data structures and models used throughout the application.
//!
//! `readings` holds what comes out of the reading store and the closed input sets
//! (metrics, group dimensions); `charts` holds what the engines hand back.

mod charts;
mod readings;

pub use charts::*;
pub use readings::*;
