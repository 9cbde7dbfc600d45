//! Plausible sensor readings for demos, offline dashboards and seeding a fresh database.

mod generator;

pub use generator::*;
