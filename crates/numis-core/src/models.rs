//! Domain models for Numis.
//!
//! These are the core types shared across all crates.

pub mod account;
pub mod audit;
pub mod coin;
