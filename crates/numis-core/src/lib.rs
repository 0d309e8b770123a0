//! Numis Core: domain models, the error taxonomy and repository traits
//! shared by the auth, audit, and storage crates.

pub mod clock;
pub mod error;
pub mod models;
pub mod repository;
