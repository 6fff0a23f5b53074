//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record store contract the persona service depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Persona::validate()` before persistence.
//! - The store-level unique index on `email` is the authoritative duplicate
//!   guard and surfaces as `RepoError::DuplicateEmail`.

pub mod persona_repo;
