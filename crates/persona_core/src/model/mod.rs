//! Domain model for persona records.
//!
//! # Responsibility
//! - Define the canonical persona record used by core business logic.
//! - Define the flat transfer shape exchanged at the crate boundary.
//!
//! # Invariants
//! - A persisted persona is identified by a store-assigned `PersonaId`.
//! - Email is unique across all persisted personas.

pub mod persona;
