//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own the domain error vocabulary (`NotFound`, `Conflict`) seen by callers.

pub mod persona_service;
