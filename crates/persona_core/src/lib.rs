//! Core domain logic for persona record management.
//! This crate is the single source of truth for persona invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::persona::{Gender, Persona, PersonaDto, PersonaId, PersonaValidationError};
pub use repo::persona_repo::{PersonaRepository, RepoError, RepoResult, SqlitePersonaRepository};
pub use service::persona_service::{
    PersonaLookup, PersonaService, PersonaServiceError, ServiceResult,
};
