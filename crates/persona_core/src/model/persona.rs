//! Persona domain model.
//!
//! # Responsibility
//! - Define the single flat entity managed by core.
//! - Provide field validation shared by repository write and read paths.
//!
//! # Invariants
//! - `id` is `None` until the store assigns one, and never changes afterwards.
//! - `name` and `email` are non-blank for every persisted record.
//! - `birth_date_time` and `gender` are always present.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned identifier for a persona row.
pub type PersonaId = i64;

/// Closed set of gender tokens accepted by core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Stable storage token for this variant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }

    /// Parses a storage/input token. Matching is case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl Display for Gender {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level validation failure for persona records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaValidationError {
    BlankName,
    BlankEmail,
}

impl Display for PersonaValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "persona name must not be blank"),
            Self::BlankEmail => write!(f, "persona email must not be blank"),
        }
    }
}

impl Error for PersonaValidationError {}

/// Canonical persona record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Assigned by the store on first save.
    pub id: Option<PersonaId>,
    pub name: String,
    /// Unique across the store. Compared case-insensitively on update.
    pub email: String,
    pub birth_date_time: NaiveDateTime,
    pub gender: Gender,
}

impl Persona {
    /// Creates an unsaved persona. The store assigns `id` on save.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        birth_date_time: NaiveDateTime,
        gender: Gender,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            birth_date_time,
            gender,
        }
    }

    /// Checks the non-blank field rules.
    ///
    /// # Errors
    /// - `BlankName` when `name` is empty or whitespace only.
    /// - `BlankEmail` when `email` is empty or whitespace only.
    pub fn validate(&self) -> Result<(), PersonaValidationError> {
        if self.name.trim().is_empty() {
            return Err(PersonaValidationError::BlankName);
        }
        if self.email.trim().is_empty() {
            return Err(PersonaValidationError::BlankEmail);
        }
        Ok(())
    }
}

/// Flat transfer copy of a persona used at the crate boundary.
///
/// Carries no id and performs no validation; callers validate upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaDto {
    pub name: String,
    pub email: String,
    pub birth_date_time: NaiveDateTime,
    pub gender: Gender,
}

impl From<&Persona> for PersonaDto {
    fn from(value: &Persona) -> Self {
        Self {
            name: value.name.clone(),
            email: value.email.clone(),
            birth_date_time: value.birth_date_time,
            gender: value.gender,
        }
    }
}

impl From<PersonaDto> for Persona {
    fn from(value: PersonaDto) -> Self {
        Persona::new(value.name, value.email, value.birth_date_time, value.gender)
    }
}
