//! Persona use-case service.
//!
//! # Responsibility
//! - Provide CRUD and lookup entry points over persona records.
//! - Enforce the one-persona-per-email rule before touching storage.
//! - Convert between stored records and the flat transfer shape.
//!
//! # Invariants
//! - Every mutation first resolves its target by id.
//! - A store-reported duplicate email is reported as `Conflict`, same as the
//!   pre-check. The pre-check alone is not atomic with the write.
//! - Store failures other than not-found/duplicate pass through as `Repo`.

use crate::model::persona::{Gender, Persona, PersonaDto, PersonaId};
use crate::repo::persona_repo::{PersonaRepository, RepoError};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, PersonaServiceError>;

/// Lookup that produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonaLookup {
    Id(PersonaId),
    Name(String),
    Email(String),
    BirthDate(NaiveDate),
    Gender(Gender),
}

impl Display for PersonaLookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "no persona found with id {id}"),
            Self::Name(name) => write!(f, "no persona found with name `{name}`"),
            Self::Email(email) => write!(f, "no persona found with email `{email}`"),
            Self::BirthDate(date) => write!(f, "no personas born on {date}"),
            Self::Gender(gender) => write!(f, "no personas with gender `{gender}`"),
        }
    }
}

/// Service error for persona use-cases.
#[derive(Debug)]
pub enum PersonaServiceError {
    /// A lookup or filtered list yielded nothing.
    NotFound(PersonaLookup),
    /// The write would give two personas the same email.
    Conflict(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for PersonaServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(lookup) => write!(f, "{lookup}"),
            Self::Conflict(email) => write!(f, "a persona with email `{email}` already exists"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersonaServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PersonaServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(PersonaLookup::Id(id)),
            RepoError::DuplicateEmail(email) => Self::Conflict(email),
            other => Self::Repo(other),
        }
    }
}

/// Persona service facade over a record store.
pub struct PersonaService<R: PersonaRepository> {
    repo: R,
}

impl<R: PersonaRepository> PersonaService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns every persona. An empty store yields an empty list.
    pub fn get_all(&self) -> ServiceResult<Vec<Persona>> {
        Ok(self.repo.find_all()?)
    }

    pub fn get_by_id(&self, id: PersonaId) -> ServiceResult<Persona> {
        self.repo
            .find_by_id(id)?
            .ok_or(PersonaServiceError::NotFound(PersonaLookup::Id(id)))
    }

    /// Returns the first persona with this exact name.
    pub fn get_by_name(&self, name: &str) -> ServiceResult<Persona> {
        self.repo
            .find_by_name(name)?
            .ok_or_else(|| PersonaServiceError::NotFound(PersonaLookup::Name(name.to_string())))
    }

    pub fn get_by_email(&self, email: &str) -> ServiceResult<Persona> {
        self.repo
            .find_by_email(email)?
            .ok_or_else(|| PersonaServiceError::NotFound(PersonaLookup::Email(email.to_string())))
    }

    /// Returns personas born on `date`; an empty match is `NotFound`.
    pub fn get_by_birth_date(&self, date: NaiveDate) -> ServiceResult<Vec<Persona>> {
        non_empty(
            self.repo.find_all_by_birth_date(date)?,
            PersonaLookup::BirthDate(date),
        )
    }

    /// Returns personas of `gender`; an empty match is `NotFound`.
    pub fn get_by_gender(&self, gender: Gender) -> ServiceResult<Vec<Persona>> {
        non_empty(
            self.repo.find_all_by_gender(gender)?,
            PersonaLookup::Gender(gender),
        )
    }

    /// Persists a new persona and returns it with its assigned id.
    ///
    /// Any id already set on `persona` is ignored.
    ///
    /// # Errors
    /// - `Conflict` when the email is already held by another persona.
    pub fn create(&self, persona: &Persona) -> ServiceResult<Persona> {
        if self.repo.exists_by_email(&persona.email)? {
            warn!("event=persona_create module=service status=conflict");
            return Err(PersonaServiceError::Conflict(persona.email.clone()));
        }

        let created = self.repo.save(&Persona {
            id: None,
            ..persona.clone()
        })?;
        info!(
            "event=persona_create module=service status=ok id={}",
            created.id.unwrap_or_default()
        );
        Ok(created)
    }

    /// Converts a transfer value and creates it.
    pub fn create_from_transfer(&self, dto: PersonaDto) -> ServiceResult<Persona> {
        self.create(&self.from_transfer(dto))
    }

    /// Overwrites the persona stored under `id` with `new_data`.
    ///
    /// Name, birth timestamp and gender are always replaced. The email is
    /// replaced only when it differs from the stored one ignoring case; a
    /// case-only difference keeps the stored spelling.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist; nothing else is checked then.
    /// - `Conflict` when the new email belongs to a persona whose id is not
    ///   the one declared in `new_data.id`, or when the store rejects it.
    pub fn update(&self, id: PersonaId, new_data: &Persona) -> ServiceResult<Persona> {
        let mut persona = self.get_by_id(id)?;

        if !emails_equal_ignore_case(&persona.email, &new_data.email) {
            if let Some(holder) = self.repo.find_by_email(&new_data.email)? {
                if holder.id != new_data.id {
                    warn!(
                        "event=persona_update module=service status=conflict id={id} holder_id={}",
                        holder.id.unwrap_or_default()
                    );
                    return Err(PersonaServiceError::Conflict(new_data.email.clone()));
                }
            }
            persona.email = new_data.email.clone();
        }

        persona.name = new_data.name.clone();
        persona.birth_date_time = new_data.birth_date_time;
        persona.gender = new_data.gender;

        let updated = self.repo.save(&persona)?;
        info!("event=persona_update module=service status=ok id={id}");
        Ok(updated)
    }

    /// Removes the persona stored under `id`.
    pub fn delete(&self, id: PersonaId) -> ServiceResult<()> {
        self.get_by_id(id)?;
        self.repo.delete_by_id(id)?;
        info!("event=persona_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Structural copy into the transfer shape. No validation.
    pub fn to_transfer(&self, persona: &Persona) -> PersonaDto {
        PersonaDto::from(persona)
    }

    /// Structural copy from the transfer shape into an unsaved persona.
    pub fn from_transfer(&self, dto: PersonaDto) -> Persona {
        Persona::from(dto)
    }
}

fn non_empty(personas: Vec<Persona>, lookup: PersonaLookup) -> ServiceResult<Vec<Persona>> {
    if personas.is_empty() {
        debug!("event=persona_list module=service status=empty");
        return Err(PersonaServiceError::NotFound(lookup));
    }
    Ok(personas)
}

fn emails_equal_ignore_case(left: &str, right: &str) -> bool {
    left.chars()
        .flat_map(char::to_lowercase)
        .eq(right.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::{emails_equal_ignore_case, PersonaLookup, PersonaServiceError};
    use crate::repo::persona_repo::RepoError;

    #[test]
    fn email_comparison_ignores_case_only() {
        assert!(emails_equal_ignore_case("Ana@Example.com", "ana@example.COM"));
        assert!(!emails_equal_ignore_case("ana@example.com", "ana@example.org"));
        assert!(emails_equal_ignore_case("ÅSA@example.com", "åsa@example.com"));
        assert!(!emails_equal_ignore_case("ana@example.com", "ana@example.co"));
    }

    #[test]
    fn repo_errors_map_to_domain_kinds() {
        let not_found = PersonaServiceError::from(RepoError::NotFound(7));
        assert!(matches!(
            not_found,
            PersonaServiceError::NotFound(PersonaLookup::Id(7))
        ));

        let conflict = PersonaServiceError::from(RepoError::DuplicateEmail("a@a.com".into()));
        assert!(matches!(conflict, PersonaServiceError::Conflict(email) if email == "a@a.com"));

        let other = PersonaServiceError::from(RepoError::InvalidData("bad".into()));
        assert!(matches!(other, PersonaServiceError::Repo(_)));
    }
}
