//! Persona repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide lookup, existence and write APIs over the `personas` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Persona::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - List queries return rows ordered by ascending id.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::persona::{Gender, Persona, PersonaId, PersonaValidationError};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{ffi, params, Connection, Params, Row};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const PERSONAS_TABLE: &str = "personas";
const REQUIRED_COLUMNS: &[&str] = &["id", "name", "email", "birth_date_time", "gender"];

const PERSONA_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    birth_date_time,
    gender
FROM personas";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persona persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(PersonaValidationError),
    Db(DbError),
    NotFound(PersonaId),
    /// Unique index on `email` rejected the write.
    DuplicateEmail(String),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "persona not found: {id}"),
            Self::DuplicateEmail(email) => write!(f, "email already in use: `{email}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted persona data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PersonaValidationError> for RepoError {
    fn from(value: PersonaValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record store contract consumed by `PersonaService`.
pub trait PersonaRepository {
    /// Returns every persona ordered by id.
    fn find_all(&self) -> RepoResult<Vec<Persona>>;
    fn find_by_id(&self, id: PersonaId) -> RepoResult<Option<Persona>>;
    /// Returns the lowest-id persona with exactly this name.
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Persona>>;
    /// Exact email match.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Persona>>;
    /// Personas whose birth timestamp falls on `date`.
    fn find_all_by_birth_date(&self, date: NaiveDate) -> RepoResult<Vec<Persona>>;
    fn find_all_by_gender(&self, gender: Gender) -> RepoResult<Vec<Persona>>;
    fn exists_by_email(&self, email: &str) -> RepoResult<bool>;
    /// Inserts when `persona.id` is `None`, overwrites the row otherwise.
    /// Returns the stored record with its id set.
    fn save(&self, persona: &Persona) -> RepoResult<Persona>;
    fn delete_by_id(&self, id: PersonaId) -> RepoResult<()>;
}

impl<R: PersonaRepository + ?Sized> PersonaRepository for &R {
    fn find_all(&self) -> RepoResult<Vec<Persona>> {
        (**self).find_all()
    }

    fn find_by_id(&self, id: PersonaId) -> RepoResult<Option<Persona>> {
        (**self).find_by_id(id)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Persona>> {
        (**self).find_by_name(name)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Persona>> {
        (**self).find_by_email(email)
    }

    fn find_all_by_birth_date(&self, date: NaiveDate) -> RepoResult<Vec<Persona>> {
        (**self).find_all_by_birth_date(date)
    }

    fn find_all_by_gender(&self, gender: Gender) -> RepoResult<Vec<Persona>> {
        (**self).find_all_by_gender(gender)
    }

    fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        (**self).exists_by_email(email)
    }

    fn save(&self, persona: &Persona) -> RepoResult<Persona> {
        (**self).save(persona)
    }

    fn delete_by_id(&self, id: PersonaId) -> RepoResult<()> {
        (**self).delete_by_id(id)
    }
}

/// SQLite-backed persona repository.
pub struct SqlitePersonaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonaRepository<'conn> {
    /// Wraps a connection after checking the persona schema is in place.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on a damaged schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_persona_schema(conn)?;
        Ok(Self { conn })
    }

    fn query_personas<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<Persona>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut personas = Vec::new();

        while let Some(row) = rows.next()? {
            personas.push(parse_persona_row(row)?);
        }

        Ok(personas)
    }

    fn query_first<P: Params>(&self, sql: &str, params: P) -> RepoResult<Option<Persona>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_persona_row(row)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, persona: &Persona) -> RepoResult<Persona> {
        self.conn
            .execute(
                "INSERT INTO personas (
                    name,
                    email,
                    birth_date_time,
                    gender
                ) VALUES (?1, ?2, ?3, ?4);",
                params![
                    persona.name.as_str(),
                    persona.email.as_str(),
                    persona.birth_date_time,
                    persona.gender.as_str(),
                ],
            )
            .map_err(|err| map_write_error(err, &persona.email))?;

        Ok(Persona {
            id: Some(self.conn.last_insert_rowid()),
            ..persona.clone()
        })
    }

    fn overwrite(&self, id: PersonaId, persona: &Persona) -> RepoResult<Persona> {
        let changed = self
            .conn
            .execute(
                "UPDATE personas
                 SET
                    name = ?1,
                    email = ?2,
                    birth_date_time = ?3,
                    gender = ?4,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?5;",
                params![
                    persona.name.as_str(),
                    persona.email.as_str(),
                    persona.birth_date_time,
                    persona.gender.as_str(),
                    id,
                ],
            )
            .map_err(|err| map_write_error(err, &persona.email))?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(persona.clone())
    }
}

impl PersonaRepository for SqlitePersonaRepository<'_> {
    fn find_all(&self) -> RepoResult<Vec<Persona>> {
        self.query_personas(&format!("{PERSONA_SELECT_SQL} ORDER BY id ASC;"), [])
    }

    fn find_by_id(&self, id: PersonaId) -> RepoResult<Option<Persona>> {
        self.query_first(&format!("{PERSONA_SELECT_SQL} WHERE id = ?1;"), [id])
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Persona>> {
        self.query_first(
            &format!("{PERSONA_SELECT_SQL} WHERE name = ?1 ORDER BY id ASC LIMIT 1;"),
            [name],
        )
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Persona>> {
        self.query_first(&format!("{PERSONA_SELECT_SQL} WHERE email = ?1;"), [email])
    }

    fn find_all_by_birth_date(&self, date: NaiveDate) -> RepoResult<Vec<Persona>> {
        self.query_personas(
            &format!("{PERSONA_SELECT_SQL} WHERE date(birth_date_time) = ?1 ORDER BY id ASC;"),
            [date.format("%Y-%m-%d").to_string()],
        )
    }

    fn find_all_by_gender(&self, gender: Gender) -> RepoResult<Vec<Persona>> {
        self.query_personas(
            &format!("{PERSONA_SELECT_SQL} WHERE gender = ?1 ORDER BY id ASC;"),
            [gender.as_str()],
        )
    }

    fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM personas WHERE email = ?1);",
            [email],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn save(&self, persona: &Persona) -> RepoResult<Persona> {
        persona.validate()?;

        match persona.id {
            Some(id) => self.overwrite(id, persona),
            None => self.insert(persona),
        }
    }

    fn delete_by_id(&self, id: PersonaId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM personas WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn ensure_persona_schema(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [PERSONAS_TABLE],
        |row| row.get(0),
    )?;
    if table_exists != 1 {
        return Err(RepoError::MissingRequiredTable(PERSONAS_TABLE));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([PERSONAS_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;

    if let Some(column) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !columns.contains(**column))
    {
        return Err(RepoError::MissingRequiredColumn {
            table: PERSONAS_TABLE,
            column: *column,
        });
    }

    Ok(())
}

fn map_write_error(err: rusqlite::Error, email: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            RepoError::DuplicateEmail(email.to_string())
        }
        _ => err.into(),
    }
}

fn parse_persona_row(row: &Row<'_>) -> RepoResult<Persona> {
    let id: PersonaId = row.get("id")?;

    let birth_text: String = row.get("birth_date_time")?;
    let birth_date_time = parse_birth_date_time(&birth_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{birth_text}` in personas.birth_date_time for id {id}"
        ))
    })?;

    let gender_text: String = row.get("gender")?;
    let gender = Gender::parse(&gender_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid gender `{gender_text}` in personas.gender for id {id}"
        ))
    })?;

    let persona = Persona {
        id: Some(id),
        name: row.get("name")?,
        email: row.get("email")?,
        birth_date_time,
        gender,
    };
    persona.validate()?;
    Ok(persona)
}

fn parse_birth_date_time(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}
