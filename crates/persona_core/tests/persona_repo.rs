use chrono::{NaiveDate, NaiveDateTime};
use persona_core::db::migrations::latest_version;
use persona_core::db::open_db_in_memory;
use persona_core::{
    Gender, Persona, PersonaRepository, PersonaValidationError, RepoError, SqlitePersonaRepository,
};
use rusqlite::Connection;

fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 15, 0)
        .unwrap()
}

fn persona(name: &str, email: &str, gender: Gender) -> Persona {
    Persona::new(name, email, at(1990, 5, 17, 8), gender)
}

#[test]
fn save_assigns_id_and_find_by_id_roundtrips() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonaRepository::try_new(&conn).unwrap();

    let saved = repo
        .save(&persona("Ana", "ana@example.com", Gender::Female))
        .unwrap();
    let id = saved.id.unwrap();

    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.birth_date_time, at(1990, 5, 17, 8));
    assert!(repo.find_by_id(id + 100).unwrap().is_none());
}

#[test]
fn save_with_id_overwrites_existing_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonaRepository::try_new(&conn).unwrap();

    let mut saved = repo
        .save(&persona("Ana", "ana@example.com", Gender::Female))
        .unwrap();
    saved.name = "Ana Maria".to_string();
    saved.gender = Gender::Other;
    repo.save(&saved).unwrap();

    let loaded = repo.find_by_id(saved.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded.name, "Ana Maria");
    assert_eq!(loaded.gender, Gender::Other);
    assert_eq!(repo.find_all().unwrap().len(), 1);
}

#[test]
fn save_with_unknown_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonaRepository::try_new(&conn).unwrap();

    let mut ghost = persona("Ghost", "ghost@example.com", Gender::Other);
    ghost.id = Some(404);
    let err = repo.save(&ghost).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(404)));
}

#[test]
fn duplicate_email_is_rejected_by_store() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonaRepository::try_new(&conn).unwrap();

    repo.save(&persona("Ana", "shared@example.com", Gender::Female))
        .unwrap();
    let err = repo
        .save(&persona("Bruno", "shared@example.com", Gender::Male))
        .unwrap_err();

    assert!(matches!(err, RepoError::DuplicateEmail(email) if email == "shared@example.com"));
    assert_eq!(repo.find_all().unwrap().len(), 1);
}

#[test]
fn validation_failure_blocks_writes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonaRepository::try_new(&conn).unwrap();

    let err = repo
        .save(&persona(" ", "blank@example.com", Gender::Male))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(PersonaValidationError::BlankName)
    ));
    assert!(repo.find_all().unwrap().is_empty());
}

#[test]
fn lookups_by_name_email_and_existence() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonaRepository::try_new(&conn).unwrap();

    let first = repo
        .save(&persona("Sam", "sam1@example.com", Gender::Male))
        .unwrap();
    repo.save(&persona("Sam", "sam2@example.com", Gender::Other))
        .unwrap();

    let by_name = repo.find_by_name("Sam").unwrap().unwrap();
    assert_eq!(by_name.id, first.id);
    assert!(repo.find_by_name("Nobody").unwrap().is_none());

    let by_email = repo.find_by_email("sam2@example.com").unwrap().unwrap();
    assert_eq!(by_email.gender, Gender::Other);
    assert!(repo.find_by_email("SAM2@example.com").unwrap().is_none());

    assert!(repo.exists_by_email("sam1@example.com").unwrap());
    assert!(!repo.exists_by_email("missing@example.com").unwrap());
}

#[test]
fn list_filters_by_birth_date_and_gender_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonaRepository::try_new(&conn).unwrap();

    let morning = repo
        .save(&Persona::new(
            "Morning",
            "m@example.com",
            at(2000, 1, 1, 6),
            Gender::Female,
        ))
        .unwrap();
    let evening = repo
        .save(&Persona::new(
            "Evening",
            "e@example.com",
            at(2000, 1, 1, 22),
            Gender::Male,
        ))
        .unwrap();
    repo.save(&Persona::new(
        "Next day",
        "n@example.com",
        at(2000, 1, 2, 6),
        Gender::Female,
    ))
    .unwrap();

    let same_day = repo
        .find_all_by_birth_date(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
        .unwrap();
    let ids: Vec<_> = same_day.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![morning.id, evening.id]);

    let females = repo.find_all_by_gender(Gender::Female).unwrap();
    assert_eq!(females.len(), 2);
    assert!(repo.find_all_by_gender(Gender::Other).unwrap().is_empty());
}

#[test]
fn delete_by_id_removes_row_and_reports_missing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonaRepository::try_new(&conn).unwrap();

    let saved = repo
        .save(&persona("Ana", "ana@example.com", Gender::Female))
        .unwrap();
    let id = saved.id.unwrap();

    repo.delete_by_id(id).unwrap();
    assert!(repo.find_by_id(id).unwrap().is_none());
    assert!(matches!(
        repo.delete_by_id(id).unwrap_err(),
        RepoError::NotFound(missing) if missing == id
    ));
}

#[test]
fn invalid_persisted_gender_is_reported() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO personas (name, email, birth_date_time, gender)
         VALUES ('Ana', 'ana@example.com', '1990-05-17 08:30:00', 'robot');",
        [],
    )
    .unwrap();
    let repo = SqlitePersonaRepository::try_new(&conn).unwrap();

    let err = repo.find_all().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("robot")));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqlitePersonaRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_personas_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePersonaRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("personas"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE personas (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            birth_date_time TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePersonaRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "personas",
            column: "gender"
        })
    ));
}
