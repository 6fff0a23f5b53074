//! Command-line front end for persona records.
//!
//! # Responsibility
//! - Open (and migrate) a persona database file.
//! - Translate one subcommand into one `PersonaService` call.
//! - Print results as JSON on stdout and domain errors on stderr.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use persona_core::db::open_db;
use persona_core::{
    default_log_level, init_logging, Gender, Persona, PersonaId, PersonaService,
    PersonaServiceError, SqlitePersonaRepository,
};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_NOT_FOUND: u8 = 2;
const EXIT_CONFLICT: u8 = 3;

/// Persona record manager backed by a local SQLite file.
#[derive(Parser, Debug)]
#[clap(version)]
struct Cli {
    /// Database file. Created and migrated when missing.
    #[clap(long, default_value = "personas.db")]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error). Defaults by build mode.
    #[clap(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Logging is off without it.
    #[clap(long)]
    log_dir: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every persona.
    List,
    /// Show one persona by id.
    Show { id: PersonaId },
    /// Find personas by one attribute.
    Find(FindArgs),
    /// Create a persona.
    Add(PersonaArgs),
    /// Replace all fields of an existing persona.
    Edit {
        id: PersonaId,
        #[clap(flatten)]
        fields: PersonaArgs,
    },
    /// Delete a persona by id.
    Remove { id: PersonaId },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct FindArgs {
    #[clap(long)]
    name: Option<String>,
    #[clap(long)]
    email: Option<String>,
    /// Calendar date, `YYYY-MM-DD`.
    #[clap(long)]
    born: Option<NaiveDate>,
    #[clap(long, value_parser = parse_gender)]
    gender: Option<Gender>,
}

#[derive(Args, Debug)]
struct PersonaArgs {
    #[clap(long)]
    name: String,
    #[clap(long)]
    email: String,
    /// Birth timestamp, `YYYY-MM-DDTHH:MM:SS`.
    #[clap(long)]
    born: NaiveDateTime,
    #[clap(long, value_parser = parse_gender)]
    gender: Gender,
}

impl PersonaArgs {
    fn into_persona(self) -> Persona {
        Persona::new(self.name, self.email, self.born, self.gender)
    }
}

fn parse_gender(value: &str) -> Result<Gender, String> {
    Gender::parse(value)
        .ok_or_else(|| format!("unknown gender `{value}`; expected male|female|other"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            match err.downcast_ref::<PersonaServiceError>() {
                Some(PersonaServiceError::NotFound(_)) => ExitCode::from(EXIT_NOT_FOUND),
                Some(PersonaServiceError::Conflict(_)) => ExitCode::from(EXIT_CONFLICT),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let conn = open_db(&cli.db)?;
    let service = PersonaService::new(SqlitePersonaRepository::try_new(&conn)?);
    log::debug!(
        "event=cli_command module=cli status=start command={}",
        command_name(&cli.command)
    );

    match cli.command {
        Command::List => print_json(&service.get_all()?),
        Command::Show { id } => print_json(&service.get_by_id(id)?),
        Command::Find(args) => find(&service, args),
        Command::Add(fields) => print_json(&service.create(&fields.into_persona())?),
        Command::Edit { id, fields } => {
            print_json(&service.update(id, &fields.into_persona())?)
        }
        Command::Remove { id } => {
            service.delete(id)?;
            println!("deleted {id}");
            Ok(())
        }
    }
}

fn find(
    service: &PersonaService<SqlitePersonaRepository<'_>>,
    args: FindArgs,
) -> Result<(), Box<dyn Error>> {
    if let Some(name) = args.name {
        return print_json(&service.get_by_name(&name)?);
    }
    if let Some(email) = args.email {
        return print_json(&service.get_by_email(&email)?);
    }
    if let Some(date) = args.born {
        return print_json(&service.get_by_birth_date(date)?);
    }
    match args.gender {
        Some(gender) => print_json(&service.get_by_gender(gender)?),
        None => Err("one of --name, --email, --born or --gender is required".into()),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::List => "list",
        Command::Show { .. } => "show",
        Command::Find(_) => "find",
        Command::Add(_) => "add",
        Command::Edit { .. } => "edit",
        Command::Remove { .. } => "remove",
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
