// SPDX-License-Identifier: Apache-2.0
#![forbid(unsafe_code)]

//! Operator commands for a junkan database: migrations, the first admin,
//! invite codes, reward tiers, statistics and approvals.

use chrono::Utc;
use clap::{error::ErrorKind, Parser, Subcommand};
use junkan_core::{resolve_db_path, ExitCode, ENV_JUNKAN_LOG_LEVEL};
use junkan_model::{validate_email, validate_password, UserStatus, ValidationError};
use junkan_store::{MembershipStore, StoreError, StoreErrorCode, SCHEMA_VERSION};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;
use tracing_subscriber::EnvFilter;

const JUNKAN_HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
Usage: {usage}

Options:
{options}

Commands:
{subcommands}
{after-help}";

#[derive(Parser)]
#[command(name = "junkan", version)]
#[command(about = "junkan membership operations CLI")]
#[command(help_template = JUNKAN_HELP_TEMPLATE)]
#[command(
    after_help = "Environment:\n  JUNKAN_DB_PATH     Default database path\n  JUNKAN_LOG_LEVEL   Log verbosity override"
)]
struct Cli {
    /// SQLite database; defaults to JUNKAN_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the schema.
    Migrate,
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
    },
    /// Mint an invite code for an active member; consumes one slot.
    MintInvite {
        #[arg(long)]
        email: String,
    },
    SeedRewards,
    Stats,
    Approve {
        #[arg(long)]
        email: String,
    },
}

#[derive(Debug)]
struct CliError {
    exit_code: ExitCode,
    code: &'static str,
    message: String,
}

impl CliError {
    fn usage(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::Usage,
            code: "usage_error",
            message: message.into(),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(error: StoreError) -> Self {
        let exit_code = match error.code {
            StoreErrorCode::Io => ExitCode::DependencyFailure,
            StoreErrorCode::Internal => ExitCode::Internal,
            _ => ExitCode::Validation,
        };
        Self {
            exit_code,
            code: error.code.as_str(),
            message: error.message,
        }
    }
}

impl From<ValidationError> for CliError {
    fn from(error: ValidationError) -> Self {
        let message = error
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.field, f.message))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            exit_code: ExitCode::Validation,
            code: "validation_error",
            message,
        }
    }
}

#[derive(Clone, Copy)]
struct OutputMode {
    json: bool,
}

impl OutputMode {
    fn emit(self, payload: &Value, human: &str) -> Result<(), CliError> {
        if self.json {
            let line = serde_json::to_string(payload).map_err(|e| CliError {
                exit_code: ExitCode::Internal,
                code: "internal_error",
                message: e.to_string(),
            })?;
            println!("{line}");
        } else {
            println!("{human}");
        }
        Ok(())
    }
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        eprintln!(
            "{}",
            json!({"code": error.code, "message": error.message})
        );
    } else {
        eprintln!("{}: {}", error.code, error.message);
    }
}

fn init_tracing() {
    let filter = std::env::var(ENV_JUNKAN_LOG_LEVEL)
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => return Err(CliError::usage(err.to_string().trim().to_string())),
        },
    };
    let command = cli
        .command
        .ok_or_else(|| CliError::usage("missing command; see --help"))?;
    init_tracing();
    let output = OutputMode { json: cli.json };
    let db = cli.db.unwrap_or_else(resolve_db_path);
    let store = MembershipStore::open(&db)?;
    tracing::debug!(db = %db.display(), "database opened");

    match command {
        Commands::Migrate => output.emit(
            &json!({"db": db.display().to_string(), "schema_version": SCHEMA_VERSION}),
            &format!("schema_version={SCHEMA_VERSION}"),
        ),
        Commands::CreateAdmin {
            email,
            password,
            name,
        } => create_admin(&store, output, &email, &password, &name),
        Commands::MintInvite { email } => mint_invite(&store, output, &email),
        Commands::SeedRewards => {
            let seeded = store.seed_default_rewards()?;
            output.emit(&json!({"seeded": seeded}), &format!("seeded={seeded}"))
        }
        Commands::Stats => {
            let stats = store.dashboard(Utc::now())?;
            let payload = json!(stats);
            let human = format!(
                "total_users={} active_rate={}% monthly_new_users={} content_count={}",
                stats.total_users, stats.active_rate, stats.monthly_new_users, stats.content_count
            );
            output.emit(&payload, &human)
        }
        Commands::Approve { email } => approve(&store, output, &email),
    }
}

fn create_admin(
    store: &MembershipStore,
    output: OutputMode,
    email: &str,
    password: &str,
    name: &str,
) -> Result<(), CliError> {
    let email = validate_email(email)?;
    validate_password(password)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::usage("--name must not be blank"));
    }
    let admin = store.create_admin(&email, password, name)?;
    output.emit(
        &json!({"id": admin.id, "member_id": admin.member_id, "email": admin.email}),
        &format!("admin created: {} ({})", admin.email, admin.member_id),
    )
}

fn mint_invite(store: &MembershipStore, output: OutputMode, email: &str) -> Result<(), CliError> {
    let email = validate_email(email)?;
    let profile = store.profile_by_email(&email)?;
    let invite = store.generate_invite_code(&profile.id)?;
    let slots = store.invite_slots(&profile.id)?;
    output.emit(
        &json!({"code": invite.code, "remaining_slots": slots.remaining()}),
        &format!("{} (remaining slots: {})", invite.code, slots.remaining()),
    )
}

fn approve(store: &MembershipStore, output: OutputMode, email: &str) -> Result<(), CliError> {
    let email = validate_email(email)?;
    let profile = store.profile_by_email(&email)?;
    if profile.status == UserStatus::Active {
        return output.emit(
            &json!({"id": profile.id, "status": profile.status, "changed": false}),
            &format!("{email} is already active"),
        );
    }
    let profile = store.set_user_status(&profile.id, UserStatus::Active)?;
    output.emit(
        &json!({"id": profile.id, "status": profile.status, "changed": true}),
        &format!("{email} approved"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn store_errors_map_to_exit_codes() {
        let err = CliError::from(StoreError::not_found("profile"));
        assert_eq!(err.exit_code, ExitCode::Validation);
        assert_eq!(err.code, "not_found");
        let err = CliError::from(StoreError::new(StoreErrorCode::Io, "disk full"));
        assert_eq!(err.exit_code, ExitCode::DependencyFailure);
        let err = CliError::from(StoreError::new(StoreErrorCode::Internal, "boom"));
        assert_eq!(err.exit_code, ExitCode::Internal);
    }

    #[test]
    fn validation_errors_name_their_fields() {
        let err = CliError::from(validate_email("not-an-email").expect_err("invalid"));
        assert_eq!(err.exit_code, ExitCode::Validation);
        assert!(err.message.starts_with("email: "));
    }
}
