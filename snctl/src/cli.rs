//! The `snctl` command line.
//!
//! Each invocation runs one command against a [`Console`]. Failures have already been printed as
//! notifications by the time they reach here, so they only turn into a non-zero exit code.

use crate::api::models::api_keys::{ApiKeyCreate, Scope};
use crate::api::models::reservations::{ReservationCreate, ReservationStatus};
use crate::api::models::users::{Role, UserCreate, UserUpdate};
use crate::config::Config;
use crate::console::{Console, Frontend};
use crate::controller::ConfirmOutcome;
use crate::controller::filters::ReservationFilter;
use crate::errors::{Error, Result};
use crate::management::users::UserFilter;
use crate::types::{ApiKeyId, ReservationId, UserId};
use crate::ui::terminal::{TerminalNotifier, TerminalPrompt, TerminalTable, api_keys_table, users_table};
use crate::ui::{Notification, NotificationSink};
use chrono::Utc;
use clap::{Args as ClapArgs, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when not given
        #[arg(long, env = "SNCTL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Check that the backend is up
    Health,
    /// Dashboard statistics
    Stats,
    /// List reservations
    List(ListArgs),
    /// Reserve a new server name
    Reserve(ReserveArgs),
    /// Mark a reservation as committed (in use)
    Commit { id: ReservationId },
    /// Return a committed reservation to reserved
    Release {
        id: ReservationId,
        /// Skip the yes/no question
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete a reservation
    Delete {
        id: ReservationId,
        /// Server name to confirm deleting a committed reservation without being asked
        #[arg(long)]
        confirm_name: Option<String>,
        /// Skip the yes/no question for reserved names
        #[arg(short, long)]
        yes: bool,
    },
    /// Manage users (admin only)
    #[command(subcommand)]
    Users(UsersCommand),
    /// Manage API keys
    #[command(subcommand)]
    ApiKeys(ApiKeysCommand),
}

#[derive(ClapArgs, Debug, Default)]
pub struct ListArgs {
    /// reserved or committed
    #[arg(long)]
    pub status: Option<ReservationStatus>,
    #[arg(long)]
    pub environment: Option<String>,
    #[arg(long)]
    pub region: Option<String>,
    /// Case-insensitive text matched against name and attributes
    #[arg(long, short)]
    pub search: Option<String>,
}

impl From<ListArgs> for ReservationFilter {
    fn from(args: ListArgs) -> Self {
        ReservationFilter {
            status: args.status,
            environment: args.environment,
            region: args.region,
            search: args.search,
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct ReserveArgs {
    #[arg(long)]
    pub unit_code: String,
    #[arg(long = "type")]
    pub kind: String,
    #[arg(long)]
    pub provider: String,
    #[arg(long)]
    pub region: String,
    #[arg(long)]
    pub environment: String,
    #[arg(long)]
    pub function: String,
}

impl From<ReserveArgs> for ReservationCreate {
    fn from(args: ReserveArgs) -> Self {
        ReservationCreate {
            unit_code: args.unit_code,
            kind: args.kind,
            provider: args.provider,
            region: args.region,
            environment: args.environment,
            function: args.function,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    List {
        #[arg(long)]
        role: Option<Role>,
        #[arg(long, short)]
        search: Option<String>,
    },
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "user")]
        role: Role,
        /// Read from stdin when not given
        #[arg(long)]
        password: Option<String>,
    },
    Update {
        id: UserId,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "user")]
        role: Role,
    },
    /// Set a new password; asks for it twice
    Password { id: UserId },
    Delete {
        id: UserId,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ApiKeysCommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Lifetime in days; omit or 0 for a key that never expires
        #[arg(long)]
        expires_in: Option<u32>,
        /// Repeatable. Defaults to read and reserve.
        #[arg(long = "scope")]
        scopes: Vec<Scope>,
    },
    Revoke {
        id: ApiKeyId,
        #[arg(short, long)]
        yes: bool,
    },
}

impl Command {
    fn view(&self) -> TerminalTable {
        match self {
            Command::List(_) => TerminalTable::reservations(),
            Command::Stats => TerminalTable::stats(),
            _ => TerminalTable::silent(),
        }
    }

    fn needs_session(&self) -> bool {
        !matches!(self, Command::Login { .. } | Command::Logout | Command::Health)
    }
}

/// Run one command to completion.
pub async fn run(command: Command, config: &Config) -> anyhow::Result<ExitCode> {
    let prompt = Arc::new(TerminalPrompt::new());
    let notifier: Arc<dyn NotificationSink> = Arc::new(TerminalNotifier);
    let frontend = Frontend {
        prompt: prompt.clone(),
        notifier: notifier.clone(),
        view: Arc::new(command.view()),
    };
    let console = Console::new(config, frontend)?;

    if command.needs_session()
        && let Err(e) = console.auth.restore().and_then(|_| console.auth.require_session())
    {
        notifier.notify(Notification::from_error(&e));
        return Ok(ExitCode::FAILURE);
    }

    let result = execute(command, &console, &prompt, &*notifier).await;
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn execute(command: Command, console: &Console, prompt: &TerminalPrompt, notifier: &dyn NotificationSink) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password(prompt, "Password: ").await?,
            };
            console.auth.login(&username, &password).await?;
        }
        Command::Logout => {
            console.logout().await?;
            notifier.notify(Notification::success("Logged out"));
        }
        Command::Whoami => {
            let user = console.api.current_user().await.inspect_err(|e| notifier.notify(Notification::from_error(e)))?;
            println!("{} <{}> ({})", user.username, user.email, user.role);

            let session = console.auth.require_session()?;
            let remaining = (session.expires_at - Utc::now()).to_std().unwrap_or_default();
            // Whole seconds only, so the output reads "23h 59m 12s"
            let remaining = Duration::from_secs(remaining.as_secs());
            eprintln!("Session expires in {}", humantime::format_duration(remaining));
        }
        Command::Health => {
            let health = console.api.health().await.inspect_err(|e| notifier.notify(Notification::from_error(e)))?;
            println!("{}", health.status);
            if !health.is_healthy() {
                let err = Error::ServerRejected {
                    status: 503,
                    message: format!("Backend reports status '{}'", health.status),
                };
                notifier.notify(Notification::from_error(&err));
                return Err(err);
            }
        }
        Command::Stats => console.reservations.load_stats().await?,
        Command::List(args) => {
            console.reservations.set_filter(args.into()).await;
            console.reservations.load_reservations().await?;
        }
        Command::Reserve(args) => {
            let reserved = console.reservations.reserve(&args.into()).await?;
            println!("{}\t{}", reserved.server_name, reserved.reservation_id);
        }
        Command::Commit { id } => {
            console.reservations.load_reservations().await?;
            console.reservations.commit(id).await?;
        }
        Command::Release { id, yes } => {
            console.reservations.load_reservations().await?;
            console.reservations.release(id).await?;
            resolve_reservation_prompt(console, prompt, None, yes).await?;
        }
        Command::Delete { id, confirm_name, yes } => {
            console.reservations.load_reservations().await?;
            console.reservations.delete(id).await?;
            resolve_reservation_prompt(console, prompt, confirm_name, yes).await?;
        }
        Command::Users(command) => execute_users(command, console, prompt).await?,
        Command::ApiKeys(command) => execute_api_keys(command, console, prompt).await?,
    }
    Ok(())
}

/// Answer the confirmation the controller just opened.
///
/// Name-gated prompts use `preset_name` when given and otherwise keep asking until the name
/// matches or input ends. Plain prompts proceed on `yes` or a typed "y".
async fn resolve_reservation_prompt(console: &Console, prompt: &TerminalPrompt, preset_name: Option<String>, yes: bool) -> Result<()> {
    let Some(pending) = console.reservations.pending_confirmation().await else {
        return Ok(());
    };

    if pending.required_name.is_none() {
        if yes || read_yes(prompt).await? {
            console.reservations.confirm(None).await?;
        } else {
            console.reservations.cancel().await?;
        }
        return Ok(());
    }

    if let Some(name) = preset_name {
        eprintln!();
        if console.reservations.confirm(Some(&name)).await? == ConfirmOutcome::NameMismatch {
            console.reservations.cancel().await?;
            return Err(Error::validation("The confirmation name does not match"));
        }
        return Ok(());
    }

    loop {
        let Some(line) = prompt.read_line().await? else {
            eprintln!();
            return console.reservations.cancel().await;
        };
        if console.reservations.confirm(Some(&line)).await? == ConfirmOutcome::Completed {
            return Ok(());
        }
    }
}

async fn read_yes(prompt: &TerminalPrompt) -> Result<bool> {
    let answer = prompt.read_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Ask for a password. Typed input is not echoed; `--password` or `SNCTL_PASSWORD` skip the
/// prompt entirely.
async fn read_password(prompt: &TerminalPrompt, label: &str) -> Result<String> {
    eprint!("{label}");
    Ok(prompt.read_secret().await?.unwrap_or_default())
}

async fn execute_users(command: UsersCommand, console: &Console, prompt: &TerminalPrompt) -> Result<()> {
    let users = &console.users;
    match command {
        UsersCommand::List { role, search } => {
            let list = users.list(&UserFilter { role, search }).await?;
            println!("{}", users_table(&list));
        }
        UsersCommand::Create {
            username,
            email,
            role,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => read_password(prompt, "Password: ").await?,
            };
            let user = users
                .create(&UserCreate {
                    username,
                    email,
                    role,
                    password,
                })
                .await?;
            println!("{}", user.id);
        }
        UsersCommand::Update { id, username, email, role } => {
            users.update(id, &UserUpdate { username, email, role }).await?;
        }
        UsersCommand::Password { id } => {
            let password = read_password(prompt, "New password: ").await?;
            let confirmation = read_password(prompt, "Confirm password: ").await?;
            users.change_password(id, &password, &confirmation).await?;
        }
        UsersCommand::Delete { id, yes } => {
            let target = users
                .list(&UserFilter::default())
                .await?
                .into_iter()
                .find(|u| u.id == id)
                .ok_or_else(|| Error::NotFound {
                    resource: "User".to_string(),
                    id: id.to_string(),
                })?;
            users.request_delete(&target).await;
            if yes || read_yes(prompt).await? {
                users.confirm_delete().await?;
            } else {
                users.cancel().await?;
            }
        }
    }
    Ok(())
}

async fn execute_api_keys(command: ApiKeysCommand, console: &Console, prompt: &TerminalPrompt) -> Result<()> {
    let keys = &console.api_keys;
    match command {
        ApiKeysCommand::List => {
            let list = keys.list().await?;
            println!("{}", api_keys_table(&list, Utc::now()));
        }
        ApiKeysCommand::Create {
            name,
            description,
            expires_in,
            scopes,
        } => {
            let created = keys
                .create(ApiKeyCreate {
                    name,
                    description,
                    expires_in,
                    scopes,
                })
                .await?;
            if let Some(secret) = created.key {
                eprintln!("Copy the key now. It will not be shown again.");
                println!("{secret}");
            }
        }
        ApiKeysCommand::Revoke { id, yes } => {
            let target = keys.list().await?.into_iter().find(|k| k.id == id).ok_or_else(|| Error::NotFound {
                resource: "API key".to_string(),
                id: id.to_string(),
            })?;
            keys.request_revoke(&target).await;
            if yes || read_yes(prompt).await? {
                keys.confirm_revoke().await?;
            } else {
                keys.cancel().await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use clap::Parser;

    #[test]
    fn test_parse_delete_with_confirm_name() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        let args = Args::try_parse_from(["snctl", "delete", id, "--confirm-name", "PRD-WEB-001"]).unwrap();
        match args.command {
            Command::Delete { id: parsed, confirm_name, yes } => {
                assert_eq!(parsed.to_string(), id);
                assert_eq!(confirm_name.as_deref(), Some("PRD-WEB-001"));
                assert!(!yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_filters() {
        let args = Args::try_parse_from(["snctl", "list", "--status", "committed", "--search", "web"]).unwrap();
        let Command::List(list) = args.command else {
            panic!("expected list");
        };
        let filter = ReservationFilter::from(list);
        assert_eq!(filter.status, Some(ReservationStatus::Committed));
        assert_eq!(filter.search.as_deref(), Some("web"));
    }

    #[test]
    fn test_parse_reserve_uses_type_flag() {
        let args = Args::try_parse_from([
            "snctl",
            "reserve",
            "--unit-code",
            "A1",
            "--type",
            "web",
            "--provider",
            "aws",
            "--region",
            "us-east",
            "--environment",
            "prod",
            "--function",
            "api",
        ])
        .unwrap();
        let Command::Reserve(reserve) = args.command else {
            panic!("expected reserve");
        };
        let create = ReservationCreate::from(reserve);
        assert_eq!(create.kind, "web");
        assert!(create.validate().is_ok());
    }

    #[test]
    fn test_parse_api_key_scopes() {
        let args = Args::try_parse_from(["snctl", "api-keys", "create", "--name", "ci", "--scope", "read", "--scope", "commit"]).unwrap();
        let Command::ApiKeys(ApiKeysCommand::Create { scopes, .. }) = args.command else {
            panic!("expected api-keys create");
        };
        assert_eq!(scopes, vec![Scope::Read, Scope::Commit]);
    }

    #[test]
    fn test_session_requirement() {
        assert!(!Command::Health.needs_session());
        assert!(Command::Stats.needs_session());
    }
}
