//! Terminal implementations of the presentation traits.
//!
//! Tables go to stdout so they can be piped; prompts and notifications go to stderr.

use super::{ConfirmationPrompt, ConfirmationRequest, Notification, NotificationLevel, NotificationSink, ReservationRow, TableView};
use crate::api::models::api_keys::ApiKey;
use crate::api::models::stats::DashboardStats;
use crate::api::models::users::User;
use crate::errors::{Error, Result};
use crate::management::api_keys::expiry_badge;
use crate::types::abbrev_uuid;
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::IsTerminal;
use tabled::builder::Builder;
use tabled::settings::object::Rows;
use tabled::settings::{Color, Style};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl NotificationSink for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        let tag = match notification.level {
            NotificationLevel::Success => "\x1b[32m✓\x1b[0m",
            NotificationLevel::Info => "\x1b[36mi\x1b[0m",
            NotificationLevel::Warning => "\x1b[33m!\x1b[0m",
            NotificationLevel::Danger => "\x1b[31m✗\x1b[0m",
        };
        eprintln!("{tag} {}", notification.message);
    }
}

/// Prints confirmation prompts and reads the answer from stdin.
pub struct TerminalPrompt {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Next line of input without its line terminator. `None` on end of input.
    pub async fn read_line(&self) -> Result<Option<String>> {
        let mut lines = self.lines.lock().await;
        lines.next_line().await.map_err(|e| Error::Other(e.into()))
    }

    /// Like [`read_line`](Self::read_line) but without echo when stdin is a terminal. Piped input
    /// is read as a plain line. `None` on end of input or Ctrl-C.
    pub async fn read_secret(&self) -> Result<Option<String>> {
        if !std::io::stdin().is_terminal() {
            return self.read_line().await;
        }

        // Hold the line reader so nothing else consumes stdin while raw mode is on
        let _lines = self.lines.lock().await;
        let secret = tokio::task::spawn_blocking(read_hidden_line)
            .await
            .map_err(|e| Error::Other(e.into()))??;
        eprintln!();
        Ok(secret)
    }
}

enum KeyOutcome {
    Continue,
    Submit,
    Abort,
}

fn apply_key(buffer: &mut String, key: KeyEvent) -> KeyOutcome {
    if key.kind != KeyEventKind::Press {
        return KeyOutcome::Continue;
    }
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => KeyOutcome::Submit,
        KeyCode::Char('c') if control => KeyOutcome::Abort,
        KeyCode::Char('d') if control && buffer.is_empty() => KeyOutcome::Abort,
        KeyCode::Backspace => {
            buffer.pop();
            KeyOutcome::Continue
        }
        KeyCode::Char(c) if !control => {
            buffer.push(c);
            KeyOutcome::Continue
        }
        _ => KeyOutcome::Continue,
    }
}

fn read_hidden_line() -> Result<Option<String>> {
    enable_raw_mode().map_err(|e| Error::Other(e.into()))?;
    let _raw = scopeguard::guard((), |_| {
        let _ = disable_raw_mode();
    });

    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read().map_err(|e| Error::Other(e.into()))? else {
            continue;
        };
        match apply_key(&mut secret, key) {
            KeyOutcome::Continue => {}
            KeyOutcome::Submit => return Ok(Some(secret)),
            KeyOutcome::Abort => return Ok(None),
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationPrompt for TerminalPrompt {
    fn open(&self, request: &ConfirmationRequest) {
        eprintln!("{}", request.message);
        match &request.required_name {
            Some(name) => eprint!("Type \"{name}\" to {}: ", request.confirm_label.to_lowercase()),
            None => eprint!("{}? [y/N] ", request.confirm_label),
        }
    }

    fn flag_invalid(&self) {
        eprint!("\x1b[31mThe name does not match.\x1b[0m Try again (Ctrl-D to cancel): ");
    }

    fn close(&self) {}
}

/// Renders tables to stdout. Each view can be switched off so a command only prints what it was
/// asked for.
#[derive(Debug, Clone, Copy)]
pub struct TerminalTable {
    pub show_reservations: bool,
    pub show_stats: bool,
}

impl TerminalTable {
    pub fn reservations() -> Self {
        Self {
            show_reservations: true,
            show_stats: false,
        }
    }

    pub fn stats() -> Self {
        Self {
            show_reservations: false,
            show_stats: true,
        }
    }

    pub fn silent() -> Self {
        Self {
            show_reservations: false,
            show_stats: false,
        }
    }
}

impl TableView for TerminalTable {
    fn render_reservations(&self, rows: &[ReservationRow]) {
        if self.show_reservations {
            println!("{}", reservations_table(rows));
        }
    }

    fn render_stats(&self, stats: &DashboardStats) {
        if self.show_stats {
            println!("{}", stats_tables(stats));
        }
    }
}

fn finish(builder: Builder) -> String {
    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.to_string()
}

fn date(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

pub fn reservations_table(rows: &[ReservationRow]) -> String {
    if rows.is_empty() {
        return "No reservations found".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record([
        "ID",
        "Server name",
        "Status",
        "Unit",
        "Type",
        "Provider",
        "Region",
        "Environment",
        "Function",
        "Created",
        "Actions",
    ]);

    for row in rows {
        let r = &row.reservation;
        let actions = row.actions.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
        builder.push_record([
            abbrev_uuid(&r.id),
            r.server_name.clone(),
            r.status.to_string(),
            r.unit_code.clone(),
            r.kind.clone(),
            r.provider.clone(),
            r.region.clone(),
            r.environment.clone(),
            r.function.clone(),
            date(&r.created_at),
            actions,
        ]);
    }

    finish(builder)
}

pub fn stats_tables(stats: &DashboardStats) -> String {
    let mut totals = Builder::default();
    totals.push_record(["Total", "Committed", "Reserved"]);
    totals.push_record([
        stats.total_reservations.to_string(),
        stats.committed_count.to_string(),
        stats.reserved_count.to_string(),
    ]);

    let recent = reservations_table(&stats.recent_reservations.iter().cloned().map(ReservationRow::new).collect::<Vec<_>>());

    let mut activity = Builder::default();
    activity.push_record(["Date", "Reserved", "Committed"]);
    for day in &stats.daily_activity {
        activity.push_record([day.date.clone(), day.reserved.to_string(), day.committed.to_string()]);
    }

    let mut environments = Builder::default();
    environments.push_record(["Environment", "Count"]);
    for env in &stats.top_environments {
        environments.push_record([env.environment.clone(), env.count.to_string()]);
    }

    format!(
        "{}\n\nRecent reservations\n{}\n\nDaily activity\n{}\n\nTop environments\n{}",
        finish(totals),
        recent,
        finish(activity),
        finish(environments)
    )
}

pub fn users_table(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["ID", "Username", "Email", "Role", "Created"]);
    for user in users {
        builder.push_record([
            user.id.to_string(),
            user.username.clone(),
            user.email.clone(),
            user.role.to_string(),
            date(&user.created_at),
        ]);
    }
    finish(builder)
}

pub fn api_keys_table(keys: &[ApiKey], now: DateTime<Utc>) -> String {
    if keys.is_empty() {
        return "No API keys found".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["ID", "Name", "Scopes", "Last used", "Expires", "Active"]);
    for key in keys {
        let scopes = key.scopes.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ");
        builder.push_record([
            key.id.to_string(),
            key.name.clone(),
            scopes,
            key.last_used.as_ref().map(date).unwrap_or_else(|| "Never".to_string()),
            expiry_badge(key, now),
            if key.is_active { "yes" } else { "no" }.to_string(),
        ]);
    }
    finish(builder)
}
