//! # snctl: Server Name Reservation Console
//!
//! `snctl` is a client for a server name generator backend. The backend derives unique server
//! names from a handful of attributes (unit code, type, provider, region, environment, function)
//! and tracks each name through a small lifecycle. This crate is the operator's side of that:
//! a typed API client, the controller that drives the lifecycle safely, and a terminal front-end.
//!
//! ## Reservation lifecycle
//!
//! A name starts out **reserved** when it is generated. Once a machine actually carries the name
//! it is **committed**. A committed name can be **released** back to reserved, and a reservation
//! can be deleted. Deleting a committed name is dangerous (the host may still be using it), so it
//! needs the operator to type the server name back before anything is sent.
//!
//! [`controller::ReservationLifecycleController`] owns those rules. It keeps the reservation list
//! cached, applies filters locally, refuses double submissions for the same reservation while
//! one is still in flight, and reloads the list and dashboard statistics after every change.
//!
//! ## Layout
//!
//! - [`api`]: request/response models and the [`api::client::ApiClient`] trait with its
//!   `reqwest` implementation
//! - [`auth`]: login, logout and the on-disk session
//! - [`controller`]: the reservation lifecycle controller, its confirmation gate, filters and
//!   action dispatch table
//! - [`management`]: user and API key administration
//! - [`ui`]: notification, prompt and table traits plus their terminal implementations
//! - [`console`]: wires one session's worth of the above together
//! - [`cli`], [`config`], [`telemetry`]: the `snctl` binary's command line, settings and logging
//!
//! ## Configuration
//!
//! See [`config`]. In short: `snctl.yaml` in the working directory (or `-f path`), overridden by
//! `SNCTL_*` environment variables.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod console;
pub mod controller;
pub mod errors;
pub mod management;
pub mod telemetry;
pub mod types;
pub mod ui;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use console::Console;
pub use controller::ReservationLifecycleController;
