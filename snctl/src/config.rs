//! Configuration loading.
//!
//! Settings come from a YAML file (`snctl.yaml` by default, or `-f`/`SNCTL_CONFIG`) with
//! `SNCTL_`-prefixed environment variables layered on top. Nested keys use `__`.
//!
//! ```yaml
//! api_url: https://names.example.com
//! request_timeout: 30s
//! session_file: /home/me/.config/snctl/session.json
//! notification_ttl: 5s
//! log_level: info
//! enable_otel_export: false
//! ```
//!
//! ```bash
//! SNCTL_API_URL=http://localhost:3000 snctl list
//! ```

use crate::cli::Command;
use crate::errors::Error;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Command line: a config file and the command to run
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SNCTL_CONFIG", default_value = "snctl.yaml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the name generator backend
    pub api_url: Url,
    /// Timeout applied to every HTTP request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Where the login session is kept. Defaults to `~/.config/snctl/session.json`.
    pub session_file: Option<PathBuf>,
    /// How long notifications stay visible
    #[serde(with = "humantime_serde")]
    pub notification_ttl: Duration,
    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
    /// Export spans over OTLP (endpoint from the standard `OTEL_EXPORTER_OTLP_*` variables)
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Url::parse("http://localhost:3000").expect("static URL is valid"),
            request_timeout: Duration::from_secs(30),
            session_file: None,
            notification_ttl: crate::ui::DEFAULT_NOTIFICATION_TTL,
            log_level: "warn".to_string(),
            enable_otel_export: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !matches!(self.api_url.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("api_url must be an http or https URL, got '{}'", self.api_url),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(Error::Config {
                message: "request_timeout must be greater than zero".to_string(),
            });
        }
        if self.notification_ttl.is_zero() {
            return Err(Error::Config {
                message: "notification_ttl must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // SNCTL_CONFIG and SNCTL_PASSWORD belong to the command line, not the config
            .merge(Env::prefixed("SNCTL_").ignore(&["CONFIG", "PASSWORD"]).split("__"))
    }

    /// The session file, falling back to `snctl/session.json` under the platform config
    /// directory, or a file in the working directory when there is none.
    pub fn session_path(&self) -> PathBuf {
        if let Some(path) = &self.session_file {
            return path.clone();
        }
        dirs::config_dir()
            .map(|dir| dir.join("snctl").join("session.json"))
            .unwrap_or_else(|| PathBuf::from(".snctl-session.json"))
    }
}
