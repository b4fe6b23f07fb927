use clap::Parser;
use snctl::{Config, cli, telemetry};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Install rustls crypto provider before anything else that might build a TLS client
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let args = snctl::config::Args::parse();
    let config = Config::load(&args)?;

    telemetry::init_telemetry(&config)?;

    let code = cli::run(args.command, &config).await;
    telemetry::shutdown_telemetry();
    code
}
