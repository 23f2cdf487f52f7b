use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Parser, Subcommand};
use gcp_sasl_plain::observability::metrics::get_metrics;
use gcp_sasl_plain::resilience::retry::RetrySettings;
use gcp_sasl_plain::sasl::{build_mechanism, GcpPlainMechanism, Mechanism, StateMachine};
use gcp_sasl_plain::utils::config_loader;
use gcp_sasl_plain::utils::logging::{self, LogLevel};
use gcp_sasl_plain::ServiceConfig;
use reqwest::Client;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "gcp-sasl-plain.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Print the principal email the mechanism authenticates as
    Resolve,
    /// Print the base64 encoded PLAIN initial response
    Payload,
    /// Run a full client-side handshake and report the outcome
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level)?;

    // -------------------------------
    // 2. Build the mechanism, retrying the whole attempt
    // -------------------------------

    let client = Client::builder().build().context("unable to build HTTP client")?;
    let mechanism = build_with_retry(&service_config, &client).await?;

    // -------------------------------
    // 3. Run the requested command
    // -------------------------------

    match args.command {
        Command::Resolve => println!("{}", mechanism.principal_email()),
        Command::Payload => {
            let (_, payload) = mechanism.start().await.context("unable to start PLAIN handshake")?;
            println!("{}", STANDARD.encode(payload));
        }
        Command::Check => {
            let (state, payload) = mechanism.start().await.context("unable to start PLAIN handshake")?;
            let (done, _) = state.next(&[]).await.context("PLAIN handshake failed")?;
            info!(principal = %mechanism.principal_email(), bytes = payload.len(), done, "handshake ok");
            println!("ok: {} authenticated with {}", mechanism.principal_email(), mechanism.name());
        }
    }

    // -------------------------------
    // METRICS
    // -------------------------------

    if service_config.settings.metrics.is_enabled {
        eprint!("{}", get_metrics().await.render());
    }

    Ok(())
}

async fn build_with_retry(service_config: &ServiceConfig, client: &Client) -> Result<GcpPlainMechanism> {
    let retry = RetrySettings::from_config(service_config.settings.retry.as_ref());
    let auth = &service_config.auth;
    let mechanism = retry
        .run_with_retry(move || build_mechanism(auth, client))
        .await
        .context("unable to build PLAIN mechanism")?;
    Ok(mechanism)
}
