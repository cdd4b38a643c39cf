mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use http::Method;
use vendor_auth::InMemoryCredentialStore;
use vendor_gateway::{
    CallerContext, GatewayConfig, Interceptor, PreparedCall, ResponseDisposition, VendorClient,
};

use crate::logging::LogFormat;

/// Vendor gateway operator tool
#[derive(Parser)]
#[command(name = "vendor-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (secrets redacted) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and exit
    Check,
    /// Obtain a vendor access token and report its lifetime
    Token,
    /// Send one request through an interceptor
    Call(CallArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Surface {
    Fintech,
    CardControl,
}

#[derive(Args)]
struct CallArgs {
    /// Vendor path, e.g. `/nbfc/v1/upi/listKeys`
    path: String,

    #[arg(long, value_enum, default_value_t = Surface::Fintech)]
    surface: Surface,

    /// JSON request body
    #[arg(long, default_value = "{}")]
    body: String,

    /// Correlation id recorded on every log line of the call
    #[arg(long)]
    request_id: Option<String>,

    #[arg(long)]
    user_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    let config = config::load(cli.config.as_deref())?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config::redacted(&config))?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Check) {
        Commands::Check => {
            tracing::info!("configuration loaded");
            println!("Configuration is valid");
            Ok(())
        }
        Commands::Token => token(&config).await,
        Commands::Call(args) => call(&config, args).await,
    }
}

fn client(config: &GatewayConfig) -> Result<VendorClient> {
    VendorClient::from_config(config, Arc::new(InMemoryCredentialStore::new()))
        .context("failed to build vendor client")
}

async fn token(config: &GatewayConfig) -> Result<()> {
    let client = client(config)?;
    let credential = client
        .credentials()
        .get_credential()
        .await
        .context("token request failed")?;
    println!(
        "obtained {} token, expires at {}",
        credential.token_type(),
        credential.expires_at()
    );
    Ok(())
}

async fn call(config: &GatewayConfig, args: CallArgs) -> Result<()> {
    serde_json::from_str::<serde_json::Value>(&args.body).context("--body is not valid JSON")?;

    let client = client(config)?;
    let context = CallerContext {
        request_id: args.request_id,
        user_id: args.user_id,
        app_version: Some(env!("CARGO_PKG_VERSION").to_owned()),
    };
    let prepared = PreparedCall::new(Method::POST, &args.path, args.body).with_context(context);

    let response = match args.surface {
        Surface::Fintech => client.fintech().execute(prepared).await,
        Surface::CardControl => client.card_control().execute(prepared).await,
    }
    .with_context(|| format!("vendor call to {} failed", args.path))?;

    let disposition = match response.disposition {
        ResponseDisposition::Decrypted => "decrypted",
        ResponseDisposition::Plaintext => "plaintext",
        ResponseDisposition::Unclassified => "unclassified",
    };
    eprintln!("status: {} ({disposition})", response.status);
    println!("{}", String::from_utf8_lossy(&response.body));
    Ok(())
}
