use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;

use access_cli::{
    config::{DEFAULT_REGION, DEFAULT_ROLE},
    CliError, ConfigStore, CredentialCache, LoginFlow, SsoConfig, SsoOidc,
};

/// Cloud CLI Access - authenticate with the identity provider to obtain
/// short-lived cloud credentials.
#[derive(Parser)]
#[command(name = "cca", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Configure the CLI with your SSO details
    Configure {
        #[arg(long)]
        sso_start_url: Option<String>,

        #[arg(long, default_value = DEFAULT_REGION)]
        sso_region: String,

        #[arg(long)]
        account_id: Option<String>,

        #[arg(long, default_value = DEFAULT_ROLE)]
        role_name: String,
    },
    /// Authenticate and obtain temporary credentials
    Login {
        /// Do not try to open the verification URL in a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Clear cached credentials
    Logout,
    /// Show authentication status and credential expiration
    Status,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(CliError::Cancelled) => {
            eprintln!("\nOperation cancelled");
            130
        }
        Err(e) => {
            eprintln!("\nError: {}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Configure {
            sso_start_url,
            sso_region,
            account_id,
            role_name,
        } => configure(sso_start_url, sso_region, account_id, role_name),
        Command::Login { no_browser } => login(no_browser).await,
        Command::Logout => logout(),
        Command::Status => status(),
    }
}

fn configure(
    sso_start_url: Option<String>,
    sso_region: String,
    account_id: Option<String>,
    role_name: String,
) -> Result<(), CliError> {
    let sso_start_url = match sso_start_url {
        Some(value) => value,
        None => prompt("SSO start URL")?,
    };
    let account_id = match account_id {
        Some(value) => value,
        None => prompt("Account ID")?,
    };

    let config = SsoConfig {
        sso_start_url,
        sso_region,
        account_id,
        role_name,
    };
    ConfigStore::default_location()?.save(&config)?;

    println!("\nConfiguration saved");
    println!("\n  SSO Start URL: {}", config.sso_start_url);
    println!("  SSO Region:    {}", config.sso_region);
    println!("  Account ID:    {}", config.account_id);
    println!("  Role Name:     {}", config.role_name);
    println!("\nNext step: run `cca login` to authenticate\n");
    Ok(())
}

fn prompt(label: &str) -> Result<String, CliError> {
    print!("{}: ", label);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        return Err(CliError::Config(format!("{} must not be empty", label)));
    }
    Ok(value)
}

async fn login(no_browser: bool) -> Result<(), CliError> {
    let config = ConfigStore::default_location()?
        .load()?
        .ok_or(CliError::NotConfigured)?;

    let provider = Arc::new(SsoOidc::new(&config.sso_region)?);
    let cache = CredentialCache::default_location()?;

    LoginFlow::new(provider, cache, config)
        .with_browser(!no_browser)
        .login()
        .await?;

    println!("\nLogin successful!\n");
    Ok(())
}

fn logout() -> Result<(), CliError> {
    CredentialCache::default_location()?.clear()?;
    println!("Logged out successfully");
    Ok(())
}

fn status() -> Result<(), CliError> {
    let cache = CredentialCache::default_location()?;
    let Some(cached) = cache.load_unchecked()? else {
        println!("Not logged in");
        println!("Run `cca login` to authenticate");
        return Ok(());
    };

    let now = Utc::now();
    let expired = cached.is_expired_at(now);

    println!("\nAuthentication status:");
    println!(
        "  Status:        {}",
        if expired { "Expired" } else { "Authenticated" }
    );
    println!("  SSO Start URL: {}", cached.sso_start_url);
    println!("  Account ID:    {}", cached.account_id);
    println!("  Role Name:     {}", cached.role_name);
    println!(
        "  Cached:        {}",
        cached.cached_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(expires) = cached.expires_at() {
        println!(
            "  Expires:       {}",
            expires.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if !expired {
            let remaining = expires - now;
            println!(
                "  Time remaining: {}h {}m",
                remaining.num_hours(),
                remaining.num_minutes() % 60
            );
        }
    }
    println!();
    Ok(())
}
