use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use portal_auth::config::{AuthConfig, ConfigError};
use portal_auth::firebase::{FirebaseAuth, FirestoreStore};
use portal_auth::identity::IdentityError;
use portal_auth::rate_limit::RateLimiter;
use portal_auth::role::StoreError;
use portal_auth::{AuthError, RoleResolver, SessionSnapshot, SessionStore, decide};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("identity provider setup failed: {0}")]
    Identity(#[from] IdentityError),
    #[error("document store setup failed: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("timed out waiting for the session to settle")]
    Timeout,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "portal-auth", about = "Travel portal session and route-guard driver")]
struct Cli {
    /// Seconds to wait for role resolution before giving up.
    #[arg(long, env = "PORTAL_SETTLE_TIMEOUT_SECS", default_value_t = 10)]
    settle_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and show where the route guard sends the user.
    Login(Credentials),
    /// Sign in through the administrator gate.
    AdminLogin(Credentials),
    /// Evaluate the route guard for a signed-out session. Sessions are not
    /// kept between runs, so this always starts unauthenticated.
    Route { path: String },
}

#[derive(Args, Debug)]
struct Credentials {
    email: String,

    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    password: String,

    /// Path to evaluate once signed in.
    #[arg(long, default_value = "/")]
    path: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = AuthConfig::from_env()?;
    let auth = Arc::new(FirebaseAuth::new(&config.firebase)?);
    let store = Arc::new(FirestoreStore::new(&config.firebase, auth.clone())?);
    let resolver = RoleResolver::new(store, config.admin_email.clone());
    let session = SessionStore::start(auth, resolver, RateLimiter::new(config.rate_limit));
    let timeout = Duration::from_secs(cli.settle_timeout_secs);

    let (path, snapshot) = match cli.command {
        Command::Login(creds) => {
            session.login(&creds.email, &creds.password).await?;
            (creds.path, settle(&session, timeout, |s| s.is_authenticated() && s.is_settled()).await?)
        }
        Command::AdminLogin(creds) => {
            session.login_as_admin(&creds.email, &creds.password).await?;
            (creds.path, settle(&session, timeout, SessionSnapshot::is_admin).await?)
        }
        Command::Route { path } => (path, settle(&session, timeout, SessionSnapshot::is_settled).await?),
    };

    let decision = decide(&snapshot, &path);
    let report = serde_json::json!({
        "path": path,
        "session": snapshot,
        "decision": decision,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    session.teardown();
    Ok(())
}

async fn settle<F>(session: &SessionStore, timeout: Duration, pred: F) -> Result<SessionSnapshot, CliError>
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    let mut rx = session.watch();
    let snapshot = tokio::time::timeout(timeout, rx.wait_for(pred))
        .await
        .map_err(|_| CliError::Timeout)?
        .map_err(|_| CliError::Timeout)?
        .clone();
    Ok(snapshot)
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
