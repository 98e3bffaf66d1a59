//! singlelink - sign in and out of a Singlelink account from the terminal.
//!
//! The session is kept in a cookie jar on disk, so `whoami` and `status`
//! pick it up on later runs until the 24 hour cookies expire.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use singlelink_core::{
    ApiClient, Config, CookieJar, Credential, FileCookieJar, HistoryRouter, SessionManager,
    SignInOutcome, SignOutScope, TOKEN_COOKIE,
};

type Session = SessionManager<ApiClient, FileCookieJar, HistoryRouter>;

#[derive(Debug, Parser)]
#[command(name = "singlelink", version, about = "Manage your Singlelink session")]
struct Cli {
    /// API base URL (overrides the config file)
    #[arg(long, env = "SINGLELINK_API_URL", global = true)]
    api_url: Option<String>,

    /// Directory holding the session cookies
    #[arg(long, global = true)]
    cookie_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out of the current session
    Logout {
        /// Also forget the stored account id
        #[arg(long)]
        all: bool,
    },
    /// Show the signed-in account
    Whoami,
    /// Show session details
    Status,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load()?;

    let base_url = cli.api_url.clone().unwrap_or_else(|| config.api_base_url());
    let cookie_dir = match cli.cookie_dir.clone() {
        Some(dir) => dir,
        None => config.cookie_dir()?,
    };
    let scope = match cli.command {
        Command::Logout { all: true } => SignOutScope::Full,
        _ => config.sign_out_scope,
    };
    debug!(base_url = %base_url, cookie_dir = %cookie_dir.display(), "Starting");

    let api = ApiClient::with_timeout(&base_url, config.request_timeout())
        .with_context(|| format!("Invalid API URL {}", base_url))?;
    let jar = FileCookieJar::open(&cookie_dir)
        .with_context(|| format!("Failed to open cookie jar in {}", cookie_dir.display()))?;
    let session = SessionManager::new(api, jar, HistoryRouter::new()).with_sign_out_scope(scope);

    session.bootstrap().await;

    match cli.command {
        Command::Login { email } => login(&session, &mut config, email).await,
        Command::Logout { .. } => Ok(logout(&session)),
        Command::Whoami => Ok(whoami(&session)),
        Command::Status => Ok(status(&session, &base_url)),
    }
}

async fn login(session: &Session, config: &mut Config, email: Option<String>) -> Result<ExitCode> {
    let email = match email {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    match session.sign_in(&Credential::new(email.clone(), password)).await {
        SignInOutcome::SignedIn(user) => {
            println!("Signed in as {}", user.display_name());
            if let Some(route) = session.router().current() {
                println!("Landing page: {}", route);
            }

            config.last_email = Some(email);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            Ok(ExitCode::SUCCESS)
        }
        SignInOutcome::Failed(e) => {
            eprintln!("Sign-in failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn prompt_email(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    choose_email(&line, last).ok_or_else(|| anyhow::anyhow!("An email address is required"))
}

/// Typed input wins; an empty line falls back to the remembered email.
fn choose_email(input: &str, last: Option<&str>) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        last.map(str::to_string)
    } else {
        Some(input.to_string())
    }
}

fn logout(session: &Session) -> ExitCode {
    session.sign_out();
    info!("Session token removed");
    println!("Signed out");
    if session.is_authenticated() {
        println!("(account id kept; use --all to forget it)");
    }
    ExitCode::SUCCESS
}

fn whoami(session: &Session) -> ExitCode {
    match session.user() {
        Some(user) => {
            println!("{}", user.display_name());
            println!("  id:    {}", user.id);
            if let Some(ref email) = user.email {
                println!("  email: {}", email);
            }
            ExitCode::SUCCESS
        }
        None => {
            println!("Not signed in");
            ExitCode::FAILURE
        }
    }
}

fn status(session: &Session, base_url: &str) -> ExitCode {
    println!("API:           {}", base_url);
    println!("Cookie jar:    {}", session.cookies().path().display());
    println!("Authenticated: {}", if session.is_authenticated() { "yes" } else { "no" });

    match session.cookies().cookie(TOKEN_COOKIE) {
        Some(cookie) => println!("Token expires: {}", cookie.expires_at.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Token:         none"),
    }
    ExitCode::SUCCESS
}
