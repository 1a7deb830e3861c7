//! faceaccess - terminal admin client for the face recognition access-control
//! service.
//!
//! Shows aggregate access statistics, enrolled employees and the access
//! attempt log. Every screen is gated behind a login; the session token is
//! kept between runs.

mod app;
mod utils;
mod views;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use faceaccess_core::config::{CredentialBackend, API_URL_ENV, APP_NAME};
use faceaccess_core::models::{Decision, LogQuery, DEFAULT_LOG_LIMIT};
use faceaccess_core::{Config, SessionState};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, Screen, ScreenOutput};

#[derive(Parser, Debug)]
#[command(name = "faceaccess", version, about = "Access-control admin client")]
struct Cli {
    /// Base URL of the access-control API
    #[arg(long, global = true, env = API_URL_ENV)]
    api_url: Option<String>,

    /// Where the session token is kept: file, keyring or memory
    #[arg(long, global = true)]
    backend: Option<CredentialBackend>,

    /// Also write logs to a daily rolling file in the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session token
    Login {
        /// Account email (defaults to FACEACCESS_EMAIL or a prompt)
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show whether a session is stored
    Status,
    /// Employee count and access statistics
    Dashboard,
    /// List enrolled employees
    Employees,
    /// Access attempt log
    Logs {
        /// Only show granted or denied attempts
        #[arg(long)]
        decision: Option<Decision>,
        /// Maximum number of entries (1-1000)
        #[arg(long, default_value_t = DEFAULT_LOG_LIMIT)]
        limit: u32,
        /// Number of entries to skip
        #[arg(long, default_value_t = 0)]
        skip: u32,
        /// Only attempts by this employee (numeric id)
        #[arg(long)]
        employee_id: Option<i64>,
        /// Earliest attempt (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = utils::parse_date_arg)]
        since: Option<chrono::DateTime<chrono::Utc>>,
        /// Latest attempt (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = utils::parse_date_arg)]
        until: Option<chrono::DateTime<chrono::Utc>>,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", APP_NAME));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_config(cli: &Cli) -> Config {
    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    if let Some(ref url) = cli.api_url {
        config.api_base_url = Some(url.clone());
    }
    if let Some(backend) = cli.backend {
        config.credential_backend = backend;
    }
    config
}

async fn run(cli: Cli, config: Config) -> Result<ExitCode> {
    let mut app = App::new(config)?;
    app.start();

    let screen = match cli.command {
        Command::Login { email } => {
            let email = app.resolve_email(email)?;
            let password = App::resolve_password()?;
            println!("Authenticating...");
            return match app.login(&email, &password).await {
                Ok(()) => {
                    println!("Login successful.");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("{}", e);
                    Ok(ExitCode::FAILURE)
                }
            };
        }
        Command::Logout => {
            app.logout();
            println!("Logged out.");
            return Ok(ExitCode::SUCCESS);
        }
        Command::Status => {
            println!("{}", app.status_line());
            println!("Token storage: {:?}", app.config().credential_backend);
            let code = if app.session().state() == SessionState::Authenticated {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
            return Ok(code);
        }
        Command::Dashboard => Screen::Dashboard,
        Command::Employees => Screen::Employees,
        Command::Logs {
            decision,
            limit,
            skip,
            employee_id,
            since,
            until,
        } => {
            let mut query = LogQuery {
                decision,
                employee_id,
                start_date: since,
                end_date: until,
                skip,
                ..LogQuery::default()
            };
            query = query.with_limit(limit);
            Screen::Logs(query)
        }
    };

    match app.show(&screen).await? {
        ScreenOutput::Rendered(text) => {
            print!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        ScreenOutput::LoginRequired => {
            eprintln!("Not logged in. Run `faceaccess login` first.");
            Ok(ExitCode::FAILURE)
        }
        ScreenOutput::Loading => {
            eprintln!("{}", views::LOADING);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_dir = if cli.log_file {
        Config::default().data_dir().ok().map(|dir| dir.join("logs"))
    } else {
        None
    };
    let _log_guard = init_tracing(log_dir);
    info!("faceaccess starting");

    let config = load_config(&cli);
    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
