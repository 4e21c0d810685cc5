//! Storefront CLI - account management and product search.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storefront_auth::AuthMode;
use storefront_config_and_utils::init_logging;
use tracing::debug;

/// Storefront CLI - Log in, manage your account and search products.
#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront CLI for accounts and product search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for config, tokens and logs (default ~/.storefront)
    #[arg(long, env = "STOREFRONT_HOME", global = true)]
    base_dir: Option<PathBuf>,

    /// API base URL, overriding the config file
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with email and password
    Login {
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Create an account
    Register {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Verify an account with the emailed code
    Verify {
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        code: Option<String>,
    },

    /// Logout and clear stored tokens
    Logout,

    /// Request a password reset email
    ForgotPassword {
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Set a new password with a reset token
    ResetPassword {
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Change the password of the logged-in account
    ChangePassword,

    /// Check authentication status
    Status,

    /// Interactive auth dialog
    Auth {
        /// Mode to open in (login, register, verify, forgot, reset, change)
        #[arg(short, long, default_value = "login")]
        mode: AuthMode,
    },

    /// Search products across marketplaces
    Search {
        /// Search terms
        #[arg(required = true)]
        query: Vec<String>,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (paths, config) = commands::load_settings(cli.base_dir.clone(), cli.api_url.as_deref())?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_logging("cli", &level, &paths, false);
    debug!(base_dir = %paths.base_dir().display(), api = %config.api_base_url, "Starting");

    let ctx = commands::Context::new(&paths, config)?;
    let format = &cli.format;

    match cli.command {
        Commands::Login { email } => commands::login(&ctx, email, format).await,
        Commands::Register { name, email } => commands::register(&ctx, name, email, format).await,
        Commands::Verify { email, code } => commands::verify(&ctx, email, code, format).await,
        Commands::Logout => commands::logout(&ctx, format).await,
        Commands::ForgotPassword { email } => commands::forgot_password(&ctx, email, format).await,
        Commands::ResetPassword { token } => commands::reset_password(&ctx, token, format).await,
        Commands::ChangePassword => commands::change_password(&ctx, format).await,
        Commands::Status => commands::status(&ctx, format).await,
        Commands::Auth { mode } => commands::auth_modal(&ctx, mode, format).await,
        Commands::Search { query } => commands::search(&ctx, &query.join(" "), format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
