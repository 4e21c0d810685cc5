//! CLI command implementations.

mod auth;
mod interactive;
mod search;

pub use auth::{change_password, forgot_password, login, logout, register, reset_password, status, verify};
pub use interactive::auth_modal;
pub use search::search;

use anyhow::{Context as _, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use storefront_auth::{AuthFetcher, SessionController};
use storefront_config_and_utils::{Config, Paths};
use storefront_storage::create_token_store;

/// Resolve paths and configuration from the command line.
pub fn load_settings(base_dir: Option<PathBuf>, api_url: Option<&str>) -> Result<(Paths, Config)> {
    let paths = match base_dir {
        Some(dir) => Paths::with_base_dir(dir),
        None => Paths::new()?,
    };
    paths
        .ensure_dirs()
        .with_context(|| format!("cannot create {}", paths.base_dir().display()))?;

    let mut config = Config::load(&paths)?;
    if let Some(url) = api_url.map(str::trim).filter(|url| !url.is_empty()) {
        config.api_base_url = url.to_string();
    }
    config.api_base_url()?;
    Ok((paths, config))
}

/// Everything a command needs.
pub struct Context {
    pub config: Config,
    pub session: SessionController,
}

impl Context {
    pub fn new(paths: &Paths, config: Config) -> Result<Self> {
        let tokens = Arc::new(create_token_store(paths)?);
        let fetcher = AuthFetcher::from_config(&config, tokens)?;
        Ok(Self {
            config,
            session: SessionController::new(fetcher),
        })
    }
}

/// Read one trimmed line from stdin.
fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

/// Read a secret without echo.
fn prompt_secret(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(format!("{}: ", label))?)
}

/// Use the given value or prompt for one; empty input is an error.
fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    let value = match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(value) => value,
        None => prompt(label)?,
    };
    if value.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(value)
}

fn required_secret(label: &str) -> Result<String> {
    let value = prompt_secret(label)?;
    if value.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(value)
}
