//! Authentication commands.

use super::{required_secret, value_or_prompt, Context};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use serde_json::{json, Value};
use storefront_auth::User;
use tracing::debug;

fn print_user(user: &User, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            output::print_row("Name", user.display_name());
            output::print_row("Email", &user.email);
        }
        OutputFormat::Json => output::print_json(user),
    }
}

/// Server `message` from a body, or a default.
fn body_message(body: &Value, default: &str) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

/// Login with email and password.
pub async fn login(ctx: &Context, email: Option<String>, format: &OutputFormat) -> Result<()> {
    let email = value_or_prompt(email, "Email")?;
    let password = required_secret("Password")?;

    println!("Logging in...");
    match ctx.session.login(&email, &password).await {
        Ok(user) => {
            output::print_success(&format!("Logged in as {}", user.display_name()), format);
        }
        Err(e) => output::print_error(&format!("Login failed: {}", e), format),
    }
    Ok(())
}

/// Create an account. A verification code is emailed.
pub async fn register(
    ctx: &Context,
    name: Option<String>,
    email: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let name = value_or_prompt(name, "Name")?;
    let email = value_or_prompt(email, "Email")?;
    let password = required_secret("Password")?;

    match ctx.session.register(&name, &email, &password).await {
        Ok(receipt) => {
            let sent_to = receipt.email.as_deref().unwrap_or(&email);
            let message = receipt.message.as_deref().unwrap_or("Verification code sent");
            output::print_success(
                &format!("{}. Run 'storefront verify --email {}' with the code.", message, sent_to),
                format,
            );
        }
        Err(e) => output::print_error(&format!("Registration failed: {}", e), format),
    }
    Ok(())
}

/// Verify an account with the emailed code.
pub async fn verify(
    ctx: &Context,
    email: Option<String>,
    code: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let email = value_or_prompt(email, "Email")?;
    let code = value_or_prompt(code, "Verification code")?;

    match ctx.session.verify(&email, &code).await {
        Ok(user) => {
            output::print_success(&format!("Verified and logged in as {}", user.display_name()), format);
        }
        Err(e) => output::print_error(&format!("Verification failed: {}", e), format),
    }
    Ok(())
}

/// Logout and clear stored tokens.
pub async fn logout(ctx: &Context, format: &OutputFormat) -> Result<()> {
    ctx.session.logout().await;
    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Request a password reset email.
pub async fn forgot_password(ctx: &Context, email: Option<String>, format: &OutputFormat) -> Result<()> {
    let email = value_or_prompt(email, "Email")?;

    match ctx.session.forgot_password(&email).await {
        Ok(body) => output::print_success(
            &body_message(&body, "If this email exists, a reset link has been sent"),
            format,
        ),
        Err(e) => output::print_error(&e.to_string(), format),
    }
    Ok(())
}

/// Set a new password with the emailed reset token.
pub async fn reset_password(ctx: &Context, token: Option<String>, format: &OutputFormat) -> Result<()> {
    let token = value_or_prompt(token, "Reset token")?;
    let new_password = required_secret("New password")?;

    match ctx.session.reset_password(&token, &new_password).await {
        Ok(body) => output::print_success(&body_message(&body, "Password has been reset"), format),
        Err(e) => output::print_error(&format!("Reset failed: {}", e), format),
    }
    Ok(())
}

/// Change the password of the logged-in account.
pub async fn change_password(ctx: &Context, format: &OutputFormat) -> Result<()> {
    if ctx.session.tokens().get_stored_tokens().is_empty() {
        output::print_error("Not logged in", format);
        return Ok(());
    }

    let current = required_secret("Current password")?;
    let new_password = required_secret("New password")?;
    let confirm = required_secret("Repeat new password")?;
    if new_password != confirm {
        output::print_error("Passwords do not match", format);
        return Ok(());
    }

    match ctx.session.change_password(&current, &new_password).await {
        Ok(body) => output::print_success(&body_message(&body, "Password has been changed"), format),
        Err(e) => output::print_error(&format!("Change failed: {}", e), format),
    }
    Ok(())
}

/// Restore the stored session and report it.
pub async fn status(ctx: &Context, format: &OutputFormat) -> Result<()> {
    ctx.session.restore().await;
    let user = ctx.session.user();
    debug!(status = ?ctx.session.status(), "Session restored for status");

    match format {
        OutputFormat::Text => {
            output::print_row("API", &ctx.config.api_base_url);
            match &user {
                Some(user) => {
                    output::print_row("Auth", "logged in");
                    print_user(user, format);
                }
                None => output::print_row("Auth", "not logged in"),
            }
        }
        OutputFormat::Json => output::print_json(&json!({
            "api_base_url": ctx.config.api_base_url,
            "logged_in": user.is_some(),
            "user": user,
        })),
    }
    Ok(())
}
