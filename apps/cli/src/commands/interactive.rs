//! Interactive auth dialog in the terminal.

use super::{prompt, prompt_secret, Context};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use storefront_auth::{AuthMode, AuthModal, FormField, ModalMessage, ModeEvent};
use tracing::debug;

enum Choice {
    Submit,
    Switch(ModeEvent),
    Quit,
}

/// Links offered from each mode.
fn links(mode: AuthMode) -> &'static [(&'static str, &'static str, ModeEvent)] {
    match mode {
        AuthMode::Login => &[
            ("r", "create an account", ModeEvent::PickRegister),
            ("f", "forgot password", ModeEvent::PickForgot),
        ],
        _ => &[("l", "back to log in", ModeEvent::PickLogin)],
    }
}

fn read_choice(mode: AuthMode) -> Result<Choice> {
    let mut menu = String::from("[Enter] submit");
    for (key, label, _) in links(mode) {
        menu.push_str(&format!(", ({}) {}", key, label));
    }
    menu.push_str(", (q) quit");
    println!("{}", menu);

    loop {
        let answer = prompt(">")?.to_lowercase();
        if answer.is_empty() {
            return Ok(Choice::Submit);
        }
        if answer == "q" {
            return Ok(Choice::Quit);
        }
        if let Some((_, _, event)) = links(mode).iter().find(|(key, _, _)| *key == answer) {
            return Ok(Choice::Switch(*event));
        }
        println!("Unknown choice: {}", answer);
    }
}

fn show(modal: &AuthModal) {
    output::print_heading(modal.mode().title());
    match modal.message() {
        Some(ModalMessage::Error(text)) => println!("! {}", text),
        Some(ModalMessage::Notice(text)) => println!("{}", text),
        None => {}
    }
}

fn fill_form(modal: &mut AuthModal) -> Result<()> {
    for field in FormField::for_mode(modal.mode()) {
        if *field == FormField::Email && modal.is_email_locked() {
            output::print_row(field.label(), &modal.form().email);
            continue;
        }
        let value = if field.is_secret() {
            prompt_secret(field.label())?
        } else {
            prompt(field.label())?
        };
        modal.set_field(*field, value);
    }
    Ok(())
}

/// Run the auth dialog until it is dismissed or the user quits.
pub async fn auth_modal(ctx: &Context, mode: AuthMode, format: &OutputFormat) -> Result<()> {
    ctx.session.restore().await;
    if mode == AuthMode::Change && !ctx.session.is_authenticated() {
        output::print_error("Log in before changing the password", format);
        return Ok(());
    }

    let mut modal = AuthModal::new();
    modal.open(mode);

    while modal.is_open() {
        show(&modal);
        match read_choice(modal.mode())? {
            Choice::Quit => {
                modal.close();
                debug!("Auth dialog closed by user");
                return Ok(());
            }
            Choice::Switch(event) => {
                if let Err(e) = modal.switch_mode(event) {
                    output::print_error(&e.to_string(), format);
                }
            }
            Choice::Submit => {
                fill_form(&mut modal)?;
                let submitted_mode = modal.mode();
                modal.submit(&ctx.session).await;
                if !modal.is_open() {
                    let message = match (submitted_mode, ctx.session.user()) {
                        (AuthMode::Change, _) => "Password has been changed".to_string(),
                        (_, Some(user)) => format!("Logged in as {}", user.display_name()),
                        (_, None) => "Done".to_string(),
                    };
                    output::print_success(&message, format);
                }
            }
        }
    }
    Ok(())
}
