//! Auth form state driven by the mode machine.
//!
//! [`AuthModal`] holds what a login dialog shows: the current mode, the
//! form values, a busy flag and one message. Submitting is split in three
//! so a UI can release its borrow while the request is in flight:
//! [`AuthModal::begin_submit`], [`dispatch`], [`AuthModal::finish_submit`].

use crate::mode_fsm::{next_mode, AuthMode, ModeEvent};
use crate::session::SessionController;
use crate::types::{RegisterReceipt, User};
use crate::{AuthError, AuthResult};
use serde_json::Value;
use tracing::{debug, warn};

const RESET_SENT_NOTICE: &str = "If this email exists, a reset link has been sent";
const PASSWORD_RESET_NOTICE: &str = "Password has been reset";
const VERIFY_NOTICE: &str = "Check your email for a verification code";

/// Message shown under the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalMessage {
    Error(String),
    Notice(String),
}

impl ModalMessage {
    pub fn text(&self) -> &str {
        match self {
            ModalMessage::Error(text) | ModalMessage::Notice(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ModalMessage::Error(_))
    }
}

/// Editable form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Email,
    Password,
    Code,
    Token,
    NewPassword,
    CurrentPassword,
}

impl FormField {
    /// Fields a mode submits, in display order.
    pub fn for_mode(mode: AuthMode) -> &'static [FormField] {
        match mode {
            AuthMode::Login => &[FormField::Email, FormField::Password],
            AuthMode::Register => &[FormField::Name, FormField::Email, FormField::Password],
            AuthMode::Verify => &[FormField::Email, FormField::Code],
            AuthMode::Forgot => &[FormField::Email],
            AuthMode::Reset => &[FormField::Token, FormField::NewPassword],
            AuthMode::Change => &[FormField::CurrentPassword, FormField::NewPassword],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::Email => "Email",
            FormField::Password => "Password",
            FormField::Code => "Verification code",
            FormField::Token => "Reset token",
            FormField::NewPassword => "New password",
            FormField::CurrentPassword => "Current password",
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(
            self,
            FormField::Password | FormField::NewPassword | FormField::CurrentPassword
        )
    }
}

/// Form values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub code: String,
    pub token: String,
    pub new_password: String,
    pub current_password: String,
}

impl AuthForm {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Email => &self.email,
            FormField::Password => &self.password,
            FormField::Code => &self.code,
            FormField::Token => &self.token,
            FormField::NewPassword => &self.new_password,
            FormField::CurrentPassword => &self.current_password,
        }
    }

    fn slot(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Name => &mut self.name,
            FormField::Email => &mut self.email,
            FormField::Password => &mut self.password,
            FormField::Code => &mut self.code,
            FormField::Token => &mut self.token,
            FormField::NewPassword => &mut self.new_password,
            FormField::CurrentPassword => &mut self.current_password,
        }
    }
}

/// Controller call selected by the mode at submit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAction {
    Login { email: String, password: String },
    Register { name: String, email: String, password: String },
    Verify { email: String, code: String },
    Forgot { email: String },
    Reset { token: String, new_password: String },
    Change { current_password: String, new_password: String },
}

impl SubmitAction {
    fn from_form(mode: AuthMode, form: &AuthForm) -> Self {
        let form = form.clone();
        match mode {
            AuthMode::Login => SubmitAction::Login {
                email: form.email,
                password: form.password,
            },
            AuthMode::Register => SubmitAction::Register {
                name: form.name,
                email: form.email,
                password: form.password,
            },
            AuthMode::Verify => SubmitAction::Verify {
                email: form.email,
                code: form.code,
            },
            AuthMode::Forgot => SubmitAction::Forgot { email: form.email },
            AuthMode::Reset => SubmitAction::Reset {
                token: form.token,
                new_password: form.new_password,
            },
            AuthMode::Change => SubmitAction::Change {
                current_password: form.current_password,
                new_password: form.new_password,
            },
        }
    }
}

/// Snapshot of a submission, tagged with the modal session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    generation: u64,
    pub mode: AuthMode,
    pub action: SubmitAction,
}

/// Successful controller result.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitSuccess {
    LoggedIn(User),
    Registered(RegisterReceipt),
    Verified(User),
    ResetRequested(Value),
    PasswordReset(Value),
    PasswordChanged(Value),
}

impl SubmitSuccess {
    fn event(&self) -> ModeEvent {
        match self {
            SubmitSuccess::LoggedIn(_) => ModeEvent::LoginSucceeded,
            SubmitSuccess::Registered(_) => ModeEvent::RegisterSucceeded,
            SubmitSuccess::Verified(_) => ModeEvent::VerifySucceeded,
            SubmitSuccess::ResetRequested(_) => ModeEvent::ResetRequested,
            SubmitSuccess::PasswordReset(_) => ModeEvent::PasswordReset,
            SubmitSuccess::PasswordChanged(_) => ModeEvent::PasswordChanged,
        }
    }
}

/// Run the one controller call a submission maps to.
pub async fn dispatch(request: &SubmitRequest, session: &SessionController) -> AuthResult<SubmitSuccess> {
    debug!(mode = %request.mode, "Dispatching auth form");
    match &request.action {
        SubmitAction::Login { email, password } => session.login(email, password).await.map(SubmitSuccess::LoggedIn),
        SubmitAction::Register { name, email, password } => session
            .register(name, email, password)
            .await
            .map(SubmitSuccess::Registered),
        SubmitAction::Verify { email, code } => session.verify(email, code).await.map(SubmitSuccess::Verified),
        SubmitAction::Forgot { email } => session
            .forgot_password(email)
            .await
            .map(SubmitSuccess::ResetRequested),
        SubmitAction::Reset { token, new_password } => session
            .reset_password(token, new_password)
            .await
            .map(SubmitSuccess::PasswordReset),
        SubmitAction::Change {
            current_password,
            new_password,
        } => session
            .change_password(current_password, new_password)
            .await
            .map(SubmitSuccess::PasswordChanged),
    }
}

/// State of the auth dialog.
#[derive(Debug, Default)]
pub struct AuthModal {
    open: bool,
    mode: AuthMode,
    form: AuthForm,
    email_locked: bool,
    busy: bool,
    message: Option<ModalMessage>,
    generation: u64,
}

impl AuthModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn form(&self) -> &AuthForm {
        &self.form
    }

    pub fn is_email_locked(&self) -> bool {
        self.email_locked
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn message(&self) -> Option<&ModalMessage> {
        self.message.as_ref()
    }

    /// Show the dialog in `mode` with a clean form.
    pub fn open(&mut self, mode: AuthMode) {
        self.reset_transient();
        self.mode = mode;
        self.open = true;
    }

    /// Hide the dialog. The mode is kept; everything else is discarded and
    /// any in-flight result will be ignored.
    pub fn close(&mut self) {
        self.reset_transient();
        self.open = false;
    }

    /// Set a form value. Returns false when the field is not editable.
    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) -> bool {
        if field == FormField::Email && self.email_locked {
            return false;
        }
        *self.form.slot(field) = value.into();
        true
    }

    /// Switch mode by user action (links between forms).
    ///
    /// Starts a fresh form: values, message and the busy flag are discarded,
    /// and a result still in flight for the previous mode is ignored.
    pub fn switch_mode(&mut self, event: ModeEvent) -> AuthResult<AuthMode> {
        if !matches!(
            event,
            ModeEvent::PickLogin | ModeEvent::PickRegister | ModeEvent::PickForgot
        ) {
            return Err(AuthError::InvalidModeTransition(format!(
                "{event:?} is not a user selection"
            )));
        }
        let step = next_mode(self.mode, event).ok_or_else(|| {
            AuthError::InvalidModeTransition(format!("{} -> {event:?}", self.mode))
        })?;
        self.reset_transient();
        self.mode = step.mode;
        Ok(step.mode)
    }

    /// Snapshot the form for submission. `None` while closed or busy.
    pub fn begin_submit(&mut self) -> Option<SubmitRequest> {
        if !self.open || self.busy {
            return None;
        }
        self.busy = true;
        self.message = None;
        Some(SubmitRequest {
            generation: self.generation,
            mode: self.mode,
            action: SubmitAction::from_form(self.mode, &self.form),
        })
    }

    /// Apply a dispatch result. Returns false if it was stale and ignored.
    pub fn finish_submit(&mut self, request: &SubmitRequest, outcome: AuthResult<SubmitSuccess>) -> bool {
        if !self.open || request.generation != self.generation {
            debug!(mode = %request.mode, "Ignoring stale auth form result");
            return false;
        }
        self.busy = false;

        let success = match outcome {
            Ok(success) => success,
            Err(e) => {
                self.message = Some(ModalMessage::Error(e.to_string()));
                return true;
            }
        };

        let Some(step) = next_mode(self.mode, success.event()) else {
            warn!(mode = %self.mode, event = ?success.event(), "Result does not fit the current mode");
            return true;
        };

        if step.dismiss {
            self.close();
            return true;
        }

        match success {
            SubmitSuccess::Registered(receipt) => self.on_register_success(&receipt),
            SubmitSuccess::ResetRequested(body) => {
                self.enter(step.mode);
                self.message = Some(ModalMessage::Notice(
                    server_message(&body).unwrap_or_else(|| RESET_SENT_NOTICE.to_string()),
                ));
            }
            SubmitSuccess::PasswordReset(body) => {
                self.enter(step.mode);
                self.message = Some(ModalMessage::Notice(
                    server_message(&body).unwrap_or_else(|| PASSWORD_RESET_NOTICE.to_string()),
                ));
            }
            _ => self.enter(step.mode),
        }
        true
    }

    /// Begin, dispatch and finish in one call.
    pub async fn submit(&mut self, session: &SessionController) -> bool {
        let Some(request) = self.begin_submit() else {
            return false;
        };
        let outcome = dispatch(&request, session).await;
        self.finish_submit(&request, outcome)
    }

    /// Move to verify with the registered email filled in and locked.
    pub fn on_register_success(&mut self, receipt: &RegisterReceipt) {
        let email = receipt
            .email
            .clone()
            .filter(|email| !email.trim().is_empty())
            .unwrap_or_else(|| self.form.email.clone());
        let mode = next_mode(self.mode, ModeEvent::RegisterSucceeded)
            .map(|step| step.mode)
            .unwrap_or(AuthMode::Verify);

        self.enter(mode);
        self.form.email = email;
        self.email_locked = true;
        self.message = Some(ModalMessage::Notice(
            receipt.message.clone().unwrap_or_else(|| VERIFY_NOTICE.to_string()),
        ));
    }

    fn enter(&mut self, mode: AuthMode) {
        self.form = AuthForm::default();
        self.message = None;
        self.email_locked = false;
        self.mode = mode;
    }

    fn reset_transient(&mut self) {
        self.form = AuthForm::default();
        self.message = None;
        self.email_locked = false;
        self.busy = false;
        self.generation += 1;
    }
}

fn server_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}
