//! Auth form mode machine using rust-fsm.
//!
//! ```text
//!            PickRegister              RegisterSucceeded
//!   Login ───────────────► Register ────────────────────► Verify
//!     │                                                     │
//!     │ PickForgot                                          │ VerifySucceeded [Dismiss]
//!     ▼                                                     ▼
//!   Forgot ── ResetRequested ──► Reset ── PasswordReset ──► Login
//!
//!   Login ── LoginSucceeded [Dismiss] ──► Login
//!   Change ── PasswordChanged [Dismiss] ──► Change
//!   any ── PickLogin ──► Login
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

state_machine! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub auth_mode_machine(Login)

    Login => {
        LoginSucceeded => Login [Dismiss],
        PickRegister => Register,
        PickForgot => Forgot,
        PickLogin => Login
    },
    Register => {
        RegisterSucceeded => Verify,
        PickLogin => Login
    },
    Verify => {
        VerifySucceeded => Verify [Dismiss],
        PickLogin => Login
    },
    Forgot => {
        ResetRequested => Reset,
        PickLogin => Login
    },
    Reset => {
        PasswordReset => Login,
        PickLogin => Login
    },
    Change => {
        PasswordChanged => Change [Dismiss],
        PickLogin => Login
    }
}

pub use auth_mode_machine::Input as ModeEvent;
pub use auth_mode_machine::State as ModeMachineState;
pub use auth_mode_machine::StateMachine as ModeMachine;

/// Which auth form is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Login,
    Register,
    Verify,
    Forgot,
    Reset,
    Change,
}

impl AuthMode {
    pub const ALL: [AuthMode; 6] = [
        AuthMode::Login,
        AuthMode::Register,
        AuthMode::Verify,
        AuthMode::Forgot,
        AuthMode::Reset,
        AuthMode::Change,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Login => "login",
            AuthMode::Register => "register",
            AuthMode::Verify => "verify",
            AuthMode::Forgot => "forgot",
            AuthMode::Reset => "reset",
            AuthMode::Change => "change",
        }
    }

    /// Form title.
    pub fn title(&self) -> &'static str {
        match self {
            AuthMode::Login => "Log in",
            AuthMode::Register => "Create account",
            AuthMode::Verify => "Verify email",
            AuthMode::Forgot => "Forgot password",
            AuthMode::Reset => "Reset password",
            AuthMode::Change => "Change password",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuthMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown auth mode: {s}"))
    }
}

impl From<&ModeMachineState> for AuthMode {
    fn from(state: &ModeMachineState) -> Self {
        match state {
            ModeMachineState::Login => AuthMode::Login,
            ModeMachineState::Register => AuthMode::Register,
            ModeMachineState::Verify => AuthMode::Verify,
            ModeMachineState::Forgot => AuthMode::Forgot,
            ModeMachineState::Reset => AuthMode::Reset,
            ModeMachineState::Change => AuthMode::Change,
        }
    }
}

impl From<AuthMode> for ModeMachineState {
    fn from(mode: AuthMode) -> Self {
        match mode {
            AuthMode::Login => ModeMachineState::Login,
            AuthMode::Register => ModeMachineState::Register,
            AuthMode::Verify => ModeMachineState::Verify,
            AuthMode::Forgot => ModeMachineState::Forgot,
            AuthMode::Reset => ModeMachineState::Reset,
            AuthMode::Change => ModeMachineState::Change,
        }
    }
}

/// Result of an accepted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeStep {
    pub mode: AuthMode,
    /// The form should close: a session was established or the password changed.
    pub dismiss: bool,
}

/// Pure transition function. `None` when `event` is not valid in `mode`.
pub fn next_mode(mode: AuthMode, event: ModeEvent) -> Option<ModeStep> {
    let state = ModeMachineState::from(mode);
    let next = auth_mode_machine::Impl::transition(&state, &event)?;
    let dismiss = auth_mode_machine::Impl::output(&state, &event).is_some();
    Some(ModeStep {
        mode: AuthMode::from(&next),
        dismiss,
    })
}
