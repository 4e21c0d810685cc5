//! Authentication for the storefront client.
//!
//! This crate provides:
//! - Authenticated fetch with one-shot refresh-and-retry on 401
//! - Session controller for login, registration, verification and password flows
//! - Startup session restoration from stored tokens
//! - Explicit FSM for the auth form modes, plus the modal state that consumes it

pub mod endpoints;
mod error;
mod fetch;
mod modal;
mod mode_fsm;
mod session;
mod types;

pub use error::{detail_message, AuthError, AuthResult};
pub use fetch::AuthFetcher;
pub use modal::{
    dispatch, AuthForm, AuthModal, FormField, ModalMessage, SubmitAction, SubmitRequest, SubmitSuccess,
};
pub use mode_fsm::auth_mode_machine;
pub use mode_fsm::{next_mode, AuthMode, ModeEvent, ModeMachine, ModeMachineState, ModeStep};
pub use session::{SessionCallback, SessionController};
pub use types::{AuthResponse, IssuedTokens, RegisterReceipt, SessionSnapshot, SessionStatus, User};
