//! Auth session controller.
//!
//! Owns the in-memory current user and the startup restoration status, and
//! maps each auth intent (login, register, verify, logout, forgot, reset,
//! change password) to exactly one request and one outcome.

use crate::endpoints;
use crate::fetch::AuthFetcher;
use crate::types::{
    AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RefreshRequest,
    RegisterReceipt, RegisterRequest, ResetPasswordRequest, SessionSnapshot, SessionStatus, User,
    VerifyRequest,
};
use crate::{AuthError, AuthResult};
use parking_lot::Mutex;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use storefront_storage::TokenStore;
use tracing::{debug, info, warn};

const LOGIN_FALLBACK: &str = "login error";
const REGISTER_FALLBACK: &str = "registration error";
const VERIFY_FALLBACK: &str = "verification error";
const FORGOT_FALLBACK: &str = "request error";
const RESET_FALLBACK: &str = "reset error";
const CHANGE_FALLBACK: &str = "change error";
const SESSION_FALLBACK: &str = "session error";

/// Callback type for session state change notifications.
pub type SessionCallback = Box<dyn Fn(SessionSnapshot) + Send + Sync>;

/// Session controller shared by everything that needs the current user.
///
/// Created once by the application root and passed by reference.
pub struct SessionController {
    fetcher: AuthFetcher,
    user: Mutex<Option<User>>,
    status: Mutex<SessionStatus>,
    /// Optional callback for state change notifications.
    state_callback: Mutex<Option<Arc<dyn Fn(SessionSnapshot) + Send + Sync>>>,
}

impl SessionController {
    pub fn new(fetcher: AuthFetcher) -> Self {
        Self {
            fetcher,
            user: Mutex::new(None),
            status: Mutex::new(SessionStatus::Idle),
            state_callback: Mutex::new(None),
        }
    }

    /// Set a callback to be notified whenever the user or status changes.
    ///
    /// The callback runs without internal locks held, so it may read the
    /// controller or replace itself.
    pub fn set_state_callback(&self, callback: SessionCallback) {
        *self.state_callback.lock() = Some(Arc::from(callback));
    }

    /// The authenticated fetcher, for other authenticated API calls.
    pub fn fetcher(&self) -> &AuthFetcher {
        &self.fetcher
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        self.fetcher.tokens()
    }

    /// Current user, if a session is established.
    pub fn user(&self) -> Option<User> {
        self.user.lock().clone()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.lock()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.lock().is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status(),
            user: self.user(),
        }
    }

    /// Restore the session from stored tokens. Call once at startup.
    ///
    /// Never fails: any problem leaves an anonymous session with cleared
    /// tokens. Ends with status `Ready`.
    pub async fn restore(&self) {
        let credentials = self.tokens().get_stored_tokens();
        if credentials.is_empty() {
            debug!("No stored tokens, starting anonymous");
            self.update(SessionStatus::Ready, None);
            return;
        }

        self.update(SessionStatus::Loading, None);

        match self.fetch_current_user().await {
            Ok(user) => {
                info!(email = %user.email, "Session restored");
                self.update(SessionStatus::Ready, Some(user));
            }
            Err(e) => {
                warn!(error = %e, "Session restoration failed, clearing tokens");
                self.clear_tokens_logged();
                self.update(SessionStatus::Ready, None);
            }
        }
    }

    /// `GET /api/auth/me` through the authenticated fetch path.
    pub async fn fetch_current_user(&self) -> AuthResult<User> {
        let response = self
            .fetcher
            .get(endpoints::ME)
            .await
            .map_err(|e| e.with_fallback(SESSION_FALLBACK))?;
        read_json(response, SESSION_FALLBACK).await
    }

    /// Log in with email and password. Stores the issued tokens and sets the user.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<User> {
        debug!(email = %email, "Logging in");
        let response = self
            .post_public(endpoints::LOGIN, &LoginRequest { email, password }, LOGIN_FALLBACK)
            .await?;
        let data: AuthResponse = read_json(response, LOGIN_FALLBACK).await?;
        let user = self.establish(data)?;
        info!(email = %user.email, "Login successful");
        Ok(user)
    }

    /// Register a new account. No tokens are issued until verification.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> AuthResult<RegisterReceipt> {
        debug!(email = %email, "Registering");
        let response = self
            .post_public(
                endpoints::REGISTER,
                &RegisterRequest { name, email, password },
                REGISTER_FALLBACK,
            )
            .await?;
        let receipt: RegisterReceipt = read_json(response, REGISTER_FALLBACK).await?;
        info!(email = %email, "Registration accepted, pending verification");
        Ok(receipt)
    }

    /// Verify a registration code. Stores the issued tokens and sets the user.
    ///
    /// `email` is sent as given; it is not compared with the address that
    /// was registered.
    pub async fn verify(&self, email: &str, code: &str) -> AuthResult<User> {
        debug!(email = %email, "Verifying account");
        let response = self
            .post_public(endpoints::VERIFY, &VerifyRequest { email, code }, VERIFY_FALLBACK)
            .await?;
        let data: AuthResponse = read_json(response, VERIFY_FALLBACK).await?;
        let user = self.establish(data)?;
        info!(email = %user.email, "Account verified");
        Ok(user)
    }

    /// Log out. Never fails.
    ///
    /// The server is told about the refresh token when one is stored; its
    /// answer is ignored. Local tokens and the user are always cleared.
    pub async fn logout(&self) {
        let credentials = self.tokens().get_stored_tokens();
        if credentials.has_refresh() {
            let body = RefreshRequest {
                refresh_token: &credentials.refresh,
            };
            match self.post_public(endpoints::LOGOUT, &body, "logout error").await {
                Ok(_) => debug!("Server acknowledged logout"),
                Err(e) => debug!(error = %e, "Server logout failed, clearing locally"),
            }
        }

        self.clear_tokens_logged();
        self.set_user(None);
        info!("Logged out");
    }

    /// Ask the server to email a password reset token.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<Value> {
        debug!(email = %email, "Requesting password reset");
        let response = self
            .post_public(endpoints::FORGOT_PASSWORD, &ForgotPasswordRequest { email }, FORGOT_FALLBACK)
            .await?;
        read_body(response, FORGOT_FALLBACK).await
    }

    /// Reset the password with an emailed token. Does not log in.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<Value> {
        let response = self
            .post_public(
                endpoints::RESET_PASSWORD,
                &ResetPasswordRequest { token, new_password },
                RESET_FALLBACK,
            )
            .await?;
        let body = read_body(response, RESET_FALLBACK).await?;
        info!("Password reset");
        Ok(body)
    }

    /// Change the password of the logged-in user through the authenticated
    /// fetch path. Tokens in the response, if any, are stored.
    pub async fn change_password(&self, current_password: &str, new_password: &str) -> AuthResult<Value> {
        let request = self
            .fetcher
            .http()
            .post(self.fetcher.endpoint(endpoints::CHANGE_PASSWORD)?)
            .json(&ChangePasswordRequest {
                current_password,
                new_password,
            })
            .build()?;

        let response = self
            .fetcher
            .auth_fetch(request)
            .await
            .map_err(|e| e.with_fallback(CHANGE_FALLBACK))?;
        let body = read_body(response, CHANGE_FALLBACK).await?;

        if let Some(tokens) = body.get("tokens") {
            let access = tokens.get("access_token").and_then(Value::as_str).unwrap_or("");
            let refresh = tokens.get("refresh_token").and_then(Value::as_str).unwrap_or("");
            self.tokens().store_tokens(access, refresh)?;
        }

        info!("Password changed");
        Ok(body)
    }

    /// POST a JSON body without credentials, mapping failures to the
    /// operation's messages.
    async fn post_public<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> AuthResult<Response> {
        let url = self.fetcher.endpoint(path)?;
        let response = self
            .fetcher
            .http()
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::from(e).with_fallback(fallback))?;
        ensure_success(response, fallback).await
    }

    /// Persist the issued tokens and replace the current user.
    fn establish(&self, data: AuthResponse) -> AuthResult<User> {
        self.tokens()
            .store_tokens(&data.tokens.access_token, &data.tokens.refresh_token)?;
        self.set_user(Some(data.user.clone()));
        Ok(data.user)
    }

    fn clear_tokens_logged(&self) {
        if let Err(e) = self.tokens().clear_tokens() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
    }

    fn set_user(&self, user: Option<User>) {
        let status = self.status();
        self.update(status, user);
    }

    fn update(&self, status: SessionStatus, user: Option<User>) {
        let changed = {
            let mut current_status = self.status.lock();
            let mut current_user = self.user.lock();
            let changed = *current_status != status || *current_user != user;
            *current_status = status;
            *current_user = user;
            changed
        };

        if changed {
            self.notify_state_change();
        }
    }

    fn notify_state_change(&self) {
        let snapshot = self.snapshot();
        debug!(status = ?snapshot.status, authenticated = snapshot.user.is_some(), "Session state changed");
        let callback = self.state_callback.lock().clone();
        if let Some(callback) = callback {
            callback(snapshot);
        }
    }
}

/// Turn a non-success response into `AuthError::Rejected`.
async fn ensure_success(response: Response, fallback: &str) -> AuthResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, "Request rejected");
    Err(AuthError::rejected(status.as_u16(), &body, fallback))
}

async fn read_json<T: DeserializeOwned>(response: Response, fallback: &str) -> AuthResult<T> {
    let response = ensure_success(response, fallback).await?;
    let text = response
        .text()
        .await
        .map_err(|e| AuthError::from(e).with_fallback(fallback))?;
    serde_json::from_str(&text).map_err(|e| AuthError::from(e).with_fallback(fallback))
}

/// Read an arbitrary success body. An empty body becomes `Value::Null`.
async fn read_body(response: Response, fallback: &str) -> AuthResult<Value> {
    let response = ensure_success(response, fallback).await?;
    let text = response
        .text()
        .await
        .map_err(|e| AuthError::from(e).with_fallback(fallback))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| AuthError::from(e).with_fallback(fallback))
}
