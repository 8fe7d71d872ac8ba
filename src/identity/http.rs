//! Hosted auth API adapter.
//!
//! Thin HTTP wrapper over the backend's password-grant auth endpoints. The
//! current token pair is held in memory only; durable session storage is the
//! hosted service's concern. Pure parsing lives in free functions for
//! testability.
//!
//! EVENTS
//! ======
//! - sign-in, and sign-up when the service returns a session: `SIGNED_IN`
//! - sign-out: `SIGNED_OUT`
//! - token refresh: `TOKEN_REFRESHED`
//! - listener registration: `INITIAL_SESSION` to the new listener only

use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use tracing::{debug, info};

use super::listeners::{IdentityHandler, ListenerRegistry, Subscription};
use super::types::{Identity, IdentityError, IdentityEvent, SignUpProfile};
use super::IdentityService;
use crate::config::{BackendConfig, build_http_client};

const AUTH_PREFIX: &str = "/auth/v1";

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone)]
struct HeldSession {
    access_token: String,
    refresh_token: Option<String>,
    user: Identity,
}

pub struct HttpIdentityService {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: Mutex<Option<HeldSession>>,
    listeners: ListenerRegistry,
}

impl HttpIdentityService {
    /// Build an identity client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, IdentityError> {
        let http = build_http_client(config.timeouts).map_err(|e| IdentityError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            session: Mutex::new(None),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Exchange the held refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::NoSession`] when nothing is signed in, or the
    /// service error when the refresh is rejected.
    pub async fn refresh_session(&self) -> Result<(), IdentityError> {
        let refresh_token = self
            .held()
            .and_then(|s| s.refresh_token)
            .ok_or(IdentityError::NoSession)?;

        let body = self
            .send(
                self.http
                    .post(auth_endpoint(&self.base_url, "/token?grant_type=refresh_token"))
                    .json(&serde_json::json!({ "refresh_token": refresh_token })),
                None,
            )
            .await?;
        let tokens = parse_token_response(&body)?;
        let user = self.hold(tokens);
        debug!(user_id = %user.id, "identity: session refreshed");
        self.listeners.emit(IdentityEvent::TokenRefreshed, Some(&user));
        Ok(())
    }

    fn held(&self) -> Option<HeldSession> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn hold(&self, tokens: TokenResponse) -> Identity {
        let user = tokens.user.clone();
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(HeldSession {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: tokens.user,
        });
        user
    }

    /// Attach auth headers, send, and return the body of a 2xx response.
    async fn send(&self, request: reqwest::RequestBuilder, bearer: Option<&str>) -> Result<String, IdentityError> {
        let response = request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        check_status(status, text)
    }
}

#[async_trait::async_trait]
impl IdentityService for HttpIdentityService {
    async fn current_identity(&self) -> Result<Option<Identity>, IdentityError> {
        let Some(held) = self.held() else {
            return Ok(None);
        };

        let body = self
            .send(self.http.get(auth_endpoint(&self.base_url, "/user")), Some(held.access_token.as_str()))
            .await?;
        let user: Identity = serde_json::from_str(&body).map_err(|e| IdentityError::Parse(e.to_string()))?;

        if let Some(session) = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            session.user = user.clone();
        }
        Ok(Some(user))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), IdentityError> {
        let body = self
            .send(
                self.http
                    .post(auth_endpoint(&self.base_url, "/token?grant_type=password"))
                    .json(&serde_json::json!({ "email": email, "password": password })),
                None,
            )
            .await?;
        let tokens = parse_token_response(&body)?;
        let user = self.hold(tokens);
        info!(user_id = %user.id, "identity: signed in");
        self.listeners.emit(IdentityEvent::SignedIn, Some(&user));
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str, profile: &SignUpProfile) -> Result<(), IdentityError> {
        let body = self
            .send(
                self.http
                    .post(auth_endpoint(&self.base_url, "/signup"))
                    .json(&signup_body(email, password, profile)),
                None,
            )
            .await?;

        match parse_signup_response(&body)? {
            SignUpResponse::Session(tokens) => {
                let user = self.hold(tokens);
                info!(user_id = %user.id, "identity: signed up");
                self.listeners.emit(IdentityEvent::SignedIn, Some(&user));
            }
            SignUpResponse::Pending(user) => {
                info!(user_id = %user.id, "identity: sign-up pending email confirmation");
            }
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if let Some(held) = self.held() {
            self.send(self.http.post(auth_endpoint(&self.base_url, "/logout")), Some(held.access_token.as_str()))
                .await?;
            *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
            info!(user_id = %held.user.id, "identity: signed out");
        }
        self.listeners.emit(IdentityEvent::SignedOut, None);
        Ok(())
    }

    fn on_identity_change(&self, handler: IdentityHandler) -> Subscription {
        let subscription = self.listeners.register(handler);
        let current = self.held().map(|s| s.user);
        self.listeners
            .emit_to(subscription.id(), IdentityEvent::InitialSession, current.as_ref());
        subscription
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: Identity,
}

/// Sign-up answers with a full session, or with a bare user when email
/// confirmation is required first.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    Pending(Identity),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

fn auth_endpoint(base_url: &str, path: &str) -> String {
    format!("{base_url}{AUTH_PREFIX}{path}")
}

fn signup_body(email: &str, password: &str, profile: &SignUpProfile) -> serde_json::Value {
    serde_json::json!({
        "email": email,
        "password": password,
        "data": { "full_name": profile.display_name },
    })
}

fn parse_token_response(json: &str) -> Result<TokenResponse, IdentityError> {
    serde_json::from_str(json).map_err(|e| IdentityError::Parse(e.to_string()))
}

fn parse_signup_response(json: &str) -> Result<SignUpResponse, IdentityError> {
    serde_json::from_str(json).map_err(|e| IdentityError::Parse(e.to_string()))
}

fn check_status(status: reqwest::StatusCode, body: String) -> Result<String, IdentityError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(parse_error_response(status.as_u16(), &body))
    }
}

fn parse_error_response(status: u16, body: &str) -> IdentityError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() { format!("HTTP {status}") } else { trimmed.to_owned() }
        });
    IdentityError::Rejected { status, message }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
