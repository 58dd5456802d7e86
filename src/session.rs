//! Login state of a [`crate::client::PyLoad`] client.
//!
//! All transitions happen while holding one async mutex, so callers racing to
//! log in observe a single login request. State is only written after a login
//! response has been fully received and validated; a login future that is
//! dropped halfway leaves the previous state untouched.

use crate::client::PyLoadError;
use crate::client::PyLoadError::{CannotConnect, InvalidAuth, Parser};
use crate::entities::{Command, LoginResponse};
use crate::parser;
use crate::transport::{ApiRequest, Transport};
use log::{debug, warn};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;

/// Username and password for the pyLoad web interface
#[derive(Clone)]
pub(crate) struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Default)]
struct SessionState {
    cookie: Option<String>,
    authenticated: bool,
    /// Incremented on every successful login
    generation: u64,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .field("authenticated", &self.authenticated)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Snapshot of an authenticated session handed to a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionTicket {
    pub cookie: String,
    pub generation: u64,
}

#[derive(Debug)]
pub(crate) struct SessionManager {
    credentials: Credentials,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.authenticated
    }

    /// Logs in unconditionally, replacing any existing session
    pub async fn login(&self, transport: &Transport) -> Result<LoginResponse, PyLoadError> {
        let mut state = self.state.lock().await;
        let (response, _) = self.login_locked(&mut state, transport).await?;
        Ok(response)
    }

    /// Returns the current session, logging in first if there is none
    pub async fn ensure_authenticated(
        &self,
        transport: &Transport,
    ) -> Result<SessionTicket, PyLoadError> {
        let mut state = self.state.lock().await;
        if let (true, Some(cookie)) = (state.authenticated, state.cookie.as_ref()) {
            return Ok(SessionTicket {
                cookie: cookie.clone(),
                generation: state.generation,
            });
        }

        debug!("No active session, logging in");
        let (_, ticket) = self.login_locked(&mut state, transport).await?;
        Ok(ticket)
    }

    /// Replaces a session the server no longer accepts.
    ///
    /// If another request already logged in again since `stale` was issued,
    /// the newer session is returned and no login request is made.
    pub async fn reauthenticate(
        &self,
        transport: &Transport,
        stale: &SessionTicket,
    ) -> Result<SessionTicket, PyLoadError> {
        let mut state = self.state.lock().await;
        if state.generation != stale.generation {
            if let (true, Some(cookie)) = (state.authenticated, state.cookie.as_ref()) {
                debug!("Session was already renewed by another request");
                return Ok(SessionTicket {
                    cookie: cookie.clone(),
                    generation: state.generation,
                });
            }
        }

        warn!("Session expired, logging in again");
        state.authenticated = false;
        state.cookie = None;
        let (_, ticket) = self.login_locked(&mut state, transport).await?;
        Ok(ticket)
    }

    /// Drops the session if it is still the one described by `ticket`
    pub async fn invalidate(&self, ticket: &SessionTicket) {
        let mut state = self.state.lock().await;
        if state.generation == ticket.generation {
            state.authenticated = false;
            state.cookie = None;
        }
    }

    /// Forgets the current session
    pub async fn logout(&self) {
        let mut state = self.state.lock().await;
        state.authenticated = false;
        state.cookie = None;
    }

    async fn login_locked(
        &self,
        state: &mut SessionState,
        transport: &Transport,
    ) -> Result<(LoginResponse, SessionTicket), PyLoadError> {
        match self.request_login(transport).await {
            Ok((login, cookie)) => {
                state.cookie = Some(cookie.clone());
                state.authenticated = true;
                state.generation += 1;
                debug!("Logged in as {} (session {})", login.name, state.generation);

                Ok((
                    login,
                    SessionTicket {
                        cookie,
                        generation: state.generation,
                    },
                ))
            }
            Err(e) => {
                if matches!(e, InvalidAuth(_)) {
                    state.authenticated = false;
                    state.cookie = None;
                }
                Err(e)
            }
        }
    }

    /// Sends the credentials and returns the login data with the session cookie
    async fn request_login(
        &self,
        transport: &Transport,
    ) -> Result<(LoginResponse, String), PyLoadError> {
        let request = ApiRequest::form(
            Command::Login,
            vec![
                ("username", self.credentials.username.clone()),
                ("password", self.credentials.password.clone()),
            ],
        );

        let response = transport.send(&request, None).await?;

        match response.status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(InvalidAuth(format!(
                    "Login rejected with status {}",
                    response.status.as_u16()
                )));
            }
            status if !status.is_success() => {
                return Err(CannotConnect {
                    context: format!("Login failed with status {}", status.as_u16()),
                    source: None,
                });
            }
            _ => {}
        }

        if response.body.trim().is_empty() {
            return Err(InvalidAuth("Login returned an empty response".into()));
        }

        let value: Value =
            parser::parse(&response.body, "Login failed during parsing of request response")?;
        if parser::is_rejected_login(&value) {
            warn!("Login rejected for user {}", self.credentials.username);
            return Err(InvalidAuth("Invalid username or password".into()));
        }

        let login: LoginResponse = serde_json::from_value(value).map_err(|e| Parser {
            context: "Login response has an unexpected shape".into(),
            source: Some(e),
        })?;

        let Some(cookie) = response.cookie_header() else {
            return Err(InvalidAuth(
                "Login response did not set a session cookie".into(),
            ));
        };

        Ok((login, cookie))
    }
}
