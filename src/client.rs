use crate::client::ConfigError::Configuration;
use crate::client::PyLoadError::*;
use crate::entities::{Command, Destination, LoginResponse, StatusServerResponse, VersionInfo};
use crate::parser;
use crate::session::{Credentials, SessionManager};
use crate::transport::{ApiRequest, RawResponse, Transport};
use log::{debug, warn};
use reqwest::Client;
use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Errors returned by the operations of the [`PyLoad`] client
#[derive(Error, Debug)]
pub enum PyLoadError {
    /// The server could not be reached or answered with an unexpected HTTP status
    #[error("Cannot connect to pyLoad: {context}")]
    CannotConnect {
        context: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Credentials were rejected, or the session expired and logging in again failed
    #[error("Authentication error: {0}")]
    InvalidAuth(String),

    /// The response body is not JSON or lacks the expected fields
    #[error("Unable to parse pyLoad response: {context}")]
    Parser {
        context: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// An argument was rejected before anything was sent to the server
    #[error("Invalid input parameter: {0}")]
    InvalidInput(String),
}

/// Errors raised while constructing a [`PyLoad`] client
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Environment variable error: {0}")]
    Environment(#[from] env::VarError),
}

/// pyLoad API client
#[derive(Debug)]
pub struct PyLoad {
    transport: Transport,
    session: SessionManager,
}

impl PyLoad {
    /// Creates a new `PyLoad` client on top of an existing HTTP client.
    ///
    /// The HTTP client stays owned by the caller; the `PyLoad` client keeps a
    /// handle to its connection pool and never shuts it down.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Username, password, or URL is empty
    /// - URL doesn't start with "http://" or "https://"
    pub fn new(
        url: String,
        username: String,
        password: String,
        client: Client,
    ) -> Result<Self, ConfigError> {
        if username.is_empty() {
            return Err(Configuration("Username cannot be empty".into()));
        }

        if password.is_empty() {
            return Err(Configuration("Password cannot be empty".into()));
        }

        if url.is_empty() {
            return Err(Configuration("URL cannot be empty".into()));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Configuration(format!(
                "URL must start with http:// or https://, got: {url}"
            )));
        }

        let url = url.trim_end_matches('/').to_string();

        Ok(Self {
            transport: Transport::new(client, url),
            session: SessionManager::new(Credentials { username, password }),
        })
    }

    /// Creates a configured HTTP client
    fn create_client(timeout: u64) -> Client {
        Client::builder()
            .timeout(Duration::from_millis(timeout))
            .build()
            .unwrap_or_default()
    }

    /// Creates a new `PyLoad` client with a builder pattern
    #[must_use]
    pub fn builder() -> PyLoadBuilder {
        PyLoadBuilder::default()
    }

    /// Base URL of the pyLoad web interface, without trailing slash
    #[must_use]
    pub fn url(&self) -> &str {
        self.transport.base_url()
    }

    /// Whether the client currently holds a session cookie accepted at login
    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    /// Logs in to pyLoad and stores the session cookie.
    ///
    /// Calling this is optional: every operation logs in on its own when no
    /// session exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails ([`PyLoadError::CannotConnect`])
    /// - Username or password are rejected ([`PyLoadError::InvalidAuth`])
    /// - Response cannot be parsed ([`PyLoadError::Parser`])
    pub async fn login(&self) -> Result<LoginResponse, PyLoadError> {
        self.session.login(&self.transport).await
    }

    /// Forgets the current session; the next operation logs in again
    pub async fn logout(&self) {
        self.session.logout().await;
    }

    /// Gets general status information of pyLoad
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response cannot be parsed or lacks a required field
    pub async fn get_status(&self) -> Result<StatusServerResponse, PyLoadError> {
        let body = self.call(ApiRequest::get(Command::Status)).await?;
        parser::parse(&body, "Get status failed during parsing of request response")
    }

    /// Pauses the download queue. Pausing an already paused queue is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not valid JSON
    pub async fn pause(&self) -> Result<(), PyLoadError> {
        self.execute(Command::Pause).await
    }

    /// Resumes the download queue
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not valid JSON
    pub async fn unpause(&self) -> Result<(), PyLoadError> {
        self.execute(Command::Unpause).await
    }

    /// Pauses or resumes the download queue depending on `paused`.
    /// This is the boolean form of [`Self::pause`]: `set_paused(true)` pauses.
    ///
    /// # Errors
    ///
    /// See [`Self::pause`] and [`Self::unpause`]
    pub async fn set_paused(&self, paused: bool) -> Result<(), PyLoadError> {
        if paused {
            self.pause().await
        } else {
            self.unpause().await
        }
    }

    /// Toggles the pause state of the download queue
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not valid JSON
    pub async fn toggle_pause(&self) -> Result<(), PyLoadError> {
        self.execute(Command::TogglePause).await
    }

    /// Aborts all running downloads
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not valid JSON
    pub async fn stop_all_downloads(&self) -> Result<(), PyLoadError> {
        self.execute(Command::AbortAll).await
    }

    /// Puts all failed files back into the queue
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not valid JSON
    pub async fn restart_failed(&self) -> Result<(), PyLoadError> {
        self.execute(Command::RestartFailed).await
    }

    /// Toggles the auto-reconnect feature
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not valid JSON
    pub async fn toggle_reconnect(&self) -> Result<(), PyLoadError> {
        self.execute(Command::ToggleReconnect).await
    }

    /// Deletes all finished files and packages
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not valid JSON
    pub async fn delete_finished(&self) -> Result<(), PyLoadError> {
        self.execute(Command::DeleteFinished).await
    }

    /// Restarts the pyLoad core
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not valid JSON
    pub async fn restart(&self) -> Result<(), PyLoadError> {
        self.execute(Command::Restart).await
    }

    /// Gets the version of the pyLoad server
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not a JSON string
    pub async fn version(&self) -> Result<VersionInfo, PyLoadError> {
        let body = self.call(ApiRequest::get(Command::Version)).await?;
        let version: String =
            parser::parse(&body, "Get version failed during parsing of request response")?;
        Ok(VersionInfo::parse(version))
    }

    /// Gets the free space in the download directory, in bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not a non-negative integer
    pub async fn free_space(&self) -> Result<u64, PyLoadError> {
        let body = self.call(ApiRequest::get(Command::FreeSpace)).await?;
        parser::parse(&body, "Get free space failed during parsing of request response")
    }

    /// Adds a new package with the given links and returns its package id
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Package name or link list is empty
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not a package id
    pub async fn add_package(
        &self,
        name: &str,
        links: &[String],
        destination: Destination,
    ) -> Result<u64, PyLoadError> {
        if name.is_empty() {
            return Err(InvalidInput("Package name cannot be empty".into()));
        }

        if links.is_empty() {
            return Err(InvalidInput("Package needs at least one link".into()));
        }

        let encode = |e: serde_json::Error| Parser {
            context: "Failed to encode package parameters".into(),
            source: Some(e),
        };
        let fields = vec![
            ("name", serde_json::to_string(name).map_err(encode)?),
            ("links", serde_json::to_string(links).map_err(encode)?),
            ("dest", serde_json::to_string(&destination).map_err(encode)?),
        ];

        debug!("Adding package {name} with {} links", links.len());

        let body = self.call(ApiRequest::form(Command::AddPackage, fields)).await?;
        parser::parse(&body, "Add package failed during parsing of request response")
    }

    /// Uploads a container file (e.g. `.dlc`) and adds its links to pyLoad
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File name or file data is empty
    /// - Network request fails
    /// - Authentication fails
    /// - Response is not valid JSON
    pub async fn upload_container(&self, filename: &str, data: &[u8]) -> Result<(), PyLoadError> {
        if filename.is_empty() {
            return Err(InvalidInput("File name cannot be empty".into()));
        }

        if data.is_empty() {
            return Err(InvalidInput("File data cannot be empty".into()));
        }

        debug!("Uploading container {filename}, size: {} bytes", data.len());

        let body = self
            .call(ApiRequest::upload(
                Command::UploadContainer,
                filename.to_string(),
                data.to_vec(),
            ))
            .await?;
        parser::expect_json(&body, "Upload container failed during parsing of request response")
    }

    /// Runs a command whose response only acknowledges the request
    async fn execute(&self, command: Command) -> Result<(), PyLoadError> {
        let body = self.call(ApiRequest::get(command)).await?;
        parser::expect_json(
            &body,
            &format!("Command {command} failed during parsing of request response"),
        )
    }

    /// Sends an authenticated request and returns the response body.
    ///
    /// When the server reports the session as invalid, the client logs in
    /// again once and repeats the request once. A second rejection is final.
    async fn call(&self, request: ApiRequest) -> Result<String, PyLoadError> {
        let ticket = self.session.ensure_authenticated(&self.transport).await?;
        let response = self.transport.send(&request, Some(&ticket.cookie)).await?;
        if !parser::is_unauthorized(response.status, &response.body) {
            return Self::accept(request.command, response);
        }

        let ticket = self.session.reauthenticate(&self.transport, &ticket).await?;
        let response = self.transport.send(&request, Some(&ticket.cookie)).await?;
        if parser::is_unauthorized(response.status, &response.body) {
            warn!("Command {} rejected again after logging in", request.command);
            self.session.invalidate(&ticket).await;
            return Err(InvalidAuth(
                "Request failed due to invalid or expired authentication cookie".into(),
            ));
        }

        Self::accept(request.command, response)
    }

    fn accept(command: Command, response: RawResponse) -> Result<String, PyLoadError> {
        let status = response.status;
        if !status.is_success() {
            return Err(CannotConnect {
                context: format!(
                    "Command {command} failed with status: {} ({})",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
                source: None,
            });
        }

        Ok(response.body)
    }
}

/// Builder for [`PyLoad`] client
#[derive(Default)]
pub struct PyLoadBuilder {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<u64>,
    client: Option<Client>,
}

impl PyLoadBuilder {
    /// Creates a builder from the `PYLOAD_URL`, `PYLOAD_USERNAME` and
    /// `PYLOAD_PASSWORD` environment variables, plus the optional
    /// `PYLOAD_TIMEOUT_MS`
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is unset or not unicode, or
    /// if `PYLOAD_TIMEOUT_MS` is not a number
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::default()
            .url(env::var("PYLOAD_URL")?)
            .username(env::var("PYLOAD_USERNAME")?)
            .password(env::var("PYLOAD_PASSWORD")?);

        if let Ok(timeout) = env::var("PYLOAD_TIMEOUT_MS") {
            let timeout = timeout.parse().map_err(|_| {
                Configuration(format!("PYLOAD_TIMEOUT_MS must be a number, got: {timeout}"))
            })?;
            builder = builder.timeout(timeout);
        }

        Ok(builder)
    }

    /// Sets the base URL of the pyLoad web interface
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the username
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the request timeout in milliseconds.
    /// Ignored when an HTTP client is supplied with [`Self::client`].
    #[must_use]
    pub fn timeout(mut self, timeout_millis: u64) -> Self {
        self.timeout = Some(timeout_millis);
        self
    }

    /// Uses an existing HTTP client instead of creating one
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the [`PyLoad`] client
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required fields (url, username, password) are not provided
    /// - URL doesn't start with "http://" or "https://"
    /// - Any field is empty
    pub fn build(self) -> Result<PyLoad, ConfigError> {
        let url = self
            .url
            .ok_or_else(|| Configuration("URL is required".into()))?;
        let username = self
            .username
            .ok_or_else(|| Configuration("Username is required".into()))?;
        let password = self
            .password
            .ok_or_else(|| Configuration("Password is required".into()))?;

        let client = self.client.unwrap_or_else(|| {
            PyLoad::create_client(self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS))
        });

        PyLoad::new(url, username, password, client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_fields() {
        let result = PyLoad::builder().username("u").password("p").build();
        assert!(matches!(result, Err(Configuration(msg)) if msg == "URL is required"));

        let result = PyLoad::builder().url("http://host:8000").password("p").build();
        assert!(matches!(result, Err(Configuration(msg)) if msg == "Username is required"));

        let result = PyLoad::builder().url("http://host:8000").username("u").build();
        assert!(matches!(result, Err(Configuration(msg)) if msg == "Password is required"));
    }

    #[test]
    fn test_builder_rejects_empty_credentials() {
        let result = PyLoad::builder()
            .url("http://host:8000")
            .username("")
            .password("p")
            .build();
        assert!(matches!(result, Err(Configuration(_))));

        let result = PyLoad::builder()
            .url("http://host:8000")
            .username("u")
            .password("")
            .build();
        assert!(matches!(result, Err(Configuration(_))));
    }

    #[test]
    fn test_builder_validates_url() {
        let result = PyLoad::builder()
            .url("host:8000")
            .username("u")
            .password("p")
            .build();
        assert!(matches!(result, Err(Configuration(_))));

        let pyload = PyLoad::builder()
            .url("http://host:8000/")
            .username("u")
            .password("p")
            .build()
            .unwrap();
        assert_eq!(pyload.url(), "http://host:8000");
    }

    #[test]
    fn test_error_messages() {
        let error = InvalidAuth("Invalid username or password".into());
        assert_eq!(
            error.to_string(),
            "Authentication error: Invalid username or password"
        );

        let error = CannotConnect {
            context: "Executing command statusServer failed".into(),
            source: None,
        };
        assert_eq!(
            error.to_string(),
            "Cannot connect to pyLoad: Executing command statusServer failed"
        );
    }
}
