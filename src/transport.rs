use crate::client::PyLoadError;
use crate::client::PyLoadError::CannotConnect;
use crate::entities::Command;
use log::debug;
use reqwest::cookie::Cookie;
use reqwest::header::COOKIE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::{Duration, SystemTime};

/// Body of a request, kept in a form that can be sent more than once
#[derive(Debug, Clone)]
pub(crate) enum Payload {
    /// GET without parameters
    Empty,
    /// POST with url-encoded form fields
    Form(Vec<(&'static str, String)>),
    /// POST with a multipart file upload
    Upload { filename: String, data: Vec<u8> },
}

/// A single call to a pyLoad endpoint
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    pub command: Command,
    pub payload: Payload,
}

impl ApiRequest {
    pub fn get(command: Command) -> Self {
        Self {
            command,
            payload: Payload::Empty,
        }
    }

    pub fn form(command: Command, fields: Vec<(&'static str, String)>) -> Self {
        Self {
            command,
            payload: Payload::Form(fields),
        }
    }

    pub fn upload(command: Command, filename: String, data: Vec<u8>) -> Self {
        Self {
            command,
            payload: Payload::Upload { filename, data },
        }
    }
}

/// Response as received from the server, before any parsing
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    /// `name=value` pairs from the `Set-Cookie` headers
    pub cookies: Vec<String>,
    pub body: String,
}

impl RawResponse {
    /// Joins the received cookies into a `Cookie` request header value
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            None
        } else {
            Some(self.cookies.join("; "))
        }
    }
}

/// Thin wrapper around a caller-owned [`Client`]
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: Client,
    base_url: String,
}

impl Transport {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, command: Command) -> String {
        format!("{}/api/{}", self.base_url, command)
    }

    fn build(&self, request: &ApiRequest) -> RequestBuilder {
        let url = self.endpoint(request.command);
        match &request.payload {
            Payload::Empty => self.client.get(url),
            Payload::Form(fields) => self.client.post(url).form(fields),
            Payload::Upload { filename, data } => {
                let part = Part::bytes(data.clone()).file_name(filename.clone());
                let form = Form::new()
                    .text("filename", filename.clone())
                    .part("data", part);
                self.client.post(url).multipart(form)
            }
        }
    }

    /// Sends the request, attaching the session cookie when one is given.
    ///
    /// Every failure to reach the server or to read its answer becomes
    /// [`PyLoadError::CannotConnect`]; HTTP status codes are left to the caller.
    pub async fn send(
        &self,
        request: &ApiRequest,
        cookie: Option<&str>,
    ) -> Result<RawResponse, PyLoadError> {
        let mut builder = self.build(request);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }

        debug!("Sending request for command {}", request.command);

        let response = builder.send().await.map_err(|e| CannotConnect {
            context: format!("Executing command {} failed", request.command),
            source: Some(e),
        })?;

        let status = response.status();
        debug!(
            "Response from {} [{}]",
            response.url().path(),
            status.as_u16()
        );

        let now = SystemTime::now();
        let cookies = response
            .cookies()
            .filter(|cookie| !is_expired(cookie, now))
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect();

        let body = response.text().await.map_err(|e| CannotConnect {
            context: format!("Reading response of command {} failed", request.command),
            source: Some(e),
        })?;

        Ok(RawResponse {
            status,
            cookies,
            body,
        })
    }
}

/// Whether the server asked to delete this cookie
fn is_expired(cookie: &Cookie<'_>, now: SystemTime) -> bool {
    cookie.max_age() == Some(Duration::ZERO) || cookie.expires().is_some_and(|at| at <= now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let transport = Transport::new(Client::new(), "http://host:8000".into());
        assert_eq!(
            transport.endpoint(Command::Status),
            "http://host:8000/api/statusServer"
        );
        assert_eq!(
            transport.endpoint(Command::FreeSpace),
            "http://host:8000/api/freeSpace"
        );
    }

    #[test]
    fn test_cookie_header() {
        let response = RawResponse {
            status: StatusCode::OK,
            cookies: vec!["sid=abc".into(), "lang=en".into()],
            body: String::new(),
        };
        assert_eq!(
            response.cookie_header().as_deref(),
            Some("sid=abc; lang=en")
        );

        let response = RawResponse {
            status: StatusCode::OK,
            cookies: Vec::new(),
            body: String::new(),
        };
        assert_eq!(response.cookie_header(), None);
    }
}
