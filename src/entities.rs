use serde::Deserialize;
use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;

/// General status information of the pyLoad server
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct StatusServerResponse {
    /// Whether the download queue is paused
    pub pause: bool,
    /// Number of active downloads
    pub active: u32,
    /// Number of downloads waiting in the queue
    pub queue: u32,
    /// Current download speed in bytes per second
    pub speed: f64,
    /// Total number of downloads
    #[serde(default)]
    pub total: Option<u32>,
    /// Whether the server will start downloading queued files.
    /// Always the opposite of [`Self::pause`] when reported.
    #[serde(default)]
    pub download: Option<bool>,
    /// Whether auto-reconnect is enabled
    #[serde(default)]
    pub reconnect: Option<bool>,
    /// Whether a captcha request is waiting for the user
    #[serde(default)]
    pub captcha: Option<bool>,
}

/// Login response data
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub authenticated: bool,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: i64,
    #[serde(default)]
    pub perms: i64,
    #[serde(default)]
    pub template: String,
    /// Whether the session cookie outlives the browser session
    #[serde(rename = "_permanent", default)]
    pub permanent: bool,
    #[serde(rename = "_flashes", default)]
    pub flashes: Vec<Value>,
}

/// Version of the remote pyLoad service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Version string as reported by the server, e.g. `0.5.0b3.dev85`
    pub version: String,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionInfo {
    /// Splits a raw version string into its numeric components.
    ///
    /// Components that are missing or do not start with a digit count as `0`,
    /// so pre-release suffixes like `0.5.0b3` still yield `0.5.0`.
    #[must_use]
    pub fn parse(version: impl Into<String>) -> Self {
        let version = version.into();
        let mut components = version
            .trim_start_matches(['v', 'V'])
            .split('.')
            .map(leading_number);

        let major = components.next().flatten().unwrap_or_default();
        let minor = components.next().flatten().unwrap_or_default();
        let patch = components.next().flatten().unwrap_or_default();

        Self {
            version,
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version)
    }
}

fn leading_number(part: &str) -> Option<u32> {
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    part[..end].parse().ok()
}

/// Remote endpoints of the pyLoad API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Login,
    Status,
    Pause,
    Unpause,
    TogglePause,
    AbortAll,
    RestartFailed,
    ToggleReconnect,
    DeleteFinished,
    Restart,
    Version,
    FreeSpace,
    AddPackage,
    UploadContainer,
}

impl Command {
    /// Endpoint name below `/api/`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Login => "login",
            Command::Status => "statusServer",
            Command::Pause => "pauseServer",
            Command::Unpause => "unpauseServer",
            Command::TogglePause => "togglePause",
            Command::AbortAll => "stopAllDownloads",
            Command::RestartFailed => "restartFailed",
            Command::ToggleReconnect => "toggleReconnect",
            Command::DeleteFinished => "deleteFinished",
            Command::Restart => "restart",
            Command::Version => "getServerVersion",
            Command::FreeSpace => "freeSpace",
            Command::AddPackage => "addPackage",
            Command::UploadContainer => "uploadContainer",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a new package is placed
#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Destination {
    Collector = 0,
    #[default]
    Queue = 1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let version = VersionInfo::parse("0.5.0b3.dev85");
        assert_eq!((version.major, version.minor, version.patch), (0, 5, 0));
        assert_eq!(version.to_string(), "0.5.0b3.dev85");

        let version = VersionInfo::parse("v1.2");
        assert_eq!((version.major, version.minor, version.patch), (1, 2, 0));

        let version = VersionInfo::parse("unknown");
        assert_eq!((version.major, version.minor, version.patch), (0, 0, 0));
    }

    #[test]
    fn test_status_optional_fields() {
        let status: StatusServerResponse =
            serde_json::from_str(r#"{"pause":true,"active":0,"queue":1,"speed":0}"#).unwrap();
        assert!(status.pause);
        assert_eq!(status.total, None);
        assert_eq!(status.captcha, None);
    }

    #[test]
    fn test_destination_repr() {
        assert_eq!(serde_json::to_string(&Destination::Collector).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Destination::Queue).unwrap(), "1");
    }
}
