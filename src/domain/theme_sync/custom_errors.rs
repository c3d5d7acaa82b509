use std::error::{self, Error};
use std::fmt;
use std::path::PathBuf;

/// Errors produced by a theme synchronization job body.
/// Every variant is recovered at the worker boundary and only ever surfaces in logs.
#[derive(Debug)]
pub enum SyncError {
    /// HTTP 403
    AccessDenied,
    /// HTTP 401
    TokenRejected,
    UnexpectedStatus(u16),
    Request(reqwest::Error),
    Decode(String),
    Io { path: PathBuf, source: std::io::Error },
    InvalidFileName(String),
    Commit(String),
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyncError::AccessDenied => write!(f, "Access Denied. You need an access token"),
            SyncError::TokenRejected => {
                write!(f, "Access Denied. Your access token is expired or invalid")
            }
            SyncError::UnexpectedStatus(status) => {
                write!(f, "Theme API answered with unexpected status {}", status)
            }
            SyncError::Request(e) => write!(f, "Theme request failed: {}", e),
            SyncError::Decode(message) => write!(f, "Could not decode theme: {}", message),
            SyncError::Io { path, source } => {
                write!(f, "Filesystem error on {}: {}", path.display(), source)
            }
            SyncError::InvalidFileName(name) => {
                write!(f, "Refusing to write file with unsafe name {:?}", name)
            }
            SyncError::Commit(message) => write!(f, "Could not commit snapshot: {}", message),
        }
    }
}

impl error::Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SyncError::Request(e) => Some(e),
            SyncError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> SyncError {
        if err.is_decode() {
            return SyncError::Decode(err.to_string());
        }
        SyncError::Request(err)
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> SyncError {
        SyncError::Decode(err.to_string())
    }
}

/// Errors of the concurrency gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    InvalidCapacity(usize),
    Closed,
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GateError::InvalidCapacity(capacity) => write!(
                f,
                "Concurrency gate capacity must be at least 1 and fit a semaphore, got {}",
                capacity
            ),
            GateError::Closed => write!(f, "Concurrency gate is closed"),
        }
    }
}

impl error::Error for GateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

/// Errors raised while turning a feed frame into a change event
#[derive(Debug)]
pub enum EventDecodeError {
    Malformed(serde_json::Error),
    MissingField(&'static str),
    InvalidTenant(String),
}

impl fmt::Display for EventDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventDecodeError::Malformed(e) => write!(f, "Malformed event frame: {}", e),
            EventDecodeError::MissingField(field) => {
                write!(f, "Event frame is missing required field '{}'", field)
            }
            EventDecodeError::InvalidTenant(tenant) => {
                write!(f, "Event names an unusable tenant {:?}", tenant)
            }
        }
    }
}

impl error::Error for EventDecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EventDecodeError::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EventDecodeError {
    fn from(err: serde_json::Error) -> EventDecodeError {
        EventDecodeError::Malformed(err)
    }
}

/// Startup configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingAccessToken,
    InvalidConcurrency { flag: &'static str, value: usize },
    InvalidUrl { flag: &'static str, source: url::ParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::MissingAccessToken => {
                write!(f, "Please set the BOOTIC_ACCESS_TOKEN env variable")
            }
            ConfigError::InvalidConcurrency { flag, value } => {
                write!(f, "--{} must be a positive integer, got {}", flag, value)
            }
            ConfigError::InvalidUrl { flag, source } => {
                write!(f, "--{} is not a valid url: {}", flag, source)
            }
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::InvalidUrl { source, .. } => Some(source),
            _ => None,
        }
    }
}
