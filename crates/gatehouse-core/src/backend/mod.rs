//! Account, session and storage operations of the remote backend.
//!
//! The auth controller only talks to these traits. [`AppwriteClient`] speaks
//! HTTP to an Appwrite-compatible server; `FakeBackend` keeps everything in
//! memory for tests.

use std::fmt;
use std::future::Future;

use gatehouse_types::{OAuthProvider, Permission, Preferences, Session, SessionUser, StoredFile};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::media::SelectedFile;

mod appwrite;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use appwrite::AppwriteClient;

/// Categories of backend errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    /// Non-success HTTP status (4xx, 5xx)
    HttpStatus,
    /// Request exceeded the configured timeout
    Timeout,
    /// Could not reach the server
    Connect,
    /// Response body didn't match the expected shape
    Parse,
    /// Error reported by the backend outside an HTTP status
    Api,
    /// Local settings missing for the requested operation
    Config,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendErrorKind::HttpStatus => write!(f, "http_status"),
            BackendErrorKind::Timeout => write!(f, "timeout"),
            BackendErrorKind::Connect => write!(f, "connect"),
            BackendErrorKind::Parse => write!(f, "parse"),
            BackendErrorKind::Api => write!(f, "api"),
            BackendErrorKind::Config => write!(f, "config"),
        }
    }
}

/// Structured error from the backend boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    /// One-line summary for logs
    pub message: String,
    /// Message the backend wants shown to the user, if it sent one
    pub backend_message: Option<String>,
    /// HTTP status or backend error code
    pub code: Option<u16>,
    /// Backend error type, e.g. `user_already_exists`
    pub error_type: Option<String>,
    /// Raw body when it couldn't be interpreted
    pub details: Option<String>,
}

/// Error body returned by Appwrite-style backends.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            backend_message: None,
            code: None,
            error_type: None,
            details: None,
        }
    }

    /// Builds an error from a non-success status and its body.
    pub fn http_status(status: u16, body: &str) -> Self {
        let mut error = Self::new(BackendErrorKind::HttpStatus, format!("HTTP {status}"));
        error.code = Some(status);

        if body.trim().is_empty() {
            return error;
        }

        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => {
                if let Some(msg) = parsed.message.filter(|m| !m.trim().is_empty()) {
                    error.message = format!("HTTP {status}: {msg}");
                    error.backend_message = Some(msg);
                }
                if let Some(code) = parsed.code.as_ref().and_then(Value::as_u64) {
                    error.code = u16::try_from(code).ok().or(error.code);
                }
                error.error_type = parsed.error_type;
            }
            Err(_) => error.details = Some(body.to_string()),
        }
        error
    }

    /// An error the backend itself would have returned, with a user-facing message.
    pub fn api(status: u16, error_type: &str, message: &str) -> Self {
        Self {
            kind: BackendErrorKind::Api,
            message: format!("{error_type}: {message}"),
            backend_message: Some(message.to_string()),
            code: Some(status),
            error_type: Some(error_type.to_string()),
            details: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Parse, message)
    }

    /// Missing local settings. The message is shown to the user as-is.
    pub fn config(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            backend_message: Some(message.clone()),
            ..Self::new(BackendErrorKind::Config, message)
        }
    }

    /// Message to show the user, when there is one worth showing.
    ///
    /// Transport failures return None so callers fall back to their own copy.
    pub fn user_message(&self) -> Option<&str> {
        self.backend_message.as_deref()
    }

    /// True when the backend rejected the call because no one is signed in.
    pub fn is_unauthorized(&self) -> bool {
        self.code == Some(401)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BackendError {}

/// Result type for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Maps a transport failure to a backend error.
pub(crate) fn classify_reqwest_error(e: &reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        BackendError::new(BackendErrorKind::Connect, format!("Connection failed: {e}"))
    } else if e.is_decode() {
        BackendError::parse(format!("Failed to decode response: {e}"))
    } else {
        BackendError::new(BackendErrorKind::Connect, format!("Request failed: {e}"))
    }
}

/// Fields for a new account.
#[derive(Debug, Clone, Copy)]
pub struct NewAccount<'a> {
    pub user_id: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

/// File to create in a bucket.
#[derive(Debug, Clone, Copy)]
pub struct NewFile<'a> {
    pub bucket_id: &'a str,
    pub file_id: &'a str,
    pub file: &'a SelectedFile,
    pub permissions: &'a [Permission],
}

/// Account and session operations.
pub trait AccountService: Send + Sync {
    fn create_account(
        &self,
        account: NewAccount<'_>,
    ) -> impl Future<Output = BackendResult<SessionUser>> + Send;

    fn create_session(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = BackendResult<Session>> + Send;

    fn current_user(&self) -> impl Future<Output = BackendResult<SessionUser>> + Send;

    fn delete_session(&self) -> impl Future<Output = BackendResult<()>> + Send;

    fn update_preferences(
        &self,
        prefs: &Preferences,
    ) -> impl Future<Output = BackendResult<SessionUser>> + Send;

    /// URL that starts the provider's consent flow. Opening it is the caller's job.
    fn oauth_url(
        &self,
        provider: OAuthProvider,
        success_url: &str,
        failure_url: &str,
    ) -> BackendResult<String>;
}

/// Object storage operations.
pub trait StorageService: Send + Sync {
    fn create_file(&self, file: NewFile<'_>)
    -> impl Future<Output = BackendResult<StoredFile>> + Send;

    /// Public view URL for a stored file.
    fn file_view_url(&self, bucket_id: &str, file_id: &str) -> BackendResult<String>;
}

/// Everything the auth controller needs from the backend.
pub trait Backend: AccountService + StorageService {}

impl<T: AccountService + StorageService> Backend for T {}
