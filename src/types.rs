//! Core types for the Convore client.

use crate::error::Error;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Account credentials used for Basic authentication.
///
/// Immutable once built; a client never changes the credentials it was
/// created with.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `Basic <base64(username:password)>`
    pub fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }

    pub(crate) fn header_value(&self) -> Result<HeaderValue, Error> {
        let mut value = HeaderValue::from_str(&self.basic_auth())
            .map_err(|_| Error::Config("credentials produce an invalid header".to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Live stream position.
///
/// Cursors are opaque: they are the `_id` of the last message delivered,
/// echoed back so the server resumes right after it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(id: impl Into<String>) -> Self {
        Cursor(id.into())
    }

    /// Read a cursor out of a message `_id`, which the server sends either
    /// as a string or as a number.
    pub fn from_id(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Cursor(s.clone())),
            Value::Number(n) => Some(Cursor(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Cursor {
    fn from(s: String) -> Self {
        Cursor(s)
    }
}

impl From<&str> for Cursor {
    fn from(s: &str) -> Self {
        Cursor(s.to_string())
    }
}

/// Structured error payload handed back for rejected credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            code: 401,
            message: "Unauthorized".to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Result of a request once redirects have been absorbed.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// 200 body, parsed as JSON, or the raw text as a JSON string when it
    /// was not JSON.
    Success(Value),
    /// 401 from the server.
    Unauthorized(ApiError),
}

impl Reply {
    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Success(_))
    }

    /// The success body, turning a 401 into [`Error::Unauthorized`].
    pub fn into_result(self) -> Result<Value, Error> {
        match self {
            Reply::Success(value) => Ok(value),
            Reply::Unauthorized(err) => Err(Error::Unauthorized(err)),
        }
    }

    /// Deserialize the success body into `T`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, Error> {
        Ok(serde_json::from_value(self.into_result()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_auth() {
        let creds = Credentials::new("alice", "s3cret");
        // base64("alice:s3cret")
        assert_eq!(creds.basic_auth(), "Basic YWxpY2U6czNjcmV0");
        assert!(creds.header_value().unwrap().is_sensitive());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("alice", "s3cret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_cursor_from_id() {
        assert_eq!(Cursor::from_id(&json!("9")), Some(Cursor::new("9")));
        assert_eq!(Cursor::from_id(&json!(42)), Some(Cursor::new("42")));
        assert_eq!(Cursor::from_id(&json!("")), None);
        assert_eq!(Cursor::from_id(&json!(null)), None);
    }

    #[test]
    fn test_reply_into_result() {
        let reply = Reply::Success(json!({"a": 1}));
        assert_eq!(reply.into_result().unwrap(), json!({"a": 1}));

        let reply = Reply::Unauthorized(ApiError::unauthorized());
        assert!(reply.into_result().unwrap_err().is_auth_error());
    }

    #[test]
    fn test_api_error_serializes() {
        let value = serde_json::to_value(ApiError::unauthorized()).unwrap();
        assert_eq!(value, json!({"code": 401, "message": "Unauthorized"}));
    }
}
