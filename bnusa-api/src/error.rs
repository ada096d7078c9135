use anyhow::{anyhow, Context};
use serde_json::json;

use crate::CommentId;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Comment content is empty")]
    EmptyContent,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Comment not found {0}")]
    NotFound(CommentId),

    #[error("Request was not successful: {0}")]
    Unsuccessful(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Error::EmptyContent => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unsuccessful(_) => StatusCode::BAD_REQUEST,
            Error::Network(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whether this error was raised before reaching the backend
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::NotAuthenticated | Error::EmptyContent | Error::NullByteInString(_)
        )
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "success": false,
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "success": false,
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::NotAuthenticated => json!({
                "success": false,
                "message": "not authenticated",
                "type": "not-authenticated",
            }),
            Error::EmptyContent => json!({
                "success": false,
                "message": "comment content is empty",
                "type": "empty-content",
            }),
            Error::NullByteInString(s) => json!({
                "success": false,
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::NotFound(id) => json!({
                "success": false,
                "message": "comment not found",
                "type": "not-found",
                "id": id,
            }),
            Error::Unsuccessful(msg) => json!({
                "success": false,
                "message": msg,
            }),
            Error::Network(msg) => json!({
                "success": false,
                "message": msg,
                "type": "network",
            }),
        })
        .expect("serializing error")
    }

    /// Parses an error body
    ///
    /// Bodies without a `type` but with a `message` are the backend's plain
    /// `{ success: false, message }` answers.
    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        let typ = match data.get("type").and_then(|t| t.as_str()) {
            Some(typ) => typ,
            None if data.get("message").is_some() => return Ok(Error::Unsuccessful(message())),
            None => return Err(anyhow!("error has neither a type nor a message")),
        };
        Ok(match typ {
            "unknown" => Error::Unknown(message()),
            "permission-denied" => Error::PermissionDenied,
            "not-authenticated" => Error::NotAuthenticated,
            "empty-content" => Error::EmptyContent,
            "null-byte" => Error::NullByteInString(String::from(
                data.get("string")
                    .and_then(|s| s.as_str())
                    .ok_or_else(|| anyhow!("error is a null-byte-in-string without a string"))?,
            )),
            "not-found" => Error::NotFound(CommentId(String::from(
                data.get("id")
                    .and_then(|id| id.as_str())
                    .ok_or_else(|| anyhow!("error is a not-found without an id"))?,
            ))),
            "network" => Error::Network(message()),
            _ => return Err(anyhow!("error contents has unknown type")),
        })
    }

    /// Builds the error for a non-success HTTP answer
    pub fn from_response(status: http::StatusCode, body: &[u8]) -> Error {
        use http::StatusCode;
        match Error::parse(body) {
            Ok(Error::Unsuccessful(_)) if status == StatusCode::UNAUTHORIZED => {
                Error::NotAuthenticated
            }
            Ok(Error::Unsuccessful(_)) if status == StatusCode::FORBIDDEN => {
                Error::PermissionDenied
            }
            Ok(err) => err,
            Err(_) => match status {
                StatusCode::UNAUTHORIZED => Error::NotAuthenticated,
                StatusCode::FORBIDDEN => Error::PermissionDenied,
                _ => Error::Unknown(format!(
                    "{status}: {}",
                    String::from_utf8_lossy(body)
                )),
            },
        }
    }
}
