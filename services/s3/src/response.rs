//! Classification of service responses.

use bytes::Bytes;
use http::StatusCode;
use log::debug;
use objsign_core::{Error, Result};
use serde::Deserialize;

/// ErrorMessage is the structured error the service returns on failure.
///
/// S3 sends it as XML:
///
/// ```xml
/// <Error>
///   <Code>NoSuchKey</Code>
///   <Message>The resource you requested does not exist</Message>
///   <Resource>/demo/file.txt</Resource>
///   <RequestId>4442587FB7D0A2F9</RequestId>
/// </Error>
/// ```
///
/// Some compatible stores answer with the same fields as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorMessage {
    /// Machine readable error code like `AccessDenied`.
    pub code: String,
    /// Human readable description.
    #[serde(default)]
    pub message: String,
    /// Bucket or object the error is about.
    #[serde(default)]
    pub resource: Option<String>,
    /// Id of the failed request, for support cases.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ErrorMessage {
    /// Decode an error body, JSON when it looks like an object and XML otherwise.
    pub fn decode(body: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(body).ok()?.trim();
        if text.is_empty() {
            return None;
        }

        let decoded = if text.starts_with('{') {
            serde_json::from_str::<ErrorMessage>(text).ok()
        } else {
            quick_xml::de::from_str::<ErrorMessage>(text).ok()
        };
        decoded.filter(|m| !m.code.is_empty())
    }
}

/// ServiceError carries what the server said about a failed request.
///
/// It's attached as the source of the [`Error`] returned by [`classify`];
/// get it back with `Error::downcast_source::<ServiceError>()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The server sent a decodable error body.
    #[error("server responded {status} {}: {}", .message.code, .message.message)]
    ErrorResponse {
        /// Response status.
        status: StatusCode,
        /// Decoded error body.
        message: ErrorMessage,
    },
    /// The server sent an error status with a body we can't decode.
    #[error("server responded {status} with a body of {} bytes that can't be decoded", .body.len())]
    MalformedResponse {
        /// Response status.
        status: StatusCode,
        /// Raw response body.
        body: Bytes,
    },
}

impl ServiceError {
    /// Status of the failed response.
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::ErrorResponse { status, .. } => *status,
            ServiceError::MalformedResponse { status, .. } => *status,
        }
    }
}

/// Classify a response.
///
/// `200 OK` and `204 No Content` are success whatever the body holds. Any
/// other status is an error: [`ErrorKind::ErrorResponse`] when the body
/// decodes into an [`ErrorMessage`], [`ErrorKind::MalformedResponse`]
/// otherwise.
///
/// [`ErrorKind::ErrorResponse`]: objsign_core::ErrorKind::ErrorResponse
/// [`ErrorKind::MalformedResponse`]: objsign_core::ErrorKind::MalformedResponse
pub fn classify(status: StatusCode, body: &Bytes) -> Result<()> {
    if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
        return Ok(());
    }

    match ErrorMessage::decode(body) {
        Some(message) => {
            debug!(
                "server responded {status} with code {} for request {:?}",
                message.code, message.request_id
            );
            let err = ServiceError::ErrorResponse { status, message };
            Err(Error::error_response(err.to_string()).with_source(err))
        }
        None => {
            debug!("server responded {status} with an undecodable body");
            let err = ServiceError::MalformedResponse {
                status,
                body: body.clone(),
            };
            Err(Error::malformed_response(err.to_string()).with_source(err))
        }
    }
}
