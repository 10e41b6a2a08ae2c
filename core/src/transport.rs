use crate::Result;
use bytes::Bytes;
use std::fmt::Debug;

/// HttpSend is the transport a client dispatches signed requests through.
///
/// Implementations own connection pooling, TLS and socket-level retries.
/// Failures to reach the server must surface as [`crate::ErrorKind::Transport`]
/// so callers can tell them apart from signing failures and retry with a
/// freshly signed request.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}
