//! [`HttpSend`] implementation backed by [`reqwest`].
//!
//! ```no_run
//! use objsign_core::Context;
//! use objsign_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::default());
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use log::debug;
use objsign_core::{Error, HttpSend, Result};
use reqwest::{Client, Request};

/// ReqwestHttpSend sends requests with a shared `reqwest::Client`.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Map a reqwest failure into our error taxonomy.
///
/// Timeouts are reported as cancelled so callers can tell a request that
/// never finished from one the server rejected.
fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::cancelled("request timed out").with_source(err)
    } else if err.is_builder() {
        Error::url_invalid("request can't be converted for sending").with_source(err)
    } else {
        Error::transport("failed to send request").with_source(err)
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        debug!("sending {} {}", req.method(), req.uri().path());
        let req = Request::try_from(req).map_err(map_reqwest_error)?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(map_reqwest_error)?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(map_reqwest_error)?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
