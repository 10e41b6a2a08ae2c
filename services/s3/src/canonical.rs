//! Canonical request construction.
//!
//! - [Create a canonical request](https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html#create-canonical-request)

use std::collections::BTreeMap;
use std::fmt::{self, Display, Write};

use http::header::HeaderName;
use http::{HeaderMap, HeaderValue, Method};
use objsign_core::hash::hex_sha256;
use objsign_core::{Error, Result, SigningRequest};
use percent_encoding::{percent_decode, utf8_percent_encode};

use crate::constants::AWS_QUERY_ENCODE_SET;

/// CanonicalRequest is the normalized form of a request that gets signed.
///
/// It's built fresh for every signature: the timestamp and payload hash make
/// it unique per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// Upper-case HTTP method.
    pub method: String,
    /// URI-encoded absolute path.
    pub canonical_uri: String,
    /// Sorted, URI-encoded query string.
    pub canonical_query: String,
    /// Lower-cased header names with normalized values, sorted by name.
    pub canonical_headers: Vec<(String, String)>,
    /// Payload hash: hex SHA-256 of the body, or a sentinel.
    pub payload_hash: String,
}

impl CanonicalRequest {
    /// The `;` separated list of signed header names.
    pub fn signed_headers(&self) -> String {
        self.canonical_headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }

    /// The canonical header block, one `name:value\n` line per header.
    pub fn canonical_header_block(&self) -> String {
        let mut s = String::with_capacity(128);
        for (k, v) in &self.canonical_headers {
            s.push_str(k);
            s.push(':');
            s.push_str(v);
            s.push('\n');
        }
        s
    }

    /// Hex encoded SHA-256 of the canonical request text.
    pub fn hashed(&self) -> String {
        hex_sha256(self.to_string().as_bytes())
    }
}

impl Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.canonical_uri)?;
        writeln!(f, "{}", self.canonical_query)?;
        f.write_str(&self.canonical_header_block())?;
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers())?;
        f.write_str(&self.payload_hash)
    }
}

/// Build the canonical request from its raw parts.
///
/// - `path` is the request path as sent, possibly percent-encoded.
/// - `query` holds decoded key/value pairs.
/// - `headers` are the headers to sign; repeated names are joined with `,`
///   in input order.
/// - `payload_hash` is decided by the caller: a hex SHA-256 of the body,
///   `UNSIGNED-PAYLOAD` or a streaming sentinel.
pub fn canonicalize(
    method: &str,
    path: &str,
    query: &[(String, String)],
    headers: &[(String, String)],
    payload_hash: &str,
) -> Result<CanonicalRequest> {
    let mut checked = Vec::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            Error::canonicalization_invalid(format!("header name {name:?} is not allowed"))
                .with_source(e)
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            Error::canonicalization_invalid(format!("value of header {name} is not allowed"))
                .with_source(e)
        })?;
        checked.push((name, value));
    }

    build(
        method,
        path,
        query,
        checked.iter().map(|(k, v)| (k, v)),
        payload_hash,
    )
}

/// Build the canonical request of a [`SigningRequest`], signing all its headers.
pub fn canonicalize_request(req: &SigningRequest, payload_hash: &str) -> Result<CanonicalRequest> {
    canonicalize_header_map(
        req.method.as_str(),
        &req.path,
        &req.query,
        &req.headers,
        payload_hash,
    )
}

/// Build the canonical request from an `http::HeaderMap`.
pub fn canonicalize_header_map(
    method: &str,
    path: &str,
    query: &[(String, String)],
    headers: &HeaderMap,
    payload_hash: &str,
) -> Result<CanonicalRequest> {
    build(method, path, query, headers.iter(), payload_hash)
}

fn build<'a>(
    method: &str,
    path: &str,
    query: &[(String, String)],
    headers: impl Iterator<Item = (&'a HeaderName, &'a HeaderValue)>,
    payload_hash: &str,
) -> Result<CanonicalRequest> {
    if method.is_empty() {
        return Err(Error::canonicalization_invalid("http method is empty"));
    }
    let method = Method::from_bytes(method.as_bytes()).map_err(|e| {
        Error::canonicalization_invalid(format!("http method {method:?} is invalid")).with_source(e)
    })?;

    Ok(CanonicalRequest {
        method: method.as_str().to_string(),
        canonical_uri: canonical_uri(path)?,
        canonical_query: canonical_query(query),
        canonical_headers: canonical_headers(headers)?,
        payload_hash: check_payload_hash(payload_hash)?,
    })
}

/// URI-encode an absolute path segment by segment.
///
/// Each segment is decoded first so already-encoded octets are not encoded
/// twice; an encoded `/` (`%2F`) stays encoded because it's part of a segment.
pub fn canonical_uri(path: &str) -> Result<String> {
    if path.is_empty() {
        return Ok("/".to_string());
    }
    if !path.starts_with('/') {
        return Err(Error::canonicalization_invalid(format!(
            "path {path:?} is not absolute"
        )));
    }
    check_percent_escapes(path)?;

    let mut s = String::with_capacity(path.len() + 16);
    for (idx, segment) in path.split('/').enumerate() {
        if idx > 0 {
            s.push('/');
        }
        let decoded = percent_decode(segment.as_bytes())
            .decode_utf8()
            .map_err(|e| {
                Error::canonicalization_invalid(format!(
                    "path {path:?} does not decode to valid utf-8"
                ))
                .with_source(e)
            })?;
        s.extend(percent_encoding::percent_encode(
            decoded.as_bytes(),
            &AWS_QUERY_ENCODE_SET,
        ));
    }
    Ok(s)
}

fn check_percent_escapes(path: &str) -> Result<()> {
    let bs = path.as_bytes();
    for (i, b) in bs.iter().enumerate() {
        if *b != b'%' {
            continue;
        }
        let valid = bs
            .get(i + 1..i + 3)
            .map(|hex| hex.iter().all(u8::is_ascii_hexdigit))
            .unwrap_or(false);
        if !valid {
            return Err(Error::canonicalization_invalid(format!(
                "path {path:?} has an incomplete percent escape at {i}"
            )));
        }
    }
    Ok(())
}

/// URI-encode every key and value, then sort by key and by value for
/// duplicate keys. Empty values render as `key=`.
pub fn canonical_query(query: &[(String, String)]) -> String {
    let mut encoded = query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect::<Vec<_>>();
    encoded.sort();

    let mut s = String::with_capacity(encoded.iter().map(|(k, v)| k.len() + v.len() + 2).sum());
    for (idx, (k, v)) in encoded.iter().enumerate() {
        if idx > 0 {
            s.push('&');
        }
        // Writing into a String never fails.
        let _ = write!(s, "{k}={v}");
    }
    s
}

fn canonical_headers<'a>(
    headers: impl Iterator<Item = (&'a HeaderName, &'a HeaderValue)>,
) -> Result<Vec<(String, String)>> {
    // BTreeMap keeps names sorted; values of a repeated name keep input order.
    let mut merged: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        let mut value = value.clone();
        SigningRequest::header_value_normalize(&mut value);
        let value = value.to_str().map_err(|e| {
            Error::canonicalization_invalid(format!("value of header {name} is not visible ascii"))
                .with_source(e)
        })?;
        merged
            .entry(name.as_str().to_string())
            .or_default()
            .push(value.to_string());
    }

    if !merged.contains_key(http::header::HOST.as_str()) {
        return Err(Error::canonicalization_invalid(
            "host header must be present and signed",
        ));
    }

    Ok(merged
        .into_iter()
        .map(|(k, vs)| (k, vs.join(",")))
        .collect())
}

fn check_payload_hash(payload_hash: &str) -> Result<String> {
    let is_hex_digest = payload_hash.len() == 64
        && payload_hash
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    let is_sentinel = !payload_hash.is_empty()
        && payload_hash
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-');

    if is_hex_digest || is_sentinel {
        Ok(payload_hash.to_string())
    } else {
        Err(Error::canonicalization_invalid(format!(
            "payload hash {payload_hash:?} is neither a hex sha256 nor a sentinel"
        )))
    }
}
