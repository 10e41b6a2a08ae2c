use std::mem;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};
use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::Uri;

/// Signing context for request.
///
/// Built from `http::request::Parts` by taking the uri and headers out of it,
/// and written back with [`SigningRequest::apply`] once signed so the
/// transmitted request is exactly the signed one.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority, `None` for origin-form uris like `/bucket/key`.
    pub authority: Option<Authority>,
    /// HTTP path, still percent-encoded as sent.
    pub path: String,
    /// HTTP query parameters, percent-decoded.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTPS),
            authority: uri.authority,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    ///
    /// Query pairs are written as they are: callers encode them first.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let authority = self.authority.take().ok_or_else(|| {
            Error::url_invalid("request without authority can't be sent after signing")
        })?;
        let query_size = self.query_size();

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(authority);
            uri_parts.path_and_query = {
                let paq = if self.query.is_empty() {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + 1);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len() + 2)
            .sum::<usize>()
    }

    /// Push a new query pair into query list.
    #[inline]
    pub fn query_push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Normalize header value: trim surrounding whitespace and collapse
    /// inner runs of spaces into one.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();
        if !bs.starts_with(b" ")
            && !bs.ends_with(b" ")
            && !bs.starts_with(b"\t")
            && !bs.ends_with(b"\t")
            && !bs.windows(2).any(|w| w == b"  ")
        {
            return;
        }

        let mut normalized = Vec::with_capacity(bs.len());
        for b in bs.iter().copied() {
            let b = if b == b'\t' { b' ' } else { b };
            if b == b' ' && (normalized.is_empty() || normalized.last() == Some(&b' ')) {
                continue;
            }
            normalized.push(b);
        }
        if normalized.last() == Some(&b' ') {
            normalized.pop();
        }

        let sensitive = v.is_sensitive();
        // Only spaces were dropped from a valid value, so it stays valid.
        if let Ok(mut nv) = HeaderValue::from_bytes(&normalized) {
            nv.set_sensitive(sensitive);
            *v = nv;
        }
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}

/// SigningMethod is the method that used in signing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SigningMethod {
    /// Signing with header.
    Header,
    /// Signing with query, the url stays valid for the given duration.
    Query(Duration),
}
