use crate::canonical::canonicalize_request;
use crate::constants::{
    ALGORITHM, AWS_QUERY_ENCODE_SET, MAX_PRESIGN_EXPIRY, UNSIGNED_PAYLOAD, X_AMZ_ALGORITHM_QUERY,
    X_AMZ_CONTENT_SHA_256, X_AMZ_CREDENTIAL_QUERY, X_AMZ_DATE, X_AMZ_DATE_QUERY,
    X_AMZ_EXPIRES_QUERY, X_AMZ_SECURITY_TOKEN, X_AMZ_SECURITY_TOKEN_QUERY,
    X_AMZ_SIGNATURE_QUERY, X_AMZ_SIGNED_HEADERS_QUERY,
};
use crate::region::{Endpoint, RegionConfig};
use crate::signature::{string_to_sign, CredentialScope, SigningKeyCache};
use crate::Credential;
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use objsign_core::time::{format_date, format_iso8601, now, DateTime};
use objsign_core::utils::redact_query;
use objsign_core::{Error, Result, SignRequest, SigningMethod, SigningRequest};
use percent_encoding::utf8_percent_encode;
use std::time::Duration;

/// RequestSigner that implement AWS SigV4 for s3.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
/// - [Authenticating Requests: Using Query Parameters](https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-query-string-auth.html)
///
/// The signer holds no per-request state: every call canonicalizes the
/// request again with a fresh timestamp.
#[derive(Debug)]
pub struct RequestSigner {
    config: RegionConfig,
    region: String,
    service: Option<String>,

    time: Option<DateTime>,
    key_cache: SigningKeyCache,
}

impl RequestSigner {
    /// Create a new signer for `region`, resolved through `config`.
    pub fn new(config: RegionConfig, region: &str) -> Self {
        Self {
            config,
            region: region.to_string(),
            service: None,

            time: None,
            key_cache: SigningKeyCache::new(),
        }
    }

    /// Sign for another service than the one registered for the region.
    pub fn with_service(mut self, service: &str) -> Self {
        self.service = Some(service.to_string());
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Region this signer signs for.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Resolve the endpoint of the configured region.
    pub fn endpoint(&self) -> Result<Endpoint> {
        self.config.resolve(&self.region)
    }

    /// Sign the request in place.
    pub fn sign(&self, req: &mut Parts, cred: &Credential, method: SigningMethod) -> Result<()> {
        if !cred.has_key_pair() {
            return Err(Error::credential_missing(
                "credential has an empty access key or secret key",
            ));
        }
        if let SigningMethod::Query(expires) = method {
            check_expires(expires)?;
        }

        let endpoint = self.endpoint()?;
        let service = self
            .service
            .clone()
            .unwrap_or_else(|| endpoint.signing_service.clone());

        let now = self.time.unwrap_or_else(now);
        let timestamp = format_iso8601(now);
        let scope = CredentialScope::new(format_date(now), &endpoint.region, service);
        debug!("calculated scope: {scope}");

        let mut signed_req = SigningRequest::build(req)?;
        if signed_req.authority.is_none() {
            signed_req.scheme = endpoint.scheme.clone();
            signed_req.authority = Some(endpoint.authority.clone());
        }

        // canonicalize context
        strip_signature(&mut signed_req);
        canonicalize_header(&mut signed_req, cred, method, &timestamp)?;
        if let SigningMethod::Query(expires) = method {
            canonicalize_query(&mut signed_req, cred, expires, &scope, &timestamp);
        }

        let payload_hash = match signed_req.headers.get(X_AMZ_CONTENT_SHA_256) {
            Some(v) => v.to_str()?.to_string(),
            None => UNSIGNED_PAYLOAD.to_string(),
        };

        // build canonical request and string to sign.
        let creq = canonicalize_request(&signed_req, &payload_hash)?;
        debug!(
            "calculated canonical request hash {} over headers {}",
            creq.hashed(),
            creq.signed_headers()
        );
        debug!(
            "calculated string to sign: {}",
            string_to_sign(&creq, &scope, &timestamp)
        );

        let signature = self
            .key_cache
            .compute_signature(&creq, cred, &scope, &timestamp)?;

        match method {
            SigningMethod::Query(_) => {
                signed_req.query_push(X_AMZ_SIGNATURE_QUERY, signature);
                debug!(
                    "pre-signed query: {}",
                    redact_query(
                        &signed_req.query,
                        &[X_AMZ_SIGNATURE_QUERY, X_AMZ_SECURITY_TOKEN_QUERY]
                    )
                );
            }
            SigningMethod::Header => {
                let mut authorization = HeaderValue::from_str(&format!(
                    "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
                    cred.access_key_id,
                    creq.signed_headers(),
                ))?;
                authorization.set_sensitive(true);

                signed_req
                    .headers
                    .insert(header::AUTHORIZATION, authorization);
            }
        }

        encode_query(&mut signed_req);

        // Apply to the request.
        signed_req.apply(req)
    }
}

impl SignRequest for RequestSigner {
    type Credential = Credential;

    fn sign_request(
        &self,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        method: SigningMethod,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Err(Error::credential_missing(
                "refusing to send a request without credential",
            ));
        };

        self.sign(req, cred, method)
    }
}

fn check_expires(expires: Duration) -> Result<()> {
    if expires.as_secs() == 0 {
        return Err(Error::expiry_invalid(
            "pre-signed url must stay valid for at least one second",
        ));
    }
    if expires.subsec_nanos() != 0 {
        return Err(Error::expiry_invalid(format!(
            "pre-signed url expiry {expires:?} is not a whole number of seconds"
        )));
    }
    if expires > MAX_PRESIGN_EXPIRY {
        return Err(Error::expiry_invalid(format!(
            "pre-signed url can't stay valid for {}s, at most {}s is allowed",
            expires.as_secs(),
            MAX_PRESIGN_EXPIRY.as_secs()
        )));
    }
    Ok(())
}

/// Drop what an earlier signing left behind, so a retried request is signed
/// over exactly what it sends.
fn strip_signature(ctx: &mut SigningRequest) {
    ctx.headers.remove(header::AUTHORIZATION);
    ctx.headers.remove(X_AMZ_SECURITY_TOKEN);
    ctx.query.retain(|(k, _)| {
        ![
            X_AMZ_ALGORITHM_QUERY,
            X_AMZ_CREDENTIAL_QUERY,
            X_AMZ_DATE_QUERY,
            X_AMZ_EXPIRES_QUERY,
            X_AMZ_SIGNED_HEADERS_QUERY,
            X_AMZ_SECURITY_TOKEN_QUERY,
            X_AMZ_SIGNATURE_QUERY,
        ]
        .contains(&k.as_str())
    });
}

fn canonicalize_header(
    ctx: &mut SigningRequest,
    cred: &Credential,
    method: SigningMethod,
    timestamp: &str,
) -> Result<()> {
    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in ctx.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)
    }

    // Host always reflects where the request goes.
    let authority = ctx
        .authority
        .as_ref()
        .ok_or_else(|| Error::url_invalid("request has no host to sign"))?;
    ctx.headers
        .insert(header::HOST, HeaderValue::from_str(authority.as_str())?);

    match method {
        SigningMethod::Header => {
            ctx.headers
                .insert(X_AMZ_DATE, HeaderValue::from_str(timestamp)?);

            if ctx.headers.get(X_AMZ_CONTENT_SHA_256).is_none() {
                ctx.headers.insert(
                    X_AMZ_CONTENT_SHA_256,
                    HeaderValue::from_static(UNSIGNED_PAYLOAD),
                );
            }

            if let Some(token) = &cred.session_token {
                let mut value = HeaderValue::from_str(token)?;
                // Set token value sensitive to valid leaking.
                value.set_sensitive(true);

                ctx.headers.insert(X_AMZ_SECURITY_TOKEN, value);
            }
        }
        SigningMethod::Query(_) => {
            // The date travels in the query, a stale header would be signed too.
            ctx.headers.remove(X_AMZ_DATE);
        }
    }

    Ok(())
}

fn canonicalize_query(
    ctx: &mut SigningRequest,
    cred: &Credential,
    expires: Duration,
    scope: &CredentialScope,
    timestamp: &str,
) {
    ctx.query_push(X_AMZ_ALGORITHM_QUERY, ALGORITHM);
    ctx.query_push(
        X_AMZ_CREDENTIAL_QUERY,
        format!("{}/{scope}", cred.access_key_id),
    );
    ctx.query_push(X_AMZ_DATE_QUERY, timestamp);
    ctx.query_push(X_AMZ_EXPIRES_QUERY, expires.as_secs().to_string());
    let signed_headers = ctx.header_name_to_vec_sorted().join(";");
    ctx.query_push(X_AMZ_SIGNED_HEADERS_QUERY, signed_headers);

    if let Some(token) = &cred.session_token {
        ctx.query_push(X_AMZ_SECURITY_TOKEN_QUERY, token.as_str());
    }
}

/// Encode query pairs in canonical order, ready to be written back verbatim.
fn encode_query(ctx: &mut SigningRequest) {
    if ctx.query.is_empty() {
        return;
    }

    // Sort by param name
    ctx.query.sort();

    ctx.query = ctx
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();
}
