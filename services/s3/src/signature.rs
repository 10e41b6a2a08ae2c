//! Signature computation: string to sign, key derivation and the final HMAC.
//!
//! Nothing in this module logs key material.

use std::fmt::{self, Debug, Display, Write};
use std::sync::Mutex;

use objsign_core::hash::{hex_hmac_sha256, hmac_sha256};
use objsign_core::time::{format_date, parse_iso8601};
use objsign_core::{Error, Result};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::canonical::CanonicalRequest;
use crate::constants::{ALGORITHM, SCOPE_TERMINATOR, SECRET_KEY_PREFIX};
use crate::Credential;

/// CredentialScope binds a signature to a date, region and service.
///
/// Renders as `20240101/us-east-1/s3/aws4_request`; the same value is used
/// for the string to sign and for key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialScope {
    /// Date as `YYYYMMDD`.
    pub date: String,
    /// Region identifier.
    pub region: String,
    /// Signing service name.
    pub service: String,
}

impl CredentialScope {
    /// Create a new scope.
    pub fn new(date: impl Into<String>, region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    /// Create the scope for a `YYYYMMDDTHHMMSSZ` timestamp.
    pub fn for_timestamp(timestamp: &str, region: &str, service: &str) -> Result<Self> {
        let time = parse_iso8601(timestamp)?;
        Ok(Self::new(format_date(time), region, service))
    }

    /// The fixed terminator of every scope.
    pub fn terminator(&self) -> &'static str {
        SCOPE_TERMINATOR
    }
}

impl Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.date, self.region, self.service, SCOPE_TERMINATOR
        )
    }
}

/// SigningKey is the derived `kSigning` key.
///
/// ```text
/// kSecret  = "AWS4" + secret
/// kDate    = HMAC(kSecret, date)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
///
/// Intermediate keys are wiped as soon as the next one is derived, and the
/// signing key itself is wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    key: Vec<u8>,
}

impl SigningKey {
    /// Derive the signing key of `scope` from the secret key.
    pub fn derive(secret_key: &str, scope: &CredentialScope) -> Result<Self> {
        if secret_key.is_empty() {
            return Err(Error::signing_failed("secret key is empty"));
        }

        let k_secret = Zeroizing::new(format!("{SECRET_KEY_PREFIX}{secret_key}"));
        let k_date = Zeroizing::new(hmac_sha256(k_secret.as_bytes(), scope.date.as_bytes()));
        let k_region = Zeroizing::new(hmac_sha256(&k_date, scope.region.as_bytes()));
        let k_service = Zeroizing::new(hmac_sha256(&k_region, scope.service.as_bytes()));
        let key = hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes());

        Ok(Self { key })
    }

    /// Hex encoded HMAC of `content` under this key.
    pub fn sign(&self, content: &str) -> String {
        hex_hmac_sha256(&self.key, content.as_bytes())
    }
}

impl Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(***)")
    }
}

/// Build the string to sign.
///
/// ```text
/// AWS4-HMAC-SHA256
/// 20220313T072004Z
/// 20220313/<region>/<service>/aws4_request
/// <hashed_canonical_request>
/// ```
pub fn string_to_sign(creq: &CanonicalRequest, scope: &CredentialScope, timestamp: &str) -> String {
    let mut f = String::with_capacity(160);
    // Writing into a String never fails.
    let _ = writeln!(f, "{ALGORITHM}");
    let _ = writeln!(f, "{timestamp}");
    let _ = writeln!(f, "{scope}");
    let _ = write!(f, "{}", creq.hashed());
    f
}

/// Compute the hex encoded signature of a canonical request.
///
/// `timestamp` is the request time as `YYYYMMDDTHHMMSSZ`, supplied by the
/// caller's clock; its date must be the scope's date.
pub fn compute_signature(
    creq: &CanonicalRequest,
    credential: &Credential,
    scope: &CredentialScope,
    timestamp: &str,
) -> Result<String> {
    let key = checked_signing_key(credential, scope, timestamp)?;
    Ok(key.sign(&string_to_sign(creq, scope, timestamp)))
}

fn checked_signing_key(
    credential: &Credential,
    scope: &CredentialScope,
    timestamp: &str,
) -> Result<SigningKey> {
    check_scope(scope, timestamp)?;
    SigningKey::derive(&credential.secret_access_key, scope)
}

fn check_scope(scope: &CredentialScope, timestamp: &str) -> Result<()> {
    let time = parse_iso8601(timestamp)?;
    let date = format_date(time);
    if date != scope.date {
        return Err(Error::signing_failed(format!(
            "scope date {} doesn't match timestamp {timestamp}",
            scope.date
        )));
    }
    if scope.region.is_empty() || scope.service.is_empty() {
        return Err(Error::signing_failed(
            "scope region and service must not be empty",
        ));
    }
    Ok(())
}

/// SigningKeyCache keeps the signing key of the last scope.
///
/// The key only depends on the secret and the scope, so it stays valid for
/// the whole day; caching it saves four HMAC rounds per request.
#[derive(Default)]
pub struct SigningKeyCache {
    entry: Mutex<Option<CachedKey>>,
}

struct CachedKey {
    access_key_id: Zeroizing<String>,
    secret_fingerprint: Zeroizing<String>,
    scope: CredentialScope,
    key: SigningKey,
}

impl Debug for SigningKeyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyCache").finish_non_exhaustive()
    }
}

impl SigningKeyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute a signature like [`compute_signature`], reusing the cached key
    /// when credential and scope are unchanged.
    pub fn compute_signature(
        &self,
        creq: &CanonicalRequest,
        credential: &Credential,
        scope: &CredentialScope,
        timestamp: &str,
    ) -> Result<String> {
        check_scope(scope, timestamp)?;
        let key = self.signing_key(credential, scope)?;
        Ok(key.sign(&string_to_sign(creq, scope, timestamp)))
    }

    fn signing_key(&self, credential: &Credential, scope: &CredentialScope) -> Result<SigningKey> {
        // A rotated secret under the same access key must not hit the cache,
        // so entries are keyed by a digest of the secret as well.
        let fingerprint = Zeroizing::new(hex_hmac_sha256(
            credential.secret_access_key.as_bytes(),
            credential.access_key_id.as_bytes(),
        ));

        let mut entry = self
            .entry
            .lock()
            .map_err(|_| Error::unexpected("signing key cache lock poisoned"))?;
        if let Some(cached) = entry.as_ref() {
            if cached.scope == *scope
                && cached.access_key_id.as_str() == credential.access_key_id
                && cached.secret_fingerprint == fingerprint
            {
                return Ok(cached.key.clone());
            }
        }

        let key = SigningKey::derive(&credential.secret_access_key, scope)?;
        *entry = Some(CachedKey {
            access_key_id: Zeroizing::new(credential.access_key_id.clone()),
            secret_fingerprint: fingerprint,
            scope: scope.clone(),
            key: key.clone(),
        });
        Ok(key)
    }
}
