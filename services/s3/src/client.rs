use crate::constants::{AWS_URI_ENCODE_SET, CLOCK_SKEW_TOLERANCE, X_AMZ_CONTENT_SHA_256};
use crate::provide_credential::{
    EnvCredentialProvider, ProvideCredentialChain, RotatingCredentialProvider,
    StaticCredentialProvider,
};
use crate::region::{Endpoint, RegionConfig};
use crate::response::classify;
use crate::sign_request::RequestSigner;
use crate::{Config, Credential};
use bytes::Bytes;
use http::request::Parts;
use http::{header, HeaderValue, Method, Request, Response, Uri};
use log::{debug, warn};
use objsign_core::hash::hex_sha256;
use objsign_core::time::{now, DateTime};
use objsign_core::{Context, Error, ProvideCredential, Result, Signer, SigningMethod};
use percent_encoding::utf8_percent_encode;
use std::str::FromStr;
use std::time::Duration;

/// Location points at an object: an optional bucket and a path inside it.
///
/// Locations without a bucket live in the client's default bucket.
pub trait Location {
    /// Bucket holding the object, `None` for the default bucket.
    fn bucket(&self) -> Option<&str>;

    /// Path of the object inside the bucket, like `photos/cat.png`.
    fn path(&self) -> &str;
}

/// ObjectLocation is the plain [`Location`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    bucket: Option<String>,
    path: String,
}

impl ObjectLocation {
    /// Object in the default bucket.
    pub fn new(path: &str) -> Self {
        Self {
            bucket: None,
            path: path.to_string(),
        }
    }

    /// Object in `bucket`.
    pub fn in_bucket(bucket: &str, path: &str) -> Self {
        Self {
            bucket: Some(bucket.to_string()),
            path: path.to_string(),
        }
    }
}

impl Location for ObjectLocation {
    fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    fn path(&self) -> &str {
        &self.path
    }
}

/// Client turns object locations into signed requests and classifies what
/// the server answers.
///
/// Everything it needs is handed over at construction: the [`Context`]
/// carrying the http client and env, and the [`Config`]. Urls are built
/// path-style: `https://<host>/<bucket>/<path>`.
#[derive(Debug, Clone)]
pub struct Client {
    ctx: Context,
    signer: Signer<Credential>,
    rotating: RotatingCredentialProvider,
    region: String,
    regions: RegionConfig,
    endpoint: Endpoint,
    default_bucket: Option<String>,
    timeout: Option<Duration>,
}

impl Client {
    /// Create a client loading credentials from the config, then from env.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        let mut chain = ProvideCredentialChain::new();
        if let (Some(ak), Some(sk)) = (&config.access_key_id, &config.secret_access_key) {
            let mut provider = StaticCredentialProvider::new(ak, sk);
            if let Some(token) = &config.session_token {
                provider = provider.with_session_token(token);
            }
            chain = chain.push(provider);
        }
        chain = chain.push(EnvCredentialProvider::new());

        Self::with_credential_provider(ctx, config, chain)
    }

    /// Create a client loading credentials from `provider`.
    pub fn with_credential_provider(
        ctx: Context,
        config: Config,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Result<Self> {
        let regions = config.region_config()?;
        let region = config.region().to_string();
        // Fail on unknown regions now rather than on the first request.
        let endpoint = regions.resolve(&region)?;

        let rotating = RotatingCredentialProvider::default();
        let chain = ProvideCredentialChain::new()
            .push(rotating.clone())
            .push(provider);
        let signer = Signer::new(
            ctx.clone(),
            chain,
            RequestSigner::new(regions.clone(), &region),
        );

        debug!("s3 client created for region {region} at {}", endpoint.host());
        Ok(Self {
            ctx,
            signer,
            rotating,
            region,
            regions,
            endpoint,
            default_bucket: config.default_bucket.clone(),
            timeout: config.timeout,
        })
    }

    /// Region requests are signed for.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Endpoint requests are sent to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Bucket used by locations that don't name one.
    pub fn default_bucket(&self) -> Option<&str> {
        self.default_bucket.as_deref()
    }

    /// Sign later requests with `cred`, replacing whatever was loaded before.
    ///
    /// Requests being signed concurrently use either the old or the new
    /// credential as a whole.
    pub fn rotate_credential(&self, cred: Credential) -> Result<()> {
        self.rotating.rotate(cred)?;
        self.signer.invalidate_credential()
    }

    /// Url of a region, or of a bucket in it: `https://s3.amazonaws.com/demo/`.
    pub fn bucket_url(&self, region: Option<&str>, bucket: Option<&str>) -> Result<Uri> {
        let endpoint = match region {
            Some(region) => self.regions.resolve(region)?,
            None => self.endpoint.clone(),
        };

        let mut url = endpoint.base_url();
        if let Some(bucket) = bucket {
            push_bucket(&mut url, bucket)?;
        }
        Ok(Uri::from_str(&url)?)
    }

    /// Url of an object: `https://s3.amazonaws.com/demo/file.txt`.
    pub fn object_url(&self, location: &impl Location) -> Result<Uri> {
        let bucket = location
            .bucket()
            .or(self.default_bucket.as_deref())
            .ok_or_else(|| {
                Error::url_invalid(format!(
                    "object {:?} names no bucket and no default bucket is configured",
                    location.path()
                ))
            })?;

        let mut url = self.endpoint.base_url();
        push_bucket(&mut url, bucket)?;
        url.extend(utf8_percent_encode(
            location.path().trim_start_matches('/'),
            &AWS_URI_ENCODE_SET,
        ));
        Ok(Uri::from_str(&url)?)
    }

    /// Build an unsigned request for an object.
    ///
    /// `content-type` follows the file extension and `x-amz-content-sha256`
    /// carries the hash of `body`, so the payload is covered by the signature.
    pub fn request(
        &self,
        method: Method,
        location: &impl Location,
        body: Bytes,
    ) -> Result<Request<Bytes>> {
        let req = Request::builder()
            .method(method)
            .uri(self.object_url(location)?)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static(mime_type(location.path())),
            )
            .header(X_AMZ_CONTENT_SHA_256, hex_sha256(&body))
            .body(body)?;
        Ok(req)
    }

    /// Sign the request in place with the authorization header.
    pub async fn sign(&self, parts: &mut Parts) -> Result<()> {
        self.signer.sign(parts, SigningMethod::Header).await
    }

    /// Build a pre-signed url granting `method` on the object for `expires`.
    pub async fn presign(
        &self,
        method: Method,
        location: &impl Location,
        expires: Duration,
    ) -> Result<Uri> {
        let (mut parts, ()) = Request::builder()
            .method(method)
            .uri(self.object_url(location)?)
            .body(())?
            .into_parts();
        self.signer
            .sign(&mut parts, SigningMethod::Query(expires))
            .await?;
        Ok(parts.uri)
    }

    /// Sign and send the request, then classify the response.
    ///
    /// Every call signs again with the current time, so retrying a failed
    /// request through `send` never replays a stale signature.
    pub async fn send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let (mut parts, body) = req.into_parts();
        self.sign(&mut parts).await?;
        let req = Request::from_parts(parts, body);

        let resp = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.ctx.http_send(req))
                .await
                .map_err(|_| {
                    Error::cancelled(format!("request timed out after {timeout:?}"))
                })??,
            None => self.ctx.http_send(req).await?,
        };

        if let Some(skew) = resp
            .headers()
            .get(header::DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|date| clock_skew(date, now()))
        {
            if skew > CLOCK_SKEW_TOLERANCE {
                warn!("local clock is {skew:?} away from the server, requests will be rejected");
            }
        }

        classify(resp.status(), resp.body())?;
        Ok(resp)
    }
}

/// Distance between the server's `date` header and the local clock.
fn clock_skew(server_date: &str, local: DateTime) -> Option<Duration> {
    let server = chrono::DateTime::parse_from_rfc2822(server_date).ok()?;
    let delta = local - server.with_timezone(&chrono::Utc);
    if delta < chrono::TimeDelta::zero() {
        (-delta).to_std().ok()
    } else {
        delta.to_std().ok()
    }
}

fn push_bucket(url: &mut String, bucket: &str) -> Result<()> {
    let bucket = bucket.trim_matches('/');
    if bucket.is_empty() {
        return Err(Error::url_invalid("bucket name is empty"));
    }
    if bucket.contains('/') {
        return Err(Error::url_invalid(format!(
            "bucket name {bucket:?} must not contain '/'"
        )));
    }
    url.extend(utf8_percent_encode(bucket, &AWS_URI_ENCODE_SET));
    url.push('/');
    Ok(())
}

/// Content type of a file by its extension, `application/octet-stream` when unknown.
pub fn mime_type(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    let Some((_, ext)) = name.rsplit_once('.') else {
        return "application/octet-stream";
    };

    match ext.to_ascii_lowercase().as_str() {
        "txt" | "text" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "xml" => "application/xml",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use objsign_core::{ErrorKind, HttpSend, StaticEnv};
    use std::sync::{Arc, Mutex};
    use test_case::test_case;

    /// Answers every request with a fixed response and records what it got.
    #[derive(Debug, Clone)]
    struct MockHttpSend {
        status: http::StatusCode,
        body: &'static str,
        delay: Option<Duration>,
        seen: Arc<Mutex<Vec<Request<Bytes>>>>,
    }

    impl MockHttpSend {
        fn new(status: http::StatusCode, body: &'static str) -> Self {
            Self {
                status,
                body,
                delay: None,
                seen: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl HttpSend for MockHttpSend {
        async fn http_send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.seen.lock().unwrap().push(req);
            Ok(Response::builder()
                .status(self.status)
                .body(Bytes::from_static(self.body.as_bytes()))?)
        }
    }

    fn config() -> Config {
        Config::default()
            .with_credential("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
            .with_default_bucket("demo")
    }

    fn client(config: Config) -> Client {
        Client::new(Context::new(), config).unwrap()
    }

    #[test]
    fn test_object_url() {
        let client = client(config());
        assert_eq!(
            client
                .object_url(&ObjectLocation::new("file.txt"))
                .unwrap()
                .to_string(),
            "https://s3.amazonaws.com/demo/file.txt"
        );
        assert_eq!(
            client
                .object_url(&ObjectLocation::in_bucket("other", "/dir/my file+1.txt"))
                .unwrap()
                .to_string(),
            "https://s3.amazonaws.com/other/dir/my%20file%2B1.txt"
        );
    }

    #[test]
    fn test_object_url_without_bucket() {
        let client = client(Config::default().with_credential("ak", "sk"));
        let err = client
            .object_url(&ObjectLocation::new("file.txt"))
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::UrlInvalid);

        let err = client
            .object_url(&ObjectLocation::in_bucket("", "file.txt"))
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::UrlInvalid);
    }

    #[test]
    fn test_bucket_url() {
        let client = client(config());
        assert_eq!(
            client.bucket_url(None, None).unwrap().to_string(),
            "https://s3.amazonaws.com/"
        );
        assert_eq!(
            client
                .bucket_url(Some("eu-west-1"), Some("demo"))
                .unwrap()
                .to_string(),
            "https://s3.eu-west-1.amazonaws.com/demo/"
        );
        let err = client
            .bucket_url(Some("mars-north-1"), Some("demo"))
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::RegionUnknown);
    }

    #[test]
    fn test_custom_endpoint() {
        let client = client(
            config()
                .with_region("minio-local")
                .with_endpoint("http://127.0.0.1:9000"),
        );
        assert_eq!(client.region(), "minio-local");
        assert_eq!(
            client
                .object_url(&ObjectLocation::new("file.txt"))
                .unwrap()
                .to_string(),
            "http://127.0.0.1:9000/demo/file.txt"
        );
    }

    #[test]
    fn test_unknown_region_fails_fast() {
        let err = Client::new(Context::new(), config().with_region("mars-north-1"))
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::RegionUnknown);
    }

    #[test]
    fn test_clock_skew() {
        let local = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(
            clock_skew("Mon, 01 Jan 2024 00:20:00 GMT", local),
            Some(Duration::from_secs(20 * 60))
        );
        assert_eq!(
            clock_skew("Sun, 31 Dec 2023 23:59:30 GMT", local),
            Some(Duration::from_secs(30))
        );
        assert_eq!(clock_skew("yesterday", local), None);
    }

    #[test_case("file.txt" => "text/plain")]
    #[test_case("photos/CAT.PNG" => "image/png")]
    #[test_case("archive.tar.gz" => "application/gzip")]
    #[test_case("no-extension" => "application/octet-stream")]
    #[test_case("dir.d/no-extension" => "application/octet-stream")]
    #[test_case("data.unknown" => "application/octet-stream")]
    fn test_mime_type(path: &str) -> &'static str {
        mime_type(path)
    }

    #[test]
    fn test_request() {
        let client = client(config());
        let req = client
            .request(
                Method::PUT,
                &ObjectLocation::new("file.txt"),
                Bytes::from_static(b"hello"),
            )
            .unwrap();

        assert_eq!(req.uri().to_string(), "https://s3.amazonaws.com/demo/file.txt");
        assert_eq!(req.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(
            req.headers()[X_AMZ_CONTENT_SHA_256],
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_presign() -> Result<()> {
        let client = client(config());
        let uri = client
            .presign(
                Method::GET,
                &ObjectLocation::new("file.txt"),
                Duration::from_secs(3600),
            )
            .await?;

        let query = uri.query().unwrap_or_default();
        assert!(uri.to_string().starts_with("https://s3.amazonaws.com/demo/file.txt?"));
        assert!(query.contains("X-Amz-Expires=3600"));
        assert!(query.contains("X-Amz-Credential=AKIDEXAMPLE%2F"));
        assert!(query.contains("X-Amz-Signature="));

        let err = client
            .presign(
                Method::GET,
                &ObjectLocation::new("file.txt"),
                Duration::from_secs(7 * 24 * 3600 + 1),
            )
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::ExpiryInvalid);
        Ok(())
    }

    #[tokio::test]
    async fn test_send_success() -> Result<()> {
        let http = MockHttpSend::new(http::StatusCode::OK, "anything");
        let client = Client::new(Context::new().with_http_send(http.clone()), config())?;

        let req = client.request(Method::GET, &ObjectLocation::new("file.txt"), Bytes::new())?;
        let resp = client.send(req).await?;
        assert_eq!(resp.body().as_ref(), b"anything");

        let seen = http.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let authorization = seen[0].headers()[header::AUTHORIZATION].to_str().unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(authorization
            .contains("SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date,"));
        Ok(())
    }

    #[tokio::test]
    async fn test_send_error_response() -> Result<()> {
        let http = MockHttpSend::new(
            http::StatusCode::FORBIDDEN,
            r#"{"Code":"AccessDenied","Message":"Access Denied","RequestId":"abc"}"#,
        );
        let client = Client::new(Context::new().with_http_send(http), config())?;

        let req = client.request(Method::GET, &ObjectLocation::new("file.txt"), Bytes::new())?;
        let err = client.send(req).await.expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::ErrorResponse);
        Ok(())
    }

    #[tokio::test]
    async fn test_send_timeout() -> Result<()> {
        let mut http = MockHttpSend::new(http::StatusCode::OK, "");
        http.delay = Some(Duration::from_secs(5));
        let client = Client::new(
            Context::new().with_http_send(http),
            config().with_timeout(Duration::from_millis(10)),
        )?;

        let req = client.request(Method::GET, &ObjectLocation::new("file.txt"), Bytes::new())?;
        let err = client.send(req).await.expect_err("must time out");
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        Ok(())
    }

    #[tokio::test]
    async fn test_send_without_transport() -> Result<()> {
        let client = client(config());
        let req = client.request(Method::GET, &ObjectLocation::new("file.txt"), Bytes::new())?;
        let err = client.send(req).await.expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Transport);
        Ok(())
    }

    #[tokio::test]
    async fn test_credentials_from_env() -> Result<()> {
        let ctx = Context::new().with_env(StaticEnv::from_pairs([
            ("AWS_ACCESS_KEY_ID", "env_access_key"),
            ("AWS_SECRET_ACCESS_KEY", "env_secret_key"),
        ]));
        let client = Client::new(ctx, Config::default().with_default_bucket("demo"))?;

        let mut parts = client
            .request(Method::GET, &ObjectLocation::new("file.txt"), Bytes::new())?
            .into_parts()
            .0;
        client.sign(&mut parts).await?;
        assert!(parts.headers[header::AUTHORIZATION]
            .to_str()
            .unwrap()
            .contains("Credential=env_access_key/"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_credentials() -> Result<()> {
        let client = client(Config::default().with_default_bucket("demo"));
        let mut parts = client
            .request(Method::GET, &ObjectLocation::new("file.txt"), Bytes::new())?
            .into_parts()
            .0;
        let err = client.sign(&mut parts).await.expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::CredentialMissing);
        Ok(())
    }

    #[tokio::test]
    async fn test_rotate_credential() -> Result<()> {
        let client = client(config());
        let sign = || async {
            let mut parts = client
                .request(Method::GET, &ObjectLocation::new("file.txt"), Bytes::new())?
                .into_parts()
                .0;
            client.sign(&mut parts).await?;
            Ok::<_, Error>(parts.headers[header::AUTHORIZATION].to_str()?.to_string())
        };

        assert!(sign().await?.contains("Credential=AKIDEXAMPLE/"));
        client.rotate_credential(Credential::new("rotated_key", "rotated_secret"))?;
        assert!(sign().await?.contains("Credential=rotated_key/"));
        Ok(())
    }

    /// Takes its time before handing out a fixed credential.
    #[derive(Debug)]
    struct SlowCredentialProvider;

    #[async_trait]
    impl ProvideCredential for SlowCredentialProvider {
        type Credential = Credential;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(Some(Credential::new("old_key", "old_secret")))
        }
    }

    #[tokio::test]
    async fn test_rotate_credential_while_loading() -> Result<()> {
        let client = Client::with_credential_provider(
            Context::new(),
            Config::default().with_default_bucket("demo"),
            SlowCredentialProvider,
        )?;
        let authorization = |client: Client| async move {
            let mut parts = client
                .request(Method::GET, &ObjectLocation::new("file.txt"), Bytes::new())?
                .into_parts()
                .0;
            client.sign(&mut parts).await?;
            Ok::<_, Error>(parts.headers[header::AUTHORIZATION].to_str()?.to_string())
        };

        let in_flight = tokio::spawn(authorization(client.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.rotate_credential(Credential::new("new_key", "new_secret"))?;

        assert!(in_flight
            .await
            .expect("task must not panic")?
            .contains("Credential=old_key/"));
        for _ in 0..3 {
            assert!(authorization(client.clone())
                .await?
                .contains("Credential=new_key/"));
        }
        Ok(())
    }
}
