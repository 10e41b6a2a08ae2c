//! Print a pre-signed url for an object, then fetch it with a signed request.
//!
//! ```shell
//! AWS_REGION=eu-west-1 AWS_ACCESS_KEY_ID=... AWS_SECRET_ACCESS_KEY=... \
//!     cargo run --example presign -- my-bucket path/to/file.txt
//! ```

use anyhow::{bail, Result};
use bytes::Bytes;
use http::Method;
use objsign_core::{Context, OsEnv};
use objsign_http_send_reqwest::ReqwestHttpSend;
use objsign_s3::{Client, Config, ObjectLocation, ServiceError};
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = env_logger::try_init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [bucket, path] = args.as_slice() else {
        bail!("usage: presign <bucket> <path>");
    };

    let http = reqwest::Client::builder()
        .user_agent("objsign-example/0.1")
        .build()?;
    let ctx = Context::new()
        .with_env(OsEnv)
        .with_http_send(ReqwestHttpSend::new(http));
    let config = Config::default()
        .with_timeout(Duration::from_secs(30))
        .from_env(&ctx);
    let client = Client::new(ctx, config)?;

    let file = ObjectLocation::in_bucket(bucket, path);
    let url = client
        .presign(Method::GET, &file, Duration::from_secs(15 * 60))
        .await?;
    println!("pre-signed url, valid for 15 minutes:\n{url}\n");

    let req = client.request(Method::GET, &file, Bytes::new())?;
    let err = match client.send(req).await {
        Ok(resp) => {
            println!("fetched {} bytes", resp.body().len());
            return Ok(());
        }
        Err(err) => err,
    };

    if let Some(ServiceError::ErrorResponse { status, message }) =
        err.downcast_source::<ServiceError>()
    {
        println!("server refused with {status}: {} {}", message.code, message.message);
        return Ok(());
    }
    Err(err.into())
}
