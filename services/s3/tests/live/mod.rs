//! Tests against a real S3 or S3-compatible server.
//!
//! Set `OBJSIGN_S3_TEST=on` together with `OBJSIGN_S3_BUCKET` and the usual
//! `AWS_*` variables (region, endpoint, key pair) to run them.

use bytes::Bytes;
use http::{Method, StatusCode};
use log::{debug, warn};
use objsign_core::{Context, ErrorKind, OsEnv, Result};
use objsign_http_send_reqwest::ReqwestHttpSend;
use objsign_s3::{Client, Config, ObjectLocation, ServiceError};
use std::env;
use std::time::Duration;

fn init_client() -> Option<Client> {
    let _ = env_logger::builder().is_test(true).try_init();

    if env::var("OBJSIGN_S3_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let ctx = Context::new()
        .with_env(OsEnv)
        .with_http_send(ReqwestHttpSend::default());
    let bucket = env::var("OBJSIGN_S3_BUCKET").expect("env OBJSIGN_S3_BUCKET must set");
    let config = Config::default()
        .with_default_bucket(&bucket)
        .with_timeout(Duration::from_secs(30))
        .from_env(&ctx);

    Some(Client::new(ctx, config).expect("client must be valid"))
}

#[tokio::test]
async fn test_put_get_object() -> Result<()> {
    let Some(client) = init_client() else {
        warn!("OBJSIGN_S3_TEST is not set, skipped");
        return Ok(());
    };

    let file = ObjectLocation::new("objsign/put get test.txt");
    let req = client.request(Method::PUT, &file, Bytes::from_static(b"Hello, World!"))?;
    client.send(req).await?;

    let req = client.request(Method::GET, &file, Bytes::new())?;
    let resp = client.send(req).await?;
    debug!("got response: {resp:?}");
    assert_eq!(resp.body().as_ref(), b"Hello, World!");

    let req = client.request(Method::DELETE, &file, Bytes::new())?;
    client.send(req).await?;
    Ok(())
}

#[tokio::test]
async fn test_get_missing_object() -> Result<()> {
    let Some(client) = init_client() else {
        warn!("OBJSIGN_S3_TEST is not set, skipped");
        return Ok(());
    };

    let file = ObjectLocation::new("objsign/not_exist_file");
    let req = client.request(Method::GET, &file, Bytes::new())?;
    let err = client.send(req).await.expect_err("object must not exist");

    assert_eq!(err.kind(), ErrorKind::ErrorResponse);
    let Some(ServiceError::ErrorResponse { status, message }) =
        err.downcast_source::<ServiceError>()
    else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(*status, StatusCode::NOT_FOUND);
    assert_eq!(message.code, "NoSuchKey");
    Ok(())
}

#[tokio::test]
async fn test_presigned_get() -> Result<()> {
    let Some(client) = init_client() else {
        warn!("OBJSIGN_S3_TEST is not set, skipped");
        return Ok(());
    };

    let url = client
        .presign(
            Method::GET,
            &ObjectLocation::new("objsign/not_exist_file"),
            Duration::from_secs(3600),
        )
        .await?;
    debug!("presigned url: {url}");

    let resp = reqwest::get(url.to_string())
        .await
        .expect("request must succeed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}
