//! Signing and sending requests to S3 and S3-compatible object storage.
//!
//! Requests are authenticated with [AWS Signature Version 4](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html),
//! either in the `authorization` header or as a pre-signed url.
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::Method;
//! use objsign_core::{Context, OsEnv, Result};
//! use objsign_s3::{Client, Config, ObjectLocation};
//! use std::time::Duration;
//!
//! # async fn example(ctx: Context) -> Result<()> {
//! let ctx = ctx.with_env(OsEnv);
//! let config = Config::default()
//!     .with_default_bucket("demo")
//!     .from_env(&ctx);
//! let client = Client::new(ctx, config)?;
//!
//! let file = ObjectLocation::new("file.txt");
//! let req = client.request(Method::GET, &file, Bytes::new())?;
//! let resp = client.send(req).await?;
//! println!("got {} bytes", resp.body().len());
//!
//! let url = client
//!     .presign(Method::GET, &file, Duration::from_secs(3600))
//!     .await?;
//! println!("share {url}");
//! # Ok(())
//! # }
//! ```
//!
//! The building blocks are public too: [`canonical`] turns a request into
//! its canonical form, [`signature`] derives keys and signatures, and
//! [`RequestSigner`] applies both to an `http::request::Parts`.

#![warn(missing_docs)]

mod constants;
pub use constants::CLOCK_SKEW_TOLERANCE;
pub use constants::MAX_PRESIGN_EXPIRY;
pub use constants::STREAMING_PAYLOAD;
pub use constants::UNSIGNED_PAYLOAD;

pub mod canonical;
pub mod signature;

mod client;
pub use client::mime_type;
pub use client::Client;
pub use client::Location;
pub use client::ObjectLocation;

mod config;
pub use config::Config;

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::*;

mod region;
pub use region::Endpoint;
pub use region::Region;
pub use region::RegionConfig;

mod response;
pub use response::classify;
pub use response::ErrorMessage;
pub use response::ServiceError;

mod sign_request;
pub use sign_request::RequestSigner;
