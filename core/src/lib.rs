//! Core components for signing object storage requests.
//!
//! This crate provides the foundational types and traits for the objsign workspace.
//! Service crates build on it to canonicalize and sign requests for a given provider.
//!
//! ## Overview
//!
//! - **Context**: holds the environment and the HTTP transport signed requests go through
//! - **Traits**: credential loading ([`ProvideCredential`]) and request signing ([`SignRequest`])
//! - **Signer**: the orchestrator that loads credentials and signs requests
//!
//! ## Example
//!
//! ```no_run
//! use objsign_core::{Context, ProvideCredential, Result, SignRequest, Signer, SigningCredential, SigningMethod};
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyLoader;
//!
//! #[async_trait]
//! impl ProvideCredential for MyLoader {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential { key: "my-access-key".to_string() }))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyBuilder;
//!
//! impl SignRequest for MyBuilder {
//!     type Credential = MyCredential;
//!
//!     fn sign_request(
//!         &self,
//!         req: &mut http::request::Parts,
//!         cred: Option<&Self::Credential>,
//!         _method: SigningMethod,
//!     ) -> Result<()> {
//!         let cred = cred.ok_or_else(|| objsign_core::Error::credential_missing("no key"))?;
//!         req.headers.insert("x-my-key", cred.key.parse()?);
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let signer = Signer::new(Context::new(), MyLoader, MyBuilder);
//!
//! let mut parts = http::Request::get("https://example.com")
//!     .body(())
//!     .unwrap()
//!     .into_parts()
//!     .0;
//! signer.sign(&mut parts, SigningMethod::Header).await?;
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::Context;
pub use context::NoopHttpSend;
mod transport;
pub use transport::HttpSend;
mod env;
pub use env::Env;
pub use env::NoopEnv;
pub use env::OsEnv;
pub use env::StaticEnv;

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod request;
pub use request::{SigningMethod, SigningRequest};
mod signer;
pub use signer::Signer;

mod error;
pub use error::{Error, ErrorKind, Result};
