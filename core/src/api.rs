use crate::{Context, Result, SigningMethod};
use std::fmt::Debug;

/// SigningCredential is the trait used by signer as the signing credential.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is valid.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(ctx) = self else {
            return false;
        };

        ctx.is_valid()
    }
}

/// ProvideCredential is the trait used by signer to load the credential.
///
/// Providers may reach out to the environment or a refreshing store, so
/// loading is async. `Ok(None)` means "nothing here", which lets chains
/// move on to the next provider.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this loader.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load signing credential from current env.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest is the trait used by signer to sign the request.
///
/// Signing is a pure computation over the request, the credential and the
/// signing time: it never blocks on I/O, so this trait is synchronous.
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this builder.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request in place.
    ///
    /// ## Credential
    ///
    /// Implementations must fail when `credential` is `None` instead of
    /// sending the request unsigned.
    ///
    /// ## Method
    ///
    /// [`SigningMethod::Header`] adds authorization headers;
    /// [`SigningMethod::Query`] produces a pre-signed URL valid for the
    /// given duration.
    fn sign_request(
        &self,
        req: &mut http::request::Parts,
        credential: Option<&Self::Credential>,
        method: SigningMethod,
    ) -> Result<()>;
}
