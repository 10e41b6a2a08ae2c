use crate::{
    Context, Error, ProvideCredential, Result, SignRequest, SigningCredential, SigningMethod,
};
use log::debug;
use std::sync::{Arc, RwLock};

/// Signer is the main struct used to sign the request.
///
/// It is constructed once with its context, credential provider and request
/// signer, then shared (it's cheap to clone) with every call site. The last
/// loaded credential is kept as a snapshot: readers clone it under a read
/// lock, and only a reload takes the write lock to swap it as a whole.
///
/// Every [`Signer::invalidate_credential`] starts a new generation. A load
/// that began in an older generation is used for its own request but never
/// cached, so a slow load can't bring back a credential that was dropped
/// while it was running.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<RwLock<Snapshot<K>>>,
}

#[derive(Debug)]
struct Snapshot<K> {
    generation: u64,
    credential: Option<K>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            loader: Arc::new(loader),
            builder: Arc::new(builder),
            credential: Arc::new(RwLock::new(Snapshot {
                generation: 0,
                credential: None,
            })),
        }
    }

    /// Get the context of this signer.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Load a valid credential, reusing the cached snapshot when possible.
    async fn credential(&self) -> Result<K> {
        let (generation, cached) = {
            let snapshot = self
                .credential
                .read()
                .map_err(|_| Error::unexpected("credential lock poisoned"))?;
            (snapshot.generation, snapshot.credential.clone())
        };
        if let Some(cred) = cached.filter(|c| c.is_valid()) {
            return Ok(cred);
        }

        debug!("cached credential is absent or invalid, loading from provider");
        let loaded = self.loader.provide_credential(&self.ctx).await?;
        let cred = match loaded {
            Some(cred) if cred.is_valid() => cred,
            Some(_) => {
                return Err(Error::credential_missing(
                    "credential provider returned an empty or expired credential",
                ))
            }
            None => {
                return Err(Error::credential_missing(
                    "no credential provider yielded a key pair",
                ))
            }
        };

        let mut snapshot = self
            .credential
            .write()
            .map_err(|_| Error::unexpected("credential lock poisoned"))?;
        if snapshot.generation == generation {
            snapshot.credential = Some(cred.clone());
        } else {
            debug!("credential invalidated while loading, the loaded one is not cached");
        }
        Ok(cred)
    }

    /// Drop the cached credential so the next signing loads a fresh one.
    ///
    /// Call this after rotating the credential behind the provider.
    pub fn invalidate_credential(&self) -> Result<()> {
        let mut snapshot = self
            .credential
            .write()
            .map_err(|_| Error::unexpected("credential lock poisoned"))?;
        snapshot.generation = snapshot.generation.wrapping_add(1);
        snapshot.credential = None;
        debug!("cached credential invalidated");
        Ok(())
    }

    /// Signing request.
    pub async fn sign(&self, req: &mut http::request::Parts, method: SigningMethod) -> Result<()> {
        let cred = self.credential().await?;
        self.builder.sign_request(req, Some(&cred), method)
    }
}
