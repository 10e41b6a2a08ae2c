use crate::Credential;
use async_trait::async_trait;
use log::debug;
use objsign_core::{Context, Error, ProvideCredential, Result};
use std::sync::{Arc, RwLock};

/// RotatingCredentialProvider serves credentials that are replaced from the
/// outside, for example by a task refreshing temporary credentials.
///
/// The current credential is an immutable `Arc` snapshot. [`Self::rotate`]
/// swaps the whole snapshot under the write lock, so a concurrent signer
/// either sees the old pair or the new one, never a mix of both.
///
/// Cloning the provider shares the snapshot: keep one clone for the
/// refresher and hand the other to the signer.
#[derive(Debug, Clone, Default)]
pub struct RotatingCredentialProvider {
    current: Arc<RwLock<Option<Arc<Credential>>>>,
}

impl RotatingCredentialProvider {
    /// Create a provider with an initial credential.
    pub fn new(cred: Credential) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(Arc::new(cred)))),
        }
    }

    /// Replace the current credential.
    pub fn rotate(&self, cred: Credential) -> Result<()> {
        let next = Arc::new(cred);
        let mut current = self
            .current
            .write()
            .map_err(|_| Error::unexpected("credential lock poisoned"))?;
        *current = Some(next);
        debug!("credential rotated");
        Ok(())
    }

    /// Drop the current credential, later loads yield nothing until the next rotation.
    pub fn clear(&self) -> Result<()> {
        *self
            .current
            .write()
            .map_err(|_| Error::unexpected("credential lock poisoned"))? = None;
        Ok(())
    }

    /// Get the current snapshot.
    pub fn snapshot(&self) -> Result<Option<Arc<Credential>>> {
        Ok(self
            .current
            .read()
            .map_err(|_| Error::unexpected("credential lock poisoned"))?
            .clone())
    }
}

#[async_trait]
impl ProvideCredential for RotatingCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(self
            .snapshot()?
            .filter(|cred| cred.has_key_pair())
            .map(|cred| cred.as_ref().clone()))
    }
}
