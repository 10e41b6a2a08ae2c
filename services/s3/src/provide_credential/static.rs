// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::Credential;
use async_trait::async_trait;
use objsign_core::{Context, ProvideCredential, Result};
use std::fmt::{Debug, Formatter};
use zeroize::Zeroizing;

/// StaticCredentialProvider provides a fixed key pair, typically from configuration.
pub struct StaticCredentialProvider {
    access_key_id: String,
    secret_access_key: Zeroizing<String>,
    session_token: Option<Zeroizing<String>>,
}

impl Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentialProvider")
            .field(
                "access_key_id",
                &objsign_core::utils::Redact::from(&self.access_key_id),
            )
            .finish_non_exhaustive()
    }
}

impl StaticCredentialProvider {
    /// Create a new StaticCredentialProvider with access key ID and secret access key.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: Zeroizing::new(secret_access_key.to_string()),
            session_token: None,
        }
    }

    /// Set the session token.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.session_token = Some(Zeroizing::new(token.to_string()));
        self
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        // An empty pair is "not configured", never an empty-string key.
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Ok(None);
        }

        let mut cred = Credential::new(
            self.access_key_id.as_str(),
            self.secret_access_key.as_str(),
        );
        if let Some(token) = &self.session_token {
            cred = cred.with_session_token(token.as_str());
        }
        Ok(Some(cred))
    }
}
