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

use crate::constants::*;
use crate::region::{Region, RegionConfig};
use objsign_core::utils::Redact;
use objsign_core::{Context, Result};
use std::fmt::{Debug, Formatter};
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Config for the s3 [`Client`](crate::Client).
///
/// Fields left as `None` fall back to their defaults: region `us-east-1`,
/// the well-known host of the region, and credentials from the environment.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Config {
    /// `region` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_REGION`], then [`AWS_DEFAULT_REGION`]
    pub region: Option<String>,
    /// `endpoint` overrides the host of every region, will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_ENDPOINT_URL_S3`], then [`AWS_ENDPOINT_URL`]
    pub endpoint: Option<String>,
    /// `access_key_id` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_ACCESS_KEY_ID`]
    pub access_key_id: Option<String>,
    /// `secret_access_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_SECRET_ACCESS_KEY`]
    pub secret_access_key: Option<String>,
    /// `session_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`AWS_SESSION_TOKEN`]
    pub session_token: Option<String>,
    /// Bucket used when a location doesn't name one.
    pub default_bucket: Option<String>,
    /// Give up on requests that take longer than this.
    #[zeroize(skip)]
    pub timeout: Option<Duration>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("default_bucket", &self.default_bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Load config from env, keeping the fields already set.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let envs = ctx.env_vars();
        let get = |key: &str| envs.get(key).filter(|v| !v.is_empty()).cloned();

        if self.region.is_none() {
            self.region = get(AWS_REGION).or_else(|| get(AWS_DEFAULT_REGION));
        }
        if self.endpoint.is_none() {
            self.endpoint = get(AWS_ENDPOINT_URL_S3).or_else(|| get(AWS_ENDPOINT_URL));
        }
        if self.access_key_id.is_none() {
            self.access_key_id = get(AWS_ACCESS_KEY_ID);
        }
        if self.secret_access_key.is_none() {
            self.secret_access_key = get(AWS_SECRET_ACCESS_KEY);
        }
        if self.session_token.is_none() {
            self.session_token = get(AWS_SESSION_TOKEN);
        }

        self
    }

    /// Set the region.
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Set a custom endpoint like `http://127.0.0.1:9000`.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    /// Set a static key pair.
    pub fn with_credential(mut self, access_key_id: &str, secret_access_key: &str) -> Self {
        self.access_key_id = Some(access_key_id.to_string());
        self.secret_access_key = Some(secret_access_key.to_string());
        self
    }

    /// Set the session token going with the static key pair.
    pub fn with_session_token(mut self, token: &str) -> Self {
        self.session_token = Some(token.to_string());
        self
    }

    /// Set the default bucket.
    pub fn with_default_bucket(mut self, bucket: &str) -> Self {
        self.default_bucket = Some(bucket.to_string());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Region to sign for, `us-east-1` when unset.
    pub fn region(&self) -> &str {
        self.region
            .as_deref()
            .unwrap_or_else(|| Region::UsEast1.identifier())
    }

    /// Build the region table, applying the custom endpoint if any.
    pub fn region_config(&self) -> Result<RegionConfig> {
        let config = RegionConfig::new();
        match self.endpoint.as_deref() {
            Some(endpoint) => config.with_endpoint(endpoint),
            None => Ok(config),
        }
    }
}
