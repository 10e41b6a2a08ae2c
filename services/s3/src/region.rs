use crate::constants::S3_SERVICE;
use http::uri::{Authority, Scheme};
use http::Uri;
use log::debug;
use objsign_core::{Error, Result};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Well-known regions of the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// US East (N. Virginia)
    UsEast1,
    /// US East (Ohio)
    UsEast2,
    /// US West (N. California)
    UsWest1,
    /// US West (Oregon)
    UsWest2,
    /// Canada (Central)
    CaCentral1,
    /// EU (Ireland)
    EuWest1,
    /// EU (London)
    EuWest2,
    /// EU (Paris)
    EuWest3,
    /// EU (Frankfurt)
    EuCentral1,
    /// EU (Stockholm)
    EuNorth1,
    /// Asia Pacific (Mumbai)
    ApSouth1,
    /// Asia Pacific (Singapore)
    ApSoutheast1,
    /// Asia Pacific (Sydney)
    ApSoutheast2,
    /// Asia Pacific (Tokyo)
    ApNortheast1,
    /// Asia Pacific (Seoul)
    ApNortheast2,
    /// Asia Pacific (Osaka)
    ApNortheast3,
    /// South America (São Paulo)
    SaEast1,
}

impl Region {
    /// All well-known regions.
    pub const ALL: [Region; 17] = [
        Region::UsEast1,
        Region::UsEast2,
        Region::UsWest1,
        Region::UsWest2,
        Region::CaCentral1,
        Region::EuWest1,
        Region::EuWest2,
        Region::EuWest3,
        Region::EuCentral1,
        Region::EuNorth1,
        Region::ApSouth1,
        Region::ApSoutheast1,
        Region::ApSoutheast2,
        Region::ApNortheast1,
        Region::ApNortheast2,
        Region::ApNortheast3,
        Region::SaEast1,
    ];

    /// The region identifier used in credential scopes, like `eu-west-1`.
    pub fn identifier(&self) -> &'static str {
        match self {
            Region::UsEast1 => "us-east-1",
            Region::UsEast2 => "us-east-2",
            Region::UsWest1 => "us-west-1",
            Region::UsWest2 => "us-west-2",
            Region::CaCentral1 => "ca-central-1",
            Region::EuWest1 => "eu-west-1",
            Region::EuWest2 => "eu-west-2",
            Region::EuWest3 => "eu-west-3",
            Region::EuCentral1 => "eu-central-1",
            Region::EuNorth1 => "eu-north-1",
            Region::ApSouth1 => "ap-south-1",
            Region::ApSoutheast1 => "ap-southeast-1",
            Region::ApSoutheast2 => "ap-southeast-2",
            Region::ApNortheast1 => "ap-northeast-1",
            Region::ApNortheast2 => "ap-northeast-2",
            Region::ApNortheast3 => "ap-northeast-3",
            Region::SaEast1 => "sa-east-1",
        }
    }

    /// Host serving this region.
    ///
    /// `us-east-1` is served by the global `s3.amazonaws.com` host.
    pub fn host(&self) -> &'static str {
        match self {
            Region::UsEast1 => "s3.amazonaws.com",
            Region::UsEast2 => "s3.us-east-2.amazonaws.com",
            Region::UsWest1 => "s3.us-west-1.amazonaws.com",
            Region::UsWest2 => "s3.us-west-2.amazonaws.com",
            Region::CaCentral1 => "s3.ca-central-1.amazonaws.com",
            Region::EuWest1 => "s3.eu-west-1.amazonaws.com",
            Region::EuWest2 => "s3.eu-west-2.amazonaws.com",
            Region::EuWest3 => "s3.eu-west-3.amazonaws.com",
            Region::EuCentral1 => "s3.eu-central-1.amazonaws.com",
            Region::EuNorth1 => "s3.eu-north-1.amazonaws.com",
            Region::ApSouth1 => "s3.ap-south-1.amazonaws.com",
            Region::ApSoutheast1 => "s3.ap-southeast-1.amazonaws.com",
            Region::ApSoutheast2 => "s3.ap-southeast-2.amazonaws.com",
            Region::ApNortheast1 => "s3.ap-northeast-1.amazonaws.com",
            Region::ApNortheast2 => "s3.ap-northeast-2.amazonaws.com",
            Region::ApNortheast3 => "s3.ap-northeast-3.amazonaws.com",
            Region::SaEast1 => "s3.sa-east-1.amazonaws.com",
        }
    }

    /// Name of the service in the credential scope.
    pub fn signing_service(&self) -> &'static str {
        S3_SERVICE
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Region::ALL
            .into_iter()
            .find(|r| r.identifier() == s)
            .ok_or_else(|| Error::region_unknown(format!("region {s:?} is not a well-known region")))
    }
}

/// Endpoint is the result of resolving a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Region identifier used in the credential scope.
    pub region: String,
    /// Scheme requests are sent with.
    pub scheme: Scheme,
    /// Host, with port for custom endpoints.
    pub authority: Authority,
    /// Service name used in the credential scope.
    pub signing_service: String,
}

impl Endpoint {
    /// Host (and port if any) of this endpoint.
    pub fn host(&self) -> &str {
        self.authority.as_str()
    }

    /// Base url like `https://s3.amazonaws.com/`.
    pub fn base_url(&self) -> String {
        format!("{}://{}/", self.scheme, self.authority)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RegionEntry {
    scheme: Scheme,
    authority: Authority,
    signing_service: String,
}

/// RegionConfig maps region identifiers to endpoints.
///
/// It is a plain lookup table: built once, then only read. A custom endpoint
/// overrides the host of every region, which is how S3-compatible stores
/// (MinIO, Ceph, ...) are reached while keeping their own region names.
#[derive(Debug, Clone)]
pub struct RegionConfig {
    regions: HashMap<String, RegionEntry>,
    endpoint: Option<(Scheme, Authority)>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionConfig {
    /// Create a config with all well-known regions registered.
    pub fn new() -> Self {
        let regions = Region::ALL
            .into_iter()
            .map(|r| {
                let authority = Authority::from_static(r.host());
                (
                    r.identifier().to_string(),
                    RegionEntry {
                        scheme: Scheme::HTTPS,
                        authority,
                        signing_service: r.signing_service().to_string(),
                    },
                )
            })
            .collect();

        Self {
            regions,
            endpoint: None,
        }
    }

    /// Create a config with no region registered.
    pub fn empty() -> Self {
        Self {
            regions: HashMap::new(),
            endpoint: None,
        }
    }

    /// Register (or replace) a region served by `endpoint`.
    ///
    /// `endpoint` is either a bare host like `storage.example.com:9000` or a
    /// url like `http://storage.example.com:9000`.
    pub fn with_region(
        mut self,
        identifier: &str,
        endpoint: &str,
        signing_service: &str,
    ) -> Result<Self> {
        if identifier.is_empty() {
            return Err(Error::config_invalid("region identifier must not be empty"));
        }
        if signing_service.is_empty() {
            return Err(Error::config_invalid("signing service must not be empty"));
        }
        let (scheme, authority) = parse_endpoint(endpoint)?;
        self.regions.insert(
            identifier.to_string(),
            RegionEntry {
                scheme,
                authority,
                signing_service: signing_service.to_string(),
            },
        );
        Ok(self)
    }

    /// Send every region to this endpoint instead of its registered host.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.endpoint = Some(parse_endpoint(endpoint)?);
        Ok(self)
    }

    /// The custom endpoint override, if any.
    pub fn endpoint(&self) -> Option<(&Scheme, &Authority)> {
        self.endpoint.as_ref().map(|(s, a)| (s, a))
    }

    /// Resolve a region identifier into its endpoint.
    ///
    /// With a custom endpoint, any non-empty identifier resolves (third-party
    /// stores name their regions freely) and is kept for the credential scope.
    pub fn resolve(&self, region: &str) -> Result<Endpoint> {
        if region.is_empty() {
            return Err(Error::region_unknown("region identifier is empty"));
        }

        let entry = self.regions.get(region);
        let endpoint = match (&self.endpoint, entry) {
            (Some((scheme, authority)), entry) => Endpoint {
                region: region.to_string(),
                scheme: scheme.clone(),
                authority: authority.clone(),
                signing_service: entry
                    .map(|e| e.signing_service.clone())
                    .unwrap_or_else(|| S3_SERVICE.to_string()),
            },
            (None, Some(entry)) => Endpoint {
                region: region.to_string(),
                scheme: entry.scheme.clone(),
                authority: entry.authority.clone(),
                signing_service: entry.signing_service.clone(),
            },
            (None, None) => {
                return Err(Error::region_unknown(format!(
                    "region {region:?} has no registered host"
                )))
            }
        };

        debug!("resolved region {region} to {}", endpoint.authority);
        Ok(endpoint)
    }
}

fn parse_endpoint(endpoint: &str) -> Result<(Scheme, Authority)> {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.is_empty() {
        return Err(Error::config_invalid("endpoint must not be empty"));
    }

    if !endpoint.contains("://") {
        let authority = Authority::from_str(endpoint).map_err(|e| {
            Error::config_invalid(format!("endpoint {endpoint:?} is not a valid host")).with_source(e)
        })?;
        return Ok((Scheme::HTTPS, authority));
    }

    let uri = Uri::from_str(endpoint).map_err(|e| {
        Error::config_invalid(format!("endpoint {endpoint:?} is not a valid url")).with_source(e)
    })?;
    if uri.path() != "/" && !uri.path().is_empty() {
        return Err(Error::config_invalid(format!(
            "endpoint {endpoint:?} must not carry a path"
        )));
    }
    let parts = uri.into_parts();
    match (parts.scheme, parts.authority) {
        (Some(scheme), Some(authority)) if scheme == Scheme::HTTP || scheme == Scheme::HTTPS => {
            Ok((scheme, authority))
        }
        _ => Err(Error::config_invalid(format!(
            "endpoint {endpoint:?} must be an http or https url"
        ))),
    }
}
