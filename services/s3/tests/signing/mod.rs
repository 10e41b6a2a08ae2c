mod golden;
mod presigned;
mod properties;

use chrono::{TimeZone, Utc};
use http::request::Parts;
use objsign_s3::{Credential, RegionConfig, RequestSigner};

pub const ACCESS_KEY: &str = "AKIDEXAMPLE";
pub const SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

pub fn credential() -> Credential {
    Credential::new(ACCESS_KEY, SECRET_KEY)
}

/// Signer for us-east-1 pinned at 2024-01-01 00:00:`second`.
pub fn signer_at(second: u32) -> RequestSigner {
    let _ = env_logger::builder().is_test(true).try_init();

    RequestSigner::new(RegionConfig::new(), "us-east-1")
        .with_time(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).unwrap())
}

pub fn get(uri: &str, headers: &[(&str, &str)]) -> Parts {
    let mut builder = http::Request::get(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    builder.body(()).unwrap().into_parts().0
}

pub fn authorization(parts: &Parts) -> String {
    parts.headers[http::header::AUTHORIZATION]
        .to_str()
        .unwrap()
        .to_string()
}

pub fn signature(parts: &Parts) -> String {
    let authorization = authorization(parts);
    authorization
        .rsplit_once("Signature=")
        .map(|(_, s)| s.to_string())
        .unwrap()
}
