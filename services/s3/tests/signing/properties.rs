use super::{credential, get, signature, signer_at};
use objsign_core::{ErrorKind, SigningMethod};
use objsign_s3::{Credential, Region, RegionConfig, RequestSigner};
use pretty_assertions::{assert_eq, assert_ne};

#[test]
fn test_signing_is_deterministic() {
    let signer = signer_at(0);
    let mut signatures = Vec::new();
    for _ in 0..3 {
        let mut req = get(
            "https://s3.amazonaws.com/demo/file.txt?versionId=3",
            &[("x-amz-meta-owner", "alice")],
        );
        signer
            .sign(&mut req, &credential(), SigningMethod::Header)
            .unwrap();
        signatures.push(signature(&req));
    }

    assert_eq!(signatures[0], signatures[1]);
    assert_eq!(signatures[1], signatures[2]);
}

#[test]
fn test_signed_header_changes_signature() {
    let sign = |value: &str| {
        let mut req = get(
            "https://s3.amazonaws.com/demo/file.txt",
            &[("x-amz-meta-owner", value)],
        );
        signer_at(0)
            .sign(&mut req, &credential(), SigningMethod::Header)
            .unwrap();
        signature(&req)
    };

    assert_ne!(sign("alice"), sign("bob"));
    // Surrounding and repeated spaces are not significant.
    assert_eq!(sign("alice  smith"), sign(" alice smith "));
}

#[test]
fn test_header_order_does_not_matter() {
    let sign = |headers: &[(&str, &str)]| {
        let mut req = get("https://s3.amazonaws.com/demo/file.txt", headers);
        signer_at(0)
            .sign(&mut req, &credential(), SigningMethod::Header)
            .unwrap();
        signature(&req)
    };

    assert_eq!(
        sign(&[("x-amz-meta-a", "1"), ("content-type", "text/plain")]),
        sign(&[("content-type", "text/plain"), ("x-amz-meta-a", "1")])
    );
}

#[test]
fn test_credential_changes_signature() {
    let sign = |cred: &Credential| {
        let mut req = get("https://s3.amazonaws.com/demo/file.txt", &[]);
        signer_at(0)
            .sign(&mut req, cred, SigningMethod::Header)
            .unwrap();
        signature(&req)
    };

    assert_ne!(
        sign(&credential()),
        sign(&Credential::new("AKIDEXAMPLE", "another-secret"))
    );
}

#[test]
fn test_every_region_signs() {
    for region in Region::ALL {
        let mut req = get(&format!("https://{}/demo/file.txt", region.host()), &[]);
        RequestSigner::new(RegionConfig::new(), region.identifier())
            .sign(&mut req, &credential(), SigningMethod::Header)
            .unwrap();
        assert!(req.headers["authorization"]
            .to_str()
            .unwrap()
            .contains(&format!("/{}/s3/aws4_request", region.identifier())));
    }
}

#[test]
fn test_unknown_region() {
    let mut req = get("https://s3.amazonaws.com/demo/file.txt", &[]);
    let err = RequestSigner::new(RegionConfig::new(), "moon-1")
        .sign(&mut req, &credential(), SigningMethod::Header)
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::RegionUnknown);
}

#[test]
fn test_secret_never_leaks() {
    let mut req = get("https://s3.amazonaws.com/demo/file.txt", &[]);
    signer_at(0)
        .sign(
            &mut req,
            &credential().with_session_token("session-token-value"),
            SigningMethod::Header,
        )
        .unwrap();

    let debug = format!("{req:?}");
    assert!(!debug.contains(super::SECRET_KEY));
    assert!(!debug.contains("session-token-value"));
    assert!(!format!("{:?}", credential()).contains(super::SECRET_KEY));
}
