use bytes::Bytes;
use http::StatusCode;
use objsign_core::ErrorKind;
use objsign_s3::{classify, ErrorMessage, ServiceError};
use pretty_assertions::assert_eq;

#[test]
fn test_forbidden_json() {
    let body = Bytes::from_static(
        br#"{"Code":"AccessDenied","Message":"Access Denied","RequestId":"abc"}"#,
    );
    let err = classify(StatusCode::FORBIDDEN, &body).expect_err("must fail");

    assert_eq!(err.kind(), ErrorKind::ErrorResponse);
    assert!(!err.is_permanent());
    let Some(ServiceError::ErrorResponse { status, message }) =
        err.downcast_source::<ServiceError>()
    else {
        panic!("unexpected source: {err:?}");
    };
    assert_eq!(*status, StatusCode::FORBIDDEN);
    assert_eq!(
        message,
        &ErrorMessage {
            code: "AccessDenied".to_string(),
            message: "Access Denied".to_string(),
            resource: None,
            request_id: Some("abc".to_string()),
        }
    );
}

#[test]
fn test_ok_with_any_body() {
    for body in ["", "not xml", "<Error><Code>X</Code></Error>"] {
        assert!(classify(StatusCode::OK, &Bytes::from_static(body.as_bytes())).is_ok());
    }
    assert!(classify(StatusCode::NO_CONTENT, &Bytes::new()).is_ok());
}

#[test]
fn test_other_success_codes_are_not_success() {
    let err = classify(StatusCode::PARTIAL_CONTENT, &Bytes::new()).expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}
