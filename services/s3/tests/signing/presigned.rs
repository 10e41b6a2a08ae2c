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

use super::{credential, get, signer_at};
use objsign_core::{ErrorKind, SigningMethod};
use objsign_s3::MAX_PRESIGN_EXPIRY;
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn test_presign_demo_file() {
    let mut req = get("https://s3.amazonaws.com/demo/file.txt", &[]);
    signer_at(0)
        .sign(
            &mut req,
            &credential(),
            SigningMethod::Query(Duration::from_secs(3600)),
        )
        .unwrap();

    let query = req.uri.query().unwrap();
    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let param = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    assert_eq!(param("X-Amz-Algorithm"), Some("AWS4-HMAC-SHA256"));
    assert_eq!(
        param("X-Amz-Credential"),
        Some("AKIDEXAMPLE/20240101/us-east-1/s3/aws4_request")
    );
    assert_eq!(param("X-Amz-Date"), Some("20240101T000000Z"));
    assert_eq!(param("X-Amz-Expires"), Some("3600"));
    assert_eq!(param("X-Amz-SignedHeaders"), Some("host"));
    assert_eq!(
        param("X-Amz-Signature"),
        Some("7ee99d75c79aacc49476eb69420f0fd479f5d253ac12f6a9f48159b10d283b04")
    );
    assert_eq!(param("X-Amz-Security-Token"), None);
}

#[test]
fn test_presign_with_session_token() {
    let mut req = get("https://s3.amazonaws.com/demo/file.txt", &[]);
    signer_at(0)
        .sign(
            &mut req,
            &credential().with_session_token("token/with+chars"),
            SigningMethod::Query(Duration::from_secs(60)),
        )
        .unwrap();

    assert!(req
        .uri
        .query()
        .unwrap()
        .contains("X-Amz-Security-Token=token%2Fwith%2Bchars"));
}

#[test]
fn test_presign_expiry_bound() {
    let mut req = get("https://s3.amazonaws.com/demo/file.txt", &[]);
    signer_at(0)
        .sign(&mut req, &credential(), SigningMethod::Query(MAX_PRESIGN_EXPIRY))
        .unwrap();
    assert!(req.uri.query().unwrap().contains("X-Amz-Expires=604800"));

    for expires in [
        Duration::ZERO,
        MAX_PRESIGN_EXPIRY + Duration::from_secs(1),
    ] {
        let mut req = get("https://s3.amazonaws.com/demo/file.txt", &[]);
        let err = signer_at(0)
            .sign(&mut req, &credential(), SigningMethod::Query(expires))
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::ExpiryInvalid);
    }
}
