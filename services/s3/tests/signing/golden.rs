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

use super::{authorization, credential, get, signature, signer_at};
use objsign_core::hash::EMPTY_SHA256;
use objsign_core::SigningMethod;
use objsign_s3::canonical::canonicalize;
use objsign_s3::signature::{compute_signature, CredentialScope};
use pretty_assertions::assert_eq;

#[test]
fn test_aws_get_vanilla() {
    let creq = canonicalize(
        "GET",
        "/",
        &[],
        &[
            ("X-Amz-Date".to_string(), "20150830T123600Z".to_string()),
            ("Host".to_string(), "example.amazonaws.com".to_string()),
        ],
        EMPTY_SHA256,
    )
    .unwrap();

    assert_eq!(
        creq.to_string(),
        "GET\n/\n\nhost:example.amazonaws.com\nx-amz-date:20150830T123600Z\n\nhost;x-amz-date\n\
         e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );

    let scope = CredentialScope::new("20150830", "us-east-1", "service");
    let signature = compute_signature(&creq, &credential(), &scope, "20150830T123600Z").unwrap();
    assert_eq!(
        signature,
        "5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
    );
}

#[test]
fn test_get_demo_file() {
    let mut req = get("https://s3.amazonaws.com/demo/file.txt", &[]);
    signer_at(0)
        .sign(&mut req, &credential(), SigningMethod::Header)
        .unwrap();

    assert_eq!(
        authorization(&req),
        "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240101/us-east-1/s3/aws4_request, \
         SignedHeaders=host;x-amz-content-sha256;x-amz-date, \
         Signature=35b4af829ff990b35e82dc8d40c4a9f10c0d743284f7e75dd36b4493378390e0"
    );
    assert_eq!(req.headers["x-amz-date"], "20240101T000000Z");
}

#[test]
fn test_two_timestamps_give_two_signatures() {
    let mut first = get("https://s3.amazonaws.com/demo/file.txt", &[]);
    signer_at(0)
        .sign(&mut first, &credential(), SigningMethod::Header)
        .unwrap();
    let mut second = get("https://s3.amazonaws.com/demo/file.txt", &[]);
    signer_at(1)
        .sign(&mut second, &credential(), SigningMethod::Header)
        .unwrap();

    assert_eq!(
        signature(&first),
        "35b4af829ff990b35e82dc8d40c4a9f10c0d743284f7e75dd36b4493378390e0"
    );
    assert_eq!(
        signature(&second),
        "5fe4250114498028923dee2f3e6a2dbe1f04d8e2a82081b3f73ab4e34240404e"
    );
}
