// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! JSON encoding of the wire containers.

use rand::rngs::OsRng;

use serde_json::Value;

use phe_ristretto::{
    Client, EnrollmentRecord, EnrollmentResponse, Server, UpdateToken, VerifyOutcome,
    VerifyPasswordRequest, VerifyPasswordResponse,
};

fn keys(value: &Value) -> Vec<String> {
    let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
    keys.sort();

    keys
}

#[test]
fn field_names() {
    let mut rng = OsRng;
    let server = Server::new(&mut rng).unwrap();
    let client = Client::new(server.public_key().unwrap(), &mut rng).unwrap();

    let enrollment = server.get_enrollment(&mut rng).unwrap();
    let value = serde_json::to_value(&enrollment).unwrap();
    assert_eq!(keys(&value), ["c_0", "c_1", "ns", "proof"]);
    assert_eq!(keys(&value["proof"]), ["blind_x", "term_1", "term_2", "term_3"]);

    let (record, _) = client.enroll_account(b"Password", &enrollment, &mut rng).unwrap();
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(keys(&value), ["nc", "ns", "t_0", "t_1"]);

    let request = client.create_verify_password_request(b"Password", &record).unwrap();
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(keys(&value), ["c_0", "ns"]);

    let response = server.verify_password(&request, &mut rng).unwrap();
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(keys(&value), ["c_1", "proof_success", "res"]);

    let request = client.create_verify_password_request(b"Password1", &record).unwrap();
    let response = server.verify_password(&request, &mut rng).unwrap();
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(keys(&value), ["c_1", "proof_fail", "res"]);
    assert_eq!(
        keys(&value["proof_fail"]),
        ["blind_a", "blind_b", "term_1", "term_2", "term_3", "term_4"],
    );

    let token = server.rotate(&mut rng).unwrap();
    let value = serde_json::to_value(&token).unwrap();
    assert_eq!(keys(&value), ["a", "b"]);
}

#[test]
fn protocol_over_json() {
    let mut rng = OsRng;
    let server = Server::new(&mut rng).unwrap();
    let client = Client::new(server.public_key().unwrap(), &mut rng).unwrap();

    let json = serde_json::to_string(&server.get_enrollment(&mut rng).unwrap()).unwrap();
    let enrollment: EnrollmentResponse = serde_json::from_str(&json).unwrap();
    let (record, key) = client.enroll_account(b"Password", &enrollment, &mut rng).unwrap();

    let json = serde_json::to_string(&record).unwrap();
    let record: EnrollmentRecord = serde_json::from_str(&json).unwrap();

    let json = serde_json::to_string(&client.create_verify_password_request(b"Password", &record).unwrap()).unwrap();
    let request: VerifyPasswordRequest = serde_json::from_str(&json).unwrap();

    let json = serde_json::to_string(&server.verify_password(&request, &mut rng).unwrap()).unwrap();
    let response: VerifyPasswordResponse = serde_json::from_str(&json).unwrap();

    assert_eq!(
        client.check_response_and_decrypt(b"Password", &record, &response).unwrap(),
        VerifyOutcome::Matched(key),
    );
}

#[test]
fn missing_proofs_are_rejected() {
    let mut rng = OsRng;
    let server = Server::new(&mut rng).unwrap();
    let client = Client::new(server.public_key().unwrap(), &mut rng).unwrap();

    let enrollment = server.get_enrollment(&mut rng).unwrap();
    let (record, _) = client.enroll_account(b"Password", &enrollment, &mut rng).unwrap();

    let json = format!(r#"{{"res":true,"c_1":{:?}}}"#, enrollment.c1);
    let response: VerifyPasswordResponse = serde_json::from_str(&json).unwrap();

    assert_eq!(
        client.check_response_and_decrypt(b"Password", &record, &response),
        Err(phe_ristretto::Error::MalformedInput),
    );

    let token: UpdateToken = serde_json::from_str(r#"{"a":[1],"b":[2]}"#).unwrap();
    assert_eq!(token.a, vec![1u8]);
}
