// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Password-Hardened Encryption over the Ristretto group.
//!
//! A hardening [`Server`] holds a secret scalar and evaluates it on
//! nonce-derived bases.  A [`Client`] blinds those evaluations with its own
//! secret and the user's password into an [`EnrollmentRecord`] protecting a
//! random [`AccountKey`](keys::AccountKey).  Checking a password requires one
//! round trip to the server, which answers with a zero-knowledge proof of
//! either a match or a mismatch.  A stolen record database therefore cannot
//! be attacked offline, and a server that lies about the outcome is caught.
//!
//! The server key can be rotated at any time.  Rotation produces an
//! [`UpdateToken`] which migrates every stored record with [`update_record`]
//! and the client key with [`Client::rotate`], without any password.
//!
//! # Usage
//!
//! ```rust
//! use phe_ristretto::{Client, Server, VerifyOutcome};
//! use phe_ristretto::encryption::{decrypt, encrypt};
//! use rand::rngs::OsRng;
//!
//! # fn do_test() -> Result<(), phe_ristretto::Error> {
//! let mut rng = OsRng;
//!
//! let server = Server::new(&mut rng)?;
//! let client = Client::new(server.public_key()?, &mut rng)?;
//!
//! // Enrollment.
//! let enrollment = server.get_enrollment(&mut rng)?;
//! let (record, key) = client.enroll_account(b"correct horse", &enrollment, &mut rng)?;
//! let ciphertext = encrypt(b"user data", &key, &mut rng)?;
//!
//! // Verification.
//! let request = client.create_verify_password_request(b"correct horse", &record)?;
//! let response = server.verify_password(&request, &mut rng)?;
//!
//! match client.check_response_and_decrypt(b"correct horse", &record, &response)? {
//!     VerifyOutcome::Matched(recovered) => {
//!         assert_eq!(decrypt(&ciphertext, &recovered)?, b"user data");
//!     },
//!     VerifyOutcome::NotMatched => unreachable!(),
//! }
//! # Ok(()) }
//! # fn main() { assert!(do_test().is_ok()); }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod client;
mod rotation;
mod server;

pub mod encryption;
pub mod errors;
pub mod group;
pub mod hashing;
pub mod keys;
pub mod messages;
pub mod nizk;

pub use crate::client::{Client, VerifyOutcome};
pub use crate::errors::{Error, Result};
pub use crate::keys::{AccountKey, ClientSecretKey, ServerPublicKey, ServerSecretKey};
pub use crate::messages::{
    EnrollmentRecord, EnrollmentResponse, ProofOfFail, ProofOfSuccess, UpdateToken, VerifyPasswordRequest,
    VerifyPasswordResponse,
};
pub use crate::rotation::update_record;
pub use crate::server::Server;
