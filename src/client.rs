// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! The client side of the protocol.
//!
//! # Details
//!
//! The client holds a secret scalar \\( y \\) and the server public key
//! \\( X \\).  For a password \\( pw \\) and a client nonce \\( n_C \\) it
//! derives the bases \\( H_{C0} = \mathcal{H}(\mathsf{hc0}, n_C, pw) \\) and
//! \\( H_{C1} = \mathcal{H}(\mathsf{hc1}, n_C, pw) \\).
//!
//! * Enrollment: given the server evaluations \\( C_0 = x \cdot H_0 \\) and
//!   \\( C_1 = x \cdot H_1 \\), the client samples a random point \\( M \\)
//!   and stores \\( T_0 = C_0 + y \cdot H_{C0} \\) and
//!   \\( T_1 = C_1 + y \cdot H_{C1} + y \cdot M \\).  The account key is
//!   \\( \mathsf{HKDF}(M) \\).
//!
//! * Verification: the client sends \\( C_0' = T_0 - y \cdot H_{C0}' \\),
//!   which equals \\( x \cdot H_0 \\) exactly when the password is right.  On
//!   a match the server returns \\( C_1 \\), from which the client recovers
//!   \\( M = y^{-1} \cdot (T_1 - C_1 - y \cdot H_{C1}) \\).
//!
//! Without the server, the record only yields \\( C_0 \\) and \\( M \\) for a
//! guessed password with no way of testing the guess.

use curve25519_dalek::scalar::Scalar;

use rand::CryptoRng;
use rand::RngCore;

use tracing::{debug, instrument, warn};

use zeroize::Zeroize;

use crate::errors::{Error, Result};
use crate::group::{generator, random_nonce, random_point};
use crate::hashing::{ClientBases, ServerBases};
use crate::keys::{AccountKey, ClientSecretKey, ServerPublicKey};
use crate::messages::{
    verify_password_request, EnrollmentRecord, EnrollmentResponse, ParsedVerdict, UpdateToken,
    VerifyPasswordRequest, VerifyPasswordResponse,
};
use crate::rotation::Rotation;

/// The authenticated outcome of a password verification.
///
/// A proof which does not verify is never reported here: it surfaces as
/// [`Error::ProofInvalid`] instead.
#[derive(Debug, Eq, PartialEq)]
pub enum VerifyOutcome {
    /// The password matched; the account key was recovered.
    Matched(AccountKey),
    /// The server proved the password did not match.
    NotMatched,
}

impl VerifyOutcome {
    /// Whether the password matched.
    pub fn is_match(&self) -> bool {
        matches!(self, VerifyOutcome::Matched(_))
    }
}

/// A client of a hardening server.
#[derive(Clone, Debug)]
pub struct Client {
    secret_key: ClientSecretKey,
    server_public_key: ServerPublicKey,
}

fn check_password(password: &[u8]) -> Result<()> {
    if password.is_empty() {
        return Err(Error::MalformedInput);
    }

    Ok(())
}

impl Client {
    /// Create a client with a freshly generated secret key, trusting
    /// `server_public_key`.
    pub fn new<R: RngCore + CryptoRng>(server_public_key: ServerPublicKey, csprng: &mut R) -> Result<Self> {
        Ok(Client::from_keys(ClientSecretKey::generate(csprng)?, server_public_key))
    }

    /// Create a client from previously persisted keys.
    pub fn from_keys(secret_key: ClientSecretKey, server_public_key: ServerPublicKey) -> Self {
        Client { secret_key, server_public_key }
    }

    /// The client secret key, for persistence.
    pub fn secret_key(&self) -> &ClientSecretKey {
        &self.secret_key
    }

    /// The server public key this client verifies proofs against.
    pub fn server_public_key(&self) -> &ServerPublicKey {
        &self.server_public_key
    }

    /// Finish the enrollment of an account protected by `password`.
    ///
    /// # Returns
    ///
    /// The record to store, and the account key it protects.
    ///
    /// # Errors
    ///
    /// [`Error::ProofInvalid`] if the server evaluations are not proven
    /// correct for this client's server public key.
    #[instrument(skip_all, err(Debug))]
    pub fn enroll_account<R: RngCore + CryptoRng>(
        &self,
        password: &[u8],
        response: &EnrollmentResponse,
        csprng: &mut R,
    ) -> Result<(EnrollmentRecord, AccountKey)> {
        check_password(password)?;
        let response = response.parse()?;
        let bases = ServerBases::from_nonce(response.ns);

        response
            .proof
            .verify(&self.server_public_key, &bases, &response.c0, &response.c1)
            .map_err(|e| {
                warn!("Rejected enrollment response with an invalid proof.");
                e
            })?;

        let nc = random_nonce(csprng)?;
        let m = random_point(csprng)?;
        let client_bases = ClientBases::from_nonce_and_password(&nc, password);
        let y = *self.secret_key;

        let t0 = response.c0 + client_bases.hc0 * y;
        let t1 = response.c1 + (client_bases.hc1 + m) * y;
        let key = AccountKey::derive(&m)?;

        debug!("Enrolled account.");

        Ok((EnrollmentRecord::new(response.ns, &nc, &t0, &t1), key))
    }

    /// Derive the evaluation the server should have produced for `record` if
    /// `password` is the enrolled one.
    pub fn create_verify_password_request(
        &self,
        password: &[u8],
        record: &EnrollmentRecord,
    ) -> Result<VerifyPasswordRequest> {
        check_password(password)?;
        let record = record.parse()?;
        let client_bases = ClientBases::from_nonce_and_password(record.nc, password);

        let c0 = record.t0 - client_bases.hc0 * *self.secret_key;

        Ok(verify_password_request(record.ns, &c0))
    }

    /// Check the server's answer to a verification request for `password`
    /// and, on a match, recover the account key.
    ///
    /// # Errors
    ///
    /// [`Error::ProofInvalid`] if the proof accompanying the answer does not
    /// verify, whatever the claimed result.  A wrong password is not an error.
    #[instrument(skip_all, err(Debug))]
    pub fn check_response_and_decrypt(
        &self,
        password: &[u8],
        record: &EnrollmentRecord,
        response: &VerifyPasswordResponse,
    ) -> Result<VerifyOutcome> {
        check_password(password)?;
        let record = record.parse()?;
        let verdict = response.parse()?;

        let bases = ServerBases::from_nonce(record.ns);
        let client_bases = ClientBases::from_nonce_and_password(record.nc, password);
        let y = *self.secret_key;
        let c0 = record.t0 - client_bases.hc0 * y;

        match verdict {
            ParsedVerdict::Success(c1, proof) => {
                proof.verify(&self.server_public_key, &bases, &c0, &c1).map_err(|e| {
                    warn!("Rejected match with an invalid proof.");
                    e
                })?;

                let mut y_inv = y.invert();
                let m = (record.t1 - c1 - client_bases.hc1 * y) * y_inv;
                y_inv.zeroize();

                debug!("Password matched.");

                Ok(VerifyOutcome::Matched(AccountKey::derive(&m)?))
            },
            ParsedVerdict::Fail(c1, proof) => {
                proof.verify(&self.server_public_key, &bases, &c0, &c1).map_err(|e| {
                    warn!("Rejected mismatch with an invalid proof.");
                    e
                })?;

                debug!("Password did not match.");

                Ok(VerifyOutcome::NotMatched)
            },
        }
    }

    /// Follow a server key rotation: \\( y' = a \cdot y \\) and
    /// \\( X' = a \cdot X + b \cdot G \\).
    ///
    /// Records must be migrated with the same token using
    /// [`update_record`](crate::update_record).
    pub fn rotate(&mut self, token: &UpdateToken) -> Result<()> {
        let rotation = Rotation::from_token(token)?;

        let rotated: Scalar = rotation.a * *self.secret_key;
        self.secret_key = ClientSecretKey(rotated);
        self.server_public_key = ServerPublicKey(rotation.apply_to_point(&self.server_public_key, &generator()));

        debug!("Rotated client key.");

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::group::point_to_bytes;
    use crate::group::test::FailingRng;
    use crate::server::Server;
    use rand::rngs::OsRng;

    const PASSWORD: &[u8] = b"Password";

    fn setup() -> (Server, Client) {
        let mut rng = OsRng;
        let server = Server::new(&mut rng).unwrap();
        let client = Client::new(server.public_key().unwrap(), &mut rng).unwrap();

        (server, client)
    }

    #[test]
    fn enroll_and_verify() {
        let mut rng = OsRng;
        let (server, client) = setup();

        let enrollment = server.get_enrollment(&mut rng).unwrap();
        let (record, key) = client.enroll_account(PASSWORD, &enrollment, &mut rng).unwrap();

        let request = client.create_verify_password_request(PASSWORD, &record).unwrap();
        let response = server.verify_password(&request, &mut rng).unwrap();
        let outcome = client.check_response_and_decrypt(PASSWORD, &record, &response).unwrap();

        assert_eq!(outcome, VerifyOutcome::Matched(key));
    }

    #[test]
    fn wrong_password() {
        let mut rng = OsRng;
        let (server, client) = setup();

        let enrollment = server.get_enrollment(&mut rng).unwrap();
        let (record, _) = client.enroll_account(PASSWORD, &enrollment, &mut rng).unwrap();

        let request = client.create_verify_password_request(b"Password1", &record).unwrap();
        let response = server.verify_password(&request, &mut rng).unwrap();
        let outcome = client.check_response_and_decrypt(b"Password1", &record, &response).unwrap();

        assert!(!response.res);
        assert_eq!(outcome, VerifyOutcome::NotMatched);
    }

    #[test]
    fn enrollment_from_another_server_is_rejected() {
        let mut rng = OsRng;
        let (_, client) = setup();
        let impostor = Server::new(&mut rng).unwrap();

        let enrollment = impostor.get_enrollment(&mut rng).unwrap();

        assert_eq!(
            client.enroll_account(PASSWORD, &enrollment, &mut rng).unwrap_err(),
            Error::ProofInvalid,
        );
    }

    #[test]
    fn enrollment_with_swapped_evaluations_is_rejected() {
        let mut rng = OsRng;
        let (server, client) = setup();

        let mut enrollment = server.get_enrollment(&mut rng).unwrap();
        core::mem::swap(&mut enrollment.c0, &mut enrollment.c1);

        assert_eq!(
            client.enroll_account(PASSWORD, &enrollment, &mut rng).unwrap_err(),
            Error::ProofInvalid,
        );
    }

    #[test]
    fn lying_server_is_detected() {
        let mut rng = OsRng;
        let (server, client) = setup();

        let enrollment = server.get_enrollment(&mut rng).unwrap();
        let (record, _) = client.enroll_account(PASSWORD, &enrollment, &mut rng).unwrap();

        // Claiming a mismatch for the right password.
        let request = client.create_verify_password_request(PASSWORD, &record).unwrap();
        let mut response = server.verify_password(&request, &mut rng).unwrap();
        let forged = random_point(&mut rng).unwrap();
        response.res = false;
        response.c1 = point_to_bytes(&forged).to_vec();
        response.proof_fail = Some(crate::messages::ProofOfFail {
            term1: response.c1.clone(),
            term2: response.c1.clone(),
            term3: response.c1.clone(),
            term4: response.c1.clone(),
            blind_a: vec![1u8],
            blind_b: vec![2u8],
        });
        response.proof_success = None;

        assert_eq!(
            client.check_response_and_decrypt(PASSWORD, &record, &response).unwrap_err(),
            Error::ProofInvalid,
        );

        // Claiming a match for the wrong password.
        let request = client.create_verify_password_request(b"Password1", &record).unwrap();
        let mismatch = server.verify_password(&request, &mut rng).unwrap();
        let matching = server
            .verify_password(&client.create_verify_password_request(PASSWORD, &record).unwrap(), &mut rng)
            .unwrap();

        assert_eq!(
            client.check_response_and_decrypt(b"Password1", &record, &matching).unwrap_err(),
            Error::ProofInvalid,
        );
        assert!(!mismatch.res);
    }

    #[test]
    fn empty_password_is_rejected() {
        let mut rng = OsRng;
        let (server, client) = setup();

        let enrollment = server.get_enrollment(&mut rng).unwrap();

        assert_eq!(client.enroll_account(b"", &enrollment, &mut rng).unwrap_err(), Error::MalformedInput);
    }

    #[test]
    fn client_rotation_tracks_server_key() {
        let mut rng = OsRng;
        let (server, mut client) = setup();

        let token = server.rotate(&mut rng).unwrap();
        client.rotate(&token).unwrap();

        assert_eq!(*client.server_public_key(), server.public_key().unwrap());
    }

    #[test]
    fn failing_rng_aborts_enrollment() {
        let mut rng = OsRng;
        let (server, client) = setup();

        let enrollment = server.get_enrollment(&mut rng).unwrap();

        assert_eq!(
            client.enroll_account(PASSWORD, &enrollment, &mut FailingRng).unwrap_err(),
            Error::SecureRandomUnavailable,
        );
    }
}
