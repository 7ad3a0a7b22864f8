// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! The hardening server.
//!
//! The server holds a single secret scalar \\( x \\).  It hands out
//! evaluations of fresh nonces at enrollment time, tells clients whether an
//! attempted evaluation matches (with a proof either way), and rotates its key.
//!
//! The key sits behind a read-write lock: enrollments and verifications only
//! read it and may run in parallel, while [`Server::rotate`] takes the write
//! lock so that no request ever evaluates with a half-rotated key.

use std::sync::RwLock;
use std::sync::RwLockReadGuard;

use rand::CryptoRng;
use rand::RngCore;

use tracing::{debug, info, instrument, warn};

use crate::errors::{Error, Result};
use crate::group::{point_to_bytes, points_equal, random_nonce};
use crate::hashing::ServerBases;
use crate::keys::{ServerPublicKey, ServerSecretKey};
use crate::messages::{
    EnrollmentResponse, ProofOfFail, ProofOfSuccess, UpdateToken, VerifyPasswordRequest,
    VerifyPasswordResponse,
};
use crate::nizk::{NizkOfFailure, NizkOfSuccess};
use crate::rotation::Rotation;

struct Keypair {
    secret_key: ServerSecretKey,
    public_key: ServerPublicKey,
}

impl Keypair {
    fn new(secret_key: ServerSecretKey) -> Self {
        let public_key = secret_key.to_public();

        Keypair { secret_key, public_key }
    }
}

/// A handle on the server secret.
pub struct Server {
    keypair: RwLock<Keypair>,
}

impl Server {
    /// Create a server with a freshly generated secret key.
    pub fn new<R: RngCore + CryptoRng>(csprng: &mut R) -> Result<Self> {
        Ok(Server::from_secret_key(ServerSecretKey::generate(csprng)?))
    }

    /// Create a server from a previously persisted secret key.
    pub fn from_secret_key(secret_key: ServerSecretKey) -> Self {
        Server { keypair: RwLock::new(Keypair::new(secret_key)) }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Keypair>> {
        self.keypair.read().map_err(|_| Error::LockPoisoned)
    }

    /// The public key clients verify proofs against.
    pub fn public_key(&self) -> Result<ServerPublicKey> {
        Ok(self.read()?.public_key)
    }

    /// A copy of the current secret key, for persistence.
    pub fn secret_key(&self) -> Result<ServerSecretKey> {
        Ok(self.read()?.secret_key.clone())
    }

    /// Start the enrollment of a new account.
    ///
    /// Samples a fresh nonce \\( n_S \\), evaluates both bases derived from
    /// it and proves the evaluations correct.
    #[instrument(skip_all, err(Debug))]
    pub fn get_enrollment<R: RngCore + CryptoRng>(&self, csprng: &mut R) -> Result<EnrollmentResponse> {
        let ns = random_nonce(csprng)?;
        let bases = ServerBases::from_nonce(&ns);

        let keypair = self.read()?;
        let c0 = bases.hs0 * *keypair.secret_key;
        let c1 = bases.hs1 * *keypair.secret_key;
        let proof = NizkOfSuccess::prove(&keypair.secret_key, &keypair.public_key, &bases, &c0, &c1, csprng)?;
        drop(keypair);

        debug!("Issued enrollment evaluation.");

        Ok(EnrollmentResponse {
            ns: ns.to_vec(),
            c0: point_to_bytes(&c0).to_vec(),
            c1: point_to_bytes(&c1).to_vec(),
            proof: ProofOfSuccess::from(&proof),
        })
    }

    /// Check a password verification attempt.
    ///
    /// On a match the response carries \\( C_1 = x \cdot H_1 \\), which the
    /// client needs to recover its key, with a proof of success.  Otherwise it
    /// carries a randomized difference with a proof of failure, so that the
    /// client can tell a wrong password from a misbehaving server.
    #[instrument(skip_all, err(Debug))]
    pub fn verify_password<R: RngCore + CryptoRng>(
        &self,
        request: &VerifyPasswordRequest,
        csprng: &mut R,
    ) -> Result<VerifyPasswordResponse> {
        let (ns, c0) = request.parse().map_err(|e| {
            warn!("Rejected malformed verification request: {}", e);
            e
        })?;
        let bases = ServerBases::from_nonce(ns);

        let keypair = self.read()?;

        if points_equal(&(bases.hs0 * *keypair.secret_key), &c0) {
            let c1 = bases.hs1 * *keypair.secret_key;
            let proof = NizkOfSuccess::prove(&keypair.secret_key, &keypair.public_key, &bases, &c0, &c1, csprng)?;
            drop(keypair);

            debug!("Password attempt matched.");

            return Ok(VerifyPasswordResponse {
                res: true,
                c1: point_to_bytes(&c1).to_vec(),
                proof_success: Some(ProofOfSuccess::from(&proof)),
                proof_fail: None,
            });
        }

        let (c1, proof) = NizkOfFailure::prove(&keypair.secret_key, &keypair.public_key, &bases, &c0, csprng)?;
        drop(keypair);

        debug!("Password attempt did not match.");

        Ok(VerifyPasswordResponse {
            res: false,
            c1: point_to_bytes(&c1).to_vec(),
            proof_success: None,
            proof_fail: Some(ProofOfFail::from(&proof)),
        })
    }

    /// Rotate the server key to \\( x' = a \cdot x + b \\).
    ///
    /// The previous key is zeroized.  The returned token must be applied once
    /// to every stored record with [`update_record`](crate::update_record) and
    /// to every client with [`Client::rotate`](crate::Client::rotate).
    #[instrument(skip_all, err(Debug))]
    pub fn rotate<R: RngCore + CryptoRng>(&self, csprng: &mut R) -> Result<UpdateToken> {
        let mut keypair = self.keypair.write().map_err(|_| Error::LockPoisoned)?;

        let rotation = Rotation::generate(&keypair.secret_key, csprng)?;
        let rotated = ServerSecretKey(rotation.apply_to_scalar(&keypair.secret_key));
        *keypair = Keypair::new(rotated);
        drop(keypair);

        info!("Rotated server key.");

        Ok(rotation.to_token())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::group::test::FailingRng;
    use crate::group::{point_from_bytes, random_point, scalar_base_mult};
    use crate::messages::verify_password_request;
    use curve25519_dalek::scalar::Scalar;
    use rand::rngs::OsRng;

    fn server_with_secret(x: u64) -> Server {
        Server::from_secret_key(ServerSecretKey(Scalar::from(x)))
    }

    #[test]
    fn enrollment_proof_verifies() {
        let mut rng = OsRng;
        let server = Server::new(&mut rng).unwrap();
        let public_key = server.public_key().unwrap();

        let response = server.get_enrollment(&mut rng).unwrap();
        let bases = ServerBases::from_nonce(&response.ns);
        let c0 = point_from_bytes(&response.c0).unwrap();
        let c1 = point_from_bytes(&response.c1).unwrap();

        assert_eq!(response.ns.len(), 32);
        assert!(response.proof.parse().unwrap().verify(&public_key, &bases, &c0, &c1).is_ok());
    }

    #[test]
    fn enrollment_nonces_are_fresh() {
        let mut rng = OsRng;
        let server = Server::new(&mut rng).unwrap();

        let first = server.get_enrollment(&mut rng).unwrap();
        let second = server.get_enrollment(&mut rng).unwrap();

        assert_ne!(first.ns, second.ns);
        assert_ne!(first.c0, second.c0);
    }

    #[test]
    fn verify_matching_evaluation() {
        let mut rng = OsRng;
        let server = server_with_secret(7);
        let public_key = server.public_key().unwrap();

        assert_eq!(public_key.0, scalar_base_mult(&Scalar::from(7u64)));

        let enrollment = server.get_enrollment(&mut rng).unwrap();
        let c0 = point_from_bytes(&enrollment.c0).unwrap();
        let request = verify_password_request(&enrollment.ns, &c0);
        let response = server.verify_password(&request, &mut rng).unwrap();

        assert!(response.res);
        assert!(response.proof_fail.is_none());
        assert_eq!(response.c1, enrollment.c1);
    }

    #[test]
    fn verify_mismatching_evaluation() {
        let mut rng = OsRng;
        let server = server_with_secret(7);
        let public_key = server.public_key().unwrap();

        let enrollment = server.get_enrollment(&mut rng).unwrap();
        let c0 = random_point(&mut rng).unwrap();
        let request = verify_password_request(&enrollment.ns, &c0);
        let response = server.verify_password(&request, &mut rng).unwrap();

        assert!(!response.res);
        assert!(response.proof_success.is_none());

        let bases = ServerBases::from_nonce(&enrollment.ns);
        let c1 = point_from_bytes(&response.c1).unwrap();
        let proof = response.proof_fail.unwrap().parse().unwrap();
        assert!(proof.verify(&public_key, &bases, &c0, &c1).is_ok());
    }

    #[test]
    fn malformed_requests_are_rejected() {
        let mut rng = OsRng;
        let server = Server::new(&mut rng).unwrap();

        let request = VerifyPasswordRequest { ns: vec![1u8; 33], c0: vec![1u8; 32] };
        assert_eq!(server.verify_password(&request, &mut rng), Err(Error::MalformedInput));

        let request = VerifyPasswordRequest { ns: Vec::new(), c0: vec![1u8; 32] };
        assert_eq!(server.verify_password(&request, &mut rng), Err(Error::MalformedInput));

        let request = VerifyPasswordRequest { ns: vec![1u8; 32], c0: vec![0u8; 32] };
        assert_eq!(server.verify_password(&request, &mut rng), Err(Error::InvalidEncoding));
    }

    #[test]
    fn rotation_changes_key() {
        let mut rng = OsRng;
        let server = Server::new(&mut rng).unwrap();
        let old_secret = server.secret_key().unwrap();
        let old_public = server.public_key().unwrap();

        let token = server.rotate(&mut rng).unwrap();
        let (a, b) = token.parse().unwrap();

        let new_secret = server.secret_key().unwrap();
        assert_eq!(*new_secret, a * *old_secret + b);
        assert_eq!(server.public_key().unwrap(), new_secret.to_public());
        assert_ne!(server.public_key().unwrap(), old_public);
    }

    #[test]
    fn rotated_server_accepts_rotated_evaluations() {
        let mut rng = OsRng;
        let server = Server::new(&mut rng).unwrap();

        let enrollment = server.get_enrollment(&mut rng).unwrap();
        let token = server.rotate(&mut rng).unwrap();
        let rotation = Rotation::from_token(&token).unwrap();

        let bases = ServerBases::from_nonce(&enrollment.ns);
        let c0 = point_from_bytes(&enrollment.c0).unwrap();

        let stale = verify_password_request(&enrollment.ns, &c0);
        assert!(!server.verify_password(&stale, &mut rng).unwrap().res);

        let rotated = verify_password_request(&enrollment.ns, &rotation.apply_to_point(&c0, &bases.hs0));
        assert!(server.verify_password(&rotated, &mut rng).unwrap().res);
    }

    #[test]
    fn failing_rng_aborts_operations() {
        let mut rng = OsRng;
        let server = Server::new(&mut rng).unwrap();
        let secret = server.secret_key().unwrap();

        assert_eq!(server.get_enrollment(&mut FailingRng), Err(Error::SecureRandomUnavailable));
        assert_eq!(server.rotate(&mut FailingRng), Err(Error::SecureRandomUnavailable));
        assert!(Server::new(&mut FailingRng).is_err());

        // A failed rotation leaves the key untouched.
        assert_eq!(server.secret_key().unwrap(), secret);
    }

    #[test]
    fn server_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Server>();
    }
}
