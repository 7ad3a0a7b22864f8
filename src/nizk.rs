// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Zero-knowledge proofs of a correct match and of a correct mismatch.
//!
//! Both proofs are sigma protocols made non-interactive with the Fiat-Shamir
//! transform.  Challenges are computed with [`hash_to_scalar`] over the
//! server public key \\( X = x \cdot G \\), the generator, the statement and
//! every commitment, in that order.
//!
//! # Proof of a correct match
//!
//! Proves knowledge of \\( x \\) such that \\( X = x \cdot G \\),
//! \\( C_0 = x \cdot H_0 \\) and \\( C_1 = x \cdot H_1 \\).  The prover
//! samples \\( k \stackrel{\\$}{\leftarrow} \mathbb{Z}\_q \\), commits to
//! \\( T_1 = k \cdot H_0 \\), \\( T_2 = k \cdot H_1 \\), \\( T_3 = k \cdot G \\),
//! and responds with \\( s = k + c \cdot x \\).
//!
//! # Proof of a correct mismatch
//!
//! For a claimed \\( C_0 \ne x \cdot H_0 \\) the server samples
//! \\( r \\), sets \\( a = r \\), \\( b = -r \cdot x \\) and discloses
//! \\( C_1 = a \cdot C_0 + b \cdot H_0 = r \cdot (C_0 - x \cdot H_0) \\).  It then
//! proves knowledge of \\( (a, b) \\) such that
//! \\( C_1 = a \cdot C_0 + b \cdot H_0 \\) and
//! \\( I = a \cdot X + b \cdot G \\) where \\( I \\) is the identity.  The second
//! relation forces \\( b = -a \cdot x \\), so a non-identity \\( C_1 \\) can only
//! be produced when \\( C_0 \\) really differs from \\( x \cdot H_0 \\).

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use curve25519_dalek::traits::IsIdentity;

use rand::CryptoRng;
use rand::RngCore;

use zeroize::Zeroize;

use crate::errors::{Error, Result};
use crate::group::{generator, point_to_bytes, points_equal, random_scalar, scalar_base_mult};
use crate::hashing::{domains, hash_to_scalar, ServerBases};

// XXX Blinding scalars must never be reused across two proofs: two transcripts
//     sharing a blinding scalar reveal the server secret.

/// A proof that the server evaluated both bases of a nonce with the secret
/// key matching its public key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NizkOfSuccess {
    /// Commitment \\( k \cdot H_0 \\).
    pub(crate) term1: RistrettoPoint,
    /// Commitment \\( k \cdot H_1 \\).
    pub(crate) term2: RistrettoPoint,
    /// Commitment \\( k \cdot G \\).
    pub(crate) term3: RistrettoPoint,
    /// Response \\( k + c \cdot x \\).
    pub(crate) blind_x: Scalar,
}

impl NizkOfSuccess {
    /// Prove that `c0` and `c1` are the evaluations of `bases` under
    /// `secret_key`, the discrete logarithm of `public_key`.
    pub fn prove<R: RngCore + CryptoRng>(
        secret_key: &Scalar,
        public_key: &RistrettoPoint,
        bases: &ServerBases,
        c0: &RistrettoPoint,
        c1: &RistrettoPoint,
        csprng: &mut R,
    ) -> Result<Self> {
        let mut k = random_scalar(csprng)?;

        let term1 = bases.hs0 * k;
        let term2 = bases.hs1 * k;
        let term3 = scalar_base_mult(&k);

        let c = success_challenge(public_key, c0, c1, &term1, &term2, &term3);
        let blind_x = k + c * secret_key;
        k.zeroize();

        Ok(NizkOfSuccess { term1, term2, term3, blind_x })
    }

    /// Verify the proof for the statement `(public_key, bases, c0, c1)`.
    pub fn verify(
        &self,
        public_key: &RistrettoPoint,
        bases: &ServerBases,
        c0: &RistrettoPoint,
        c1: &RistrettoPoint,
    ) -> Result<()> {
        let c = success_challenge(public_key, c0, c1, &self.term1, &self.term2, &self.term3);

        let first = points_equal(&(bases.hs0 * self.blind_x), &(self.term1 + c0 * c));
        let second = points_equal(&(bases.hs1 * self.blind_x), &(self.term2 + c1 * c));
        let third = points_equal(&scalar_base_mult(&self.blind_x), &(self.term3 + public_key * c));

        if first & second & third {
            return Ok(());
        }

        Err(Error::ProofInvalid)
    }
}

fn success_challenge(
    public_key: &RistrettoPoint,
    c0: &RistrettoPoint,
    c1: &RistrettoPoint,
    term1: &RistrettoPoint,
    term2: &RistrettoPoint,
    term3: &RistrettoPoint,
) -> Scalar {
    hash_to_scalar(
        domains::PROOF_OK,
        &[
            &point_to_bytes(public_key)[..],
            &point_to_bytes(&generator())[..],
            &point_to_bytes(c0)[..],
            &point_to_bytes(c1)[..],
            &point_to_bytes(term1)[..],
            &point_to_bytes(term2)[..],
            &point_to_bytes(term3)[..],
        ],
    )
}

/// A proof that a claimed evaluation differs from the server's evaluation of
/// the first base, tied to the disclosed randomized difference \\( C_1 \\).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NizkOfFailure {
    /// Commitment \\( k_a \cdot C_0 \\).
    pub(crate) term1: RistrettoPoint,
    /// Commitment \\( k_b \cdot H_0 \\).
    pub(crate) term2: RistrettoPoint,
    /// Commitment \\( k_a \cdot X \\).
    pub(crate) term3: RistrettoPoint,
    /// Commitment \\( k_b \cdot G \\).
    pub(crate) term4: RistrettoPoint,
    /// Response \\( k_a + c \cdot a \\).
    pub(crate) blind_a: Scalar,
    /// Response \\( k_b + c \cdot b \\).
    pub(crate) blind_b: Scalar,
}

impl NizkOfFailure {
    /// Compute the randomized difference \\( C_1 \\) between `c0` and the
    /// evaluation of `bases.hs0` under `secret_key`, and prove it was
    /// computed honestly.
    ///
    /// # Returns
    ///
    /// The disclosed point \\( C_1 \\) along with its proof.
    pub fn prove<R: RngCore + CryptoRng>(
        secret_key: &Scalar,
        public_key: &RistrettoPoint,
        bases: &ServerBases,
        c0: &RistrettoPoint,
        csprng: &mut R,
    ) -> Result<(RistrettoPoint, Self)> {
        let mut a = random_scalar(csprng)?;
        let mut b = -(a * secret_key);

        let c1 = c0 * a + bases.hs0 * b;

        let mut k_a = random_scalar(csprng)?;
        let mut k_b = random_scalar(csprng)?;

        let term1 = c0 * k_a;
        let term2 = bases.hs0 * k_b;
        let term3 = public_key * k_a;
        let term4 = scalar_base_mult(&k_b);

        let c = failure_challenge(public_key, c0, &c1, &term1, &term2, &term3, &term4);
        let blind_a = k_a + c * a;
        let blind_b = k_b + c * b;

        a.zeroize();
        b.zeroize();
        k_a.zeroize();
        k_b.zeroize();

        Ok((c1, NizkOfFailure { term1, term2, term3, term4, blind_a, blind_b }))
    }

    /// Verify the proof for the statement `(public_key, bases, c0, c1)`.
    pub fn verify(
        &self,
        public_key: &RistrettoPoint,
        bases: &ServerBases,
        c0: &RistrettoPoint,
        c1: &RistrettoPoint,
    ) -> Result<()> {
        // A correct mismatch always discloses a non-trivial difference.
        if c1.is_identity() {
            return Err(Error::ProofInvalid);
        }

        let c = failure_challenge(public_key, c0, c1, &self.term1, &self.term2, &self.term3, &self.term4);

        let first = points_equal(
            &(c0 * self.blind_a + bases.hs0 * self.blind_b),
            &(self.term1 + self.term2 + c1 * c),
        );
        let i = RistrettoPoint::identity();
        let second = points_equal(
            &(public_key * self.blind_a + scalar_base_mult(&self.blind_b)),
            &(self.term3 + self.term4 + i * c),
        );

        if first & second {
            return Ok(());
        }

        Err(Error::ProofInvalid)
    }
}

fn failure_challenge(
    public_key: &RistrettoPoint,
    c0: &RistrettoPoint,
    c1: &RistrettoPoint,
    term1: &RistrettoPoint,
    term2: &RistrettoPoint,
    term3: &RistrettoPoint,
    term4: &RistrettoPoint,
) -> Scalar {
    hash_to_scalar(
        domains::PROOF_ERR,
        &[
            &point_to_bytes(public_key)[..],
            &point_to_bytes(&generator())[..],
            &point_to_bytes(c0)[..],
            &point_to_bytes(c1)[..],
            &point_to_bytes(term1)[..],
            &point_to_bytes(term2)[..],
            &point_to_bytes(term3)[..],
            &point_to_bytes(term4)[..],
        ],
    )
}
