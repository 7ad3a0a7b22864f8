// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Domain-separated hashing onto the group and onto the scalar field.

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;

use sha2::Digest;
use sha2::Sha512;

/// Domain separation tags.  Changing any of them changes every record and
/// every proof produced by the crate.
pub mod domains {
    /// First server evaluation base, derived from the server nonce.
    pub const HS0: &[u8] = b"phe-ristretto-v1/hs0";
    /// Second server evaluation base, derived from the server nonce.
    pub const HS1: &[u8] = b"phe-ristretto-v1/hs1";
    /// First client base, derived from the client nonce and the password.
    pub const HC0: &[u8] = b"phe-ristretto-v1/hc0";
    /// Second client base, derived from the client nonce and the password.
    pub const HC1: &[u8] = b"phe-ristretto-v1/hc1";
    /// Fiat-Shamir challenge of the proof of a correct match.
    pub const PROOF_OK: &[u8] = b"phe-ristretto-v1/proof-ok";
    /// Fiat-Shamir challenge of the proof of a correct mismatch.
    pub const PROOF_ERR: &[u8] = b"phe-ristretto-v1/proof-err";
    /// HKDF info string for the key recovered by the client.
    pub const ACCOUNT_KEY: &[u8] = b"phe-ristretto-v1/account-key";
    /// HKDF info string for the data encryption key schedule.
    pub const ENCRYPTION: &[u8] = b"phe-ristretto-v1/encryption";
}

/// Absorb the domain tag and every item, each prefixed by its length, so that
/// distinct item sequences never produce the same hash input.
fn transcript(domain: &[u8], items: &[&[u8]]) -> Sha512 {
    let mut h = Sha512::new();

    h.update((domain.len() as u64).to_le_bytes());
    h.update(domain);
    for item in items {
        h.update((item.len() as u64).to_le_bytes());
        h.update(item);
    }

    h
}

/// Deterministically map a sequence of byte strings to a group element.
///
/// The SHA-512 digest of the domain-separated input is mapped with the
/// Ristretto Elligator map applied twice, which yields points
/// indistinguishable from uniformly random ones.
pub fn hash_to_point(domain: &[u8], items: &[&[u8]]) -> RistrettoPoint {
    RistrettoPoint::from_hash(transcript(domain, items))
}

/// Deterministically map a sequence of byte strings to a scalar, reducing a
/// 512-bit digest modulo the group order.
///
/// This is the Fiat-Shamir challenge of both proofs: prover and verifier must
/// pass identical items in the identical order.
pub fn hash_to_scalar(domain: &[u8], items: &[&[u8]]) -> Scalar {
    Scalar::from_hash(transcript(domain, items))
}

/// The two evaluation bases \\( (H_0, H_1) \\) the server derives from a
/// nonce \\( n_S \\).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ServerBases {
    /// \\( H_0 = \mathcal{H}(\mathsf{hs0}, n_S) \\)
    pub hs0: RistrettoPoint,
    /// \\( H_1 = \mathcal{H}(\mathsf{hs1}, n_S) \\)
    pub hs1: RistrettoPoint,
}

impl ServerBases {
    /// Derive the evaluation bases for the server nonce `ns`.
    pub fn from_nonce(ns: &[u8]) -> Self {
        ServerBases {
            hs0: hash_to_point(domains::HS0, &[ns]),
            hs1: hash_to_point(domains::HS1, &[ns]),
        }
    }
}

/// The two password-dependent bases \\( (H_{C0}, H_{C1}) \\) the client
/// derives from its nonce \\( n_C \\) and a password.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClientBases {
    /// \\( H_{C0} = \mathcal{H}(\mathsf{hc0}, n_C, pw) \\)
    pub hc0: RistrettoPoint,
    /// \\( H_{C1} = \mathcal{H}(\mathsf{hc1}, n_C, pw) \\)
    pub hc1: RistrettoPoint,
}

impl ClientBases {
    /// Derive the client bases for the client nonce `nc` and `password`.
    pub fn from_nonce_and_password(nc: &[u8], password: &[u8]) -> Self {
        ClientBases {
            hc0: hash_to_point(domains::HC0, &[nc, password]),
            hc1: hash_to_point(domains::HC1, &[nc, password]),
        }
    }
}
