// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Long-term keys of both roles and the key recovered by the client.
//!
//! A deployment is configured through these types: the server persists its
//! [`ServerSecretKey`] and publishes its [`ServerPublicKey`], each client
//! persists its [`ClientSecretKey`] next to the server public key it trusts.

use core::fmt;
use core::ops::Deref;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;

use hkdf::Hkdf;

use rand::CryptoRng;
use rand::RngCore;

use sha2::Sha512;

use subtle::ConstantTimeEq;

use zeroize::Zeroize;

use crate::errors::{Error, Result};
use crate::group::{point_from_bytes, point_to_bytes, random_scalar, scalar_base_mult, scalar_from_bytes};
use crate::hashing::domains;

/// Length in bytes of the key recovered by the client.
pub const ACCOUNT_KEY_LENGTH: usize = 32;

fn nonzero_scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
    let scalar = scalar_from_bytes(bytes)?;

    if scalar == Scalar::zero() {
        return Err(Error::InvalidEncoding);
    }

    Ok(scalar)
}

/// The server's long-term hardening key \\( x \\).
#[derive(Clone, Eq, PartialEq, Zeroize)]
#[zeroize(drop)]
pub struct ServerSecretKey(pub(crate) Scalar);

impl ServerSecretKey {
    /// Sample a fresh random nonzero key.
    pub fn generate<R: RngCore + CryptoRng>(csprng: &mut R) -> Result<Self> {
        Ok(ServerSecretKey(random_scalar(csprng)?))
    }

    /// Compute the matching public key \\( X = x \cdot G \\).
    pub fn to_public(&self) -> ServerPublicKey {
        ServerPublicKey(scalar_base_mult(&self.0))
    }

    /// Serialise this secret key as an array of bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Deserialise this slice of bytes to a `ServerSecretKey`.
    ///
    /// Up to 32 little-endian bytes are accepted; the zero key is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<ServerSecretKey> {
        Ok(ServerSecretKey(nonzero_scalar_from_bytes(bytes)?))
    }
}

impl Deref for ServerSecretKey {
    type Target = Scalar;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for ServerSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ServerSecretKey([REDACTED])")
    }
}

/// The server's public key \\( X = x \cdot G \\), against which the client
/// verifies every proof.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ServerPublicKey(pub(crate) RistrettoPoint);

impl ServerPublicKey {
    /// Serialise this public key as an array of bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        point_to_bytes(&self.0)
    }

    /// Deserialise this slice of bytes to a `ServerPublicKey`
    pub fn from_bytes(bytes: &[u8]) -> Result<ServerPublicKey> {
        Ok(ServerPublicKey(point_from_bytes(bytes)?))
    }
}

impl Deref for ServerPublicKey {
    type Target = RistrettoPoint;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The client's long-term blinding key \\( y \\).
#[derive(Clone, Eq, PartialEq, Zeroize)]
#[zeroize(drop)]
pub struct ClientSecretKey(pub(crate) Scalar);

impl ClientSecretKey {
    /// Sample a fresh random nonzero key.
    pub fn generate<R: RngCore + CryptoRng>(csprng: &mut R) -> Result<Self> {
        Ok(ClientSecretKey(random_scalar(csprng)?))
    }

    /// Serialise this secret key as an array of bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Deserialise this slice of bytes to a `ClientSecretKey`.
    ///
    /// Up to 32 little-endian bytes are accepted; the zero key is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<ClientSecretKey> {
        Ok(ClientSecretKey(nonzero_scalar_from_bytes(bytes)?))
    }
}

impl Deref for ClientSecretKey {
    type Target = Scalar;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for ClientSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ClientSecretKey([REDACTED])")
    }
}

/// The secret protected by an enrollment record.
///
/// It is derived with HKDF-SHA-512 from the random point \\( M \\) the client
/// embeds into the record, and can only be recomputed after the server
/// confirmed a password match.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct AccountKey([u8; ACCOUNT_KEY_LENGTH]);

impl AccountKey {
    pub(crate) fn derive(m: &RistrettoPoint) -> Result<Self> {
        let mut ikm = point_to_bytes(m);
        let hkdf = Hkdf::<Sha512>::new(None, &ikm[..]);
        ikm.zeroize();

        let mut key = [0u8; ACCOUNT_KEY_LENGTH];
        hkdf.expand(domains::ACCOUNT_KEY, &mut key)
            .map_err(|_| Error::KeyDerivationError)?;

        Ok(AccountKey(key))
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; ACCOUNT_KEY_LENGTH] {
        &self.0
    }
}

impl PartialEq for AccountKey {
    fn eq(&self, other: &AccountKey) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for AccountKey {}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AccountKey([REDACTED])")
    }
}
