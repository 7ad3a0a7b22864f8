// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Arithmetic and encodings for the prime-order group used by the protocol.
//!
//! All protocol points live in the Ristretto group, which has prime order
//! \\( q = 2^{252} + 27742317777372353535851937790883648493 \\) and a canonical
//! 32-byte encoding.  Point addition, negation and scalar multiplication are
//! the operator overloads of [`RistrettoPoint`] and [`Scalar`]; this module
//! adds what the protocol needs on top of them: bounded decoding of wire
//! bytes, constant-time comparison, and fallible sampling of secrets.

use core::convert::TryInto;

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_TABLE;
use curve25519_dalek::ristretto::CompressedRistretto;
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::IsIdentity;

use rand::CryptoRng;
use rand::RngCore;

use subtle::ConstantTimeEq;

use tracing::error;

use zeroize::Zeroize;

use crate::errors::{Error, Result};

/// Length in bytes of an encoded group element.
pub const POINT_LENGTH: usize = 32;
/// Length in bytes of an encoded scalar.
pub const SCALAR_LENGTH: usize = 32;
/// Upper bound on the length of every byte field exchanged by the protocol.
pub const MAX_FIELD_LENGTH: usize = 32;
/// Length in bytes of the nonces generated by the server and the client.
pub const NONCE_LENGTH: usize = 32;

/// The distinguished generator \\( G \\) of the group.
pub fn generator() -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT
}

/// Compute \\( k \cdot G \\) using the precomputed basepoint table.
pub fn scalar_base_mult(k: &Scalar) -> RistrettoPoint {
    k * &RISTRETTO_BASEPOINT_TABLE
}

/// Compare two group elements in constant time.
pub fn points_equal(p: &RistrettoPoint, q: &RistrettoPoint) -> bool {
    p.ct_eq(q).into()
}

/// Serialise a group element to its canonical 32-byte encoding.
pub fn point_to_bytes(point: &RistrettoPoint) -> [u8; POINT_LENGTH] {
    point.compress().to_bytes()
}

/// Deserialise a protocol point.
///
/// Empty or over-width inputs are rejected as [`Error::MalformedInput`]
/// before any decoding happens.  Inputs of any other length, non-canonical
/// encodings and the identity element are rejected as
/// [`Error::InvalidEncoding`].
pub fn point_from_bytes(bytes: &[u8]) -> Result<RistrettoPoint> {
    check_field_length(bytes)?;

    let array: [u8; POINT_LENGTH] = bytes
        .try_into()
        .map_err(|_| Error::InvalidEncoding)?;

    let point = CompressedRistretto(array)
        .decompress()
        .ok_or(Error::InvalidEncoding)?;

    if point.is_identity() {
        return Err(Error::InvalidEncoding);
    }

    Ok(point)
}

/// Serialise a scalar to its canonical little-endian 32-byte encoding.
pub fn scalar_to_bytes(scalar: &Scalar) -> [u8; SCALAR_LENGTH] {
    scalar.to_bytes()
}

/// Deserialise a scalar from at most 32 little-endian bytes.
///
/// Shorter inputs are zero-extended.  The value must be reduced modulo the
/// group order.
pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
    check_field_length(bytes)?;

    let mut array = [0u8; SCALAR_LENGTH];
    array[..bytes.len()].copy_from_slice(bytes);

    let scalar = Scalar::from_canonical_bytes(array);
    array.zeroize();

    scalar.ok_or(Error::InvalidEncoding)
}

/// Sample a uniformly random nonzero scalar.
///
/// The scalar is obtained by reducing 64 random bytes modulo the group order,
/// and resampled in the (negligible) event it is zero.
pub fn random_scalar<R: RngCore + CryptoRng>(csprng: &mut R) -> Result<Scalar> {
    let mut wide = [0u8; 64];

    loop {
        fill_random(csprng, &mut wide)?;
        let scalar = Scalar::from_bytes_mod_order_wide(&wide);
        wide.zeroize();

        if scalar != Scalar::zero() {
            return Ok(scalar);
        }
    }
}

/// Sample a uniformly random group element with unknown discrete logarithm.
pub fn random_point<R: RngCore + CryptoRng>(csprng: &mut R) -> Result<RistrettoPoint> {
    let mut wide = [0u8; 64];
    fill_random(csprng, &mut wide)?;
    let point = RistrettoPoint::from_uniform_bytes(&wide);
    wide.zeroize();

    Ok(point)
}

/// Sample a fresh protocol nonce.
pub fn random_nonce<R: RngCore + CryptoRng>(csprng: &mut R) -> Result<[u8; NONCE_LENGTH]> {
    let mut nonce = [0u8; NONCE_LENGTH];
    fill_random(csprng, &mut nonce)?;

    Ok(nonce)
}

/// Reject empty and over-width wire fields.
pub(crate) fn check_field_length(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() || bytes.len() > MAX_FIELD_LENGTH {
        return Err(Error::MalformedInput);
    }

    Ok(())
}

fn fill_random<R: RngCore + CryptoRng>(csprng: &mut R, dest: &mut [u8]) -> Result<()> {
    csprng.try_fill_bytes(dest).map_err(|e| {
        error!("Secure random source failed: {}", e);
        Error::SecureRandomUnavailable
    })
}
