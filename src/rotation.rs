// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Key rotation and migration of stored enrollment records.
//!
//! A rotation replaces the server key \\( x \\) by \\( x' = a \cdot x + b \\)
//! and the client key \\( y \\) by \\( y' = a \cdot y \\).  Every value of the
//! form \\( v = x \cdot H + y \cdot P \\) is then migrated to
//! \\( v' = a \cdot v + b \cdot H = x' \cdot H + y' \cdot P \\) without
//! knowledge of the password, which is how [`update_record`] moves records
//! forward.  The transform is not idempotent: a token must be applied exactly
//! once to each record.

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;

use rand::CryptoRng;
use rand::RngCore;

use tracing::debug;

use zeroize::Zeroize;

use crate::errors::Result;
use crate::group::random_scalar;
use crate::hashing::ServerBases;
use crate::messages::{EnrollmentRecord, UpdateToken};

/// The affine map \\( v \mapsto a \cdot v + b \\) described by an
/// [`UpdateToken`].
#[derive(Zeroize)]
#[zeroize(drop)]
pub(crate) struct Rotation {
    pub(crate) a: Scalar,
    pub(crate) b: Scalar,
}

impl Rotation {
    /// Sample a rotation that maps `secret` to a nonzero key.
    pub(crate) fn generate<R: RngCore + CryptoRng>(secret: &Scalar, csprng: &mut R) -> Result<Self> {
        loop {
            let rotation = Rotation {
                a: random_scalar(csprng)?,
                b: random_scalar(csprng)?,
            };

            if rotation.apply_to_scalar(secret) != Scalar::zero() {
                return Ok(rotation);
            }
        }
    }

    pub(crate) fn from_token(token: &UpdateToken) -> Result<Self> {
        let (a, b) = token.parse()?;

        Ok(Rotation { a, b })
    }

    pub(crate) fn to_token(&self) -> UpdateToken {
        UpdateToken::new(&self.a, &self.b)
    }

    /// \\( x' = a \cdot x + b \\)
    pub(crate) fn apply_to_scalar(&self, x: &Scalar) -> Scalar {
        self.a * x + self.b
    }

    /// \\( V' = a \cdot V + b \cdot H \\)
    pub(crate) fn apply_to_point(&self, v: &RistrettoPoint, base: &RistrettoPoint) -> RistrettoPoint {
        v * self.a + base * self.b
    }
}

/// Migrate an enrollment record to the server key produced by the rotation
/// that issued `token`.
///
/// Only the server nonce is needed to recompute the evaluation bases, so the
/// migration can run as an offline batch job over the whole database.
pub fn update_record(record: &EnrollmentRecord, token: &UpdateToken) -> Result<EnrollmentRecord> {
    let rotation = Rotation::from_token(token)?;
    let parsed = record.parse()?;
    let bases = ServerBases::from_nonce(parsed.ns);

    let t0 = rotation.apply_to_point(&parsed.t0, &bases.hs0);
    let t1 = rotation.apply_to_point(&parsed.t1, &bases.hs1);
    debug!("Updated enrollment record.");

    Ok(EnrollmentRecord::new(parsed.ns, parsed.nc, &t0, &t1))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::Error;
    use crate::group::random_point;
    use rand::rngs::OsRng;

    #[test]
    fn rotation_commutes_with_evaluation() {
        let mut rng = OsRng;
        let x = random_scalar(&mut rng).unwrap();
        let h = random_point(&mut rng).unwrap();
        let rotation = Rotation::generate(&x, &mut rng).unwrap();

        let rotated_x = rotation.apply_to_scalar(&x);

        assert_eq!(rotation.apply_to_point(&(h * x), &h), h * rotated_x);
    }

    #[test]
    fn token_encoding() {
        let mut rng = OsRng;
        let x = random_scalar(&mut rng).unwrap();
        let rotation = Rotation::generate(&x, &mut rng).unwrap();
        let decoded = Rotation::from_token(&rotation.to_token()).unwrap();

        assert_eq!(rotation.a, decoded.a);
        assert_eq!(rotation.b, decoded.b);
    }

    #[test]
    fn update_rejects_malformed_tokens() {
        let mut rng = OsRng;
        let record = EnrollmentRecord::new(
            &[1u8; 32],
            &[2u8; 32],
            &random_point(&mut rng).unwrap(),
            &random_point(&mut rng).unwrap(),
        );
        let token = UpdateToken { a: vec![1u8; 40], b: vec![1u8] };

        assert_eq!(update_record(&record, &token), Err(Error::MalformedInput));
    }

    #[test]
    fn update_preserves_nonces() {
        let mut rng = OsRng;
        let x = random_scalar(&mut rng).unwrap();
        let record = EnrollmentRecord::new(
            &[1u8; 32],
            &[2u8; 32],
            &random_point(&mut rng).unwrap(),
            &random_point(&mut rng).unwrap(),
        );
        let token = Rotation::generate(&x, &mut rng).unwrap().to_token();
        let updated = update_record(&record, &token).unwrap();

        assert_eq!(updated.ns, record.ns);
        assert_eq!(updated.nc, record.nc);
        assert_ne!(updated.t0, record.t0);
        assert_ne!(updated.t1, record.t1);
    }
}
