// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Wire containers exchanged between the server, the client and the storage
//! layer.
//!
//! Every container carries raw byte fields and exposes a `parse` method which
//! validates the 32-byte bound of every field and decodes points and scalars
//! eagerly, so that no arithmetic ever runs on unvalidated input.  With the
//! `serde` feature enabled the containers can be (de)serialised, for instance
//! to JSON.

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::group::{
    check_field_length, point_from_bytes, point_to_bytes, scalar_from_bytes, scalar_to_bytes,
    POINT_LENGTH,
};
use crate::nizk::{NizkOfFailure, NizkOfSuccess};

/// Everything the application stores for an enrolled account.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnrollmentRecord {
    /// Server nonce.
    pub ns: Vec<u8>,
    /// Client nonce.
    pub nc: Vec<u8>,
    /// \\( T_0 = C_0 + y \cdot H_{C0} \\)
    #[cfg_attr(feature = "serde", serde(rename = "t_0"))]
    pub t0: Vec<u8>,
    /// \\( T_1 = C_1 + y \cdot H_{C1} + y \cdot M \\)
    #[cfg_attr(feature = "serde", serde(rename = "t_1"))]
    pub t1: Vec<u8>,
}

/// The typed content of an [`EnrollmentRecord`].
#[derive(Clone, Debug)]
pub(crate) struct ParsedRecord<'a> {
    pub(crate) ns: &'a [u8],
    pub(crate) nc: &'a [u8],
    pub(crate) t0: RistrettoPoint,
    pub(crate) t1: RistrettoPoint,
}

impl EnrollmentRecord {
    pub(crate) fn new(ns: &[u8], nc: &[u8], t0: &RistrettoPoint, t1: &RistrettoPoint) -> Self {
        EnrollmentRecord {
            ns: ns.to_vec(),
            nc: nc.to_vec(),
            t0: point_to_bytes(t0).to_vec(),
            t1: point_to_bytes(t1).to_vec(),
        }
    }

    pub(crate) fn parse(&self) -> Result<ParsedRecord<'_>> {
        check_field_length(&self.ns)?;
        check_field_length(&self.nc)?;
        check_field_length(&self.t0)?;
        check_field_length(&self.t1)?;

        Ok(ParsedRecord {
            ns: &self.ns,
            nc: &self.nc,
            t0: point_from_bytes(&self.t0)?,
            t1: point_from_bytes(&self.t1)?,
        })
    }

    /// Serialise this record as a Vec of bytes.
    ///
    /// The layout is `len(ns) || ns || len(nc) || nc || t0 || t1` with one-byte
    /// lengths.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut res: Vec<u8> = Vec::with_capacity(2 + self.ns.len() + self.nc.len() + 2 * POINT_LENGTH);
        res.push(self.ns.len() as u8);
        res.extend_from_slice(&self.ns);
        res.push(self.nc.len() as u8);
        res.extend_from_slice(&self.nc);
        res.extend_from_slice(&self.t0);
        res.extend_from_slice(&self.t1);

        res
    }

    /// Deserialise this slice of bytes to an `EnrollmentRecord`, validating
    /// every field.
    pub fn from_bytes(bytes: &[u8]) -> Result<EnrollmentRecord> {
        let (ns, rest) = split_length_prefixed(bytes)?;
        let (nc, rest) = split_length_prefixed(rest)?;

        if rest.len() != 2 * POINT_LENGTH {
            return Err(Error::MalformedInput);
        }

        let record = EnrollmentRecord {
            ns: ns.to_vec(),
            nc: nc.to_vec(),
            t0: rest[..POINT_LENGTH].to_vec(),
            t1: rest[POINT_LENGTH..].to_vec(),
        };
        record.parse()?;

        Ok(record)
    }
}

fn split_length_prefixed(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = bytes.split_first().ok_or(Error::MalformedInput)?;
    let len = *len as usize;

    if rest.len() < len {
        return Err(Error::MalformedInput);
    }
    let (field, rest) = rest.split_at(len);
    check_field_length(field)?;

    Ok((field, rest))
}

/// Wire form of a [`NizkOfSuccess`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProofOfSuccess {
    /// Commitment to the blinding scalar on the first evaluation base.
    #[cfg_attr(feature = "serde", serde(rename = "term_1"))]
    pub term1: Vec<u8>,
    /// Commitment to the blinding scalar on the second evaluation base.
    #[cfg_attr(feature = "serde", serde(rename = "term_2"))]
    pub term2: Vec<u8>,
    /// Commitment to the blinding scalar on the generator.
    #[cfg_attr(feature = "serde", serde(rename = "term_3"))]
    pub term3: Vec<u8>,
    /// Response scalar.
    pub blind_x: Vec<u8>,
}

impl ProofOfSuccess {
    pub(crate) fn parse(&self) -> Result<NizkOfSuccess> {
        check_field_length(&self.term1)?;
        check_field_length(&self.term2)?;
        check_field_length(&self.term3)?;
        check_field_length(&self.blind_x)?;

        Ok(NizkOfSuccess {
            term1: point_from_bytes(&self.term1)?,
            term2: point_from_bytes(&self.term2)?,
            term3: point_from_bytes(&self.term3)?,
            blind_x: scalar_from_bytes(&self.blind_x)?,
        })
    }
}

impl From<&NizkOfSuccess> for ProofOfSuccess {
    fn from(proof: &NizkOfSuccess) -> ProofOfSuccess {
        ProofOfSuccess {
            term1: point_to_bytes(&proof.term1).to_vec(),
            term2: point_to_bytes(&proof.term2).to_vec(),
            term3: point_to_bytes(&proof.term3).to_vec(),
            blind_x: scalar_to_bytes(&proof.blind_x).to_vec(),
        }
    }
}

/// Wire form of a [`NizkOfFailure`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProofOfFail {
    /// Commitment on the claimed evaluation.
    #[cfg_attr(feature = "serde", serde(rename = "term_1"))]
    pub term1: Vec<u8>,
    /// Commitment on the first evaluation base.
    #[cfg_attr(feature = "serde", serde(rename = "term_2"))]
    pub term2: Vec<u8>,
    /// Commitment on the server public key.
    #[cfg_attr(feature = "serde", serde(rename = "term_3"))]
    pub term3: Vec<u8>,
    /// Commitment on the generator.
    #[cfg_attr(feature = "serde", serde(rename = "term_4"))]
    pub term4: Vec<u8>,
    /// First response scalar.
    pub blind_a: Vec<u8>,
    /// Second response scalar.
    pub blind_b: Vec<u8>,
}

impl ProofOfFail {
    pub(crate) fn parse(&self) -> Result<NizkOfFailure> {
        check_field_length(&self.term1)?;
        check_field_length(&self.term2)?;
        check_field_length(&self.term3)?;
        check_field_length(&self.term4)?;
        check_field_length(&self.blind_a)?;
        check_field_length(&self.blind_b)?;

        Ok(NizkOfFailure {
            term1: point_from_bytes(&self.term1)?,
            term2: point_from_bytes(&self.term2)?,
            term3: point_from_bytes(&self.term3)?,
            term4: point_from_bytes(&self.term4)?,
            blind_a: scalar_from_bytes(&self.blind_a)?,
            blind_b: scalar_from_bytes(&self.blind_b)?,
        })
    }
}

impl From<&NizkOfFailure> for ProofOfFail {
    fn from(proof: &NizkOfFailure) -> ProofOfFail {
        ProofOfFail {
            term1: point_to_bytes(&proof.term1).to_vec(),
            term2: point_to_bytes(&proof.term2).to_vec(),
            term3: point_to_bytes(&proof.term3).to_vec(),
            term4: point_to_bytes(&proof.term4).to_vec(),
            blind_a: scalar_to_bytes(&proof.blind_a).to_vec(),
            blind_b: scalar_to_bytes(&proof.blind_b).to_vec(),
        }
    }
}

/// The server's answer to an enrollment request: a fresh nonce, the
/// evaluations of both bases derived from it, and a proof of their
/// correctness.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnrollmentResponse {
    /// Server nonce.
    pub ns: Vec<u8>,
    /// \\( C_0 = x \cdot H_0 \\)
    #[cfg_attr(feature = "serde", serde(rename = "c_0"))]
    pub c0: Vec<u8>,
    /// \\( C_1 = x \cdot H_1 \\)
    #[cfg_attr(feature = "serde", serde(rename = "c_1"))]
    pub c1: Vec<u8>,
    /// Proof that both evaluations used the server key.
    pub proof: ProofOfSuccess,
}

pub(crate) struct ParsedEnrollmentResponse<'a> {
    pub(crate) ns: &'a [u8],
    pub(crate) c0: RistrettoPoint,
    pub(crate) c1: RistrettoPoint,
    pub(crate) proof: NizkOfSuccess,
}

impl EnrollmentResponse {
    pub(crate) fn parse(&self) -> Result<ParsedEnrollmentResponse<'_>> {
        check_field_length(&self.ns)?;
        check_field_length(&self.c0)?;
        check_field_length(&self.c1)?;

        Ok(ParsedEnrollmentResponse {
            ns: &self.ns,
            c0: point_from_bytes(&self.c0)?,
            c1: point_from_bytes(&self.c1)?,
            proof: self.proof.parse()?,
        })
    }
}

/// A password verification attempt sent by the client.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VerifyPasswordRequest {
    /// Server nonce of the record being checked.
    pub ns: Vec<u8>,
    /// \\( C_0' = T_0 - y \cdot H_{C0}' \\), derived from the attempted password.
    #[cfg_attr(feature = "serde", serde(rename = "c_0"))]
    pub c0: Vec<u8>,
}

impl VerifyPasswordRequest {
    pub(crate) fn parse(&self) -> Result<(&[u8], RistrettoPoint)> {
        check_field_length(&self.ns)?;
        check_field_length(&self.c0)?;

        Ok((&self.ns, point_from_bytes(&self.c0)?))
    }
}

/// The server's verdict on a [`VerifyPasswordRequest`].
///
/// `proof_success` is present iff `res` is `true`, `proof_fail` iff it is
/// `false`.  On success `c1` is \\( x \cdot H_1 \\), otherwise it is the
/// randomized difference proven by `proof_fail`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VerifyPasswordResponse {
    /// Whether the attempted password matched.
    pub res: bool,
    /// Second evaluation, or randomized difference on a mismatch.
    #[cfg_attr(feature = "serde", serde(rename = "c_1"))]
    pub c1: Vec<u8>,
    /// Proof of a correct match.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub proof_success: Option<ProofOfSuccess>,
    /// Proof of a correct mismatch.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub proof_fail: Option<ProofOfFail>,
}

pub(crate) enum ParsedVerdict {
    Success(RistrettoPoint, NizkOfSuccess),
    Fail(RistrettoPoint, NizkOfFailure),
}

impl VerifyPasswordResponse {
    pub(crate) fn parse(&self) -> Result<ParsedVerdict> {
        check_field_length(&self.c1)?;

        match (self.res, &self.proof_success, &self.proof_fail) {
            (true, Some(proof), None) => {
                let proof = proof.parse()?;
                Ok(ParsedVerdict::Success(point_from_bytes(&self.c1)?, proof))
            },
            (false, None, Some(proof)) => {
                let proof = proof.parse()?;
                Ok(ParsedVerdict::Fail(point_from_bytes(&self.c1)?, proof))
            },
            _ => Err(Error::MalformedInput),
        }
    }
}

/// Coefficients \\( (a, b) \\) of a server key rotation
/// \\( x' = a \cdot x + b \\).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateToken {
    /// Multiplicative coefficient.
    pub a: Vec<u8>,
    /// Additive coefficient.
    pub b: Vec<u8>,
}

impl UpdateToken {
    pub(crate) fn new(a: &Scalar, b: &Scalar) -> Self {
        UpdateToken {
            a: scalar_to_bytes(a).to_vec(),
            b: scalar_to_bytes(b).to_vec(),
        }
    }

    /// The multiplicative coefficient must be invertible, otherwise the
    /// rotation would collapse every record.
    pub(crate) fn parse(&self) -> Result<(Scalar, Scalar)> {
        check_field_length(&self.a)?;
        check_field_length(&self.b)?;

        let a = scalar_from_bytes(&self.a)?;
        let b = scalar_from_bytes(&self.b)?;

        if a == Scalar::zero() {
            return Err(Error::InvalidEncoding);
        }

        Ok((a, b))
    }
}

/// Encode an attempted evaluation as a [`VerifyPasswordRequest`].
pub(crate) fn verify_password_request(ns: &[u8], c0: &RistrettoPoint) -> VerifyPasswordRequest {
    VerifyPasswordRequest {
        ns: ns.to_vec(),
        c0: point_to_bytes(c0).to_vec(),
    }
}
