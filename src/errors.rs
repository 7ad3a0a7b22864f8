// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Errors which may occur while running the protocol.

use core::fmt;

/// Errors that may happen during enrollment, verification, rotation or
/// decryption.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// A wire field is empty, missing or longer than 32 bytes.
    MalformedInput,
    /// A byte string does not decode to a valid group element or to a
    /// canonical scalar.
    InvalidEncoding,
    /// A zero-knowledge proof failed its verification equations.
    ProofInvalid,
    /// The cryptographically secure random source failed.
    SecureRandomUnavailable,
    /// A ciphertext failed authentication or is too short.
    DecryptionError,
    /// A key derivation could not produce the requested output length.
    KeyDerivationError,
    /// The lock guarding the server secret was poisoned by a panicking writer.
    LockPoisoned,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedInput => {
                write!(f, "A field is empty, missing or exceeds 32 bytes.")
            },
            Error::InvalidEncoding => {
                write!(f, "Could not decode a group element or a scalar.")
            },
            Error::ProofInvalid => {
                write!(f, "The zero-knowledge proof is not correct.")
            },
            Error::SecureRandomUnavailable => {
                write!(f, "The secure random number generator failed.")
            },
            Error::DecryptionError => {
                write!(f, "Could not decrypt the ciphertext.")
            },
            Error::KeyDerivationError => {
                write!(f, "Key derivation failed.")
            },
            Error::LockPoisoned => {
                write!(f, "The server key lock is poisoned.")
            },
        }
    }
}

impl std::error::Error for Error {}

/// Result type
pub type Result<T> = core::result::Result<T, Error>;
