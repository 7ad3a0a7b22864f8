// -*- mode: rust; -*-
//
// This file is part of phe-ristretto.
// Copyright (c) 2023 Toposware Inc.
// See LICENSE for licensing information.
//
// Authors:
// - Toposware developers <dev@toposware.com>

//! Authenticated encryption of application data under an [`AccountKey`].
//!
//! A ciphertext is laid out as `salt || body || tag` where:
//!
//! * `salt` is 32 fresh random bytes,
//! * `body` is the plaintext under AES-256-CTR,
//! * `tag` is HMAC-SHA-256 over `salt || body`.
//!
//! The cipher key, counter nonce and MAC key are expanded with HKDF-SHA-512
//! from the account key and the salt, so no key material is reused across
//! ciphertexts.

use aes::cipher::{generic_array::GenericArray, FromBlockCipher, NewBlockCipher, StreamCipher};
use aes::{Aes256, Aes256Ctr};

use hkdf::Hkdf;

use hmac::{Hmac, Mac, NewMac};

use rand::CryptoRng;
use rand::RngCore;

use sha2::{Sha256, Sha512};

use tracing::warn;

use zeroize::Zeroize;

use crate::errors::{Error, Result};
use crate::group::{random_nonce, NONCE_LENGTH as SALT_LENGTH};
use crate::hashing::domains;
use crate::keys::AccountKey;

const TAG_LENGTH: usize = 32;

const AES_KEY_LENGTH: usize = 32;
const CTR_NONCE_LENGTH: usize = 16;
const MAC_KEY_LENGTH: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Per-ciphertext keys expanded from the account key.
#[derive(Zeroize)]
#[zeroize(drop)]
struct KeySchedule {
    aes_key: [u8; AES_KEY_LENGTH],
    nonce: [u8; CTR_NONCE_LENGTH],
    mac_key: [u8; MAC_KEY_LENGTH],
}

impl KeySchedule {
    fn derive(key: &AccountKey, salt: &[u8]) -> Result<Self> {
        let hkdf = Hkdf::<Sha512>::new(Some(salt), &key.as_bytes()[..]);

        let mut okm = [0u8; AES_KEY_LENGTH + CTR_NONCE_LENGTH + MAC_KEY_LENGTH];
        hkdf.expand(domains::ENCRYPTION, &mut okm)
            .map_err(|_| Error::KeyDerivationError)?;

        let mut schedule = KeySchedule {
            aes_key: [0u8; AES_KEY_LENGTH],
            nonce: [0u8; CTR_NONCE_LENGTH],
            mac_key: [0u8; MAC_KEY_LENGTH],
        };
        schedule.aes_key.copy_from_slice(&okm[..AES_KEY_LENGTH]);
        schedule.nonce.copy_from_slice(&okm[AES_KEY_LENGTH..AES_KEY_LENGTH + CTR_NONCE_LENGTH]);
        schedule.mac_key.copy_from_slice(&okm[AES_KEY_LENGTH + CTR_NONCE_LENGTH..]);
        okm.zeroize();

        Ok(schedule)
    }

    fn apply_keystream(&self, data: &mut [u8]) {
        let aes_key = GenericArray::from_slice(&self.aes_key);
        let nonce = GenericArray::from_slice(&self.nonce);
        let cipher = Aes256::new(aes_key);
        let mut cipher = Aes256Ctr::from_block_cipher(cipher, nonce);

        cipher.apply_keystream(data);
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.mac_key).map_err(|_| Error::KeyDerivationError)
    }
}

/// Encrypt `plaintext` under `key`.
pub fn encrypt<R: RngCore + CryptoRng>(plaintext: &[u8], key: &AccountKey, csprng: &mut R) -> Result<Vec<u8>> {
    let salt: [u8; SALT_LENGTH] = random_nonce(csprng)?;

    let schedule = KeySchedule::derive(key, &salt)?;

    let mut ciphertext = Vec::with_capacity(SALT_LENGTH + plaintext.len() + TAG_LENGTH);
    ciphertext.extend_from_slice(&salt);
    ciphertext.extend_from_slice(plaintext);
    schedule.apply_keystream(&mut ciphertext[SALT_LENGTH..]);

    let mut mac = schedule.mac()?;
    mac.update(&ciphertext);
    ciphertext.extend_from_slice(&mac.finalize().into_bytes());

    Ok(ciphertext)
}

/// Decrypt a ciphertext produced by [`encrypt`] under `key`.
///
/// # Errors
///
/// [`Error::DecryptionError`] if the ciphertext is truncated, was modified,
/// or was encrypted under another key.
pub fn decrypt(ciphertext: &[u8], key: &AccountKey) -> Result<Vec<u8>> {
    if ciphertext.len() < SALT_LENGTH + TAG_LENGTH {
        return Err(Error::DecryptionError);
    }

    let (authenticated, tag) = ciphertext.split_at(ciphertext.len() - TAG_LENGTH);
    let schedule = KeySchedule::derive(key, &authenticated[..SALT_LENGTH])?;

    let mut mac = schedule.mac()?;
    mac.update(authenticated);
    mac.verify(tag).map_err(|_| {
        warn!("Rejected ciphertext with an invalid tag.");
        Error::DecryptionError
    })?;

    let mut plaintext = authenticated[SALT_LENGTH..].to_vec();
    schedule.apply_keystream(&mut plaintext);

    Ok(plaintext)
}
