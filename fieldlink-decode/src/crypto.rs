//! Payload decryption.
//!
//! Payloads are AES-128-CBC with a fixed IV and no padding. A block cipher
//! accepts any key, so a wrong key is only detected by content: bytes
//! [`ZERO_REGION`] of a genuine plaintext are always zero.

use std::ops::Range;

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};

use crate::keys::DeviceKey;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Fixed initialisation vector `00 01 .. 0F`.
pub const IV: [u8; BLOCK_LEN] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
];

/// Plaintext bytes that must be zero under the right key.
pub const ZERO_REGION: Range<usize> = 40..48;

/// Decrypt `ciphertext` with `key`.
///
/// Returns `None` unless the ciphertext is a positive multiple of
/// [`BLOCK_LEN`].
pub fn decrypt(key: &DeviceKey, ciphertext: &[u8]) -> Option<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return None;
    }
    Aes128CbcDec::new(&(*key).into(), &IV.into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .ok()
}

/// Whether `plaintext` passes the zero-region check.
///
/// Plaintexts too short to contain the region fail.
pub fn zero_region_clear(plaintext: &[u8]) -> bool {
    plaintext
        .get(ZERO_REGION)
        .is_some_and(|region| region.iter().all(|&b| b == 0))
}

#[cfg(test)]
pub(crate) fn encrypt(key: &DeviceKey, plaintext: &[u8]) -> Vec<u8> {
    use cbc::cipher::BlockEncryptMut;

    cbc::Encryptor::<aes::Aes128>::new(&(*key).into(), &IV.into())
        .encrypt_padded_vec_mut::<NoPadding>(plaintext)
}
