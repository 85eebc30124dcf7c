//! Wrappers for the OpenSSL primitives used by the Arq formats.
//!
//! Arq wraps every stored object in a two-layer AES-256-CBC envelope
//! authenticated with HMAC-SHA256, derives its master keys with
//! PBKDF2-HMAC-SHA1 and addresses objects by SHA1. These helpers keep
//! the OpenSSL plumbing in one place; the envelope logic itself lives
//! in the datastore crate.

use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::Signer;
use openssl::symm::Cipher;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptError {
    #[error("openssl error: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),

    #[error("cipher round-trip mismatch (re-encrypted plaintext differs from ciphertext)")]
    RoundTrip,
}

pub type Result<T> = std::result::Result<T, CryptError>;

/// AES-256-CBC encrypt with PKCS7 padding.
pub fn aes_cbc_encrypt(data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    Ok(openssl::symm::encrypt(
        Cipher::aes_256_cbc(),
        key,
        Some(iv),
        data,
    )?)
}

/// AES-256-CBC decrypt with PKCS7 padding.
pub fn aes_cbc_decrypt(data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    Ok(openssl::symm::decrypt(
        Cipher::aes_256_cbc(),
        key,
        Some(iv),
        data,
    )?)
}

/// Decrypt, then re-encrypt the plaintext and require the result to
/// reproduce the input exactly.
///
/// This guards against a decrypt/encrypt asymmetry bug corrupting data
/// without any other symptom; the check is cheap relative to the I/O
/// that precedes it.
pub fn aes_cbc_decrypt_verified(data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    let plain = aes_cbc_decrypt(data, key, iv)?;
    if aes_cbc_encrypt(&plain, key, iv)? != data {
        return Err(CryptError::RoundTrip);
    }
    Ok(plain)
}

/// Constant-time comparison of a computed MAC against a stored one.
/// Length mismatch is an immediate failure.
pub fn mac_matches(computed: &[u8], stored: &[u8]) -> bool {
    computed.len() == stored.len() && openssl::memcmp::eq(computed, stored)
}

pub fn hmac_sha256(data: &[u8], key: &[u8]) -> Result<[u8; 32]> {
    let pkey = PKey::hmac(key)?;
    let mut signer = Signer::new(MessageDigest::sha256(), &pkey)?;
    signer.update(data)?;
    let sig = signer.sign_to_vec()?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&sig);
    Ok(out)
}

pub fn sha1(data: &[u8]) -> [u8; 20] {
    openssl::sha::sha1(data)
}

pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(sha1(data))
}

/// PBKDF2 with HMAC-SHA1 as the PRF, writing `out.len()` bytes.
pub fn pbkdf2_sha1(passphrase: &[u8], salt: &[u8], iterations: usize, out: &mut [u8]) -> Result<()> {
    openssl::pkcs5::pbkdf2_hmac(passphrase, salt, iterations, MessageDigest::sha1(), out)?;
    Ok(())
}
