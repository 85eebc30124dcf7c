//! Master key handling for Arq object stores.
//!
//! Every computer in a store carries an `encryptionv3.dat` blob holding
//! three 32-byte master keys, themselves encrypted under a key derived
//! from the user's passphrase. [`MasterKeys`] either unwraps that blob
//! or accepts a pre-derived triple of hex keys; the keys are immutable
//! afterwards and are never persisted by this crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arq_tools::byte_reader::{ByteReader, DecodeError};
use arq_tools::crypt::{self, CryptError};

/// Header tag of the `encryptionv3.dat` key file. The tag predates the
/// v3 file name and was never bumped.
pub const ENCRYPTION_DAT_HEADER: &str = "ENCRYPTIONV2";

/// PBKDF2-HMAC-SHA1 iteration count used for passphrase stretching.
pub const PBKDF2_ITERATIONS: usize = 200_000;

#[derive(Debug, Error)]
pub enum KeyConfigError {
    #[error("key file format error: {0}")]
    Format(String),

    #[error("HMAC mismatch in key file (wrong passphrase or corrupted file)")]
    HmacMismatch,

    #[error("key file cipher round-trip mismatch")]
    RoundTrip,

    #[error("invalid hex key: {0}")]
    InvalidHex(String),

    #[error("crypto error: {0}")]
    Crypt(CryptError),
}

impl From<DecodeError> for KeyConfigError {
    fn from(err: DecodeError) -> Self {
        KeyConfigError::Format(err.to_string())
    }
}

impl From<CryptError> for KeyConfigError {
    fn from(err: CryptError) -> Self {
        match err {
            CryptError::RoundTrip => KeyConfigError::RoundTrip,
            other => KeyConfigError::Crypt(other),
        }
    }
}

/// A pre-derived key triple as exchanged with external key stores.
///
/// This is the JSON boundary format only; use
/// [`MasterKeys::from_key_triple`] to turn it into usable keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyTriple {
    pub encryption_key: String,
    pub hmac_creation_key: String,
    pub sha1_computation_key: String,
}

/// The three 32-byte master keys of one computer.
///
/// Derived once, immutable afterwards. The SHA1-computation key is not
/// used while reading a store but is carried so that callers holding a
/// `MasterKeys` have the complete triple.
pub struct MasterKeys {
    encryption_key: [u8; 32],
    hmac_creation_key: [u8; 32],
    sha1_computation_key: [u8; 32],
}

impl MasterKeys {
    /// Unwrap the master keys from the raw contents of an
    /// `encryptionv3.dat` file using the user's passphrase.
    ///
    /// Layout after the header tag: salt(8), HMAC-SHA256(32), IV(16),
    /// encrypted key material(96), padding block(16). The passphrase is
    /// stretched to 64 bytes; the first half decrypts the key material,
    /// the second half authenticates it.
    pub fn from_passphrase(passphrase: &str, data: &[u8]) -> Result<Self, KeyConfigError> {
        let mut r = ByteReader::new(data);
        r.verify_header(ENCRYPTION_DAT_HEADER)?;

        let salt = r.read_bytes(8)?;
        let stored_hmac = r.read_bytes(32)?;
        let iv = r.read_bytes(16)?;
        let key_material = r.read_bytes(96)?;
        let pad = r.read_bytes(16)?;

        let mut derived = [0u8; 64];
        crypt::pbkdf2_sha1(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut derived)?;
        let (k1, k2) = derived.split_at(32);

        let mut hmac_payload = Vec::with_capacity(16 + 96 + 16);
        hmac_payload.extend_from_slice(iv);
        hmac_payload.extend_from_slice(key_material);
        hmac_payload.extend_from_slice(pad);
        let computed = crypt::hmac_sha256(&hmac_payload, k2)?;
        if !crypt::mac_matches(&computed, stored_hmac) {
            return Err(KeyConfigError::HmacMismatch);
        }

        let mut ciphertext = Vec::with_capacity(96 + 16);
        ciphertext.extend_from_slice(key_material);
        ciphertext.extend_from_slice(pad);
        let plain = crypt::aes_cbc_decrypt_verified(&ciphertext, k1, iv)?;
        if plain.len() != 96 {
            return Err(KeyConfigError::Format(format!(
                "decrypted key material has {} bytes, expected 96",
                plain.len()
            )));
        }

        let mut keys = Self {
            encryption_key: [0u8; 32],
            hmac_creation_key: [0u8; 32],
            sha1_computation_key: [0u8; 32],
        };
        keys.encryption_key.copy_from_slice(&plain[0..32]);
        keys.hmac_creation_key.copy_from_slice(&plain[32..64]);
        keys.sha1_computation_key.copy_from_slice(&plain[64..96]);
        Ok(keys)
    }

    /// Use externally supplied hex keys verbatim, skipping derivation.
    pub fn from_hex_keys(
        encryption_key: &str,
        hmac_creation_key: &str,
        sha1_computation_key: &str,
    ) -> Result<Self, KeyConfigError> {
        Ok(Self {
            encryption_key: decode_key(encryption_key)?,
            hmac_creation_key: decode_key(hmac_creation_key)?,
            sha1_computation_key: decode_key(sha1_computation_key)?,
        })
    }

    pub fn from_key_triple(triple: &KeyTriple) -> Result<Self, KeyConfigError> {
        Self::from_hex_keys(
            &triple.encryption_key,
            &triple.hmac_creation_key,
            &triple.sha1_computation_key,
        )
    }

    pub fn encryption_key(&self) -> &[u8; 32] {
        &self.encryption_key
    }

    pub fn hmac_creation_key(&self) -> &[u8; 32] {
        &self.hmac_creation_key
    }

    pub fn sha1_computation_key(&self) -> &[u8; 32] {
        &self.sha1_computation_key
    }
}

fn decode_key(hex_key: &str) -> Result<[u8; 32], KeyConfigError> {
    let raw = hex::decode(hex_key.trim())
        .map_err(|err| KeyConfigError::InvalidHex(err.to_string()))?;
    raw.try_into()
        .map_err(|_| KeyConfigError::InvalidHex("key must be 32 bytes".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPHRASE: &str = "correct horse battery staple";
    const SALT: [u8; 8] = [0x10, 0x32, 0x54, 0x76, 0x98, 0xba, 0xdc, 0xfe];
    const IV: [u8; 16] = [0x42u8; 16];

    fn test_key_material() -> [u8; 96] {
        let mut keys = [0u8; 96];
        for (i, b) in keys.iter_mut().enumerate() {
            *b = (i * 7 % 251) as u8;
        }
        keys
    }

    /// Build a synthetic `encryptionv3.dat` blob the way Arq writes one.
    fn build_encryption_dat(passphrase: &str) -> Vec<u8> {
        let mut derived = [0u8; 64];
        crypt::pbkdf2_sha1(
            passphrase.as_bytes(),
            &SALT,
            PBKDF2_ITERATIONS,
            &mut derived,
        )
        .unwrap();
        let (k1, k2) = derived.split_at(32);

        // 96 bytes of key material -> 112 bytes with the PKCS7 block
        let ciphertext = crypt::aes_cbc_encrypt(&test_key_material(), k1, &IV).unwrap();
        assert_eq!(ciphertext.len(), 112);

        let mut hmac_payload = Vec::new();
        hmac_payload.extend_from_slice(&IV);
        hmac_payload.extend_from_slice(&ciphertext);
        let hmac = crypt::hmac_sha256(&hmac_payload, k2).unwrap();

        let mut out = Vec::new();
        out.extend_from_slice(ENCRYPTION_DAT_HEADER.as_bytes());
        out.extend_from_slice(&SALT);
        out.extend_from_slice(&hmac);
        out.extend_from_slice(&IV);
        out.extend_from_slice(&ciphertext);
        out
    }

    #[test]
    fn unwraps_master_keys_from_passphrase() {
        let blob = build_encryption_dat(PASSPHRASE);
        let keys = MasterKeys::from_passphrase(PASSPHRASE, &blob).unwrap();
        let expected = test_key_material();
        assert_eq!(keys.encryption_key(), &expected[0..32]);
        assert_eq!(keys.hmac_creation_key(), &expected[32..64]);
        assert_eq!(keys.sha1_computation_key(), &expected[64..96]);
    }

    #[test]
    fn wrong_passphrase_is_hmac_mismatch() {
        let blob = build_encryption_dat(PASSPHRASE);
        assert!(matches!(
            MasterKeys::from_passphrase("not the passphrase", &blob),
            Err(KeyConfigError::HmacMismatch)
        ));
    }

    #[test]
    fn bad_header_tag_is_format_error() {
        let mut blob = build_encryption_dat(PASSPHRASE);
        blob[0] = b'X';
        assert!(matches!(
            MasterKeys::from_passphrase(PASSPHRASE, &blob),
            Err(KeyConfigError::Format(_))
        ));
    }

    #[test]
    fn hex_keys_used_verbatim() {
        let enc = "00".repeat(32);
        let hmac = "11".repeat(32);
        let sha = "22".repeat(32);
        let keys = MasterKeys::from_hex_keys(&enc, &hmac, &sha).unwrap();
        assert_eq!(keys.encryption_key(), &[0x00u8; 32]);
        assert_eq!(keys.hmac_creation_key(), &[0x11u8; 32]);
        assert_eq!(keys.sha1_computation_key(), &[0x22u8; 32]);

        assert!(MasterKeys::from_hex_keys("abcd", &hmac, &sha).is_err());
        assert!(MasterKeys::from_hex_keys("zz", &hmac, &sha).is_err());
    }

    #[test]
    fn key_triple_json_round_trip() {
        let triple = KeyTriple {
            encryption_key: "00".repeat(32),
            hmac_creation_key: "11".repeat(32),
            sha1_computation_key: "22".repeat(32),
        };
        let json = serde_json::to_string(&triple).unwrap();
        let parsed: KeyTriple = serde_json::from_str(&json).unwrap();
        let keys = MasterKeys::from_key_triple(&parsed).unwrap();
        assert_eq!(keys.encryption_key(), &[0u8; 32]);
    }
}
