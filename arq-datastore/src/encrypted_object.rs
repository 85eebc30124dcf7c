//! The per-object encryption envelope.
//!
//! Every stored object (loose or inside a pack) is wrapped as:
//!
//! ```text
//! "ARQO" | hmac(32) | master IV(16) | wrapped session envelope(64) | ciphertext
//! ```
//!
//! The HMAC-SHA256 covers everything after itself and is keyed with the
//! HMAC-creation master key. The wrapped envelope is AES-256-CBC under
//! the master encryption key and the master IV; its plaintext is the
//! data IV(16) followed by a one-off session key(32). The ciphertext is
//! then AES-256-CBC under that session key and data IV. Both
//! decryptions are round-trip verified.

use arq_key_config::MasterKeys;
use arq_tools::byte_reader::ByteReader;
use arq_tools::crypt;

use crate::error::{DecodeCtx, StoreError};
use crate::file_formats::ENCRYPTED_OBJECT_HEADER;

const CTX: &str = "encrypted object";

/// Authenticate and decrypt one `ARQO` envelope.
pub fn decrypt(data: &[u8], keys: &MasterKeys) -> Result<Vec<u8>, StoreError> {
    let mut r = ByteReader::new(data);
    r.verify_header(ENCRYPTED_OBJECT_HEADER).ctx(CTX)?;

    let stored_hmac = r.read_bytes(32).ctx(CTX)?;
    let hmac_scope = &data[r.position()..];
    let master_iv = r.read_bytes(16).ctx(CTX)?;
    let wrapped = r.read_bytes(64).ctx(CTX)?;
    let ciphertext = r.read_remaining();

    let computed = crypt::hmac_sha256(hmac_scope, keys.hmac_creation_key())?;
    if !crypt::mac_matches(&computed, stored_hmac) {
        return Err(StoreError::integrity(CTX, "HMAC mismatch"));
    }

    let session = crypt::aes_cbc_decrypt_verified(wrapped, keys.encryption_key(), master_iv)
        .map_err(|err| integrity_on_round_trip(err, "session envelope"))?;
    if session.len() != 48 {
        return Err(StoreError::format(
            CTX,
            format!("session envelope has {} bytes, expected 48", session.len()),
        ));
    }
    let (data_iv, session_key) = session.split_at(16);

    crypt::aes_cbc_decrypt_verified(ciphertext, session_key, data_iv)
        .map_err(|err| integrity_on_round_trip(err, "payload"))
}

fn integrity_on_round_trip(err: crypt::CryptError, what: &str) -> StoreError {
    match err {
        crypt::CryptError::RoundTrip => {
            StoreError::integrity(CTX, format!("{what} round-trip mismatch"))
        }
        other => StoreError::Crypt(other),
    }
}

/// Build an `ARQO` envelope from explicit IVs and session key.
///
/// Only used to construct store fixtures; real writers draw the IVs and
/// session key from a CSPRNG.
pub fn encrypt(
    plaintext: &[u8],
    keys: &MasterKeys,
    master_iv: &[u8; 16],
    data_iv: &[u8; 16],
    session_key: &[u8; 32],
) -> Result<Vec<u8>, StoreError> {
    let mut session = Vec::with_capacity(48);
    session.extend_from_slice(data_iv);
    session.extend_from_slice(session_key);
    let wrapped = crypt::aes_cbc_encrypt(&session, keys.encryption_key(), master_iv)?;
    debug_assert_eq!(wrapped.len(), 64);

    let ciphertext = crypt::aes_cbc_encrypt(plaintext, session_key, data_iv)?;

    let mut scope = Vec::with_capacity(16 + 64 + ciphertext.len());
    scope.extend_from_slice(master_iv);
    scope.extend_from_slice(&wrapped);
    scope.extend_from_slice(&ciphertext);
    let hmac = crypt::hmac_sha256(&scope, keys.hmac_creation_key())?;

    let mut out = Vec::with_capacity(4 + 32 + scope.len());
    out.extend_from_slice(ENCRYPTED_OBJECT_HEADER.as_bytes());
    out.extend_from_slice(&hmac);
    out.extend_from_slice(&scope);
    Ok(out)
}
