use std::path::PathBuf;

use thiserror::Error;

use arq_key_config::KeyConfigError;
use arq_tools::byte_reader::DecodeError;
use arq_tools::crypt::CryptError;

use crate::object_id::ObjectId;

/// Errors surfaced while reading a store.
///
/// `Format` and `Integrity` are distinct on purpose: a format error
/// means the bytes do not parse as the expected record, an integrity
/// error means they parse but a checksum or MAC does not hold.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("format error in {context}: {msg}")]
    Format { context: String, msg: String },

    #[error("integrity check failed in {context}: {msg}")]
    Integrity { context: String, msg: String },

    #[error("object {0} not found")]
    NotFound(ObjectId),

    #[error("unsupported compression type {0}")]
    Unsupported(i32),

    #[error("value out of range in {context}: {msg}")]
    Overflow { context: String, msg: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Crypt(#[from] CryptError),

    #[error(transparent)]
    KeyConfig(#[from] KeyConfigError),
}

impl StoreError {
    pub fn format(context: &str, msg: impl Into<String>) -> Self {
        StoreError::Format {
            context: context.to_string(),
            msg: msg.into(),
        }
    }

    pub fn integrity(context: &str, msg: impl Into<String>) -> Self {
        StoreError::Integrity {
            context: context.to_string(),
            msg: msg.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the record being decoded to a raw decode error.
    pub fn decode(context: &str, err: DecodeError) -> Self {
        match err {
            DecodeError::Overflow(msg) => StoreError::Overflow {
                context: context.to_string(),
                msg,
            },
            other => StoreError::Format {
                context: context.to_string(),
                msg: other.to_string(),
            },
        }
    }
}

/// Maps `Result<T, DecodeError>` into `Result<T, StoreError>` with the
/// name of the record being decoded attached.
pub(crate) trait DecodeCtx<T> {
    fn ctx(self, context: &str) -> Result<T, StoreError>;
}

impl<T> DecodeCtx<T> for Result<T, DecodeError> {
    fn ctx(self, context: &str) -> Result<T, StoreError> {
        self.map_err(|err| StoreError::decode(context, err))
    }
}
