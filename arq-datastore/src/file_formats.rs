//! On-disk magics, version tags and field constants shared by the
//! container and object decoders.

use crate::error::StoreError;

/// Magic number at the start of a pack index file.
pub const PACK_INDEX_MAGIC: u32 = 0xff74_4f63;

/// Pack index version this reader understands.
pub const PACK_INDEX_VERSION: u32 = 2;

/// Header tag of a pack file.
pub const PACK_FILE_HEADER: &str = "PACK";

/// Pack file version this reader understands.
pub const PACK_FILE_VERSION: u32 = 2;

/// Header tag of an encrypted object envelope.
pub const ENCRYPTED_OBJECT_HEADER: &str = "ARQO";

/// Header tag of a commit record.
pub const COMMIT_HEADER: &str = "CommitV012";

/// Header tag of a tree record.
pub const TREE_HEADER: &str = "TreeV022";

/// Blob storage location: regular object store vs. cold archival tier.
pub const STORAGE_TYPE_PRIMARY: u32 = 1;
pub const STORAGE_TYPE_ARCHIVAL: u32 = 2;

/// Compression applied to object payloads after decryption.
///
/// `Gzip` is a legacy value still seen in old stores; this reader
/// recognizes it but does not decompress it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    Store,
    Gzip,
    Lz4,
}

impl CompressionType {
    pub fn from_i32(v: i32) -> Result<Self, StoreError> {
        match v {
            0 => Ok(CompressionType::Store),
            1 => Ok(CompressionType::Gzip),
            2 => Ok(CompressionType::Lz4),
            other => Err(StoreError::Unsupported(other)),
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            CompressionType::Store => 0,
            CompressionType::Gzip => 1,
            CompressionType::Lz4 => 2,
        }
    }
}
