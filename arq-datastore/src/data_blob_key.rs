//! Blob key records, the pointers from tree nodes to file content.

use arq_tools::byte_reader::{ByteReader, DecodeError, Result};

use crate::object_id::ObjectId;

/// Reference to one content blob.
///
/// `sha1` is absent in records written for zero-length attribute sets;
/// `storage_type` distinguishes the regular store from a cold archival
/// tier (see `file_formats::STORAGE_TYPE_*`).
#[derive(Debug, Clone)]
pub struct DataBlobKey {
    pub sha1: Option<ObjectId>,
    pub stretched_key: bool,
    pub storage_type: u32,
    pub archive_id: String,
    pub archive_size: u64,
    pub archive_upload_date_millis: Option<u64>,
}

impl DataBlobKey {
    pub fn decode(r: &mut ByteReader) -> Result<Self> {
        let sha1_hex = r.read_optional_string()?;
        let sha1 = if sha1_hex.is_empty() {
            None
        } else {
            Some(
                ObjectId::from_hex(&sha1_hex)
                    .map_err(|err| DecodeError::Format(err.to_string()))?,
            )
        };
        Ok(Self {
            sha1,
            stretched_key: r.read_bool()?,
            storage_type: r.read_u32()?,
            archive_id: r.read_optional_string()?,
            archive_size: r.read_u64()?,
            archive_upload_date_millis: r.read_optional_date_millis()?,
        })
    }
}
