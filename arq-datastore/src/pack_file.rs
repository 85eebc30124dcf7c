//! Pack file decoding.
//!
//! A pack concatenates objects behind a short header:
//!
//! ```text
//! "PACK" | version(u32) | count(i64) |
//! entries { mime(optional string) | name(optional string) | data } |
//! sha1 over all preceding bytes(20)
//! ```
//!
//! Index entries address an object by the byte offset of its entry
//! start (the mime presence byte), so each entry records that offset
//! while parsing.

use arq_tools::byte_reader::ByteReader;
use arq_tools::crypt;

use crate::error::{DecodeCtx, StoreError};
use crate::file_formats::{PACK_FILE_HEADER, PACK_FILE_VERSION};

const CTX: &str = "pack file";

#[derive(Debug)]
pub struct PackFileEntry {
    pub mime_type: String,
    pub name: String,
    pub data: Vec<u8>,
    /// Byte offset of this entry's start within the pack.
    pub offset: u64,
}

#[derive(Debug)]
pub struct PackFile {
    pub entries: Vec<PackFileEntry>,
}

impl PackFile {
    pub fn parse(data: &[u8]) -> Result<Self, StoreError> {
        let mut r = ByteReader::new(data);
        r.verify_header(PACK_FILE_HEADER).ctx(CTX)?;
        r.verify_u32(PACK_FILE_VERSION, "pack file version").ctx(CTX)?;

        let count = r.read_len().ctx(CTX)?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let offset = r.position() as u64;
            let mime_type = r.read_optional_string().ctx(CTX)?;
            let name = r.read_optional_string().ctx(CTX)?;
            let data = r.read_data().ctx(CTX)?.to_vec();
            entries.push(PackFileEntry {
                mime_type,
                name,
                data,
                offset,
            });
        }

        let body = r.past_bytes();
        let stored = r.read_bytes(20).ctx(CTX)?;
        if crypt::sha1(body) != stored {
            return Err(StoreError::integrity(CTX, "trailing SHA1 mismatch"));
        }
        r.must_be_eof().ctx(CTX)?;

        Ok(Self { entries })
    }

    /// Entry whose recorded offset matches an index entry's offset.
    pub fn entry_at(&self, offset: u64) -> Option<&PackFileEntry> {
        self.entries.iter().find(|e| e.offset == offset)
    }
}
