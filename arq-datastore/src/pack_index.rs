//! Pack index decoding.
//!
//! Each pack file `<uuid>.pack` has a sibling `<uuid>.index` mapping
//! object ids to `(offset, size)` within the pack:
//!
//! ```text
//! magic(u32) | version(u32) | 256 cumulative counts(i32) |
//! entries { offset(i64) | size(i64) | sha1(20) | pad(u32, zero) } |
//! sha1 over all preceding bytes(20)
//! ```
//!
//! The count table is cumulative by the first byte of the sha1, so the
//! last slot holds the total number of entries.

use std::fs;
use std::path::{Path, PathBuf};

use arq_tools::byte_reader::ByteReader;
use arq_tools::crypt;

use crate::error::{DecodeCtx, StoreError};
use crate::file_formats::{PACK_INDEX_MAGIC, PACK_INDEX_VERSION};
use crate::object_id::ObjectId;

const CTX: &str = "pack index";

#[derive(Debug, Clone)]
pub struct PackIndexEntry {
    pub offset: u64,
    pub data_size: u64,
    pub sha1: ObjectId,
}

#[derive(Debug)]
pub struct PackIndex {
    /// UUID taken from the index file name; also names the pack file.
    pub uuid: String,
    pub entries: Vec<PackIndexEntry>,
}

impl PackIndex {
    pub fn parse(uuid: &str, data: &[u8]) -> Result<Self, StoreError> {
        let mut r = ByteReader::new(data);
        r.verify_u32(PACK_INDEX_MAGIC, "pack index magic").ctx(CTX)?;
        r.verify_u32(PACK_INDEX_VERSION, "pack index version")
            .ctx(CTX)?;

        let mut total = 0i32;
        for _ in 0..256 {
            // cumulative, so only the final slot matters here
            total = r.read_i32().ctx(CTX)?;
        }
        let total = usize::try_from(total).map_err(|_| StoreError::Overflow {
            context: CTX.to_string(),
            msg: format!("invalid entry count {total}"),
        })?;

        let mut entries = Vec::with_capacity(total);
        for _ in 0..total {
            let offset = read_u64_field(&mut r, "entry offset")?;
            let data_size = read_u64_field(&mut r, "entry size")?;
            let mut raw = [0u8; 20];
            raw.copy_from_slice(r.read_bytes(20).ctx(CTX)?);
            r.verify_u32(0, "entry padding").ctx(CTX)?;
            entries.push(PackIndexEntry {
                offset,
                data_size,
                sha1: ObjectId::from_raw(&raw),
            });
        }

        let body = r.past_bytes();
        let stored = r.read_bytes(20).ctx(CTX)?;
        if crypt::sha1(body) != stored {
            return Err(StoreError::integrity(CTX, "trailing SHA1 mismatch"));
        }
        r.must_be_eof().ctx(CTX)?;

        Ok(Self {
            uuid: uuid.to_string(),
            entries,
        })
    }

    /// Index files of one bucket's packset directory, sorted by name so
    /// that merge order is deterministic.
    pub fn list(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let mut out = Vec::new();
        let iter = fs::read_dir(dir).map_err(|err| StoreError::io(dir, err))?;
        for entry in iter {
            let entry = entry.map_err(|err| StoreError::io(dir, err))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "index") {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }
}

fn read_u64_field(r: &mut ByteReader, what: &str) -> Result<u64, StoreError> {
    let v = r.read_i64().ctx(CTX)?;
    u64::try_from(v).map_err(|_| StoreError::Overflow {
        context: CTX.to_string(),
        msg: format!("negative {what}: {v}"),
    })
}
