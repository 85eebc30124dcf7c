use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// SHA1 object identifier, stored as its 40-char lowercase hex form.
///
/// Objects are addressed by hex everywhere above the wire layer (index
/// entries carry the raw 20 bytes and are hex-encoded on read), so the
/// canonical representation here is the string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn from_hex(s: &str) -> Result<Self, StoreError> {
        if s.len() != 40 || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(StoreError::format(
                "object id",
                format!("not a 40-char lowercase hex sha1: {s:?}"),
            ));
        }
        Ok(Self(s.to_string()))
    }

    pub fn from_raw(raw: &[u8; 20]) -> Self {
        Self(hex::encode(raw))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Directory fan-out for loose objects: first two hex chars name
    /// the subdirectory, the remaining 38 the file.
    pub fn fan_out(&self) -> (&str, &str) {
        self.0.split_at(2)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
