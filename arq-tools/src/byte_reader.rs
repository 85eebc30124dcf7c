//! Cursor-based decoder for the big-endian record encodings used
//! throughout an Arq object store.
//!
//! Every on-disk record (pack index, pack file, commit, tree, ...) is a
//! flat sequence of fixed-width and length-prefixed fields. A
//! [`ByteReader`] wraps an immutable byte buffer with a monotonically
//! increasing read position; each record decoder performs its reads in
//! wire order and finishes with [`ByteReader::must_be_eof`] so that
//! trailing garbage is a hard error instead of being silently ignored.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of input at offset {offset} (need {needed} more bytes)")]
    Eof { offset: usize, needed: usize },

    #[error("{0}")]
    Format(String),

    #[error("{0}")]
    Overflow(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Read cursor over an immutable byte buffer.
///
/// All fixed-width integers are big-endian. The cursor is purely
/// synchronous and not shareable; every caller owns its own instance.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Everything consumed so far. Used to compute the trailing-hash
    /// checksums that pack and index files carry over all preceding bytes.
    pub fn past_bytes(&self) -> &'a [u8] {
        &self.buf[..self.pos]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(DecodeError::Eof {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// One byte, 1 = true, anything else = false.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? == 1)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Read an `i64` and convert it to a length usable for indexing.
    ///
    /// Negative values and values exceeding the address space are
    /// rejected rather than wrapped.
    pub fn read_len(&mut self) -> Result<usize> {
        let v = self.read_i64()?;
        usize::try_from(v).map_err(|_| DecodeError::Overflow(format!("invalid length {v}")))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// All bytes from the current position to the end of the buffer.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    /// 20 raw bytes, returned as a 40-char lowercase hex string.
    pub fn read_sha1_hex(&mut self) -> Result<String> {
        Ok(hex::encode(self.take(20)?))
    }

    pub fn read_string(&mut self, n: usize) -> Result<String> {
        let raw = self.take(n)?;
        String::from_utf8(raw.to_vec())
            .map_err(|err| DecodeError::Format(format!("invalid UTF-8 string: {err}")))
    }

    /// An `i64` length prefix followed by that many bytes.
    pub fn read_data(&mut self) -> Result<&'a [u8]> {
        let n = self.read_len()?;
        self.take(n)
    }

    /// An `i64` length prefix followed by a UTF-8 string of that length.
    pub fn read_data_string(&mut self) -> Result<String> {
        let n = self.read_len()?;
        self.read_string(n)
    }

    /// A presence byte followed by a length-prefixed string, or the
    /// empty string when the presence byte is zero.
    pub fn read_optional_string(&mut self) -> Result<String> {
        if self.read_u8()? != 0 {
            self.read_data_string()
        } else {
            Ok(String::new())
        }
    }

    /// A presence byte followed by a `u64` of milliseconds since the
    /// epoch, or `None` when absent.
    pub fn read_optional_date_millis(&mut self) -> Result<Option<u64>> {
        if self.read_u8()? != 0 {
            Ok(Some(self.read_u64()?))
        } else {
            Ok(None)
        }
    }

    /// Read `tag.len()` bytes and compare against the expected header tag.
    pub fn verify_header(&mut self, tag: &str) -> Result<()> {
        let raw = self.take(tag.len())?;
        if raw != tag.as_bytes() {
            return Err(DecodeError::Format(format!(
                "header mismatch (expected {tag:?}, got {:?})",
                String::from_utf8_lossy(raw)
            )));
        }
        Ok(())
    }

    /// Read a `u32` and require it to match an expected value.
    pub fn verify_u32(&mut self, expected: u32, what: &str) -> Result<()> {
        let got = self.read_u32()?;
        if got != expected {
            return Err(DecodeError::Format(format!(
                "{what} mismatch (expected {expected:#x}, got {got:#x})"
            )));
        }
        Ok(())
    }

    /// Every top-level record decode ends with this check; unconsumed
    /// bytes mean the record does not match the expected schema.
    pub fn must_be_eof(&self) -> Result<()> {
        if !self.is_eof() {
            return Err(DecodeError::Format(format!(
                "{} trailing bytes after record",
                self.remaining()
            )));
        }
        Ok(())
    }
}
