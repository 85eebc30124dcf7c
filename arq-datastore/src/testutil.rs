//! Fixture builders for unit tests: record encoders that mirror the
//! wire layouts, plus deterministic keys and envelopes.

use arq_key_config::MasterKeys;
use arq_tools::crypt;

use crate::encrypted_object;
use crate::file_formats::{
    CompressionType, COMMIT_HEADER, PACK_FILE_HEADER, PACK_FILE_VERSION, PACK_INDEX_MAGIC,
    PACK_INDEX_VERSION, STORAGE_TYPE_PRIMARY, TREE_HEADER,
};
use crate::object_id::ObjectId;

pub fn object_id(byte: u8) -> ObjectId {
    ObjectId::from_raw(&[byte; 20])
}

pub fn test_master_keys() -> MasterKeys {
    MasterKeys::from_hex_keys(&"a1".repeat(32), &"b2".repeat(32), &"c3".repeat(32)).unwrap()
}

/// Envelope with fixed IVs and session key so fixtures are stable.
pub fn encrypt_object(plain: &[u8], keys: &MasterKeys) -> Vec<u8> {
    encrypted_object::encrypt(plain, keys, &[1u8; 16], &[2u8; 16], &[3u8; 32]).unwrap()
}

/// Big-endian record encoder, the write-side mirror of `ByteReader`.
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn bool(&mut self, v: bool) {
        self.u8(v as u8);
    }

    pub fn u32(&mut self, v: u32) {
        self.raw(&v.to_be_bytes());
    }

    pub fn i32(&mut self, v: i32) {
        self.raw(&v.to_be_bytes());
    }

    pub fn i64(&mut self, v: i64) {
        self.raw(&v.to_be_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.raw(&v.to_be_bytes());
    }

    pub fn data(&mut self, bytes: &[u8]) {
        self.i64(bytes.len() as i64);
        self.raw(bytes);
    }

    pub fn optional_string(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.u8(1);
                self.data(s.as_bytes());
            }
            None => self.u8(0),
        }
    }

    pub fn optional_date_millis(&mut self, millis: Option<u64>) {
        match millis {
            Some(m) => {
                self.u8(1);
                self.u64(m);
            }
            None => self.u8(0),
        }
    }

    pub fn sha1_raw(&mut self, id: &ObjectId) {
        self.raw(&hex::decode(id.as_hex()).unwrap());
    }

    /// An absent-by-default blob key (no sha, primary storage).
    pub fn empty_blob_key(&mut self) {
        self.blob_key(None);
    }

    pub fn blob_key(&mut self, sha1: Option<&ObjectId>) {
        self.optional_string(sha1.map(|id| id.as_hex()));
        self.bool(false);
        self.u32(STORAGE_TYPE_PRIMARY);
        self.optional_string(None);
        self.u64(0);
        self.optional_date_millis(None);
    }

    /// Append the SHA1 of everything written so far.
    pub fn trailing_sha1(&mut self) {
        let digest = crypt::sha1(&self.buf);
        self.raw(&digest);
    }
}

pub struct PackIndexBuilder {
    entries: Vec<(u64, u64, ObjectId, u32)>,
}

impl PackIndexBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entry(self, offset: u64, size: u64, sha1: &ObjectId) -> Self {
        self.entry_with_padding(offset, size, sha1, 0)
    }

    pub fn entry_with_padding(mut self, offset: u64, size: u64, sha1: &ObjectId, pad: u32) -> Self {
        self.entries.push((offset, size, sha1.clone(), pad));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.u32(PACK_INDEX_MAGIC);
        w.u32(PACK_INDEX_VERSION);

        let mut histogram = [0i32; 256];
        for (_, _, sha1, _) in &self.entries {
            let first = u8::from_str_radix(&sha1.as_hex()[..2], 16).unwrap();
            histogram[first as usize] += 1;
        }
        let mut cumulative = 0i32;
        for count in histogram {
            cumulative += count;
            w.i32(cumulative);
        }

        for (offset, size, sha1, pad) in &self.entries {
            w.i64(*offset as i64);
            w.i64(*size as i64);
            w.sha1_raw(sha1);
            w.u32(*pad);
        }
        w.trailing_sha1();
        w.into_vec()
    }
}

pub struct PackFileBuilder {
    entries: Vec<(String, String, Vec<u8>)>,
}

impl PackFileBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, mime_type: &str, name: &str, data: &[u8]) -> Self {
        self.entries
            .push((mime_type.to_string(), name.to_string(), data.to_vec()));
        self
    }

    /// Build the pack, returning its bytes plus the (offset, size) of
    /// each entry as an index for it would record them.
    pub fn build_with_offsets(self) -> (Vec<u8>, Vec<(u64, u64)>) {
        let mut w = ByteWriter::new();
        w.raw(PACK_FILE_HEADER.as_bytes());
        w.u32(PACK_FILE_VERSION);
        w.i64(self.entries.len() as i64);

        let mut offsets = Vec::new();
        for (mime_type, name, data) in &self.entries {
            let offset = w.as_slice().len() as u64;
            w.optional_string(if mime_type.is_empty() {
                None
            } else {
                Some(mime_type)
            });
            w.optional_string(if name.is_empty() { None } else { Some(name) });
            w.data(data);
            offsets.push((offset, data.len() as u64));
        }
        w.trailing_sha1();
        (w.into_vec(), offsets)
    }

    pub fn build(self) -> Vec<u8> {
        self.build_with_offsets().0
    }
}

pub struct CommitSpec {
    pub author: &'static str,
    pub comment: &'static str,
    pub parent: Option<ObjectId>,
    pub tree: ObjectId,
    pub tree_compression: CompressionType,
    pub folder_path: &'static str,
    pub creation_date_millis: Option<u64>,
    pub failures: Vec<(&'static str, &'static str)>,
    pub has_missing_nodes: bool,
    pub is_complete: bool,
}

impl CommitSpec {
    pub fn minimal(tree: ObjectId) -> Self {
        Self {
            author: "",
            comment: "",
            parent: None,
            tree,
            tree_compression: CompressionType::Store,
            folder_path: "/",
            creation_date_millis: None,
            failures: Vec::new(),
            has_missing_nodes: false,
            is_complete: true,
        }
    }
}

pub fn encode_commit(spec: &CommitSpec) -> Vec<u8> {
    encode_commit_with_compression(spec, spec.tree_compression.as_i32())
}

pub fn encode_commit_with_compression(spec: &CommitSpec, compression: i32) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.raw(COMMIT_HEADER.as_bytes());
    w.optional_string(some_if_nonempty(spec.author));
    w.optional_string(some_if_nonempty(spec.comment));
    match &spec.parent {
        Some(parent) => {
            w.i64(1);
            w.optional_string(Some(parent.as_hex()));
            w.bool(false);
        }
        None => w.i64(0),
    }
    w.optional_string(Some(spec.tree.as_hex()));
    w.bool(false);
    w.i32(compression);
    w.optional_string(some_if_nonempty(spec.folder_path));
    w.optional_date_millis(spec.creation_date_millis);
    w.i64(spec.failures.len() as i64);
    for (path, msg) in &spec.failures {
        w.optional_string(Some(path));
        w.optional_string(Some(msg));
    }
    w.bool(spec.has_missing_nodes);
    w.bool(spec.is_complete);
    w.data(b"<plist/>");
    w.optional_string(Some("7.9.2"));
    w.into_vec()
}

#[derive(Default)]
pub struct TreeSpec {
    pub missing_nodes: Vec<&'static str>,
    pub nodes: Vec<NodeSpec>,
}

pub struct NodeSpec {
    pub file_name: &'static str,
    pub is_tree: bool,
    pub data_compression: CompressionType,
    pub data_blob_keys: Vec<ObjectId>,
    pub data_size: u64,
}

impl NodeSpec {
    pub fn file(file_name: &'static str, data_blob_keys: Vec<ObjectId>, data_size: u64) -> Self {
        Self {
            file_name,
            is_tree: false,
            data_compression: CompressionType::Store,
            data_blob_keys,
            data_size,
        }
    }

    pub fn subtree(file_name: &'static str, tree_sha1: ObjectId) -> Self {
        Self {
            file_name,
            is_tree: true,
            data_compression: CompressionType::Store,
            data_blob_keys: vec![tree_sha1],
            data_size: 0,
        }
    }
}

pub fn encode_tree(spec: &TreeSpec) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.raw(TREE_HEADER.as_bytes());
    w.i32(CompressionType::Store.as_i32()); // xattrs
    w.i32(CompressionType::Store.as_i32()); // acl
    w.empty_blob_key();
    w.i64(0); // xattrs size
    w.empty_blob_key();
    w.i32(501); // uid
    w.i32(20); // gid
    w.i32(0o040755); // mode
    w.i64(1_580_000_000); // mtime sec
    w.i64(0); // mtime nsec
    w.i64(0); // flags
    w.i32(0); // finder flags
    w.i32(0); // extended finder flags
    w.i32(1); // st_dev
    w.i32(42); // st_ino
    w.u32(1); // st_nlink
    w.i32(0); // st_rdev
    w.i64(1_580_000_000); // ctime sec
    w.i64(0); // ctime nsec
    w.i64(8); // st_blocks
    w.u32(4096); // st_blksize
    w.i64(1_570_000_000); // create time sec
    w.i64(0); // create time nsec

    w.u32(spec.missing_nodes.len() as u32);
    for name in &spec.missing_nodes {
        w.optional_string(Some(name));
    }
    w.u32(spec.nodes.len() as u32);
    for node in &spec.nodes {
        encode_node(&mut w, node);
    }
    w.into_vec()
}

fn encode_node(w: &mut ByteWriter, node: &NodeSpec) {
    w.optional_string(Some(node.file_name));
    w.bool(node.is_tree);
    w.bool(false); // tree contains missing items
    w.i32(node.data_compression.as_i32());
    w.i32(CompressionType::Store.as_i32()); // xattrs
    w.i32(CompressionType::Store.as_i32()); // acl
    w.i32(node.data_blob_keys.len() as i32);
    for key in &node.data_blob_keys {
        w.blob_key(Some(key));
    }
    w.u64(node.data_size);
    w.empty_blob_key();
    w.i64(0); // xattrs size
    w.empty_blob_key();
    w.i32(501); // uid
    w.i32(20); // gid
    w.i32(if node.is_tree { 0o040755 } else { 0o100644 });
    w.i64(1_580_000_000); // mtime sec
    w.i64(0);
    w.i64(0); // flags
    w.i32(0); // finder flags
    w.i32(0); // extended finder flags
    w.optional_string(None); // finder file type
    w.optional_string(None); // finder file creator
    w.bool(false); // extension hidden
    w.i32(1); // st_dev
    w.i32(43); // st_ino
    w.u32(1); // st_nlink
    w.i32(0); // st_rdev
    w.i64(1_580_000_000); // ctime
    w.i64(0);
    w.i64(1_570_000_000); // create time
    w.i64(0);
    w.i64(8); // st_blocks
    w.u32(4096); // st_blksize
}

fn some_if_nonempty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
