//! Tree and tree node record decoding.
//!
//! A tree snapshots one directory: its own POSIX metadata plus a node
//! per child. Subtree nodes point at exactly one blob key holding the
//! child tree object; file nodes carry one blob key per content chunk.

use arq_tools::byte_reader::ByteReader;

use crate::data_blob_key::DataBlobKey;
use crate::error::{DecodeCtx, StoreError};
use crate::file_formats::{CompressionType, TREE_HEADER};

const CTX: &str = "tree";
const NODE_CTX: &str = "tree node";

#[derive(Debug)]
pub struct Tree {
    pub xattrs_compression: CompressionType,
    pub acl_compression: CompressionType,
    pub xattrs_blob_key: DataBlobKey,
    pub xattrs_size: u64,
    pub acl_blob_key: DataBlobKey,
    pub uid: i32,
    pub gid: i32,
    pub mode: i32,
    pub mtime_sec: i64,
    pub mtime_nsec: i64,
    pub flags: i64,
    pub finder_flags: i32,
    pub extended_finder_flags: i32,
    pub st_dev: i32,
    pub st_ino: i32,
    pub st_nlink: u32,
    pub st_rdev: i32,
    pub ctime_sec: i64,
    pub ctime_nsec: i64,
    pub st_blocks: i64,
    pub st_blksize: u32,
    pub create_time_sec: i64,
    pub create_time_nsec: i64,
    /// Child names the writer knew about but could not store.
    pub missing_nodes: Vec<String>,
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug)]
pub struct TreeNode {
    pub file_name: String,
    pub is_tree: bool,
    pub tree_contains_missing_items: bool,
    pub data_compression: CompressionType,
    pub xattrs_compression: CompressionType,
    pub acl_compression: CompressionType,
    pub data_blob_keys: Vec<DataBlobKey>,
    pub data_size: u64,
    pub xattrs_blob_key: DataBlobKey,
    pub xattrs_size: u64,
    pub acl_blob_key: DataBlobKey,
    pub uid: i32,
    pub gid: i32,
    pub mode: i32,
    pub mtime_sec: i64,
    pub mtime_nsec: i64,
    pub flags: i64,
    pub finder_flags: i32,
    pub extended_finder_flags: i32,
    pub finder_file_type: String,
    pub finder_file_creator: String,
    pub is_file_extension_hidden: bool,
    pub st_dev: i32,
    pub st_ino: i32,
    pub st_nlink: u32,
    pub st_rdev: i32,
    pub ctime_sec: i64,
    pub ctime_nsec: i64,
    pub create_time_sec: i64,
    pub create_time_nsec: i64,
    pub st_blocks: i64,
    pub st_blksize: u32,
}

impl Tree {
    pub fn decode(data: &[u8]) -> Result<Self, StoreError> {
        let mut r = ByteReader::new(data);
        r.verify_header(TREE_HEADER).ctx(CTX)?;

        let xattrs_compression = CompressionType::from_i32(r.read_i32().ctx(CTX)?)?;
        let acl_compression = CompressionType::from_i32(r.read_i32().ctx(CTX)?)?;
        let xattrs_blob_key = DataBlobKey::decode(&mut r).ctx(CTX)?;
        let xattrs_size = read_u64_size(&mut r, CTX)?;
        let acl_blob_key = DataBlobKey::decode(&mut r).ctx(CTX)?;
        let uid = r.read_i32().ctx(CTX)?;
        let gid = r.read_i32().ctx(CTX)?;
        let mode = r.read_i32().ctx(CTX)?;
        let mtime_sec = r.read_i64().ctx(CTX)?;
        let mtime_nsec = r.read_i64().ctx(CTX)?;
        let flags = r.read_i64().ctx(CTX)?;
        let finder_flags = r.read_i32().ctx(CTX)?;
        let extended_finder_flags = r.read_i32().ctx(CTX)?;
        let st_dev = r.read_i32().ctx(CTX)?;
        let st_ino = r.read_i32().ctx(CTX)?;
        let st_nlink = r.read_u32().ctx(CTX)?;
        let st_rdev = r.read_i32().ctx(CTX)?;
        let ctime_sec = r.read_i64().ctx(CTX)?;
        let ctime_nsec = r.read_i64().ctx(CTX)?;
        let st_blocks = r.read_i64().ctx(CTX)?;
        let st_blksize = r.read_u32().ctx(CTX)?;
        let create_time_sec = r.read_i64().ctx(CTX)?;
        let create_time_nsec = r.read_i64().ctx(CTX)?;

        let missing_count = r.read_u32().ctx(CTX)? as usize;
        let mut missing_nodes = Vec::with_capacity(missing_count);
        for _ in 0..missing_count {
            missing_nodes.push(r.read_optional_string().ctx(CTX)?);
        }

        let node_count = r.read_u32().ctx(CTX)? as usize;
        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            nodes.push(TreeNode::decode(&mut r)?);
        }
        r.must_be_eof().ctx(CTX)?;

        Ok(Self {
            xattrs_compression,
            acl_compression,
            xattrs_blob_key,
            xattrs_size,
            acl_blob_key,
            uid,
            gid,
            mode,
            mtime_sec,
            mtime_nsec,
            flags,
            finder_flags,
            extended_finder_flags,
            st_dev,
            st_ino,
            st_nlink,
            st_rdev,
            ctime_sec,
            ctime_nsec,
            st_blocks,
            st_blksize,
            create_time_sec,
            create_time_nsec,
            missing_nodes,
            nodes,
        })
    }
}

impl TreeNode {
    pub fn decode(r: &mut ByteReader) -> Result<Self, StoreError> {
        let file_name = r.read_optional_string().ctx(NODE_CTX)?;
        let is_tree = r.read_bool().ctx(NODE_CTX)?;
        let tree_contains_missing_items = r.read_bool().ctx(NODE_CTX)?;
        let data_compression = CompressionType::from_i32(r.read_i32().ctx(NODE_CTX)?)?;
        let xattrs_compression = CompressionType::from_i32(r.read_i32().ctx(NODE_CTX)?)?;
        let acl_compression = CompressionType::from_i32(r.read_i32().ctx(NODE_CTX)?)?;

        let key_count = r.read_i32().ctx(NODE_CTX)?;
        let key_count = usize::try_from(key_count).map_err(|_| StoreError::Overflow {
            context: NODE_CTX.to_string(),
            msg: format!("invalid blob key count {key_count}"),
        })?;
        let mut data_blob_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            data_blob_keys.push(DataBlobKey::decode(r).ctx(NODE_CTX)?);
        }

        let data_size = r.read_u64().ctx(NODE_CTX)?;
        let xattrs_blob_key = DataBlobKey::decode(r).ctx(NODE_CTX)?;
        let xattrs_size = read_u64_size(r, NODE_CTX)?;
        let acl_blob_key = DataBlobKey::decode(r).ctx(NODE_CTX)?;
        let uid = r.read_i32().ctx(NODE_CTX)?;
        let gid = r.read_i32().ctx(NODE_CTX)?;
        let mode = r.read_i32().ctx(NODE_CTX)?;
        let mtime_sec = r.read_i64().ctx(NODE_CTX)?;
        let mtime_nsec = r.read_i64().ctx(NODE_CTX)?;
        let flags = r.read_i64().ctx(NODE_CTX)?;
        let finder_flags = r.read_i32().ctx(NODE_CTX)?;
        let extended_finder_flags = r.read_i32().ctx(NODE_CTX)?;
        let finder_file_type = r.read_optional_string().ctx(NODE_CTX)?;
        let finder_file_creator = r.read_optional_string().ctx(NODE_CTX)?;
        let is_file_extension_hidden = r.read_bool().ctx(NODE_CTX)?;
        let st_dev = r.read_i32().ctx(NODE_CTX)?;
        let st_ino = r.read_i32().ctx(NODE_CTX)?;
        let st_nlink = r.read_u32().ctx(NODE_CTX)?;
        let st_rdev = r.read_i32().ctx(NODE_CTX)?;
        let ctime_sec = r.read_i64().ctx(NODE_CTX)?;
        let ctime_nsec = r.read_i64().ctx(NODE_CTX)?;
        let create_time_sec = r.read_i64().ctx(NODE_CTX)?;
        let create_time_nsec = r.read_i64().ctx(NODE_CTX)?;
        let st_blocks = r.read_i64().ctx(NODE_CTX)?;
        let st_blksize = r.read_u32().ctx(NODE_CTX)?;

        Ok(Self {
            file_name,
            is_tree,
            tree_contains_missing_items,
            data_compression,
            xattrs_compression,
            acl_compression,
            data_blob_keys,
            data_size,
            xattrs_blob_key,
            xattrs_size,
            acl_blob_key,
            uid,
            gid,
            mode,
            mtime_sec,
            mtime_nsec,
            flags,
            finder_flags,
            extended_finder_flags,
            finder_file_type,
            finder_file_creator,
            is_file_extension_hidden,
            st_dev,
            st_ino,
            st_nlink,
            st_rdev,
            ctime_sec,
            ctime_nsec,
            create_time_sec,
            create_time_nsec,
            st_blocks,
            st_blksize,
        })
    }

    /// The single blob key a subtree node must carry, pointing at the
    /// child tree object.
    pub fn subtree_blob_key(&self) -> Result<&DataBlobKey, StoreError> {
        if !self.is_tree {
            return Err(StoreError::format(
                NODE_CTX,
                format!("{:?} is not a subtree node", self.file_name),
            ));
        }
        match self.data_blob_keys.as_slice() {
            [key] => Ok(key),
            keys => Err(StoreError::format(
                NODE_CTX,
                format!(
                    "subtree node {:?} has {} blob keys, expected 1",
                    self.file_name,
                    keys.len()
                ),
            )),
        }
    }
}

fn read_u64_size(r: &mut ByteReader, context: &str) -> Result<u64, StoreError> {
    let v = r.read_i64().ctx(context)?;
    u64::try_from(v).map_err(|_| StoreError::Overflow {
        context: context.to_string(),
        msg: format!("negative size {v}"),
    })
}
