//! Commit record decoding.
//!
//! A commit names the tree it snapshots, its parent commit (if any) and
//! assorted bookkeeping. The trailing configuration plist is kept as
//! opaque bytes; nothing in the read path interprets it.

use arq_tools::byte_reader::ByteReader;

use crate::error::{DecodeCtx, StoreError};
use crate::file_formats::{CompressionType, COMMIT_HEADER};
use crate::object_id::ObjectId;

const CTX: &str = "commit";

#[derive(Debug, Clone)]
pub struct ParentCommit {
    pub sha1: ObjectId,
    pub stretched_key: bool,
}

#[derive(Debug, Clone)]
pub struct CommitFailure {
    pub relative_path: String,
    pub error_message: String,
}

#[derive(Debug)]
pub struct Commit {
    pub author: String,
    pub comment: String,
    pub parent: Option<ParentCommit>,
    pub tree_sha1: ObjectId,
    pub tree_stretched_key: bool,
    pub tree_compression: CompressionType,
    pub folder_path: String,
    pub creation_date_millis: Option<u64>,
    pub failures: Vec<CommitFailure>,
    pub has_missing_nodes: bool,
    pub is_complete: bool,
    /// Folder configuration plist, carried verbatim.
    pub config_plist: Vec<u8>,
    pub writer_version: String,
}

impl Commit {
    pub fn decode(data: &[u8]) -> Result<Self, StoreError> {
        let mut r = ByteReader::new(data);
        r.verify_header(COMMIT_HEADER).ctx(CTX)?;

        let author = r.read_optional_string().ctx(CTX)?;
        let comment = r.read_optional_string().ctx(CTX)?;

        // Writers emit the parent count as an i64, not a presence byte,
        // even though at most one parent is ever recorded.
        let parent_count = r.read_i64().ctx(CTX)?;
        let parent = if parent_count != 0 {
            let sha1_hex = r.read_optional_string().ctx(CTX)?;
            let sha1 = ObjectId::from_hex(&sha1_hex)?;
            let stretched_key = r.read_bool().ctx(CTX)?;
            Some(ParentCommit {
                sha1,
                stretched_key,
            })
        } else {
            None
        };

        let tree_sha1 = ObjectId::from_hex(&r.read_optional_string().ctx(CTX)?)?;
        let tree_stretched_key = r.read_bool().ctx(CTX)?;
        let tree_compression = CompressionType::from_i32(r.read_i32().ctx(CTX)?)?;
        let folder_path = r.read_optional_string().ctx(CTX)?;
        let creation_date_millis = r.read_optional_date_millis().ctx(CTX)?;

        let failure_count = r.read_len().ctx(CTX)?;
        let mut failures = Vec::with_capacity(failure_count);
        for _ in 0..failure_count {
            failures.push(CommitFailure {
                relative_path: r.read_optional_string().ctx(CTX)?,
                error_message: r.read_optional_string().ctx(CTX)?,
            });
        }

        let has_missing_nodes = r.read_bool().ctx(CTX)?;
        let is_complete = r.read_bool().ctx(CTX)?;
        let config_plist = r.read_data().ctx(CTX)?.to_vec();
        let writer_version = r.read_optional_string().ctx(CTX)?;
        r.must_be_eof().ctx(CTX)?;

        Ok(Self {
            author,
            comment,
            parent,
            tree_sha1,
            tree_stretched_key,
            tree_compression,
            folder_path,
            creation_date_millis,
            failures,
            has_missing_nodes,
            is_complete,
            config_plist,
            writer_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, CommitSpec};

    #[test]
    fn decodes_full_commit() {
        let parent = testutil::object_id(0x11);
        let tree = testutil::object_id(0x22);
        let data = testutil::encode_commit(&CommitSpec {
            author: "someone@example.com",
            comment: "nightly snapshot",
            parent: Some(parent.clone()),
            tree: tree.clone(),
            tree_compression: CompressionType::Lz4,
            folder_path: "/Users/someone/Documents",
            creation_date_millis: Some(1_580_000_000_000),
            failures: vec![("a/b.txt", "permission denied")],
            has_missing_nodes: true,
            is_complete: false,
        });

        let commit = Commit::decode(&data).unwrap();
        assert_eq!(commit.author, "someone@example.com");
        assert_eq!(commit.comment, "nightly snapshot");
        assert_eq!(commit.parent.as_ref().unwrap().sha1, parent);
        assert_eq!(commit.tree_sha1, tree);
        assert_eq!(commit.tree_compression, CompressionType::Lz4);
        assert_eq!(commit.folder_path, "/Users/someone/Documents");
        assert_eq!(commit.creation_date_millis, Some(1_580_000_000_000));
        assert_eq!(commit.failures.len(), 1);
        assert_eq!(commit.failures[0].relative_path, "a/b.txt");
        assert_eq!(commit.failures[0].error_message, "permission denied");
        assert!(commit.has_missing_nodes);
        assert!(!commit.is_complete);
    }

    #[test]
    fn root_commit_has_no_parent() {
        let data = testutil::encode_commit(&CommitSpec {
            parent: None,
            ..CommitSpec::minimal(testutil::object_id(0x33))
        });
        let commit = Commit::decode(&data).unwrap();
        assert!(commit.parent.is_none());
        assert!(commit.creation_date_millis.is_none());
        assert!(commit.failures.is_empty());
    }

    #[test]
    fn wrong_header_is_format_error() {
        let mut data = testutil::encode_commit(&CommitSpec::minimal(testutil::object_id(1)));
        data[0] = b'X';
        assert!(matches!(
            Commit::decode(&data),
            Err(StoreError::Format { .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut data = testutil::encode_commit(&CommitSpec::minimal(testutil::object_id(1)));
        data.push(0);
        assert!(matches!(
            Commit::decode(&data),
            Err(StoreError::Format { .. })
        ));
    }

    #[test]
    fn unknown_tree_compression_is_unsupported() {
        let data = testutil::encode_commit_with_compression(
            &CommitSpec::minimal(testutil::object_id(1)),
            9,
        );
        assert!(matches!(
            Commit::decode(&data),
            Err(StoreError::Unsupported(9))
        ));
    }
}
