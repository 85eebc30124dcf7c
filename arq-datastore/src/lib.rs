//! Read access to an Arq object store.
//!
//! An Arq store on disk is a directory tree of pack files (concatenated
//! objects with a per-bucket index) and loose objects, every object
//! individually encrypted under a per-computer master key set. This
//! crate decodes the container formats, unwraps the encryption envelope
//! and exposes the typed object model on top: commits, trees, tree
//! nodes and blob keys.
//!
//! The entry point is [`ObjectStore`]; [`hierarchy`] walks commit
//! chains and file trees, [`catalog`] flattens trees into rows for
//! indexing.

pub mod bucket_info;
pub mod cache;
pub mod catalog;
pub mod commit;
pub mod compress;
pub mod data_blob_key;
pub mod encrypted_object;
pub mod error;
pub mod file_formats;
pub mod hierarchy;
pub mod object_id;
pub mod object_store;
pub mod pack_file;
pub mod pack_index;
pub mod tree;

#[cfg(test)]
pub(crate) mod testutil;

pub use commit::Commit;
pub use data_blob_key::DataBlobKey;
pub use error::StoreError;
pub use file_formats::CompressionType;
pub use object_id::ObjectId;
pub use object_store::ObjectStore;
pub use tree::{Tree, TreeNode};
