//! Flattening trees into rows for a relational index.
//!
//! No SQL lives here; this module only defines the row shapes an
//! indexer consumes and derives them from decoded trees.

use arq_tools::crypt;

use crate::object_id::ObjectId;
use crate::tree::Tree;

/// One child of one tree, in a shape ready for an `arq_node` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRow {
    /// `<tree sha>::<index>`, unique per store.
    pub node_id: String,
    pub parent_tree_sha: ObjectId,
    pub file_name: String,
    pub is_tree: bool,
    pub tree_contains_missing_items: bool,
    pub data_compression_type: i32,
    pub data_size: u64,
    /// SHA1 over the concatenated hex ids of the content chunks;
    /// `None` for subtree nodes, whose content is the child tree.
    pub content_sha: Option<String>,
}

/// A child the writer recorded as missing rather than storing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingNodeRow {
    pub node_id: String,
    pub parent_tree_sha: ObjectId,
    pub file_name: String,
}

pub fn rows_for_tree(tree_sha: &ObjectId, tree: &Tree) -> Vec<NodeRow> {
    tree.nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let content_sha = if node.is_tree {
                None
            } else {
                let mut concatenated = String::new();
                for key in &node.data_blob_keys {
                    if let Some(sha1) = &key.sha1 {
                        concatenated.push_str(sha1.as_hex());
                    }
                }
                Some(crypt::sha1_hex(concatenated.as_bytes()))
            };
            NodeRow {
                node_id: format!("{tree_sha}::{index}"),
                parent_tree_sha: tree_sha.clone(),
                file_name: node.file_name.clone(),
                is_tree: node.is_tree,
                tree_contains_missing_items: node.tree_contains_missing_items,
                data_compression_type: node.data_compression.as_i32(),
                data_size: node.data_size,
                content_sha,
            }
        })
        .collect()
}

pub fn missing_rows_for_tree(tree_sha: &ObjectId, tree: &Tree) -> Vec<MissingNodeRow> {
    tree.missing_nodes
        .iter()
        .enumerate()
        .map(|(index, name)| MissingNodeRow {
            node_id: format!("{tree_sha}::{index}"),
            parent_tree_sha: tree_sha.clone(),
            file_name: name.clone(),
        })
        .collect()
}
