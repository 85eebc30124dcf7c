//! Traversal over the object graph: commit chains and tree walks.

use std::collections::HashSet;

use crate::error::StoreError;
use crate::file_formats::CompressionType;
use crate::object_id::ObjectId;
use crate::object_store::ObjectStore;
use crate::tree::TreeNode;
use crate::Commit;

/// Lazy iterator over a commit chain, newest first, following parent
/// links until a root commit is reached.
///
/// A decode or lookup failure is yielded once and ends the iteration;
/// a broken chain cannot be followed further.
pub struct CommitChain<'a> {
    store: &'a mut ObjectStore,
    bucket: String,
    next: Option<ObjectId>,
}

impl<'a> CommitChain<'a> {
    pub fn new(store: &'a mut ObjectStore, bucket: &str, head: ObjectId) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
            next: Some(head),
        }
    }

    /// Chain starting at the bucket's head ref.
    pub fn from_head(store: &'a mut ObjectStore, bucket: &str) -> Result<Self, StoreError> {
        let head = store.head_commit_id(bucket)?;
        Ok(Self::new(store, bucket, head))
    }
}

impl Iterator for CommitChain<'_> {
    type Item = Result<(ObjectId, Commit), StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        match self.store.commit(&self.bucket, &id) {
            Ok(commit) => {
                self.next = commit.parent.as_ref().map(|p| p.sha1.clone());
                Some(Ok((id, commit)))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// One visited entry during a tree walk.
pub struct WalkItem<'a> {
    /// Path relative to the walk root, components joined with `/`.
    pub path: String,
    /// Id of the tree object holding this node.
    pub parent_tree_sha: ObjectId,
    pub node: &'a TreeNode,
}

/// Pre-order walk of the tree rooted at `root`, driving `visit` for
/// every node.
///
/// Uses an explicit work list rather than recursion, so arbitrarily
/// deep trees cannot exhaust the call stack. Trees already visited in
/// this walk are skipped; subtrees shared by content hash are reported
/// once.
pub fn walk_tree<F>(
    store: &mut ObjectStore,
    bucket: &str,
    root: &ObjectId,
    root_compression: CompressionType,
    visit: &mut F,
) -> Result<(), StoreError>
where
    F: FnMut(WalkItem<'_>) -> Result<(), StoreError>,
{
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut work = vec![(root.clone(), root_compression, String::new())];

    while let Some((tree_sha, compression, path)) = work.pop() {
        if !visited.insert(tree_sha.clone()) {
            continue;
        }
        let tree = store.tree(bucket, &tree_sha, compression)?;

        let mut subtrees = Vec::new();
        for node in &tree.nodes {
            let child_path = if path.is_empty() {
                node.file_name.clone()
            } else {
                format!("{path}/{}", node.file_name)
            };
            visit(WalkItem {
                path: child_path.clone(),
                parent_tree_sha: tree_sha.clone(),
                node,
            })?;

            if node.is_tree {
                let key = node.subtree_blob_key()?;
                let child_sha = key.sha1.clone().ok_or_else(|| {
                    StoreError::format(
                        "tree node",
                        format!("subtree node {:?} has no blob id", node.file_name),
                    )
                })?;
                subtrees.push((child_sha, node.data_compression, child_path));
            }
        }
        // reversed so the first child is popped next (pre-order)
        work.extend(subtrees.into_iter().rev());
    }
    Ok(())
}
