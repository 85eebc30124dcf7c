//! In-memory caches for merged pack indexes and decrypted pack contents.
//!
//! The first object lookup in a bucket parses and merges every index of
//! that bucket's packset; the first object taken from a given pack
//! parses and decrypts the whole pack. Both results are kept here and
//! dropped only via [`ObjectCache::clear`]; the store owns its cache,
//! there is no global state.

use std::collections::HashMap;

use crate::object_id::ObjectId;
use crate::pack_index::PackIndexEntry;

/// Where an object lives: which pack, and where inside it.
#[derive(Debug, Clone)]
pub struct PackLocation {
    pub pack_uuid: String,
    pub entry: PackIndexEntry,
}

#[derive(Debug, Default)]
pub struct ObjectCache {
    /// Per bucket: merged object id -> pack location map.
    merged_indexes: HashMap<String, HashMap<ObjectId, PackLocation>>,
    /// Per pack uuid: decrypted object bytes keyed by (offset, size).
    pack_objects: HashMap<String, HashMap<(u64, u64), Vec<u8>>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merged_index(&self, bucket: &str) -> Option<&HashMap<ObjectId, PackLocation>> {
        self.merged_indexes.get(bucket)
    }

    pub fn insert_merged_index(&mut self, bucket: &str, index: HashMap<ObjectId, PackLocation>) {
        self.merged_indexes.insert(bucket.to_string(), index);
    }

    pub fn pack_objects(&self, pack_uuid: &str) -> Option<&HashMap<(u64, u64), Vec<u8>>> {
        self.pack_objects.get(pack_uuid)
    }

    pub fn insert_pack_objects(
        &mut self,
        pack_uuid: &str,
        objects: HashMap<(u64, u64), Vec<u8>>,
    ) {
        self.pack_objects.insert(pack_uuid.to_string(), objects);
    }

    pub fn clear(&mut self) {
        self.merged_indexes.clear();
        self.pack_objects.clear();
    }
}
