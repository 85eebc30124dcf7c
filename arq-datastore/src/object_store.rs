//! The object resolver: merged pack indexes, whole-pack decryption and
//! the loose-object fallback, behind one typed read interface.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use arq_key_config::MasterKeys;

use crate::cache::{ObjectCache, PackLocation};
use crate::commit::Commit;
use crate::compress;
use crate::encrypted_object;
use crate::error::StoreError;
use crate::file_formats::CompressionType;
use crate::object_id::ObjectId;
use crate::pack_file::PackFile;
use crate::pack_index::PackIndex;
use crate::tree::Tree;

/// Name of the per-computer key file inside the computer directory.
pub const KEY_FILE_NAME: &str = "encryptionv3.dat";

/// Read access to one computer's object store.
///
/// `dir` is the computer directory (the one holding `packsets/`,
/// `objects/` and `bucketdata/`). All lookups go through the owned
/// [`ObjectCache`]: the first object touched in a bucket merges that
/// bucket's pack indexes, the first object taken from a pack decrypts
/// the whole pack.
pub struct ObjectStore {
    dir: PathBuf,
    keys: MasterKeys,
    cache: ObjectCache,
}

impl ObjectStore {
    pub fn open(dir: impl Into<PathBuf>, keys: MasterKeys) -> Self {
        Self {
            dir: dir.into(),
            keys,
            cache: ObjectCache::new(),
        }
    }

    /// Open a store by unwrapping its key file with a passphrase.
    pub fn open_with_passphrase(
        dir: impl Into<PathBuf>,
        passphrase: &str,
    ) -> Result<Self, StoreError> {
        let dir = dir.into();
        let key_path = dir.join(KEY_FILE_NAME);
        let blob = fs::read(&key_path).map_err(|err| StoreError::io(&key_path, err))?;
        let keys = MasterKeys::from_passphrase(passphrase, &blob)?;
        Ok(Self::open(dir, keys))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve one object: merged index, then pack, then the loose
    /// fan-out path; decrypt and decompress.
    pub fn read_object(
        &mut self,
        bucket: &str,
        id: &ObjectId,
        compression: CompressionType,
    ) -> Result<Vec<u8>, StoreError> {
        self.ensure_index(bucket)?;
        let location = self
            .cache
            .merged_index(bucket)
            .and_then(|index| index.get(id))
            .cloned();

        let plain = match location {
            Some(location) => self.packed_object(bucket, id, &location)?,
            None => self.loose_object(id)?,
        };
        compress::decompress(&plain, compression)
    }

    /// Decode the commit with the given id. Commit objects are stored
    /// uncompressed.
    pub fn commit(&mut self, bucket: &str, id: &ObjectId) -> Result<Commit, StoreError> {
        let data = self.read_object(bucket, id, CompressionType::Store)?;
        Commit::decode(&data)
    }

    pub fn tree(
        &mut self,
        bucket: &str,
        id: &ObjectId,
        compression: CompressionType,
    ) -> Result<Tree, StoreError> {
        let data = self.read_object(bucket, id, compression)?;
        Tree::decode(&data)
    }

    /// Id of the newest commit of a bucket, from its head ref file.
    pub fn head_commit_id(&self, bucket: &str) -> Result<ObjectId, StoreError> {
        let path = self
            .dir
            .join("bucketdata")
            .join(bucket)
            .join("refs/heads/master");
        let text = fs::read_to_string(&path).map_err(|err| StoreError::io(&path, err))?;
        ObjectId::from_hex(text.trim_end_matches(['\r', '\n']))
    }

    /// Drop both cache layers. Required before re-reading a bucket
    /// under a different key context.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn packset_dir(&self, bucket: &str) -> PathBuf {
        self.dir.join("packsets").join(format!("{bucket}-trees"))
    }

    fn ensure_index(&mut self, bucket: &str) -> Result<(), StoreError> {
        if self.cache.merged_index(bucket).is_some() {
            return Ok(());
        }

        let dir = self.packset_dir(bucket);
        let mut merged: HashMap<ObjectId, PackLocation> = HashMap::new();
        if dir.is_dir() {
            log::info!("reading index files for bucket {bucket}");
            for path in PackIndex::list(&dir)? {
                let uuid = file_stem(&path)?;
                let data = fs::read(&path).map_err(|err| StoreError::io(&path, err))?;
                let index = PackIndex::parse(&uuid, &data)?;
                for entry in index.entries {
                    // ids are content hashes; the first index to claim
                    // one wins, later duplicates are ignored
                    merged.entry(entry.sha1.clone()).or_insert(PackLocation {
                        pack_uuid: index.uuid.clone(),
                        entry,
                    });
                }
            }
        }
        self.cache.insert_merged_index(bucket, merged);
        Ok(())
    }

    fn packed_object(
        &mut self,
        bucket: &str,
        id: &ObjectId,
        location: &PackLocation,
    ) -> Result<Vec<u8>, StoreError> {
        if self.cache.pack_objects(&location.pack_uuid).is_none() {
            log::info!("reading pack file {}", location.pack_uuid);
            let path = self
                .packset_dir(bucket)
                .join(format!("{}.pack", location.pack_uuid));
            let data = fs::read(&path).map_err(|err| StoreError::io(&path, err))?;
            let pack = PackFile::parse(&data)?;

            let mut objects = HashMap::new();
            for entry in &pack.entries {
                let plain = encrypted_object::decrypt(&entry.data, &self.keys)?;
                objects.insert((entry.offset, entry.data.len() as u64), plain);
            }
            self.cache.insert_pack_objects(&location.pack_uuid, objects);
        }

        self.cache
            .pack_objects(&location.pack_uuid)
            .and_then(|objects| objects.get(&(location.entry.offset, location.entry.data_size)))
            .cloned()
            .ok_or_else(|| {
                StoreError::integrity(
                    "pack file",
                    format!(
                        "index entry for {id} (offset {}, size {}) not present in pack {}",
                        location.entry.offset, location.entry.data_size, location.pack_uuid
                    ),
                )
            })
    }

    fn loose_object(&self, id: &ObjectId) -> Result<Vec<u8>, StoreError> {
        let (fan, rest) = id.fan_out();
        let path = self.dir.join("objects").join(fan).join(rest);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()));
            }
            Err(err) => return Err(StoreError::io(&path, err)),
        };
        encrypted_object::decrypt(&data, &self.keys)
    }
}

fn file_stem(path: &Path) -> Result<String, StoreError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            StoreError::format("pack index", format!("unusable file name {}", path.display()))
        })
}
