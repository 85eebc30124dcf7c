//! Typed view of a bucket (backed-up folder) configuration.
//!
//! Bucket config files are encrypted plists; plist parsing is out of
//! scope here, so this accepts the already-decoded key/value map and
//! lifts it into a typed record.

use std::collections::HashMap;

use crate::error::StoreError;

const CTX: &str = "bucket config";

#[derive(Debug, Clone)]
pub struct BucketInfo {
    pub computer_uuid: String,
    pub endpoint: String,
    pub bucket_name: String,
    pub local_path: String,
    pub local_mount_point: String,
    pub storage_type: u32,
}

impl BucketInfo {
    pub fn from_plist_dict(dict: &HashMap<String, String>) -> Result<Self, StoreError> {
        Ok(Self {
            computer_uuid: required(dict, "ComputerUUID")?,
            endpoint: required(dict, "Endpoint")?,
            bucket_name: required(dict, "BucketName")?,
            local_path: required(dict, "LocalPath")?,
            local_mount_point: required(dict, "LocalMountPoint")?,
            storage_type: required(dict, "StorageType")?.parse().map_err(|_| {
                StoreError::format(CTX, "StorageType is not an unsigned integer")
            })?,
        })
    }
}

fn required(dict: &HashMap<String, String>, key: &str) -> Result<String, StoreError> {
    dict.get(key)
        .cloned()
        .ok_or_else(|| StoreError::format(CTX, format!("missing key {key:?}")))
}
