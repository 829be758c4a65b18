//! # Storage
//!
//! Cluster storage definitions (`/storage`). Directory, NFS and BTRFS
//! backends share one collection, the not-found message and most fields; each
//! backend adds its own location fields.
//!
//! Storage definitions are applied synchronously, so every kind here converges
//! immediately. `content` and `nodes` are sent as native lists; the remote
//! reports them comma-joined.

mod btrfs;
mod dir;
mod nfs;

pub use btrfs::{StorageBtrfs, StorageBtrfsModel};
pub use dir::{StorageDir, StorageDirModel};
pub use nfs::{StorageNfs, StorageNfsModel};

use crate::error::ResourceError;
use crate::model::{Attr, StringSet};
use crate::reconciler::FieldReader;

pub(crate) const NOT_FOUND: &[&str] = &["storage '{id}' does not exist"];

/// Fields every storage backend reports the same way
#[derive(Debug)]
pub(crate) struct CommonFields {
    pub name: String,
    pub storage_type: Attr<String>,
    pub content: Attr<StringSet>,
    pub nodes: Attr<StringSet>,
    pub disable: Attr<bool>,
    pub preallocation: Attr<String>,
    pub prune_backups: Attr<String>,
}

impl CommonFields {
    pub fn decode(reader: &FieldReader<'_>) -> Result<Self, ResourceError> {
        Ok(Self {
            name: reader.required_text("storage")?,
            storage_type: reader.text("type")?,
            content: reader.set("content")?,
            nodes: reader.set("nodes")?,
            disable: reader.flag("disable")?,
            preallocation: reader.text("preallocation")?,
            prune_backups: reader.text("prune-backups")?,
        })
    }
}
