//! # Managed Resources
//!
//! One [`ResourceKind`](crate::reconciler::ResourceKind) per managed object
//! type. Each kind is a static descriptor plus the conversions between its
//! model and the wire; the lifecycle itself lives in
//! [`reconciler`](crate::reconciler).

pub mod acme;
pub mod firewall;
pub mod pool;
pub mod storage;

pub use acme::{AcmeAccount, AcmeAccountModel, AcmePlugin, AcmePluginModel};
pub use firewall::{
    FirewallAlias, FirewallAliasModel, FirewallGroup, FirewallGroupModel, FirewallIpSet,
    FirewallIpSetCidr, FirewallIpSetCidrModel, FirewallIpSetModel,
};
pub use pool::{Pool, PoolModel};
pub use storage::{
    StorageBtrfs, StorageBtrfsModel, StorageDir, StorageDirModel, StorageNfs, StorageNfsModel,
};
