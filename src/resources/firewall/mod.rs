//! # Cluster Firewall
//!
//! Aliases, IP sets, IP set members and security groups of the cluster
//! firewall. All of them are written synchronously.
//!
//! Updates replace the whole entry on the remote: an optional field left out
//! of an update is cleared, so null configuration values are simply omitted.
//! Aliases, IP sets and groups are renamed in place by the same update call.

mod alias;
mod group;
mod ipset;
mod ipset_cidr;

pub use alias::{FirewallAlias, FirewallAliasModel};
pub use group::{FirewallGroup, FirewallGroupModel};
pub use ipset::{FirewallIpSet, FirewallIpSetModel};
pub use ipset_cidr::{FirewallIpSetCidr, FirewallIpSetCidrModel};
