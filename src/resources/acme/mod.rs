//! # ACME
//!
//! ACME accounts and DNS challenge plugins (`/cluster/acme`). Both endpoints
//! only accept a `root@pam` session, and both apply changes in the background:
//! a read right after a write may not see the change yet, so these kinds poll
//! until the remote reports a converged object.

mod account;
mod plugin;

pub use account::{AcmeAccount, AcmeAccountModel};
pub use plugin::{AcmePlugin, AcmePluginModel};
