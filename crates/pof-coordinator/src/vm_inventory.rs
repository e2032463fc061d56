//! The VM-inventory consult used to downgrade an `offline` agent to
//! `deleted` (spec.md §4.5 step 3). The real implementation shells out to a
//! deploy-CLI and is explicitly out of scope (spec.md §1 "the
//! deploy-via-shell-CLI feature"); this trait is its interface.

use async_trait::async_trait;

#[async_trait]
pub trait VmInventory: Send + Sync {
    /// Does the VM backing `agent_name` still exist?
    async fn exists(&self, agent_name: &str) -> bool;
}

/// Every VM is always present — an `offline` agent is never further
/// demoted to `deleted`. Useful as a conservative default and in tests
/// that don't exercise the demotion path.
pub struct AlwaysPresent;

#[async_trait]
impl VmInventory for AlwaysPresent {
    async fn exists(&self, _agent_name: &str) -> bool {
        true
    }
}

/// Every VM is always gone — every `offline` agent is immediately demoted
/// to `deleted` on the next consult. Used by tests exercising that path.
pub struct AlwaysGone;

#[async_trait]
impl VmInventory for AlwaysGone {
    async fn exists(&self, _agent_name: &str) -> bool {
        false
    }
}
