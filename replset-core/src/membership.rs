use async_trait::async_trait;

use crate::address::LiveSet;

/// Inventory of the running instances of the monitored service. Polled, never pushed.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn live_addresses(&self) -> anyhow::Result<LiveSet>;

    /// Whether the service exists and has at least one running instance.
    async fn is_available(&self) -> anyhow::Result<bool>;
}
