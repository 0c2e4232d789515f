use async_trait::async_trait;

use crate::address::Address;
use crate::error::AdminError;
use crate::replica_config::ReplicaConfig;

/// Answer of a node asked for its replica set configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigResult {
    Found(ReplicaConfig),
    NotConfigured,
    Unreachable(String),
}

/// Answer of a node asked whether it is the primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryResult {
    IsPrimary,
    IsNotPrimary,
    Unreachable(String),
}

/// Administrative commands against a single cluster node.
///
/// Implementations must bound every call by a connection timeout so that one dead node
/// cannot stall a reconciliation pass.
#[async_trait]
pub trait ReplicaAdmin: Send + Sync {
    async fn get_config(&self, node: &Address) -> ConfigResult;

    async fn is_primary(&self, node: &Address) -> PrimaryResult;

    /// Bootstraps a brand-new replica set. Returns [`AdminError::AlreadyInitialized`] when the
    /// node already carries a configuration.
    async fn initiate(&self, node: &Address, config: &ReplicaConfig) -> Result<(), AdminError>;

    async fn reconfigure(&self, node: &Address, config: &ReplicaConfig, force: bool) -> Result<(), AdminError>;
}
