use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use tracing::{debug, Instrument, Span};

use crate::address::LiveSet;
use crate::admin::{ConfigResult, ReplicaAdmin};
use crate::replica_config::ReplicaConfig;

/// Finds the authoritative configuration by asking candidates one after another.
///
/// The first configured node wins and the rest are not asked. This trusts a single source and
/// does not detect diverging configurations across a split cluster.
pub struct ConfigReader {
    admin: Arc<dyn ReplicaAdmin>,
    span: Span,
}

impl ConfigReader {
    pub fn new(admin: Arc<dyn ReplicaAdmin>, span: Span) -> Self {
        Self { admin, span }
    }

    pub async fn read_config(&self, candidates: &LiveSet) -> Option<ReplicaConfig> {
        async {
            for candidate in candidates {
                match self.admin.get_config(candidate).await {
                    ConfigResult::Found(config) => {
                        debug!("configuration from {}: {}", candidate, config);
                        return Some(config);
                    }
                    ConfigResult::NotConfigured => {
                        debug!("no configuration found on {}", candidate);
                    }
                    ConfigResult::Unreachable(reason) => {
                        debug!("cannot connect to {} to get configuration, failed ({})", candidate, reason);
                    }
                }
            }
            debug!("none of {} candidates has a configuration", candidates.len());
            None
        }
        .instrument(self.span.clone())
        .await
    }
}

impl Debug for ConfigReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigReader")
            .finish_non_exhaustive()
    }
}
