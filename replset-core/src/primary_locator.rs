use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info, warn, Instrument, Span};

use crate::address::LiveSet;
use crate::admin::{PrimaryResult, ReplicaAdmin};
use crate::replica_config::PrimaryState;

/// Asks every candidate whether it is the primary. Unreachable nodes count as "not primary".
pub struct PrimaryLocator {
    admin: Arc<dyn ReplicaAdmin>,
    span: Span,
}

impl PrimaryLocator {
    pub fn new(admin: Arc<dyn ReplicaAdmin>, span: Span) -> Self {
        Self { admin, span }
    }

    /// The first node claiming to be primary wins. More than one claim means some node has a
    /// stale view; that is logged but not treated as a failure.
    pub async fn find_primary(&self, candidates: &LiveSet) -> PrimaryState {
        async {
            let mut primaries = Vec::new();
            for candidate in candidates {
                match self.admin.is_primary(candidate).await {
                    PrimaryResult::IsPrimary => primaries.push(candidate.clone()),
                    PrimaryResult::IsNotPrimary => {}
                    PrimaryResult::Unreachable(reason) => {
                        debug!("cannot connect to {} to check if primary, failed ({})", candidate, reason);
                    }
                }
            }
            if primaries.len() > 1 {
                warn!("multiple primaries were found ({}), using the first", primaries.iter().join(", "));
            }
            match primaries.into_iter().next() {
                Some(primary) => {
                    info!("primary is {}", primary);
                    PrimaryState::Known(primary)
                }
                None => PrimaryState::Unknown,
            }
        }
        .instrument(self.span.clone())
        .await
    }
}

impl Debug for PrimaryLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryLocator")
            .finish_non_exhaustive()
    }
}
