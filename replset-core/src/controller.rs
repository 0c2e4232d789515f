use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, debug_span, error, info, info_span, warn, Span};

use crate::address::LiveSet;
use crate::admin::ReplicaAdmin;
use crate::applier::Applier;
use crate::error::StartupError;
use crate::membership::MembershipSource;
use crate::reconciler::{Effect, Reconciler};
use crate::retry::{RetryPolicy, Sleeper};
use crate::settings::Settings;

/// Outcome of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cycle {
    /// Live set identical to the last converged one, nothing was reconciled.
    Unchanged,
    /// Reconciled and, unless the effect is a no-op, applied.
    Converged(Effect),
    /// Something failed along the way, the next poll reconciles again.
    Pending,
}

pub struct Controller {
    source: Arc<dyn MembershipSource>,
    reconciler: Reconciler,
    applier: Applier,
    sleeper: Arc<dyn Sleeper>,
    poll_interval: Duration,
    converged: Option<LiveSet>,
    span: Span,
}

impl Controller {
    pub fn new(
        settings: &Settings,
        source: Arc<dyn MembershipSource>,
        admin: Arc<dyn ReplicaAdmin>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let span = info_span!("controller", replica_set = %settings.replicaset_name);
        let reconciler = Reconciler::new(
            settings.replicaset_name.as_str(),
            admin.clone(),
            settings.election_policy(),
            sleeper.clone(),
            debug_span!(parent: &span, "reconciler"),
        );
        let applier = Applier::new(admin, debug_span!(parent: &span, "applier"));
        Self {
            source,
            reconciler,
            applier,
            sleeper,
            poll_interval: settings.poll_interval(),
            converged: None,
            span,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub async fn run_once(&mut self) -> Cycle {
        let live = match self.source.live_addresses().await {
            Ok(live) => live,
            Err(error) => {
                warn!(parent: &self.span, "cannot list live members: {:#}", error);
                return Cycle::Pending;
            }
        };
        if self.converged.as_ref() == Some(&live) {
            debug!(parent: &self.span, "live members unchanged since last reconcile");
            return Cycle::Unchanged;
        }
        let effect = match self.reconciler.reconcile(&live).await {
            Ok(effect) => effect,
            Err(error) => {
                warn!(parent: &self.span, "skipping reconcile: {}", error);
                return Cycle::Pending;
            }
        };
        if let Err(error) = self.applier.apply(&effect).await {
            error!(parent: &self.span, "{} failed: {}", effect, error);
            self.reconciler.apply_failed();
            return Cycle::Pending;
        }
        self.reconciler.applied(&effect);
        self.converged = Some(live);
        Cycle::Converged(effect)
    }

    /// Polls forever. Cancel the returned future to stop.
    pub async fn run(mut self) {
        info!(parent: &self.span, "polling every {:?}", self.poll_interval);
        loop {
            self.run_once().await;
            self.sleeper.sleep(self.poll_interval).await;
        }
    }
}

impl Debug for Controller {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("reconciler", &self.reconciler)
            .field("poll_interval", &self.poll_interval)
            .field("converged", &self.converged)
            .finish_non_exhaustive()
    }
}

/// Blocks until the monitored service reports a running instance or the policy runs out.
pub async fn wait_until_available(
    source: &dyn MembershipSource,
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<(), StartupError> {
    let ready = policy
        .run(sleeper, |attempt| async move {
            match source.is_available().await {
                Ok(true) => Some(()),
                Ok(false) => {
                    info!("service not running yet, attempt {}/{}", attempt, policy.max_attempts);
                    None
                }
                Err(error) => {
                    warn!("cannot inspect service, attempt {}/{}: {:#}", attempt, policy.max_attempts, error);
                    None
                }
            }
        })
        .await;
    ready.ok_or(StartupError::ServiceUnavailable { attempts: policy.max_attempts })
}
