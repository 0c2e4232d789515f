//! Decides how the replica set configuration must change to match the live instances.
//!
//! A reconciler starts [`ReconcilerState::Unconfigured`] and moves to
//! [`ReconcilerState::Configured`] the first time it reads or creates a configuration. It
//! never goes back.
//!
//! Every pass that finds a membership change asks the surviving members who the primary is.
//! The stored primary is only what was last observed or applied and never decides the
//! target. A live primary receives the new document as a regular reconfiguration. Without
//! one the cluster gets a bounded window to elect a new one; only if nobody steps up is the
//! change forced through a surviving member.

use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, debug_span, info, warn, Instrument, Span};

use crate::address::{Address, LiveSet};
use crate::admin::ReplicaAdmin;
use crate::config_builder::{build_initial, build_updated};
use crate::config_reader::ConfigReader;
use crate::error::ReconcileError;
use crate::primary_locator::PrimaryLocator;
use crate::replica_config::{PrimaryState, ReplicaConfig};
use crate::retry::{RetryPolicy, Sleeper};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    NoOp,
    Initiate {
        target: Address,
        config: ReplicaConfig,
    },
    Reconfigure {
        target: Address,
        config: ReplicaConfig,
        force: bool,
    },
}

impl Effect {
    pub fn target(&self) -> Option<&Address> {
        match self {
            Effect::NoOp => None,
            Effect::Initiate { target, .. } | Effect::Reconfigure { target, .. } => Some(target),
        }
    }

    pub fn config(&self) -> Option<&ReplicaConfig> {
        match self {
            Effect::NoOp => None,
            Effect::Initiate { config, .. } | Effect::Reconfigure { config, .. } => Some(config),
        }
    }
}

impl Display for Effect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::NoOp => write!(f, "no-op"),
            Effect::Initiate { target, config } => write!(f, "initiate {} on {}", config, target),
            Effect::Reconfigure { target, config, force } => {
                write!(f, "reconfigure {} on {} (force: {})", config, target, force)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReconcilerState {
    #[default]
    Unconfigured,
    Configured {
        config: ReplicaConfig,
        primary: PrimaryState,
    },
}

pub struct Reconciler {
    replica_set: String,
    reader: ConfigReader,
    locator: PrimaryLocator,
    election: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    state: ReconcilerState,
    span: Span,
}

impl Reconciler {
    pub fn new(
        replica_set: impl Into<String>,
        admin: Arc<dyn ReplicaAdmin>,
        election: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        span: Span,
    ) -> Self {
        let reader = ConfigReader::new(admin.clone(), debug_span!(parent: &span, "config_reader"));
        let locator = PrimaryLocator::new(admin, debug_span!(parent: &span, "primary_locator"));
        Self {
            replica_set: replica_set.into(),
            reader,
            locator,
            election,
            sleeper,
            state: ReconcilerState::Unconfigured,
            span,
        }
    }

    /// Resumes from a state observed earlier, e.g. when the controller is rebuilt.
    pub fn with_state(mut self, state: ReconcilerState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &ReconcilerState {
        &self.state
    }

    pub fn primary(&self) -> &PrimaryState {
        match &self.state {
            ReconcilerState::Unconfigured => &PrimaryState::Unknown,
            ReconcilerState::Configured { primary, .. } => primary,
        }
    }

    pub async fn reconcile(&mut self, live: &LiveSet) -> Result<Effect, ReconcileError> {
        let span = self.span.clone();
        self.reconcile_live(live).instrument(span).await
    }

    async fn reconcile_live(&mut self, live: &LiveSet) -> Result<Effect, ReconcileError> {
        let Some(first_live) = live.first().cloned() else {
            return Err(ReconcileError::NoLiveMembers);
        };
        let Some(current) = self.reader.read_config(live).await else {
            return match self.state {
                ReconcilerState::Unconfigured => {
                    info!("no previous valid configuration, starting replica set {} from scratch", self.replica_set);
                    let config = build_initial(live, self.replica_set.as_str());
                    debug!("initial config: {}", config);
                    Ok(Effect::Initiate { target: first_live, config })
                }
                ReconcilerState::Configured { .. } => Err(ReconcileError::ConfigUnreadable),
            };
        };
        let current_addresses = current.addresses();
        if current_addresses == *live {
            let primary = self.primary().clone();
            self.state = ReconcilerState::Configured { config: current, primary };
            return Ok(Effect::NoOp);
        }
        let to_remove: LiveSet = current_addresses.difference(live).cloned().collect();
        let to_add: LiveSet = live.difference(&current_addresses).cloned().collect();
        if !to_remove.is_empty() {
            info!("to remove: {}", to_remove.iter().join(", "));
        }
        if !to_add.is_empty() {
            info!("to add: {}", to_add.iter().join(", "));
        }

        let survivors: LiveSet = current_addresses.intersection(live).cloned().collect();
        let primary = self.locator.find_primary(&survivors).await;
        if let Some(last) = self.primary().address() {
            if primary.address() != Some(last) {
                debug!("last known primary {} superseded, now {}", last, primary);
            }
        }
        debug!("current primary: {}", primary);
        self.state = ReconcilerState::Configured {
            config: current.clone(),
            primary: primary.clone(),
        };

        let (target, force) = self.choose_coordinator(&primary, &current_addresses, live).await?;
        let config = build_updated(&current, &to_remove, &to_add);
        debug!("new config: {}", config);
        Ok(Effect::Reconfigure { target, config, force })
    }

    /// Picks the node the reconfiguration is sent to and whether it has to be forced.
    async fn choose_coordinator(
        &self,
        primary: &PrimaryState,
        current_addresses: &LiveSet,
        live: &LiveSet,
    ) -> Result<(Address, bool), ReconcileError> {
        if let PrimaryState::Known(address) = primary {
            if live.contains(address) {
                return Ok((address.clone(), false));
            }
        }
        debug!("no live primary ({}), waiting for an election", primary);

        let locator = &self.locator;
        let max_attempts = self.election.max_attempts;
        let elected = self
            .election
            .run(self.sleeper.as_ref(), |attempt| async move {
                let found = locator.find_primary(live).await.into_address();
                if found.is_none() {
                    debug!("no new primary automatically elected yet ({}/{})", attempt, max_attempts);
                }
                found
            })
            .await;
        if let Some(elected) = elected {
            info!("{} was elected primary, reconfiguring without force", elected);
            return Ok((elected, false));
        }

        let fallback = current_addresses
            .intersection(live)
            .next()
            .or_else(|| live.first())
            .cloned()
            .ok_or(ReconcileError::NoLiveMembers)?;
        warn!(
            "no primary elected after {} attempts, forcing reconfiguration through {}",
            max_attempts, fallback
        );
        Ok((fallback, true))
    }

    /// Records an effect the cluster accepted. The applied document and its target become the
    /// known configuration and primary without another round trip.
    pub fn applied(&mut self, effect: &Effect) {
        match effect {
            Effect::NoOp => {}
            Effect::Initiate { target, config } | Effect::Reconfigure { target, config, .. } => {
                self.state = ReconcilerState::Configured {
                    config: config.clone(),
                    primary: PrimaryState::Known(target.clone()),
                };
            }
        }
    }

    /// The cluster refused the last effect; whoever we thought was primary is no longer trusted.
    pub fn apply_failed(&mut self) {
        if let ReconcilerState::Configured { primary, .. } = &mut self.state {
            *primary = PrimaryState::Unknown;
        }
    }
}

impl Debug for Reconciler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("replica_set", &self.replica_set)
            .field("election", &self.election)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
