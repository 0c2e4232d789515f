use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::address::{Address, LiveSet};
use crate::admin::{ConfigResult, PrimaryResult, ReplicaAdmin};
use crate::error::AdminError;
use crate::membership::MembershipSource;
use crate::replica_config::{Member, ReplicaConfig};
use crate::retry::Sleeper;

pub(crate) const PORT: u16 = 27017;

pub(crate) fn addr(host: &str) -> Address {
    Address::new(host, PORT)
}

pub(crate) fn live(hosts: &[&str]) -> LiveSet {
    hosts.iter().map(|h| addr(h)).collect()
}

pub(crate) fn config(members: &[(u32, &str)], version: u64) -> ReplicaConfig {
    ReplicaConfig {
        name: "rs0".to_string(),
        members: members.iter().map(|(id, host)| Member::new(*id, addr(host))).collect(),
        version,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AdminCall {
    Initiate { node: Address, config: ReplicaConfig },
    Reconfigure { node: Address, config: ReplicaConfig, force: bool },
}

#[derive(Debug, Default)]
struct FakeAdminState {
    configs: HashMap<String, ConfigResult>,
    primaries: HashMap<String, (Vec<PrimaryResult>, usize)>,
    config_queries: Vec<Address>,
    primary_queries: Vec<Address>,
    calls: Vec<AdminCall>,
    initiate_errors: VecDeque<AdminError>,
    reconfigure_errors: VecDeque<AdminError>,
}

/// Scripted cluster. Nodes without a scripted answer are unreachable.
#[derive(Debug, Default)]
pub(crate) struct FakeAdmin {
    state: Mutex<FakeAdminState>,
}

impl FakeAdmin {
    pub(crate) fn set_config(&self, host: &str, result: ConfigResult) {
        self.state.lock().configs.insert(host.to_string(), result);
    }

    /// Answers handed out one per `is_primary` call, the last one repeats.
    pub(crate) fn set_primary<I>(&self, host: &str, answers: I) where I: IntoIterator<Item=PrimaryResult> {
        self.state.lock().primaries.insert(host.to_string(), (answers.into_iter().collect(), 0));
    }

    pub(crate) fn fail_next_initiate(&self, error: AdminError) {
        self.state.lock().initiate_errors.push_back(error);
    }

    pub(crate) fn fail_next_reconfigure(&self, error: AdminError) {
        self.state.lock().reconfigure_errors.push_back(error);
    }

    pub(crate) fn config_queries(&self) -> Vec<Address> {
        self.state.lock().config_queries.clone()
    }

    pub(crate) fn primary_queries(&self) -> Vec<Address> {
        self.state.lock().primary_queries.clone()
    }

    pub(crate) fn calls(&self) -> Vec<AdminCall> {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl ReplicaAdmin for FakeAdmin {
    async fn get_config(&self, node: &Address) -> ConfigResult {
        let mut state = self.state.lock();
        state.config_queries.push(node.clone());
        state
            .configs
            .get(node.host())
            .cloned()
            .unwrap_or_else(|| ConfigResult::Unreachable("connection refused".to_string()))
    }

    async fn is_primary(&self, node: &Address) -> PrimaryResult {
        let mut state = self.state.lock();
        state.primary_queries.push(node.clone());
        match state.primaries.get_mut(node.host()) {
            Some((answers, served)) if !answers.is_empty() => {
                let answer = answers[(*served).min(answers.len() - 1)].clone();
                *served += 1;
                answer
            }
            _ => PrimaryResult::Unreachable("connection refused".to_string()),
        }
    }

    async fn initiate(&self, node: &Address, config: &ReplicaConfig) -> Result<(), AdminError> {
        let mut state = self.state.lock();
        state.calls.push(AdminCall::Initiate { node: node.clone(), config: config.clone() });
        match state.initiate_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn reconfigure(&self, node: &Address, config: &ReplicaConfig, force: bool) -> Result<(), AdminError> {
        let mut state = self.state.lock();
        state.calls.push(AdminCall::Reconfigure { node: node.clone(), config: config.clone(), force });
        match state.reconfigure_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Scripted inventory. The last scripted poll repeats forever.
#[derive(Debug, Default)]
pub(crate) struct FakeMembership {
    polls: Mutex<VecDeque<Result<LiveSet, String>>>,
    available: Mutex<VecDeque<bool>>,
}

impl FakeMembership {
    pub(crate) fn push_live(&self, hosts: &[&str]) {
        self.polls.lock().push_back(Ok(live(hosts)));
    }

    pub(crate) fn push_failure(&self, reason: &str) {
        self.polls.lock().push_back(Err(reason.to_string()));
    }

    pub(crate) fn push_available(&self, available: bool) {
        self.available.lock().push_back(available);
    }
}

fn next_sticky<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl MembershipSource for FakeMembership {
    async fn live_addresses(&self) -> anyhow::Result<LiveSet> {
        match next_sticky(&mut self.polls.lock()) {
            Some(Ok(live)) => Ok(live),
            Some(Err(reason)) => Err(anyhow::anyhow!(reason)),
            None => Ok(LiveSet::new()),
        }
    }

    async fn is_available(&self) -> anyhow::Result<bool> {
        Ok(next_sticky(&mut self.available.lock()).unwrap_or(false))
    }
}

/// Returns immediately and remembers every requested delay.
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }

    pub(crate) fn total(&self) -> Duration {
        self.slept.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}
