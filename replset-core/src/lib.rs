pub const REFERENCE: &'static str = include_str!("../reference.toml");

pub mod address;
pub mod admin;
pub mod applier;
pub mod config_builder;
pub mod config_reader;
pub mod controller;
pub mod error;
pub mod ext;
pub mod membership;
pub mod primary_locator;
pub mod reconciler;
pub mod replica_config;
pub mod retry;
pub mod settings;
#[cfg(test)]
pub(crate) mod testkit;

pub use address::{Address, LiveSet};
pub use admin::{ConfigResult, PrimaryResult, ReplicaAdmin};
pub use controller::{wait_until_available, Controller, Cycle};
pub use membership::MembershipSource;
pub use reconciler::{Effect, Reconciler, ReconcilerState};
pub use replica_config::{Member, MemberId, PrimaryState, ReplicaConfig};
pub use settings::Settings;
