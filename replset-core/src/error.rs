use thiserror::Error;

use crate::replica_config::MemberId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address {0} is invalid, expected host:port")]
    Invalid(String),
    #[error("address {0} has an invalid port")]
    InvalidPort(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidConfig {
    #[error("replica set name is empty")]
    EmptyName,
    #[error("configuration version must be >= 1, got {0}")]
    Version(u64),
    #[error("member id {0} is used more than once")]
    DuplicateId(MemberId),
    #[error("member host {0} is used more than once")]
    DuplicateHost(String),
}

/// Failures reported by a node when it is asked to change the replica set configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("node unreachable: {0}")]
    Unreachable(String),
    #[error("node already initialized: {0}")]
    AlreadyInitialized(String),
    #[error("command rejected with code {code}: {message}")]
    Rejected { code: i32, message: String },
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("driver error: {0}")]
    Driver(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("no live members to reconcile against")]
    NoLiveMembers,
    #[error("replica set configuration is temporarily unreadable")]
    ConfigUnreadable,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    #[error("service did not reach a running state after {attempts} attempts")]
    ServiceUnavailable { attempts: usize },
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("required setting {0} is empty")]
    Empty(&'static str),
    #[error("setting {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}
