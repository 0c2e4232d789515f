use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::address::{Address, LiveSet};
use crate::error::InvalidConfig;

pub type MemberId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub address: Address,
}

impl Member {
    pub fn new(id: MemberId, address: Address) -> Self {
        Self { id, address }
    }
}

impl Display for Member {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.id, self.address)
    }
}

/// Replica set configuration document.
///
/// Member ids are pairwise distinct and `version` only ever grows: every accepted change
/// carries `old.version + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaConfig {
    pub name: String,
    pub members: Vec<Member>,
    pub version: u64,
}

impl ReplicaConfig {
    pub fn addresses(&self) -> LiveSet {
        self.members.iter().map(|m| m.address.clone()).collect()
    }

    pub fn member(&self, address: &Address) -> Option<&Member> {
        self.members.iter().find(|m| m.address == *address)
    }

    pub fn max_member_id(&self) -> Option<MemberId> {
        self.members.iter().map(|m| m.id).max()
    }

    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.name.is_empty() {
            return Err(InvalidConfig::EmptyName);
        }
        if self.version < 1 {
            return Err(InvalidConfig::Version(self.version));
        }
        let mut ids = HashSet::with_capacity(self.members.len());
        let mut hosts = HashSet::with_capacity(self.members.len());
        for member in &self.members {
            if !ids.insert(member.id) {
                return Err(InvalidConfig::DuplicateId(member.id));
            }
            if !hosts.insert(member.address.host()) {
                return Err(InvalidConfig::DuplicateHost(member.address.host().to_string()));
            }
        }
        Ok(())
    }
}

impl Display for ReplicaConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{} [{}]", self.name, self.version, self.members.iter().join(", "))
    }
}

/// Which node currently acts as primary, as far as the controller knows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PrimaryState {
    Known(Address),
    #[default]
    Unknown,
}

impl PrimaryState {
    pub fn address(&self) -> Option<&Address> {
        match self {
            PrimaryState::Known(address) => Some(address),
            PrimaryState::Unknown => None,
        }
    }

    pub fn into_address(self) -> Option<Address> {
        match self {
            PrimaryState::Known(address) => Some(address),
            PrimaryState::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, PrimaryState::Known(_))
    }
}

impl Display for PrimaryState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryState::Known(address) => write!(f, "{}", address),
            PrimaryState::Unknown => write!(f, "unknown"),
        }
    }
}
