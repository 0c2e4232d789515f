//! Pure construction of configuration documents.
//!
//! Ids are handed out in the iteration order of the address sets, which is ordered by host,
//! so the same inputs always produce the same document.

use crate::address::LiveSet;
use crate::replica_config::{Member, MemberId, ReplicaConfig};

pub fn build_initial(addresses: &LiveSet, name: impl Into<String>) -> ReplicaConfig {
    let members = addresses
        .iter()
        .zip(0 as MemberId..)
        .map(|(address, id)| Member::new(id, address.clone()))
        .collect();
    ReplicaConfig {
        name: name.into(),
        members,
        version: 1,
    }
}

/// Drops `to_remove`, appends `to_add` above the highest remaining id and bumps the version.
///
/// Callers must not invoke this without a change; an empty diff is guarded upstream.
pub fn build_updated(old: &ReplicaConfig, to_remove: &LiveSet, to_add: &LiveSet) -> ReplicaConfig {
    debug_assert!(
        !(to_remove.is_empty() && to_add.is_empty()),
        "build_updated called without any membership change"
    );
    let mut members: Vec<Member> = old
        .members
        .iter()
        .filter(|m| !to_remove.contains(&m.address))
        .cloned()
        .collect();
    let offset = members.iter().map(|m| m.id).max().map_or(0, |id| id + 1);
    members.extend(
        to_add
            .iter()
            .zip(offset..)
            .map(|(address, id)| Member::new(id, address.clone())),
    );
    ReplicaConfig {
        name: old.name.clone(),
        members,
        version: old.version + 1,
    }
}

#[cfg(test)]
mod tests {
    use crate::address::{Address, LiveSet};
    use crate::config_builder::{build_initial, build_updated};
    use crate::replica_config::{Member, ReplicaConfig};

    fn live(hosts: &[&str]) -> LiveSet {
        hosts.iter().map(|h| Address::new(*h, 27017)).collect()
    }

    fn ids(config: &ReplicaConfig) -> Vec<(u32, String)> {
        config
            .members
            .iter()
            .map(|m| (m.id, m.address.host().to_string()))
            .collect()
    }

    #[test]
    fn initial_config_numbers_members_from_zero() {
        let config = build_initial(&live(&["c", "a", "b"]), "rs0");
        assert_eq!(config.name, "rs0");
        assert_eq!(config.version, 1);
        assert_eq!(
            ids(&config),
            vec![(0, "a".to_string()), (1, "b".to_string()), (2, "c".to_string())]
        );
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn remove_one_add_one() {
        let old = ReplicaConfig {
            name: "rs0".to_string(),
            members: vec![
                Member::new(0, Address::new("a", 27017)),
                Member::new(1, Address::new("b", 27017)),
            ],
            version: 5,
        };
        let config = build_updated(&old, &live(&["a"]), &live(&["c"]));
        assert_eq!(ids(&config), vec![(1, "b".to_string()), (2, "c".to_string())]);
        assert_eq!(config.version, 6);
        assert_eq!(config.name, "rs0");
    }

    #[test]
    fn removing_everything_restarts_ids_at_zero() {
        let old = build_initial(&live(&["a", "b"]), "rs0");
        let config = build_updated(&old, &live(&["a", "b"]), &live(&["x", "y"]));
        assert_eq!(ids(&config), vec![(0, "x".to_string()), (1, "y".to_string())]);
        assert_eq!(config.version, 2);
    }

    #[test]
    fn new_ids_are_above_every_surviving_id() {
        let old = ReplicaConfig {
            name: "rs0".to_string(),
            members: vec![
                Member::new(7, Address::new("a", 27017)),
                Member::new(2, Address::new("b", 27017)),
                Member::new(9, Address::new("c", 27017)),
            ],
            version: 11,
        };
        let config = build_updated(&old, &live(&["c"]), &live(&["d", "e"]));
        assert_eq!(
            ids(&config),
            vec![(7, "a".to_string()), (2, "b".to_string()), (8, "d".to_string()), (9, "e".to_string())]
        );
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn successive_updates_bump_version_by_one() {
        let mut config = build_initial(&live(&["a"]), "rs0");
        for (step, host) in ["b", "c", "d"].into_iter().enumerate() {
            config = build_updated(&config, &LiveSet::new(), &live(&[host]));
            assert_eq!(config.version, step as u64 + 2);
            assert_eq!(config.validate(), Ok(()));
        }
        assert_eq!(config.members.len(), 4);
    }
}
