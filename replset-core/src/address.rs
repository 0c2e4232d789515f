use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::AddressError;

/// Network endpoint of one cluster instance.
///
/// The port is fixed cluster-wide, so two addresses are the same instance when their hosts
/// match. `Eq`, `Ord` and `Hash` only look at the host.
#[derive(Debug, Clone)]
pub struct Address {
    host: String,
    port: u16,
}

/// Snapshot of the reachable instances, ordered by host.
pub type LiveSet = BTreeSet<Address>;

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Parses `host:port`, or a bare `host` which gets `default_port`.
    pub fn parse_with_default_port(s: &str, default_port: u16) -> Result<Self, AddressError> {
        if s.contains(':') {
            s.parse()
        } else if s.is_empty() {
            Err(AddressError::Invalid(s.to_string()))
        } else {
            Ok(Self::new(s, default_port))
        }
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host
    }
}

impl Eq for Address {}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.host.cmp(&other.host)
    }
}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressError::Invalid(s.to_string()))?;
        if host.is_empty() {
            return Err(AddressError::Invalid(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressError::InvalidPort(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::address::{Address, LiveSet};
    use crate::error::AddressError;

    #[test]
    fn parse_host_and_port() -> anyhow::Result<()> {
        let address: Address = "10.0.0.3:27017".parse()?;
        assert_eq!(address.host(), "10.0.0.3");
        assert_eq!(address.port(), 27017);
        assert_eq!(address.to_string(), "10.0.0.3:27017");
        Ok(())
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("10.0.0.3".parse::<Address>(), Err(AddressError::Invalid("10.0.0.3".to_string())));
        assert_eq!(":27017".parse::<Address>(), Err(AddressError::Invalid(":27017".to_string())));
        assert_eq!("10.0.0.3:mongo".parse::<Address>(), Err(AddressError::InvalidPort("10.0.0.3:mongo".to_string())));
    }

    #[test]
    fn bare_host_gets_default_port() -> anyhow::Result<()> {
        let address = Address::parse_with_default_port("10.0.0.3", 27017)?;
        assert_eq!(address.to_string(), "10.0.0.3:27017");
        let address = Address::parse_with_default_port("10.0.0.3:27018", 27017)?;
        assert_eq!(address.port(), 27018);
        assert!(Address::parse_with_default_port("", 27017).is_err());
        Ok(())
    }

    #[test]
    fn equality_ignores_port() {
        let a = Address::new("10.0.0.3", 27017);
        let b = Address::new("10.0.0.3", 27018);
        assert_eq!(a, b);
        let set: HashSet<Address> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn live_set_is_ordered_by_host() {
        let live: LiveSet = ["10.0.0.9", "10.0.0.1", "10.0.0.5"]
            .into_iter()
            .map(|h| Address::new(h, 27017))
            .collect();
        let hosts: Vec<&str> = live.iter().map(|a| a.host()).collect();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.5", "10.0.0.9"]);
    }
}
