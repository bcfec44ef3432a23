use std::collections::BTreeMap;
use std::fmt;

/// One `address hostname` pair of the hosts table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostEntry {
    /// Node address
    pub address: String,
    /// Node hostname
    pub hostname: String,
}

impl HostEntry {
    /// Create a new entry
    #[must_use]
    pub fn new(address: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            hostname: hostname.into(),
        }
    }
}

impl fmt::Display for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.address, self.hostname)
    }
}

/// Hostname to address mapping published for name resolution.
///
/// Hostnames are unique keys. Iteration happens to be sorted by hostname,
/// but the published blob carries no ordering contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostTable {
    hosts: BTreeMap<String, String>,
}

impl HostTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hostnames in the table
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns true if the table has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Address currently mapped to `hostname`
    #[must_use]
    pub fn get(&self, hostname: &str) -> Option<&str> {
        self.hosts.get(hostname).map(String::as_str)
    }

    /// Returns true if `hostname` has an entry
    #[must_use]
    pub fn contains(&self, hostname: &str) -> bool {
        self.hosts.contains_key(hostname)
    }

    /// Map `hostname` to `address`, returning the previous address
    pub fn insert(
        &mut self,
        hostname: impl Into<String>,
        address: impl Into<String>,
    ) -> Option<String> {
        self.hosts.insert(hostname.into(), address.into())
    }

    /// Drop the entry for `hostname`, returning its address
    pub fn remove(&mut self, hostname: &str) -> Option<String> {
        self.hosts.remove(hostname)
    }

    /// Full entry for `hostname`
    #[must_use]
    pub fn entry(&self, hostname: &str) -> Option<HostEntry> {
        self.get(hostname).map(|address| HostEntry::new(address, hostname))
    }

    /// Iterate over `(hostname, address)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.hosts.iter().map(|(h, a)| (h.as_str(), a.as_str()))
    }

    /// Iterate over entries
    pub fn entries(&self) -> impl Iterator<Item = HostEntry> + '_ {
        self.iter().map(|(h, a)| HostEntry::new(a, h))
    }
}

impl<H: Into<String>, A: Into<String>> FromIterator<(H, A)> for HostTable {
    fn from_iter<I: IntoIterator<Item = (H, A)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (hostname, address) in iter {
            table.insert(hostname, address);
        }
        table
    }
}
