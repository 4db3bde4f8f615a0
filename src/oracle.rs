use crate::models::OpcodeKind;
use std::collections::{BTreeMap, BTreeSet};

/// Decides whether an address may emit a given oracle opcode.
pub trait OracleAuthorizer: Send + Sync {
    fn is_authorized(&self, address: &str, kind: OpcodeKind) -> bool;
}

/// Static allow-list of oracle addresses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleRegistry {
    // An empty set grants every oracle opcode
    grants: BTreeMap<String, BTreeSet<OpcodeKind>>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry where each address may emit every oracle opcode
    pub fn with_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for address in addresses {
            registry.grant_all(address);
        }
        registry
    }

    pub fn grant_all(&mut self, address: impl Into<String>) {
        self.grants.insert(address.into(), BTreeSet::new());
    }

    /// Restrict an address to specific opcode kinds
    pub fn grant(&mut self, address: impl Into<String>, kinds: impl IntoIterator<Item = OpcodeKind>) {
        self.grants
            .entry(address.into())
            .or_default()
            .extend(kinds);
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl OracleAuthorizer for OracleRegistry {
    fn is_authorized(&self, address: &str, kind: OpcodeKind) -> bool {
        match self.grants.get(address) {
            Some(kinds) => kinds.is_empty() || kinds.contains(&kind),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_and_scoped_grants() {
        let mut registry = OracleRegistry::with_addresses(["oracle"]);
        registry.grant("events-only", [OpcodeKind::Event, OpcodeKind::Result]);

        assert!(registry.is_authorized("oracle", OpcodeKind::Mapping));
        assert!(registry.is_authorized("events-only", OpcodeKind::Result));
        assert!(!registry.is_authorized("events-only", OpcodeKind::Mapping));
        assert!(!registry.is_authorized("player", OpcodeKind::Event));
    }
}
