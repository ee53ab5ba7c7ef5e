//! Party registry: the identity mapping shared by the node, the chain loader
//! and balance replay.
//!
//! Each party has a stable id, a display name, the balance it started with
//! and its live balance. Ids are what transactions and the persisted chain
//! refer to; names are for display only and need not be unique.

use crate::blockchain::StartingBalances;
use crate::error::ChainError;
use crate::transaction::{Balance, PartyId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;

const MAX_NAME_LENGTH: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Party {
    pub id: PartyId,
    pub name: String,
    pub starting_balance: Balance,
    pub balance: Balance,
}

impl Party {
    fn new(id: PartyId, name: String, balance: Balance) -> Result<Self, ChainError> {
        let name = name.trim().to_string();
        validate_name(&name)?;
        if balance < 0 {
            return Err(ChainError::RegistryError(format!(
                "Starting balance for '{}' cannot be negative",
                name
            )));
        }
        Ok(Party {
            id,
            name,
            starting_balance: balance,
            balance,
        })
    }
}

/// Parties in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRegistry {
    parties: Vec<Party>,
}

impl PartyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a party under a fresh random id.
    pub fn register(&mut self, name: impl Into<String>, balance: Balance) -> Result<PartyId, ChainError> {
        self.register_with_id(PartyId::generate(), name, balance)
    }

    pub fn register_with_id(
        &mut self,
        id: PartyId,
        name: impl Into<String>,
        balance: Balance,
    ) -> Result<PartyId, ChainError> {
        if self.contains(&id) {
            return Err(ChainError::RegistryError(format!(
                "Party id '{}' already registered",
                id
            )));
        }
        let party = Party::new(id.clone(), name.into(), balance)?;
        self.parties.push(party);
        Ok(id)
    }

    pub fn get(&self, id: &PartyId) -> Option<&Party> {
        self.parties.iter().find(|p| &p.id == id)
    }

    pub fn get_mut(&mut self, id: &PartyId) -> Option<&mut Party> {
        self.parties.iter_mut().find(|p| &p.id == id)
    }

    /// Look up a party, failing with `UnresolvedIdentity`.
    pub fn resolve(&self, id: &PartyId) -> Result<&Party, ChainError> {
        self.get(id)
            .ok_or_else(|| ChainError::UnresolvedIdentity(id.to_string()))
    }

    /// First party registered under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Party> {
        self.parties.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, id: &PartyId) -> bool {
        self.get(id).is_some()
    }

    pub fn name_of(&self, id: &PartyId) -> Option<&str> {
        self.get(id).map(|p| p.name.as_str())
    }

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }

    /// Live balances keyed by id.
    pub fn balances(&self) -> BTreeMap<PartyId, Balance> {
        self.parties
            .iter()
            .map(|p| (p.id.clone(), p.balance))
            .collect()
    }

    /// Put every live balance back to its starting value.
    pub fn reset_balances(&mut self) {
        for party in &mut self.parties {
            party.balance = party.starting_balance;
        }
    }

    /// Save the registry as pretty JSON, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), ChainError> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self, ChainError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ChainError::RegistryError(format!("Failed to read registry {}: {}", path.display(), e))
        })?;
        let registry: PartyRegistry = serde_json::from_str(&contents)?;

        let mut seen = HashSet::new();
        for party in &registry.parties {
            validate_name(&party.name)?;
            if !seen.insert(&party.id) {
                return Err(ChainError::RegistryError(format!(
                    "Duplicate party id '{}' in registry",
                    party.id
                )));
            }
        }

        Ok(registry)
    }
}

impl StartingBalances for PartyRegistry {
    fn starting_balance(&self, party: &PartyId) -> Option<Balance> {
        self.get(party).map(|p| p.starting_balance)
    }
}

/// Write through a temporary file in the target directory, then rename it
/// over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ChainError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| ChainError::IoError(e.error.to_string()))?;
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ChainError> {
    if name.is_empty() {
        return Err(ChainError::RegistryError("Party name cannot be empty".to_string()));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(ChainError::RegistryError(format!(
            "Party name too long (max {} characters)",
            MAX_NAME_LENGTH
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(ChainError::RegistryError(
            "Party name contains control characters".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = PartyRegistry::new();
        let alice = registry.register("Alice", 100).unwrap();
        let party = registry.resolve(&alice).unwrap();
        assert_eq!(party.name, "Alice");
        assert_eq!(party.starting_balance, 100);
        assert_eq!(party.balance, 100);
        assert_eq!(registry.name_of(&alice), Some("Alice"));
        assert_eq!(registry.find_by_name("Alice").map(|p| &p.id), Some(&alice));
    }

    #[test]
    fn test_unknown_id_is_unresolved() {
        let registry = PartyRegistry::new();
        let missing = PartyId::new("nobody");
        assert_eq!(
            registry.resolve(&missing).unwrap_err(),
            ChainError::UnresolvedIdentity("nobody".to_string())
        );
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = PartyRegistry::new();
        registry.register_with_id(PartyId::new("p1"), "One", 1).unwrap();
        assert!(registry.register_with_id(PartyId::new("p1"), "Two", 2).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_names_and_balances() {
        let mut registry = PartyRegistry::new();
        assert!(registry.register("   ", 1).is_err());
        assert!(registry.register("x".repeat(65), 1).is_err());
        assert!(registry.register("bad\nname", 1).is_err());
        assert!(registry.register("Negative", -1).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_starting_balances_survive_live_changes() {
        let mut registry = PartyRegistry::new();
        let bob = registry.register("Bob", 50).unwrap();
        registry.get_mut(&bob).unwrap().balance = 10;
        assert_eq!(registry.starting_balance(&bob), Some(50));
        registry.reset_balances();
        assert_eq!(registry.balances()[&bob], 50);
    }

    #[test]
    fn test_save_and_load() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("parties.json");

        let mut registry = PartyRegistry::new();
        registry.register("Alice", 60000)?;
        registry.register("Bob", 4500)?;
        registry.save(&path)?;

        let loaded = PartyRegistry::load(&path)?;
        assert_eq!(loaded, registry);

        // Saving again replaces the file in place.
        registry.register("Eva", 7500)?;
        registry.save(&path)?;
        assert_eq!(PartyRegistry::load(&path)?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_load_rejects_duplicate_ids() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("parties.json");
        let party = r#"{"id": "p1", "name": "A", "starting_balance": 1, "balance": 1}"#;
        fs::write(&path, format!(r#"{{"parties": [{party}, {party}]}}"#))?;
        assert!(matches!(
            PartyRegistry::load(&path),
            Err(ChainError::RegistryError(_))
        ));
        Ok(())
    }
}
