use crate::error::{LedgerError, LedgerResult};
use crate::models::{MappingEntry, MappingType};
use std::collections::BTreeMap;

/// Write-once mapping table between numeric ids and display names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingRepository {
    by_id: BTreeMap<(MappingType, u32), String>,
    by_name: BTreeMap<(MappingType, String), u32>,
    /// Keys registered since `begin`, while a block is open
    undo: Option<Vec<(MappingType, u32)>>,
}

impl MappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new mapping. Both the id and the name must be unused
    /// within the category; existing entries are never overwritten.
    pub fn register(&mut self, category: MappingType, id: u32, name: &str) -> LedgerResult<()> {
        if let Some(existing) = self.by_id.get(&(category, id)) {
            return Err(LedgerError::DuplicateMapping {
                category,
                detail: format!("id {} already mapped to '{}'", id, existing),
            });
        }

        let name_key = (category, name.to_string());
        if let Some(existing) = self.by_name.get(&name_key) {
            return Err(LedgerError::DuplicateMapping {
                category,
                detail: format!("name '{}' already mapped to id {}", name, existing),
            });
        }

        self.by_id.insert((category, id), name.to_string());
        self.by_name.insert(name_key, id);
        if let Some(undo) = self.undo.as_mut() {
            undo.push((category, id));
        }
        Ok(())
    }

    pub(crate) fn begin(&mut self) {
        self.undo = Some(Vec::new());
    }

    pub(crate) fn commit(&mut self) {
        self.undo = None;
    }

    /// Drop every mapping registered since `begin`
    pub(crate) fn rollback(&mut self) {
        if let Some(undo) = self.undo.take() {
            for key in undo.into_iter().rev() {
                if let Some(name) = self.by_id.remove(&key) {
                    self.by_name.remove(&(key.0, name));
                }
            }
        }
    }

    pub fn resolve_name(&self, category: MappingType, id: u32) -> LedgerResult<&str> {
        self.by_id
            .get(&(category, id))
            .map(String::as_str)
            .ok_or_else(|| LedgerError::UnknownMapping {
                category,
                detail: format!("id {}", id),
            })
    }

    /// Exact, case-sensitive lookup
    pub fn resolve_id(&self, category: MappingType, name: &str) -> LedgerResult<u32> {
        self.by_name
            .get(&(category, name.to_string()))
            .copied()
            .ok_or_else(|| LedgerError::UnknownMapping {
                category,
                detail: format!("name '{}'", name),
            })
    }

    /// Entries of one category in id order
    pub fn list(&self, category: MappingType) -> Vec<MappingEntry> {
        self.by_id
            .range((category, 0)..=(category, u32::MAX))
            .map(|((c, id), name)| MappingEntry::new(*c, *id, name.clone()))
            .collect()
    }

    /// All entries ordered by category, then id
    pub fn iter(&self) -> impl Iterator<Item = MappingEntry> + '_ {
        self.by_id
            .iter()
            .map(|((c, id), name)| MappingEntry::new(*c, *id, name.clone()))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut repo = MappingRepository::new();
        repo.register(MappingType::Sport, 0, "Football").unwrap();
        repo.register(MappingType::Team, 0, "Football").unwrap();

        assert_eq!(repo.resolve_name(MappingType::Sport, 0).unwrap(), "Football");
        assert_eq!(repo.resolve_id(MappingType::Team, "Football").unwrap(), 0);
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_duplicate_id_keeps_first_name() {
        let mut repo = MappingRepository::new();
        repo.register(MappingType::Team, 5, "Astralis").unwrap();

        let err = repo.register(MappingType::Team, 5, "Gambit").unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateMapping { .. }));
        assert_eq!(repo.resolve_name(MappingType::Team, 5).unwrap(), "Astralis");
        assert!(repo.resolve_id(MappingType::Team, "Gambit").is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut repo = MappingRepository::new();
        repo.register(MappingType::Round, 1, "round1").unwrap();
        assert!(repo.register(MappingType::Round, 2, "round1").is_err());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut repo = MappingRepository::new();
        repo.register(MappingType::Sport, 3, "CSGO").unwrap();
        let err = repo.resolve_id(MappingType::Sport, "csgo").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rollback_drops_block_registrations() {
        let mut repo = MappingRepository::new();
        repo.register(MappingType::Sport, 1, "MMA").unwrap();
        let before = repo.clone();

        repo.begin();
        repo.register(MappingType::Sport, 2, "Boxing").unwrap();
        repo.register(MappingType::Team, 2, "Boxing").unwrap();
        repo.rollback();

        assert_eq!(repo, before);
        assert!(repo.resolve_id(MappingType::Sport, "Boxing").is_err());
        repo.register(MappingType::Sport, 2, "Boxing").unwrap();
    }

    #[test]
    fn test_list_is_scoped_and_ordered() {
        let mut repo = MappingRepository::new();
        repo.register(MappingType::Tournament, 9, "UFC244").unwrap();
        repo.register(MappingType::Tournament, 2, "PGL Major Krakow").unwrap();
        repo.register(MappingType::Sport, 1, "MMA").unwrap();

        let ids: Vec<u32> = repo
            .list(MappingType::Tournament)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![2, 9]);
    }
}
