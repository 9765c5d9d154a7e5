//! In-memory persona store
//!
//! Backs the `memory` database type for local runs and the integration tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::error::Result;
use crate::models::persona::Persona;
use crate::storage::repository::PersonaRepository;

#[derive(Clone, Default)]
pub struct MemoryPersonaRepository {
    rows: Arc<RwLock<BTreeMap<i64, Persona>>>,
}

impl MemoryPersonaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed rows directly, replacing any existing row with the same uid.
    pub fn with_personas(personas: impl IntoIterator<Item = Persona>) -> Self {
        let repo = Self::new();
        {
            let mut rows = repo.rows.write();
            for persona in personas {
                rows.insert(persona.uid, persona);
            }
        }
        repo
    }

    pub fn get(&self, uid: i64) -> Option<Persona> {
        self.rows.read().get(&uid).cloned()
    }

    pub fn all(&self) -> Vec<Persona> {
        self.rows.read().values().cloned().collect()
    }
}

#[async_trait]
impl PersonaRepository for MemoryPersonaRepository {
    async fn recorded_rooms(&self, rooms: &[i64]) -> Result<Vec<i64>> {
        let wanted: HashSet<i64> = rooms.iter().copied().collect();
        Ok(self
            .rows
            .read()
            .values()
            .filter(|p| wanted.contains(&p.room_id))
            .map(|p| p.room_id)
            .collect())
    }

    async fn insert_ignore(&self, personas: &[Persona]) -> Result<u64> {
        let mut rows = self.rows.write();
        let mut inserted = 0;
        for persona in personas {
            if !rows.contains_key(&persona.uid) {
                rows.insert(persona.uid, persona.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn uids_not_in(&self, uids: &[i64]) -> Result<Vec<i64>> {
        let excluded: HashSet<i64> = uids.iter().copied().collect();
        Ok(self
            .rows
            .read()
            .keys()
            .filter(|uid| !excluded.contains(*uid))
            .copied()
            .collect())
    }

    async fn existing_uids(&self, uids: &[i64]) -> Result<Vec<i64>> {
        let rows = self.rows.read();
        Ok(uids
            .iter()
            .filter(|uid| rows.contains_key(*uid))
            .copied()
            .collect())
    }

    async fn delete_by_uids(&self, uids: &[i64]) -> Result<u64> {
        let mut rows = self.rows.write();
        Ok(uids.iter().filter(|uid| rows.remove(*uid).is_some()).count() as u64)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.read().len() as u64)
    }
}
