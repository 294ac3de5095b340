// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use packly_core::catalog::{
    InstanceId, InstanceSpec, Item, ItemFilter, ItemId, RewardInstance, SpecialDefinition,
    SpecialFilter,
};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;

use crate::collaborators::{Catalog, CatalogError, Persistence, PersistenceError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub specials: Vec<SpecialDefinition>,
}

/// Catalog held in memory, loaded once at start-up.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<CatalogFile>,
}

impl InMemoryCatalog {
    pub fn new(items: Vec<Item>, specials: Vec<SpecialDefinition>) -> Self {
        Self {
            inner: RwLock::new(CatalogFile { items, specials }),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| CatalogError::Unavailable(format!("{}: {err}", path.display())))?;
        let file: CatalogFile =
            serde_json::from_str(&raw).map_err(|err| CatalogError::Invalid(err.to_string()))?;
        for item in &file.items {
            if !item.rarity.is_finite() || item.rarity < 0.0 {
                return Err(CatalogError::Invalid(format!(
                    "item {} has invalid rarity {}",
                    item.id, item.rarity
                )));
            }
        }
        for special in &file.specials {
            if !(0.0..=1.0).contains(&special.rarity_threshold) {
                return Err(CatalogError::Invalid(format!(
                    "special {} threshold outside [0, 1]",
                    special.id
                )));
            }
        }
        tracing::info!(
            target: "packly.lifecycle",
            items = file.items.len(),
            specials = file.specials.len(),
            "catalog loaded"
        );
        Ok(Self {
            inner: RwLock::new(file),
        })
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn query_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, CatalogError> {
        Ok(self
            .inner
            .read()
            .items
            .iter()
            .filter(|item| item.matches(filter))
            .cloned()
            .collect())
    }

    async fn query_specials(
        &self,
        filter: &SpecialFilter,
    ) -> Result<Vec<SpecialDefinition>, CatalogError> {
        Ok(self
            .inner
            .read()
            .specials
            .iter()
            .filter(|special| special.matches(filter))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct InstanceTable {
    next_id: InstanceId,
    rows: Vec<RewardInstance>,
}

impl InstanceTable {
    fn insert(&mut self, spec: InstanceSpec) -> InstanceId {
        self.next_id += 1;
        let id = self.next_id;
        self.rows.push(RewardInstance::from_spec(id, spec));
        id
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    table: Mutex<InstanceTable>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances(&self) -> Vec<RewardInstance> {
        self.table.lock().rows.clone()
    }

    pub fn instances_for(&self, owner: &str) -> Vec<RewardInstance> {
        self.table
            .lock()
            .rows
            .iter()
            .filter(|row| row.owner == owner)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn create_instance(&self, spec: InstanceSpec) -> Result<InstanceId, PersistenceError> {
        Ok(self.table.lock().insert(spec))
    }

    async fn bulk_create(
        &self,
        specs: Vec<InstanceSpec>,
    ) -> Result<Vec<InstanceId>, PersistenceError> {
        let mut table = self.table.lock();
        Ok(specs.into_iter().map(|spec| table.insert(spec)).collect())
    }

    async fn owned_item_ids(&self, owner: &str) -> Result<HashSet<ItemId>, PersistenceError> {
        Ok(self
            .table
            .lock()
            .rows
            .iter()
            .filter(|row| row.owner == owner)
            .map(|row| row.item_id)
            .collect())
    }
}
