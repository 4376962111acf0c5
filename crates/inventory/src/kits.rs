//! Kit storage. Accessors only; transfer rules live in the allocation engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use medkit_core::{DomainError, DomainResult, KitId};

use crate::model::{Kit, KitItem, KitTemplate};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KitRegistry {
    kits: Vec<Kit>,
}

impl KitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kits(&self) -> &[Kit] {
        &self.kits
    }

    pub fn get_kit(&self, kit_id: KitId) -> DomainResult<&Kit> {
        self.kits
            .iter()
            .find(|k| k.id == kit_id)
            .ok_or_else(|| kit_not_found(kit_id))
    }

    pub(crate) fn get_kit_mut(&mut self, kit_id: KitId) -> DomainResult<&mut Kit> {
        self.kits
            .iter_mut()
            .find(|k| k.id == kit_id)
            .ok_or_else(|| kit_not_found(kit_id))
    }

    pub fn get_item(&self, kit_id: KitId, material_code: &str) -> DomainResult<&KitItem> {
        self.get_kit(kit_id)?
            .item(material_code)
            .ok_or_else(|| item_not_found(kit_id, material_code))
    }

    pub(crate) fn get_item_mut(
        &mut self,
        kit_id: KitId,
        material_code: &str,
    ) -> DomainResult<&mut KitItem> {
        self.get_kit_mut(kit_id)?
            .item_mut(material_code)
            .ok_or_else(|| item_not_found(kit_id, material_code))
    }

    pub fn kit_total(&self, kit_id: KitId) -> DomainResult<usize> {
        Ok(self.get_kit(kit_id)?.total_units())
    }

    /// Create an empty kit from a template.
    pub fn create_kit(&mut self, template: KitTemplate, default_capacity: u32) -> DomainResult<KitId> {
        if template.name.trim().is_empty() {
            return Err(DomainError::validation("kit name cannot be empty"));
        }

        let mut seen = HashSet::new();
        for item in &template.items {
            if item.material_code.trim().is_empty() {
                return Err(DomainError::validation("kit template has a blank material code"));
            }
            if !seen.insert(item.material_code.as_str()) {
                return Err(DomainError::validation(format!(
                    "material {} appears twice in kit template",
                    item.material_code
                )));
            }
        }

        let id = KitId::new();
        self.kits.push(Kit {
            id,
            name: template.name,
            location: template.location,
            max_capacity: template.max_capacity.unwrap_or(default_capacity),
            items: template
                .items
                .into_iter()
                .map(|i| KitItem::empty(i.material_code, i.max_quantity.into()))
                .collect(),
        });
        Ok(id)
    }

    /// Register a fully-formed kit (e.g. restored from an audit).
    pub fn insert(&mut self, kit: Kit) -> DomainResult<KitId> {
        if self.kits.iter().any(|k| k.id == kit.id) {
            return Err(DomainError::validation(format!("kit {} already exists", kit.id)));
        }
        let id = kit.id;
        self.kits.push(kit);
        Ok(id)
    }

    pub fn remove_kit(&mut self, kit_id: KitId) -> DomainResult<Kit> {
        let idx = self
            .kits
            .iter()
            .position(|k| k.id == kit_id)
            .ok_or_else(|| kit_not_found(kit_id))?;
        Ok(self.kits.remove(idx))
    }
}

fn kit_not_found(kit_id: KitId) -> DomainError {
    DomainError::not_found(format!("kit {kit_id}"))
}

fn item_not_found(kit_id: KitId, material_code: &str) -> DomainError {
    DomainError::not_found(format!("material {material_code} in kit {kit_id}"))
}
