//! Material reference data and code resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::Material;

/// Identity shared by every code that denotes the same physical material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Maps a material code to its canonical identity.
///
/// Lot eligibility falls back to this when no lot carries the exact code
/// requested, so two codes for the same product can stand in for each other.
pub trait MaterialResolver: Send + Sync {
    /// `None` when the code is unknown.
    fn resolve_material(&self, code: &str) -> Option<CanonicalId>;
}

impl<R> MaterialResolver for Arc<R>
where
    R: MaterialResolver + ?Sized,
{
    fn resolve_material(&self, code: &str) -> Option<CanonicalId> {
        (**self).resolve_material(code)
    }
}

/// In-memory material catalog keyed by code.
///
/// Resolves codes by material name, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialCatalog {
    materials: BTreeMap<String, Material>,
}

impl MaterialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a material; returns the previous entry for that code.
    pub fn insert(&mut self, material: Material) -> Option<Material> {
        self.materials.insert(material.code.clone(), material)
    }

    pub fn get(&self, code: &str) -> Option<&Material> {
        self.materials.get(code)
    }

    /// Materials ordered by code.
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Display name for a code, falling back to the code itself.
    pub fn display_name(&self, code: &str) -> String {
        self.get(code)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| code.to_string())
    }
}

impl FromIterator<Material> for MaterialCatalog {
    fn from_iter<T: IntoIterator<Item = Material>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for material in iter {
            catalog.insert(material);
        }
        catalog
    }
}

impl MaterialResolver for MaterialCatalog {
    fn resolve_material(&self, code: &str) -> Option<CanonicalId> {
        self.get(code)
            .map(|m| CanonicalId::new(m.name.trim().to_lowercase()))
    }
}
