//! Domain error model.

use chrono::NaiveDate;
use thiserror::Error;

use crate::id::{KitId, LotId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Which limit a rejected allocation ran into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CapacityScope {
    /// Total physical units across every slot of a kit.
    Kit,
    /// Units held by a single kit slot.
    Slot,
}

impl core::fmt::Display for CapacityScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CapacityScope::Kit => f.write_str("kit"),
            CapacityScope::Slot => f.write_str("slot"),
        }
    }
}

/// Domain-level error.
///
/// Every expected business outcome of a stock transfer is a variant here.
/// Callers translate these into user-facing messages; nothing in the domain
/// layer panics or silently ignores one of these conditions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A kit, slot, or lot does not exist (including stale caller state).
    #[error("not found: {0}")]
    NotFound(String),

    /// No unexpired warehouse lot can satisfy the material.
    #[error("out of stock: no eligible lot for material {material_code}")]
    OutOfStock { material_code: String },

    /// The kit or slot is already full.
    #[error("{scope} capacity of {limit} units reached")]
    CapacityExceeded { scope: CapacityScope, limit: u32 },

    /// The slot holds no units to send back.
    #[error("nothing to return: kit {kit_id} holds no units of {material_code}")]
    NothingToReturn { kit_id: KitId, material_code: String },

    /// The slot holds no unit with the requested expiry date.
    #[error("kit {kit_id} holds no unit of {material_code} expiring {expiry_date}")]
    InvalidExpiry {
        kit_id: KitId,
        material_code: String,
        expiry_date: NaiveDate,
    },

    /// A lot decrement asked for more units than the lot holds.
    #[error("insufficient stock in lot {lot_id}: available {available}, requested {requested}")]
    InsufficientStock {
        lot_id: LotId,
        available: u32,
        requested: u32,
    },

    /// Malformed data-entry input.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn out_of_stock(material_code: impl Into<String>) -> Self {
        Self::OutOfStock {
            material_code: material_code.into(),
        }
    }

    /// Stable machine-readable name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::OutOfStock { .. } => "out_of_stock",
            DomainError::CapacityExceeded { .. } => "capacity_exceeded",
            DomainError::NothingToReturn { .. } => "nothing_to_return",
            DomainError::InvalidExpiry { .. } => "invalid_expiry",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::Validation(_) => "validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_message_names_the_scope() {
        let err = DomainError::CapacityExceeded {
            scope: CapacityScope::Slot,
            limit: 2,
        };
        assert_eq!(err.to_string(), "slot capacity of 2 units reached");
        assert_eq!(err.kind(), "capacity_exceeded");
    }

    #[test]
    fn out_of_stock_mentions_material() {
        let err = DomainError::out_of_stock("BAND-01");
        assert_eq!(
            err.to_string(),
            "out of stock: no eligible lot for material BAND-01"
        );
    }
}
