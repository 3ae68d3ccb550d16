//! Variant record model.
//!
//! # Responsibility
//! - Describe one content item participating in a variant family.
//!
//! # Invariants
//! - `id` is stable and unique within one environment.
//! - Base records carry no audience; variant records normally carry one.

use crate::model::audience::AudienceCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque content item identifier.
pub type ItemId = Uuid;

/// One member of a variant family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub id: ItemId,
    /// Display name of the content item.
    pub name: String,
    /// `None` for base content, or for a variant whose audience was cleared.
    pub audience: Option<AudienceCode>,
    pub is_base_content: bool,
}

impl VariantRecord {
    /// Creates the base record of a family.
    pub fn base(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            audience: None,
            is_base_content: true,
        }
    }

    /// Creates an audience-tagged variant record.
    pub fn variant(id: ItemId, name: impl Into<String>, audience: AudienceCode) -> Self {
        Self {
            id,
            name: name.into(),
            audience: Some(audience),
            is_base_content: false,
        }
    }

    /// Returns whether this record targets `code`.
    pub fn targets(&self, code: &AudienceCode) -> bool {
        self.audience.as_ref() == Some(code)
    }
}
