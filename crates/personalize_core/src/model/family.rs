//! Variant family model.
//!
//! # Responsibility
//! - Group one base record with its audience-tagged variants.
//! - Report violations of family-level invariants as typed errors.
//!
//! # Invariants
//! - A constructed family has exactly one base record, stored first.
//! - Member order otherwise follows load order.
//! - Duplicate audiences are detectable but not rejected at construction.

use crate::model::audience::{AudienceCatalog, AudienceCode, AudienceDefinition};
use crate::model::variant::{ItemId, VariantRecord};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Violations of variant-family invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilyInvariantError {
    /// No member is marked as base content.
    MissingBase,
    /// More than one member is marked as base content.
    MultipleBases(Vec<ItemId>),
    /// Two or more variants target the same audience.
    DuplicateAudience {
        audience: AudienceCode,
        items: Vec<ItemId>,
    },
}

impl Display for FamilyInvariantError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingBase => write!(f, "variant family has no base content item"),
            Self::MultipleBases(ids) => {
                write!(f, "variant family has {} base content items", ids.len())
            }
            Self::DuplicateAudience { audience, items } => write!(
                f,
                "audience `{audience}` is targeted by {} variants",
                items.len()
            ),
        }
    }
}

impl Error for FamilyInvariantError {}

/// Base content plus its variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantFamily {
    members: Vec<VariantRecord>,
}

impl VariantFamily {
    /// Builds a family from loaded members.
    ///
    /// The base record is moved to the front; the relative order of the
    /// remaining members is preserved.
    ///
    /// # Errors
    /// - `MissingBase` when no member is base content.
    /// - `MultipleBases` when several members claim to be base content.
    pub fn from_members(members: Vec<VariantRecord>) -> Result<Self, FamilyInvariantError> {
        let base_ids: Vec<ItemId> = members
            .iter()
            .filter(|member| member.is_base_content)
            .map(|member| member.id)
            .collect();

        match base_ids.len() {
            0 => return Err(FamilyInvariantError::MissingBase),
            1 => {}
            _ => return Err(FamilyInvariantError::MultipleBases(base_ids)),
        }

        let (base, variants): (Vec<_>, Vec<_>) = members
            .into_iter()
            .partition(|member| member.is_base_content);
        let mut ordered = base;
        ordered.extend(variants);
        Ok(Self { members: ordered })
    }

    /// Starts a new family containing only its base record.
    pub fn single(base: VariantRecord) -> Result<Self, FamilyInvariantError> {
        Self::from_members(vec![base])
    }

    pub fn base(&self) -> &VariantRecord {
        &self.members[0]
    }

    pub fn variants(&self) -> &[VariantRecord] {
        &self.members[1..]
    }

    pub fn members(&self) -> &[VariantRecord] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<ItemId> {
        self.members.iter().map(|member| member.id).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false: a family holds at least its base record.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ItemId) -> Option<&VariantRecord> {
        self.members.iter().find(|member| member.id == id)
    }

    /// Audiences already targeted by at least one variant.
    pub fn used_audiences(&self) -> BTreeSet<&AudienceCode> {
        self.variants()
            .iter()
            .filter_map(|variant| variant.audience.as_ref())
            .collect()
    }

    /// Audiences targeted by more than one variant, in first-seen order.
    pub fn duplicate_audiences(&self) -> Vec<(&AudienceCode, Vec<ItemId>)> {
        let mut grouped: Vec<(&AudienceCode, Vec<ItemId>)> = Vec::new();
        for variant in self.variants() {
            let Some(code) = variant.audience.as_ref() else {
                continue;
            };
            match grouped.iter_mut().find(|(seen, _)| *seen == code) {
                Some((_, ids)) => ids.push(variant.id),
                None => grouped.push((code, vec![variant.id])),
            }
        }
        grouped.retain(|(_, ids)| ids.len() > 1);
        grouped
    }

    /// Fails on the first audience targeted by several variants.
    pub fn ensure_unique_audiences(&self) -> Result<(), FamilyInvariantError> {
        match self.duplicate_audiences().into_iter().next() {
            Some((audience, items)) => Err(FamilyInvariantError::DuplicateAudience {
                audience: audience.clone(),
                items,
            }),
            None => Ok(()),
        }
    }

    /// Catalog audiences that no variant targets yet.
    pub fn available_audiences<'c>(
        &self,
        catalog: &'c AudienceCatalog,
    ) -> Vec<&'c AudienceDefinition> {
        let used = self.used_audiences();
        catalog
            .entries()
            .iter()
            .filter(|entry| !used.contains(&entry.codename))
            .collect()
    }
}
