//! Variant family use-case service.
//!
//! # Responsibility
//! - Load variant families from an item repository.
//! - Resolve display content for a selected audience.
//! - Create and delete variants while keeping the family cross-linked.
//!
//! # Invariants
//! - Resolver and coordinator never run for items lacking personalization
//!   elements.
//! - Creation reports success only when every sibling links the new item.
//! - A variant is deleted only after every sibling dropped its link.
//! - The base record is never deleted here.
//! - Applied link updates are never rolled back.

use crate::config::PersonalizationConfig;
use crate::coordinator::fanout::{apply_link_plan, LinkUpdater, PartialMutationFailure};
use crate::coordinator::plan::{
    plan_addition_links, plan_removal_links, LinkInstruction, LinkOperation,
};
use crate::coordinator::MembershipState;
use crate::model::audience::{AudienceCatalog, AudienceCode, AudienceDefinition, AudienceSelection};
use crate::model::element::{PersonalizationElements, PreconditionError};
use crate::model::family::{FamilyInvariantError, VariantFamily};
use crate::model::variant::{ItemId, VariantRecord};
use crate::repo::item_repo::{ItemRepository, NewVariantItem, RepoError};
use crate::resolver::{display_label, resolve_in_family};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from variant service operations.
#[derive(Debug)]
pub enum VariantServiceError {
    /// Requested item does not exist or is not part of the family.
    NotFound(ItemId),
    /// The family breaks a structural invariant.
    InvariantViolation(FamilyInvariantError),
    /// The item's content type has no personalization elements.
    PreconditionFailure(PreconditionError),
    /// Some link updates failed; already applied ones were kept.
    PartialMutationFailure {
        variant_id: ItemId,
        state: MembershipState,
        failure: PartialMutationFailure,
    },
    /// Audience is not part of the configured catalog.
    UnknownAudience(AudienceCode),
    /// Base content cannot be removed from its family.
    CannotDeleteBase(ItemId),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for VariantServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "content item not found: {id}"),
            Self::InvariantViolation(err) => write!(f, "{err}"),
            Self::PreconditionFailure(err) => write!(f, "{err}"),
            Self::PartialMutationFailure { failure, .. } => write!(f, "{failure}"),
            Self::UnknownAudience(code) => write!(f, "audience not configured: {code}"),
            Self::CannotDeleteBase(id) => write!(f, "base content cannot be deleted: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VariantServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvariantViolation(err) => Some(err),
            Self::PreconditionFailure(err) => Some(err),
            Self::PartialMutationFailure { failure, .. } => Some(failure),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for VariantServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<FamilyInvariantError> for VariantServiceError {
    fn from(value: FamilyInvariantError) -> Self {
        Self::InvariantViolation(value)
    }
}

impl From<PreconditionError> for VariantServiceError {
    fn from(value: PreconditionError) -> Self {
        Self::PreconditionFailure(value)
    }
}

pub type VariantServiceResult<T> = Result<T, VariantServiceError>;

/// Successful variant creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCreated {
    pub record: VariantRecord,
    /// Existing members that now link the new variant, in family order.
    pub linked_items: Vec<ItemId>,
    pub state: MembershipState,
}

/// Successful variant deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDeleted {
    pub variant_id: ItemId,
    /// Remaining members that dropped their link, in family order.
    pub unlinked_items: Vec<ItemId>,
    pub state: MembershipState,
}

/// Routes link instructions to repository link mutations.
struct RepoLinkUpdater<'r, R>(&'r R);

impl<R: ItemRepository> LinkUpdater for RepoLinkUpdater<'_, R> {
    type Error = RepoError;

    fn update_links(&self, instruction: &LinkInstruction) -> Result<(), Self::Error> {
        match instruction.operation {
            LinkOperation::Add => self.0.add_link(instruction.item_id, instruction.variant_id),
            LinkOperation::Remove => self
                .0
                .remove_link(instruction.item_id, instruction.variant_id),
        }
    }
}

/// Variant family service facade.
pub struct VariantService<R: ItemRepository> {
    repo: R,
    config: PersonalizationConfig,
    catalog: AudienceCatalog,
}

impl<R: ItemRepository + Sync> VariantService<R> {
    /// Creates service from repository and configuration.
    pub fn new(repo: R, config: PersonalizationConfig) -> Self {
        let catalog = config.catalog();
        Self {
            repo,
            config,
            catalog,
        }
    }

    /// Replaces the configured audience catalog, e.g. with one built from
    /// a fetched audience taxonomy.
    pub fn with_catalog(mut self, catalog: AudienceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &PersonalizationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AudienceCatalog {
        &self.catalog
    }

    /// Locates the personalization elements of the item's content type.
    pub fn check_personalization(
        &self,
        item_id: ItemId,
    ) -> VariantServiceResult<PersonalizationElements> {
        let elements = self.repo.content_type_elements(item_id)?;
        PersonalizationElements::locate(&elements, &self.config.element_suffixes)
            .map_err(Into::into)
    }

    /// Loads the family `item_id` belongs to.
    ///
    /// Links to items that no longer exist are skipped.
    pub fn load_family(&self, item_id: ItemId) -> VariantServiceResult<VariantFamily> {
        let current = self
            .repo
            .get_item(item_id)?
            .ok_or(VariantServiceError::NotFound(item_id))?;
        self.check_personalization(item_id)?;

        let mut members = vec![current];
        for linked_id in self.repo.linked_item_ids(item_id)? {
            if linked_id == item_id || members.iter().any(|member| member.id == linked_id) {
                continue;
            }
            match self.repo.get_item(linked_id)? {
                Some(record) => members.push(record),
                None => warn!(
                    "event=family_load module=service status=skip item_id={} dangling_link={}",
                    item_id, linked_id
                ),
            }
        }

        let family = VariantFamily::from_members(members)?;
        for (audience, items) in family.duplicate_audiences() {
            warn!(
                "event=family_load module=service status=warn base_id={} duplicate_audience={} variants={}",
                family.base().id,
                audience,
                items.len()
            );
        }
        Ok(family)
    }

    /// Resolves the record to render for `selection`.
    pub fn resolve_for(
        &self,
        item_id: ItemId,
        selection: &AudienceSelection,
    ) -> VariantServiceResult<VariantRecord> {
        let family = self.load_family(item_id)?;
        Ok(resolve_in_family(&family, selection).clone())
    }

    /// Display label for one record using the service catalog.
    pub fn label_for(&self, record: &VariantRecord) -> String {
        display_label(record, &self.catalog, &self.config.labels)
    }

    /// Catalog audiences not yet targeted within the item's family.
    pub fn available_audiences(
        &self,
        item_id: ItemId,
    ) -> VariantServiceResult<Vec<AudienceDefinition>> {
        let family = self.load_family(item_id)?;
        Ok(family
            .available_audiences(&self.catalog)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Creates a variant of the family `source_item_id` belongs to.
    ///
    /// The new item links every existing member; every existing member is
    /// then updated to link the new item.
    ///
    /// # Errors
    /// - `NotFound` / `PreconditionFailure` / `InvariantViolation` from
    ///   loading the family.
    /// - `UnknownAudience` when `audience` is not in the catalog.
    /// - `InvariantViolation` for an already targeted audience when
    ///   `enforce_unique_audiences` is set.
    /// - `PartialMutationFailure` when a sibling update failed; the new item
    ///   and applied links are kept.
    pub fn create_variant(
        &self,
        source_item_id: ItemId,
        audience: AudienceCode,
    ) -> VariantServiceResult<VariantCreated> {
        let family = self.load_family(source_item_id)?;
        let audience_name = self
            .catalog
            .name_of(&audience)
            .ok_or_else(|| VariantServiceError::UnknownAudience(audience.clone()))?
            .to_string();

        if family.used_audiences().contains(&audience) {
            if self.config.enforce_unique_audiences {
                let items = family
                    .variants()
                    .iter()
                    .filter(|variant| variant.targets(&audience))
                    .map(|variant| variant.id)
                    .collect();
                return Err(FamilyInvariantError::DuplicateAudience { audience, items }.into());
            }
            warn!(
                "event=variant_create module=service status=warn base_id={} duplicate_audience={}",
                family.base().id,
                audience
            );
        }

        let base = family.base();
        let members = family.member_ids();
        let record = self.repo.create_variant_item(&NewVariantItem {
            source_item_id: base.id,
            name: format!("{} ({})", base.name, audience_name),
            audience,
            links: members.clone(),
        })?;

        let plan = plan_addition_links(&members, record.id);
        let report = apply_link_plan(&RepoLinkUpdater(&self.repo), &plan).map_err(|failure| {
            VariantServiceError::PartialMutationFailure {
                variant_id: record.id,
                state: MembershipState::PartiallyLinked,
                failure,
            }
        })?;

        info!(
            "event=variant_create module=service status=ok base_id={} variant_id={} linked={}",
            base.id,
            record.id,
            report.updated.len()
        );
        Ok(VariantCreated {
            record,
            linked_items: report.updated,
            state: MembershipState::Linked,
        })
    }

    /// Deletes `variant_id` from the family `family_item_id` belongs to.
    ///
    /// Every remaining member drops its link first; the variant itself is
    /// deleted only when all of those updates succeeded.
    ///
    /// The family is read from the variant's own links, which stay intact
    /// until the final delete, so a call that failed part way can be
    /// repeated as is.
    pub fn delete_variant(
        &self,
        family_item_id: ItemId,
        variant_id: ItemId,
    ) -> VariantServiceResult<VariantDeleted> {
        if self.repo.get_item(family_item_id)?.is_none() {
            return Err(VariantServiceError::NotFound(family_item_id));
        }
        let family = self.load_family(variant_id)?;
        if !family.contains(family_item_id) {
            return Err(VariantServiceError::NotFound(variant_id));
        }
        let record = family
            .get(variant_id)
            .ok_or(VariantServiceError::NotFound(variant_id))?;
        if record.is_base_content {
            return Err(VariantServiceError::CannotDeleteBase(variant_id));
        }

        let plan = plan_removal_links(&family.member_ids(), variant_id);
        let report = apply_link_plan(&RepoLinkUpdater(&self.repo), &plan).map_err(|failure| {
            VariantServiceError::PartialMutationFailure {
                variant_id,
                state: MembershipState::PartiallyLinked,
                failure,
            }
        })?;

        self.repo.delete_item(variant_id)?;

        info!(
            "event=variant_delete module=service status=ok base_id={} variant_id={} unlinked={}",
            family.base().id,
            variant_id,
            report.updated.len()
        );
        Ok(VariantDeleted {
            variant_id,
            unlinked_items: report.updated,
            state: MembershipState::Removed,
        })
    }
}
