//! Core logic for audience-based content personalization.
//! This crate is the single source of truth for variant-family invariants.

pub mod config;
pub mod coordinator;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod resolver;
pub mod service;

pub use config::{
    load_config, ConfigError, DisplayLabels, ElementSuffixes, LoggingConfig, PersonalizationConfig,
};
pub use coordinator::fanout::{apply_link_plan, FanOutReport, LinkUpdater, PartialMutationFailure};
pub use coordinator::plan::{
    apply_link_operation, plan_addition_links, plan_removal_links, LinkInstruction, LinkOperation,
};
pub use coordinator::MembershipState;
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::audience::{
    AudienceCatalog, AudienceCode, AudienceCodeError, AudienceDefinition, AudienceSelection,
};
pub use model::element::{ElementDefinition, PersonalizationElements, PreconditionError};
pub use model::family::{FamilyInvariantError, VariantFamily};
pub use model::taxonomy::{TaxonomyGroup, TaxonomyTerm};
pub use model::variant::{ItemId, VariantRecord};
pub use repo::item_repo::{
    ItemRepository, NewVariantItem, RepoError, RepoResult, SqliteItemRepository,
};
pub use resolver::{display_label, resolve, resolve_in_family};
pub use service::variant_service::{
    VariantCreated, VariantDeleted, VariantService, VariantServiceError, VariantServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
