//! Audience resolver.
//!
//! Picks which member of a variant family is rendered for a visitor.
//! Everything here is pure: no I/O, no logging, no errors.

use crate::config::DisplayLabels;
use crate::model::audience::{AudienceCatalog, AudienceSelection};
use crate::model::family::VariantFamily;
use crate::model::variant::VariantRecord;

/// Selects the record to render for `selection`.
///
/// - `AudienceSelection::None` returns `base` without scanning `variants`.
/// - Otherwise the first variant targeting the selected audience wins.
/// - No match falls back to `base`.
///
/// When several variants share an audience the earliest one in `variants`
/// is returned.
pub fn resolve<'a>(
    base: &'a VariantRecord,
    variants: &'a [VariantRecord],
    selection: &AudienceSelection,
) -> &'a VariantRecord {
    let Some(code) = selection.code() else {
        return base;
    };

    variants
        .iter()
        .find(|variant| variant.targets(code))
        .unwrap_or(base)
}

/// `resolve` over a loaded family.
pub fn resolve_in_family<'a>(
    family: &'a VariantFamily,
    selection: &AudienceSelection,
) -> &'a VariantRecord {
    resolve(family.base(), family.variants(), selection)
}

/// Human-readable label for a record.
///
/// Base records get `labels.base_content`; variants get their audience's
/// catalog name, or `labels.unknown_audience` when the audience is unset or
/// no longer in the catalog.
pub fn display_label(
    record: &VariantRecord,
    catalog: &AudienceCatalog,
    labels: &DisplayLabels,
) -> String {
    if record.is_base_content {
        return labels.base_content.clone();
    }

    record
        .audience
        .as_ref()
        .and_then(|code| catalog.name_of(code))
        .unwrap_or(labels.unknown_audience.as_str())
        .to_string()
}
