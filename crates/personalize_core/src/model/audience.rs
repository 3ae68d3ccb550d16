//! Audience codes, selections and the configured audience catalog.
//!
//! # Responsibility
//! - Validate audience codenames before they reach resolver or storage.
//! - Model the "no audience" sentinel explicitly instead of a magic string.
//! - Map audience codes to human-readable names.
//!
//! # Invariants
//! - `AudienceCode` values always match `^[a-z][a-z0-9_]{0,59}$`.
//! - Catalog entries are unique by codename and keep insertion order.

use crate::model::taxonomy::TaxonomyGroup;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static AUDIENCE_CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]{0,59}$").expect("audience code pattern is a valid regex")
});

/// Selection keywords that mean "render base content".
const NONE_KEYWORDS: &[&str] = &["", "none"];

/// Error returned when a string is not a usable audience codename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceCodeError {
    value: String,
}

impl Display for AudienceCodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid audience codename `{}`; expected lowercase letters, digits and underscores",
            self.value
        )
    }
}

impl Error for AudienceCodeError {}

/// Identifier of one audience segment, e.g. `premium_members`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AudienceCode(String);

impl AudienceCode {
    /// Parses and validates one codename. Surrounding whitespace is ignored.
    pub fn parse(value: &str) -> Result<Self, AudienceCodeError> {
        let trimmed = value.trim();
        if AUDIENCE_CODE_PATTERN.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(AudienceCodeError {
                value: trimmed.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for AudienceCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AudienceCode {
    type Error = AudienceCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<AudienceCode> for String {
    fn from(value: AudienceCode) -> Self {
        value.0
    }
}

/// Audience chosen by the visitor, or the sentinel for base content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum AudienceSelection {
    /// Render base content; no variant lookup happens.
    #[default]
    None,
    /// Render the variant tagged with this audience, if any.
    Audience(AudienceCode),
}

impl AudienceSelection {
    /// Parses user input. `none` and blank input select base content.
    pub fn parse(value: &str) -> Result<Self, AudienceCodeError> {
        let normalized = value.trim().to_ascii_lowercase();
        if NONE_KEYWORDS.contains(&normalized.as_str()) {
            return Ok(Self::None);
        }
        AudienceCode::parse(normalized.as_str()).map(Self::Audience)
    }

    /// Returns the selected code, or `None` for the base-content sentinel.
    pub fn code(&self) -> Option<&AudienceCode> {
        match self {
            Self::None => None,
            Self::Audience(code) => Some(code),
        }
    }
}

impl From<AudienceCode> for AudienceSelection {
    fn from(value: AudienceCode) -> Self {
        Self::Audience(value)
    }
}

/// One configured audience with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceDefinition {
    pub codename: AudienceCode,
    pub name: String,
}

impl AudienceDefinition {
    pub fn new(codename: AudienceCode, name: impl Into<String>) -> Self {
        Self {
            codename,
            name: name.into(),
        }
    }
}

/// Ordered set of audiences an editor can target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudienceCatalog {
    entries: Vec<AudienceDefinition>,
}

impl AudienceCatalog {
    /// Builds a catalog, keeping the first definition of a repeated codename.
    pub fn new(definitions: impl IntoIterator<Item = AudienceDefinition>) -> Self {
        let mut entries: Vec<AudienceDefinition> = Vec::new();
        for definition in definitions {
            if entries
                .iter()
                .all(|entry| entry.codename != definition.codename)
            {
                entries.push(definition);
            }
        }
        Self { entries }
    }

    /// Builds a catalog from an audience taxonomy.
    ///
    /// Nested terms are included depth-first, parents before children.
    /// Terms whose codename is not a valid audience code are skipped.
    pub fn from_taxonomy(group: &TaxonomyGroup) -> Self {
        Self::new(group.flatten().into_iter().filter_map(|term| {
            match AudienceCode::parse(term.codename.as_str()) {
                Ok(code) => Some(AudienceDefinition::new(code, term.name.clone())),
                Err(err) => {
                    warn!(
                        "event=catalog_build module=model status=skip taxonomy={} term_id={} error={}",
                        group.codename, term.id, err
                    );
                    None
                }
            }
        }))
    }

    /// Default demo audiences.
    pub fn builtin() -> Self {
        Self::new(
            [
                ("new_visitors", "New Visitors"),
                ("returning_visitors", "Returning Visitors"),
                ("premium_members", "Premium Members"),
                ("enterprise_customers", "Enterprise Customers"),
            ]
            .into_iter()
            .filter_map(|(codename, name)| {
                AudienceCode::parse(codename)
                    .ok()
                    .map(|code| AudienceDefinition::new(code, name))
            }),
        )
    }

    pub fn entries(&self) -> &[AudienceDefinition] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, code: &AudienceCode) -> bool {
        self.get(code).is_some()
    }

    pub fn get(&self, code: &AudienceCode) -> Option<&AudienceDefinition> {
        self.entries.iter().find(|entry| &entry.codename == code)
    }

    /// Human-readable name for one audience code.
    pub fn name_of(&self, code: &AudienceCode) -> Option<&str> {
        self.get(code).map(|entry| entry.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{AudienceCatalog, AudienceCode, AudienceSelection};
    use crate::model::taxonomy::{TaxonomyGroup, TaxonomyTerm};

    #[test]
    fn audience_code_rejects_malformed_values() {
        assert!(AudienceCode::parse("premium_members").is_ok());
        assert!(AudienceCode::parse(" new_visitors ").is_ok());
        assert!(AudienceCode::parse("Premium").is_err());
        assert!(AudienceCode::parse("9lives").is_err());
        assert!(AudienceCode::parse("with-dash").is_err());
        assert!(AudienceCode::parse("").is_err());
    }

    #[test]
    fn selection_parses_sentinel_keywords() {
        assert_eq!(AudienceSelection::parse("none").unwrap(), AudienceSelection::None);
        assert_eq!(AudienceSelection::parse("  ").unwrap(), AudienceSelection::None);
        assert_eq!(AudienceSelection::parse("NONE").unwrap(), AudienceSelection::None);

        let selection = AudienceSelection::parse("Premium_Members").unwrap();
        assert_eq!(selection.code().map(AudienceCode::as_str), Some("premium_members"));
    }

    #[test]
    fn builtin_catalog_names_known_audiences() {
        let catalog = AudienceCatalog::builtin();
        assert_eq!(catalog.len(), 4);
        let code = AudienceCode::parse("enterprise_customers").unwrap();
        assert_eq!(catalog.name_of(&code), Some("Enterprise Customers"));
    }

    #[test]
    fn base_named_audiences_stay_selectable() {
        for value in ["base", "base_content"] {
            let selection = AudienceSelection::parse(value).unwrap();
            assert_eq!(selection.code().map(AudienceCode::as_str), Some(value));
        }
    }

    #[test]
    fn taxonomy_terms_with_invalid_codenames_are_skipped() {
        let group = TaxonomyGroup::new("personas", "Personas")
            .with_term(TaxonomyTerm::new("t-1", "new_visitors", "New Visitors"))
            .with_term(TaxonomyTerm::new("t-2", "_internal", "Internal"));

        let catalog = AudienceCatalog::from_taxonomy(&group);
        assert_eq!(catalog.len(), 1);
        let code = AudienceCode::parse("new_visitors").unwrap();
        assert_eq!(catalog.name_of(&code), Some("New Visitors"));
    }
}
