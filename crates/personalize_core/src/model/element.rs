//! Content-type element lookup for personalization fields.
//!
//! Personalization fields usually live in a content-type snippet, so their
//! codenames carry a snippet prefix (`personalization__content_variants`).
//! Elements are therefore matched by codename suffix.

use crate::config::ElementSuffixes;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One element declared by a content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDefinition {
    pub id: String,
    pub codename: String,
}

impl ElementDefinition {
    pub fn new(id: impl Into<String>, codename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            codename: codename.into(),
        }
    }
}

/// The content type lacks one or more personalization fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreconditionError {
    /// Codename suffixes that matched no element.
    pub missing: Vec<String>,
}

impl Display for PreconditionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "personalization is not available; missing elements: {}",
            self.missing.join(", ")
        )
    }
}

impl Error for PreconditionError {}

/// Element ids of the three personalization fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalizationElements {
    pub variant_type_element_id: String,
    pub audience_element_id: String,
    pub variant_links_element_id: String,
}

impl PersonalizationElements {
    /// Locates the personalization fields among `elements`.
    ///
    /// The first element whose codename ends with a suffix wins.
    pub fn locate(
        elements: &[ElementDefinition],
        suffixes: &ElementSuffixes,
    ) -> Result<Self, PreconditionError> {
        let variant_type = find_element_id_by_suffix(elements, &suffixes.variant_type);
        let audience = find_element_id_by_suffix(elements, &suffixes.audience);
        let links = find_element_id_by_suffix(elements, &suffixes.variant_links);

        match (variant_type, audience, links) {
            (Some(variant_type), Some(audience), Some(links)) => Ok(Self {
                variant_type_element_id: variant_type.to_string(),
                audience_element_id: audience.to_string(),
                variant_links_element_id: links.to_string(),
            }),
            (variant_type, audience, links) => {
                let missing = [
                    (variant_type, &suffixes.variant_type),
                    (audience, &suffixes.audience),
                    (links, &suffixes.variant_links),
                ]
                .into_iter()
                .filter(|(found, _)| found.is_none())
                .map(|(_, suffix)| suffix.clone())
                .collect();
                Err(PreconditionError { missing })
            }
        }
    }
}

/// Returns the id of the first element whose codename ends with `suffix`.
pub fn find_element_id_by_suffix<'a>(
    elements: &'a [ElementDefinition],
    suffix: &str,
) -> Option<&'a str> {
    elements
        .iter()
        .find(|element| element.codename.ends_with(suffix))
        .map(|element| element.id.as_str())
}
