//! Taxonomy tree read model.
//!
//! Taxonomies arrive from the content-fetch collaborator as owned trees of
//! terms with arbitrarily nested children. Lookups are plain depth-first
//! traversals; pre-order is the iteration order everywhere in this module.

use serde::{Deserialize, Serialize};

/// One taxonomy term and its nested child terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyTerm {
    pub id: String,
    pub codename: String,
    pub name: String,
    #[serde(default)]
    pub terms: Vec<TaxonomyTerm>,
}

impl TaxonomyTerm {
    pub fn new(id: impl Into<String>, codename: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            codename: codename.into(),
            name: name.into(),
            terms: Vec::new(),
        }
    }

    /// Appends one child term.
    pub fn with_child(mut self, child: TaxonomyTerm) -> Self {
        self.terms.push(child);
        self
    }
}

/// Root of one taxonomy, e.g. `personalization_audiences`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyGroup {
    pub codename: String,
    pub name: String,
    #[serde(default)]
    pub terms: Vec<TaxonomyTerm>,
}

impl TaxonomyGroup {
    pub fn new(codename: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            codename: codename.into(),
            name: name.into(),
            terms: Vec::new(),
        }
    }

    pub fn with_term(mut self, term: TaxonomyTerm) -> Self {
        self.terms.push(term);
        self
    }

    /// Finds the first term with `codename` anywhere in the tree.
    pub fn find_by_codename(&self, codename: &str) -> Option<&TaxonomyTerm> {
        find_term(&self.terms, &|term| term.codename == codename)
    }

    /// Finds the first term with `id` anywhere in the tree.
    pub fn find_by_id(&self, id: &str) -> Option<&TaxonomyTerm> {
        find_term(&self.terms, &|term| term.id == id)
    }

    /// Returns every term in pre-order.
    pub fn flatten(&self) -> Vec<&TaxonomyTerm> {
        let mut out = Vec::new();
        collect_terms(&self.terms, &mut out);
        out
    }
}

fn find_term<'a>(
    terms: &'a [TaxonomyTerm],
    predicate: &dyn Fn(&TaxonomyTerm) -> bool,
) -> Option<&'a TaxonomyTerm> {
    for term in terms {
        if predicate(term) {
            return Some(term);
        }
        if let Some(found) = find_term(&term.terms, predicate) {
            return Some(found);
        }
    }
    None
}

fn collect_terms<'a>(terms: &'a [TaxonomyTerm], out: &mut Vec<&'a TaxonomyTerm>) {
    for term in terms {
        out.push(term);
        collect_terms(&term.terms, out);
    }
}

#[cfg(test)]
mod tests {
    use super::{TaxonomyGroup, TaxonomyTerm};

    fn variant_type_taxonomy() -> TaxonomyGroup {
        TaxonomyGroup::new("variant_type", "Variant type")
            .with_term(TaxonomyTerm::new("t-base", "base_content", "Base content"))
            .with_term(
                TaxonomyTerm::new("t-group", "grouping", "Grouping")
                    .with_child(TaxonomyTerm::new("t-variant", "variant", "Variant")),
            )
    }

    #[test]
    fn find_by_codename_reaches_nested_terms() {
        let taxonomy = variant_type_taxonomy();
        let found = taxonomy.find_by_codename("variant").unwrap();
        assert_eq!(found.id, "t-variant");
        assert!(taxonomy.find_by_codename("missing").is_none());
    }

    #[test]
    fn flatten_lists_parents_before_children() {
        let taxonomy = variant_type_taxonomy();
        let ids: Vec<&str> = taxonomy.flatten().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t-base", "t-group", "t-variant"]);
        assert_eq!(taxonomy.find_by_id("t-group").unwrap().codename, "grouping");
    }
}
