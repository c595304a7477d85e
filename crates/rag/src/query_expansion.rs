//! Query Expansion
//!
//! Appends domain synonyms for the query's category so short queries embed
//! closer to the relevant knowledge chunks. Only the first two terms of a
//! category's table are used; `general` and `chatbot` queries pass through
//! unchanged.

use crate::classifier::QueryCategory;

/// Number of synonym terms appended per query
const MAX_EXPANSION_TERMS: usize = 2;

/// Category-driven query expander
#[derive(Debug, Clone)]
pub struct QueryExpander {
    max_terms: usize,
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self {
            max_terms: MAX_EXPANSION_TERMS,
        }
    }
}

impl QueryExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static synonym table
    pub fn synonyms(category: QueryCategory) -> &'static [&'static str] {
        match category {
            QueryCategory::Skills => &["expertise", "technologies", "tools", "proficient", "experienced"],
            QueryCategory::Projects => &["portfolio", "built", "developed", "created", "work"],
            QueryCategory::Experience => &["worked", "employment", "job", "role", "career"],
            QueryCategory::Education => &["degree", "studied", "qualification", "university", "academic"],
            QueryCategory::Contact => &["email", "phone", "reach", "linkedin", "connect"],
            QueryCategory::About => &["background", "summary", "bio", "profile", "overview"],
            QueryCategory::Chatbot | QueryCategory::General => &[],
        }
    }

    /// Terms appended for a category
    pub fn expansion_terms(&self, category: QueryCategory) -> &'static [&'static str] {
        let terms = Self::synonyms(category);
        &terms[..terms.len().min(self.max_terms)]
    }

    /// Expanded query string: the original query followed by the expansion terms
    pub fn expand(&self, query: &str, category: QueryCategory) -> String {
        let terms = self.expansion_terms(category);
        if terms.is_empty() {
            return query.to_string();
        }

        let mut expanded = String::with_capacity(query.len() + 32);
        expanded.push_str(query);
        for term in terms {
            expanded.push(' ');
            expanded.push_str(term);
        }
        expanded
    }
}
