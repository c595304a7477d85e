//! Query Classification
//!
//! Maps a raw query to a topic category by case-insensitive keyword
//! presence. Categories are checked in a fixed order and the first match
//! wins, so a query mentioning both "github" and "project" is a projects
//! query. Classification is pure: no state, no failure mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic category of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCategory {
    Skills,
    Projects,
    Experience,
    Education,
    Contact,
    About,
    Chatbot,
    General,
}

impl QueryCategory {
    /// Categories in match order (General is the fallthrough)
    pub const ORDERED: [QueryCategory; 7] = [
        QueryCategory::Skills,
        QueryCategory::Projects,
        QueryCategory::Experience,
        QueryCategory::Education,
        QueryCategory::Contact,
        QueryCategory::About,
        QueryCategory::Chatbot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::Skills => "skills",
            QueryCategory::Projects => "projects",
            QueryCategory::Experience => "experience",
            QueryCategory::Education => "education",
            QueryCategory::Contact => "contact",
            QueryCategory::About => "about",
            QueryCategory::Chatbot => "chatbot",
            QueryCategory::General => "general",
        }
    }

    /// Trigger keywords for this category
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            QueryCategory::Skills => &[
                "skill",
                "technology",
                "programming",
                "language",
                "framework",
                "tool",
            ],
            QueryCategory::Projects => &[
                "project",
                "built",
                "created",
                "developed",
                "work on",
                "github",
            ],
            QueryCategory::Experience => &[
                "experience",
                "worked",
                "job",
                "role",
                "position",
                "internship",
            ],
            QueryCategory::Education => &[
                "education",
                "degree",
                "university",
                "studied",
                "graduated",
            ],
            QueryCategory::Contact => &["contact", "email", "phone", "reach", "linkedin", "github"],
            QueryCategory::About => &["about", "who", "background", "summary", "tell me"],
            QueryCategory::Chatbot => &[
                "chatbot",
                "how do you work",
                "what are you",
                "how does this work",
            ],
            QueryCategory::General => &[],
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword-based query classifier
pub struct QueryClassifier;

impl QueryClassifier {
    /// Classify a query (case-insensitive substring match)
    pub fn classify(query: &str) -> QueryCategory {
        let lowered = query.to_lowercase();

        QueryCategory::ORDERED
            .into_iter()
            .find(|category| category.keywords().iter().any(|kw| lowered.contains(kw)))
            .unwrap_or(QueryCategory::General)
    }

    /// Metadata filter preferred for a category
    ///
    /// Returns `(key, value)` pairs; a chunk matches if any pair matches.
    /// Categories without a mapped filter return an empty list.
    pub fn section_filter(category: QueryCategory) -> Vec<(&'static str, &'static str)> {
        match category {
            QueryCategory::Skills => vec![("section", "technical_skills")],
            QueryCategory::Projects => vec![("section", "key_projects")],
            QueryCategory::Experience => vec![("section", "professional_experience")],
            QueryCategory::Education => vec![("section", "education")],
            QueryCategory::Contact => vec![("type", "profile")],
            QueryCategory::About => vec![("section", "professional_summary")],
            QueryCategory::Chatbot | QueryCategory::General => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_categories() {
        assert_eq!(QueryClassifier::classify("What programming languages?"), QueryCategory::Skills);
        assert_eq!(QueryClassifier::classify("Which projects were built?"), QueryCategory::Projects);
        assert_eq!(QueryClassifier::classify("Any internship?"), QueryCategory::Experience);
        assert_eq!(QueryClassifier::classify("Which university?"), QueryCategory::Education);
        assert_eq!(QueryClassifier::classify("What is the contact email?"), QueryCategory::Contact);
        assert_eq!(QueryClassifier::classify("Tell me a bit more"), QueryCategory::About);
        assert_eq!(QueryClassifier::classify("How does this work?"), QueryCategory::Chatbot);
        assert_eq!(QueryClassifier::classify("What is the expected salary?"), QueryCategory::General);
    }

    #[test]
    fn test_first_category_wins() {
        // "github" is a projects keyword and a contact keyword; projects comes first
        assert_eq!(QueryClassifier::classify("github link"), QueryCategory::Projects);
        // "tool" (skills) beats "project" (projects)
        assert_eq!(QueryClassifier::classify("project tooling"), QueryCategory::Skills);
    }

    #[test]
    fn test_case_insensitive_and_deterministic() {
        let a = QueryClassifier::classify("Python SKILLS");
        let b = QueryClassifier::classify("python skills");
        assert_eq!(a, b);
        assert_eq!(a, QueryClassifier::classify("Python SKILLS"));
    }

    #[test]
    fn test_section_filter() {
        assert_eq!(
            QueryClassifier::section_filter(QueryCategory::Contact),
            vec![("type", "profile")]
        );
        assert!(QueryClassifier::section_filter(QueryCategory::General).is_empty());
        assert!(QueryClassifier::section_filter(QueryCategory::Chatbot).is_empty());
    }
}
