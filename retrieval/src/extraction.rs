//! Closed-vocabulary role and skill spotting.

use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_ROLES: [&str; 4] = [
    "BI Engineer",
    "Data Engineer",
    "Data Analyst",
    "Machine Learning Engineer",
];

const DEFAULT_SKILLS: [&str; 11] = [
    "Python",
    "SQL",
    "Power BI",
    "Tableau",
    "Data Warehousing",
    "ETL Processes",
    "Statistics",
    "Machine Learning",
    "Deep Learning",
    "MLOps",
    "Cloud Platforms",
];

/// Role and skill names the extractor looks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub roles: Vec<String>,
    pub skills: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            roles: DEFAULT_ROLES.iter().map(|r| (*r).to_string()).collect(),
            skills: DEFAULT_SKILLS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Roles and skills mentioned in a question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedEntities {
    /// In order of first mention.
    pub roles: Vec<String>,

    /// In order of first mention.
    pub skills: Vec<String>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.skills.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Term {
    name: String,
    lowered: String,
}

impl Term {
    fn list(names: &[String]) -> Vec<Term> {
        let mut terms: Vec<Term> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if name.is_empty() || terms.iter().any(|t| t.name == name) {
                continue;
            }
            terms.push(Term {
                name: name.to_string(),
                lowered: name.to_lowercase(),
            });
        }
        terms
    }
}

/// Finds vocabulary terms in free text.
///
/// A term matches when its lowercase form occurs in the lowercase
/// question. Matches are reported in order of first occurrence, ties in
/// vocabulary order. When no role matches exactly, a role still matches
/// if each word of its name occurs somewhere in the question; skills have
/// no such fallback.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    roles: Vec<Term>,
    skills: Vec<Term>,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(&Vocabulary::default())
    }
}

impl EntityExtractor {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        Self {
            roles: Term::list(&vocabulary.roles),
            skills: Term::list(&vocabulary.skills),
        }
    }

    /// Known role names, in vocabulary order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|t| t.name.as_str())
    }

    pub fn extract(&self, query: &str) -> ExtractedEntities {
        let query = query.to_lowercase();

        let mut roles = exact_matches(&self.roles, &query);
        if roles.is_empty() {
            roles = self
                .roles
                .iter()
                .filter(|term| {
                    let mut words = term.lowered.split_whitespace().peekable();
                    words.peek().is_some() && words.all(|word| query.contains(word))
                })
                .map(|term| term.name.clone())
                .collect();
        }
        let skills = exact_matches(&self.skills, &query);

        debug!("Extracted roles {roles:?} and skills {skills:?}");
        ExtractedEntities { roles, skills }
    }
}

fn exact_matches(terms: &[Term], query: &str) -> Vec<String> {
    let mut found: Vec<(usize, usize, &str)> = terms
        .iter()
        .enumerate()
        .filter_map(|(order, term)| {
            query
                .find(&term.lowered)
                .map(|position| (position, order, term.name.as_str()))
        })
        .collect();
    found.sort_unstable();
    found.into_iter().map(|(_, _, name)| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roles_in_order_of_mention() {
        let entities = EntityExtractor::default()
            .extract("How can I transition from BI Engineer to Data Engineer?");
        assert_eq!(entities.roles, vec!["BI Engineer", "Data Engineer"]);
        assert!(entities.skills.is_empty());
    }

    #[test]
    fn test_mention_order_beats_vocabulary_order() {
        let entities = EntityExtractor::default()
            .extract("Should a data analyst or a BI engineer learn sql before python?");
        assert_eq!(entities.roles, vec!["Data Analyst", "BI Engineer"]);
        assert_eq!(entities.skills, vec!["SQL", "Python"]);
    }

    #[test]
    fn test_word_fallback_for_roles() {
        let entities =
            EntityExtractor::default().extract("What does an engineer working with data do?");
        assert_eq!(entities.roles, vec!["Data Engineer"]);
    }

    #[test]
    fn test_fallback_only_when_no_exact_match() {
        let entities = EntityExtractor::default()
            .extract("Is an analyst with data skills a good BI Engineer?");
        assert_eq!(entities.roles, vec!["BI Engineer"]);
    }

    #[test]
    fn test_skills_have_no_word_fallback() {
        let entities = EntityExtractor::default().extract("Which platforms run in the cloud?");
        assert!(entities.skills.is_empty());
    }

    #[test]
    fn test_overlapping_terms_both_match() {
        let entities =
            EntityExtractor::default().extract("What does a Machine Learning Engineer do?");
        assert_eq!(entities.roles, vec!["Machine Learning Engineer"]);
        assert_eq!(entities.skills, vec!["Machine Learning"]);
    }

    #[test]
    fn test_unknown_terms_are_ignored() {
        let entities = EntityExtractor::default().extract("How do I become an astronaut?");
        assert!(entities.is_empty());
    }

    #[test]
    fn test_custom_vocabulary() {
        let vocabulary = Vocabulary {
            roles: vec!["Platform Engineer".to_string(), " ".to_string()],
            skills: vec!["Kubernetes".to_string(), "Kubernetes".to_string()],
        };
        let extractor = EntityExtractor::new(&vocabulary);
        let entities = extractor.extract("platform engineer using kubernetes");

        assert_eq!(extractor.roles().collect::<Vec<_>>(), vec!["Platform Engineer"]);
        assert_eq!(entities.roles, vec!["Platform Engineer"]);
        assert_eq!(entities.skills, vec!["Kubernetes"]);
    }
}
