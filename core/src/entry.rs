//! Concept entries and the closed category set they are filed under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Survey field category. Closed set: a typo cannot create an orphan bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Role,
    Expertise,
    Interest,
}

impl Category {
    /// All categories in persisted order
    pub const ALL: [Category; 3] = [Self::Role, Self::Expertise, Self::Interest];

    /// Canonical name, also the persisted key and the record field name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "Role",
            Self::Expertise => "Expertise",
            Self::Interest => "Interest",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "role" => Ok(Self::Role),
            "expertise" => Ok(Self::Expertise),
            "interest" => Ok(Self::Interest),
            _ => Err(format!("Unknown category: {s}")),
        }
    }
}

/// One value per category, serialized as `{"Role": .., "Expertise": .., "Interest": ..}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerCategory<T> {
    #[serde(rename = "Role", default)]
    pub role: T,
    #[serde(rename = "Expertise", default)]
    pub expertise: T,
    #[serde(rename = "Interest", default)]
    pub interest: T,
}

impl<T> PerCategory<T> {
    /// Build each slot from its category
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self {
            role: f(Category::Role),
            expertise: f(Category::Expertise),
            interest: f(Category::Interest),
        }
    }

    pub fn get(&self, category: Category) -> &T {
        match category {
            Category::Role => &self.role,
            Category::Expertise => &self.expertise,
            Category::Interest => &self.interest,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut T {
        match category {
            Category::Role => &mut self.role,
            Category::Expertise => &mut self.expertise,
            Category::Interest => &mut self.interest,
        }
    }

    /// Iterate in persisted order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Identity of an entry within a term bucket: `(ontology_id or "", ontology or "")`.
pub type IdentityKey<'a> = (&'a str, &'a str);

/// One candidate link from a free-text term to a public-ontology concept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptEntry {
    #[serde(default)]
    pub concept_label: Option<String>,
    #[serde(default)]
    pub ontology_id: Option<String>,
    #[serde(default)]
    pub ontology: Option<String>,
    /// In [0.0, 1.0] when present
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl ConceptEntry {
    /// Create an entry with a label and ontology reference
    pub fn new(
        concept_label: impl Into<String>,
        ontology_id: impl Into<String>,
        ontology: impl Into<String>,
    ) -> Self {
        Self {
            concept_label: Some(concept_label.into()),
            ontology_id: Some(ontology_id.into()),
            ontology: Some(ontology.into()),
            confidence: None,
            explanation: None,
        }
    }

    /// Set the confidence score
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Set the explanation text
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn identity_key(&self) -> IdentityKey<'_> {
        (
            self.ontology_id.as_deref().unwrap_or(""),
            self.ontology.as_deref().unwrap_or(""),
        )
    }
}

/// Normalize a free-text term for use as a bucket key: trimmed and case-folded.
pub fn normalize_term(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_category_round_trip_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert_eq!(" interest ".parse::<Category>(), Ok(Category::Interest));
        assert!("Interests".parse::<Category>().is_err());
    }

    #[test]
    fn test_identity_key_treats_null_as_empty() {
        let entry = ConceptEntry {
            ontology_id: Some("Wikidata:Q5".to_string()),
            ..Default::default()
        };
        assert_eq!(entry.identity_key(), ("Wikidata:Q5", ""));
        assert_eq!(ConceptEntry::default().identity_key(), ("", ""));
    }

    #[test]
    fn test_entry_accepts_missing_and_null_fields() {
        let entry: ConceptEntry =
            serde_json::from_str(r#"{"concept_label": "Brain", "confidence": null}"#)
                .expect("parse");
        assert_eq!(entry.concept_label.as_deref(), Some("Brain"));
        assert_eq!(entry.ontology_id, None);
        assert_eq!(entry.confidence, None);
    }

    #[test]
    fn test_per_category_serializes_with_category_keys() {
        let per = PerCategory::from_fn(|c| c.as_str().len());
        let json = serde_json::to_value(&per).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"Role": 4, "Expertise": 9, "Interest": 8})
        );
    }

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("  Robotics AND AI \n"), "robotics and ai");
        assert_eq!(normalize_term("   "), "");
    }
}
