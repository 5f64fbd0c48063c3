use crate::domain::Query;
use crate::error::HarvestError;

/// A subject with its raw, untrimmed category strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectCategories {
    pub subject: String,
    pub categories: Vec<String>,
}

impl SubjectCategories {
    pub fn new(subject: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            categories,
        }
    }

    /// Parses `"Tomato: Leaf Spot, Early Blight"`.
    pub fn parse_shorthand(value: &str) -> Result<Self, HarvestError> {
        let (subject, categories) = value
            .split_once(':')
            .ok_or_else(|| HarvestError::InvalidSubject(value.to_string()))?;
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(HarvestError::InvalidSubject(value.to_string()));
        }
        Ok(Self {
            subject: subject.to_string(),
            categories: categories.split(',').map(str::to_string).collect(),
        })
    }
}

/// Flattens subjects into queries in input order, dropping blank categories.
pub fn expand(subjects: &[SubjectCategories]) -> Vec<Query> {
    subjects
        .iter()
        .flat_map(|entry| {
            entry
                .categories
                .iter()
                .filter(|category| !category.trim().is_empty())
                .map(move |category| Query::new(entry.subject.as_str(), category.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn shorthand_splits_on_commas() {
        let entry = SubjectCategories::parse_shorthand("Tomato: Leaf Spot , Blight,").unwrap();
        assert_eq!(entry.subject, "Tomato");
        assert_eq!(entry.categories.len(), 3);

        let queries = expand(&[entry]);
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].category(), "Leaf Spot");
        assert_eq!(queries[1].category(), "Blight");
    }

    #[test]
    fn shorthand_requires_subject() {
        let err = SubjectCategories::parse_shorthand("Leaf Spot").unwrap_err();
        assert_matches!(err, HarvestError::InvalidSubject(_));
        let err = SubjectCategories::parse_shorthand(" : Leaf Spot").unwrap_err();
        assert_matches!(err, HarvestError::InvalidSubject(_));
    }
}
