use std::fmt;

use serde::{Deserialize, Serialize};

pub const ALL_SENTINEL: &str = "all";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nature,
    Architecture,
    Animals,
    Misc,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Nature,
        Category::Architecture,
        Category::Animals,
        Category::Misc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Nature => "nature",
            Category::Architecture => "architecture",
            Category::Animals => "animals",
            Category::Misc => "misc",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
    }

    /// Target category for uploads; anything unrecognized lands in `misc`.
    pub fn parse_or_misc(input: Option<&str>) -> Self {
        input.and_then(Self::parse).unwrap_or(Category::Misc)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
    /// A category name nothing can carry; it always selects an empty view.
    Unmatched(String),
}

impl CategoryFilter {
    pub fn parse(input: &str) -> Self {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized == ALL_SENTINEL {
            return CategoryFilter::All;
        }
        match Category::parse(&normalized) {
            Some(category) => CategoryFilter::Only(category),
            None => CategoryFilter::Unmatched(input.to_string()),
        }
    }

    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(selected) => *selected == category,
            CategoryFilter::Unmatched(_) => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_SENTINEL,
            CategoryFilter::Only(category) => category.as_str(),
            CategoryFilter::Unmatched(raw) => raw,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, CategoryFilter};

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(Category::parse(" Nature "), Some(Category::Nature));
        assert_eq!(Category::parse("ANIMALS"), Some(Category::Animals));
        assert_eq!(Category::parse("cars"), None);
    }

    #[test]
    fn upload_target_defaults_to_misc() {
        assert_eq!(Category::parse_or_misc(None), Category::Misc);
        assert_eq!(Category::parse_or_misc(Some("spaceships")), Category::Misc);
        assert_eq!(
            Category::parse_or_misc(Some("architecture")),
            Category::Architecture
        );
    }

    #[test]
    fn filter_parse_handles_sentinel_and_unknown() {
        assert_eq!(CategoryFilter::parse("all"), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse("nature"),
            CategoryFilter::Only(Category::Nature)
        );
        let unknown = CategoryFilter::parse("food");
        assert_eq!(unknown, CategoryFilter::Unmatched("food".to_string()));
        for category in Category::ALL {
            assert!(!unknown.matches(category));
            assert!(CategoryFilter::All.matches(category));
        }
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Architecture).unwrap();
        assert_eq!(json, "\"architecture\"");
        let parsed: Category = serde_json::from_str("\"animals\"").unwrap();
        assert_eq!(parsed, Category::Animals);
    }
}
