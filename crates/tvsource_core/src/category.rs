use serde::{Deserialize, Serialize};

/// Category used when no rule matches.
pub const DEFAULT_CATEGORY: &str = "其他";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    Prefix,
    Contains,
}

/// Maps channel names to a category when `pattern` matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub kind: MatchKind,
    pub pattern: String,
}

impl CategoryRule {
    pub fn prefix(category: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            kind: MatchKind::Prefix,
            pattern: pattern.into(),
        }
    }

    pub fn contains(category: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            kind: MatchKind::Contains,
            pattern: pattern.into(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.to_uppercase();
        let pattern = self.pattern.to_uppercase();
        match self.kind {
            MatchKind::Prefix => name.starts_with(&pattern),
            MatchKind::Contains => name.contains(&pattern),
        }
    }
}

/// Ordered substring classifier; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryClassifier {
    rules: Vec<CategoryRule>,
}

impl CategoryClassifier {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    pub fn classify(&self, channel_name: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matches(channel_name))
            .map(|rule| rule.category.as_str())
            .unwrap_or(DEFAULT_CATEGORY)
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new(vec![
            CategoryRule::prefix("央视", "CCTV"),
            CategoryRule::contains("凤凰", "凤凰"),
            CategoryRule::contains("卫视", "卫视"),
            CategoryRule::contains("香港", "翡翠"),
            CategoryRule::contains("香港", "明珠"),
            CategoryRule::contains("香港", "香港"),
            CategoryRule::contains("香港", "TVB"),
            CategoryRule::contains("香港", "VIUTV"),
        ])
    }
}
