//! Finding type: a single defect or observation emitted by an engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a [`Finding`], ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Default scoring penalty for a single finding of this severity
    ///.
    pub fn default_penalty(self) -> f64 {
        match self {
            Severity::Critical => 20.0,
            Severity::High => 10.0,
            Severity::Medium => 5.0,
            Severity::Low => 1.0,
            Severity::Info => 0.0,
        }
    }
}

/// A single defect or observation emitted by an engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Stable id, unique within its `EngineResult`.
    pub id: String,
    /// Type tag, e.g. "code_quality", "complexity", "security".
    pub finding_type: String,
    /// Severity.
    pub severity: Severity,
    /// Human-readable title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// File this finding is anchored to, if any.
    pub file: Option<String>,
    /// 1-based line, if any.
    pub line: Option<usize>,
    /// 1-based column, if any.
    pub column: Option<usize>,
    /// Rule identifier (e.g. linter rule id), if any.
    pub rule_id: Option<String>,
    /// Free-form category, e.g. linter name.
    pub category: Option<String>,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Opaque supporting evidence.
    pub evidence: HashMap<String, serde_json::Value>,
}

impl Finding {
    /// Construct a new finding with a freshly generated id and confidence 1.0.
    pub fn new(
        finding_type: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            finding_type: finding_type.into(),
            severity,
            title: title.into(),
            description: description.into(),
            file: None,
            line: None,
            column: None,
            rule_id: None,
            category: None,
            confidence: 1.0,
            evidence: HashMap::new(),
        }
    }

    /// Anchor this finding at a file and line.
    pub fn at(mut self, file: impl Into<String>, line: usize) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Attach a rule id.
    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Attach a category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Override the default confidence of 1.0.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_penalties_use_documented_values() {
        assert_eq!(Severity::Critical.default_penalty(), 20.0);
        assert_eq!(Severity::High.default_penalty(), 10.0);
        assert_eq!(Severity::Medium.default_penalty(), 5.0);
        assert_eq!(Severity::Low.default_penalty(), 1.0);
    }

    #[test]
    fn severity_orders_by_rank() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Info < Severity::Low);
    }

    #[test]
    fn builder_sets_location() {
        let finding = Finding::new("complexity", Severity::Medium, "t", "d").at("main.go", 1);
        assert_eq!(finding.file.as_deref(), Some("main.go"));
        assert_eq!(finding.line, Some(1));
    }
}
