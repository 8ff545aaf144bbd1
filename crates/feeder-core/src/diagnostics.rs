//! Diagnostics collected while assembling and checking a network.
//!
//! Network assembly fails fast on invalid entities, with one exception: a
//! Load that has no usable power specification is dropped and reported
//! here. Structural checks (`Network::validate_into`) also report through
//! this type so callers can print or serialize everything in one place.
//!
//! # Example
//!
//! ```
//! use feeder_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("load", "no kws, q_to_p or csv given; load dropped", "Load b3");
//! diag.add_error("structure", "bus b9 is not reachable from the substation");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recovered locally (e.g. an unusable Load was dropped)
    Warning,
    /// The network is not fit for the algorithms that consume it
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g. "load", "structure", "reference")
    pub category: String,
    pub message: String,
    /// Optional entity reference (e.g. "Load b3", "Conductor b1-b2")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    /// Add entity reference to the issue
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for one operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
    /// Entity counts from the last network build, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<BuildStats>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw issue directly
    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    /// Get issues filtered by category
    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    /// Merge another diagnostics into this one. Stats from `other` win when set.
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
        if other.stats.is_some() {
            self.stats = other.stats;
        }
    }

    pub fn summary(&self) -> String {
        let warnings = self.warning_count();
        let errors = self.error_count();

        let issues = match (warnings, errors) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, plural(w)),
            (0, e) => format!("{} error{}", e, plural(e)),
            (w, e) => format!("{} warning{}, {} error{}", w, plural(w), e, plural(e)),
        };

        match &self.stats {
            Some(stats) => format!("{} | {}", stats, issues),
            None => issues,
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

/// Counts of entities assembled into a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub busses: usize,
    pub conductors: usize,
    pub transformers: usize,
    pub voltage_regulators: usize,
    pub loads: usize,
    pub shunts: usize,
    pub dropped_loads: usize,
}

impl std::fmt::Display for BuildStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} busses, {} conductors, {} transformers, {} regulators, {} loads ({} dropped), {} shunts",
            self.busses,
            self.conductors,
            self.transformers,
            self.voltage_regulators,
            self.loads,
            self.dropped_loads,
            self.shunts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.add_warning("load", "dropped");
        diag.add_error("structure", "unreachable bus");
        diag.add_warning_with_entity("load", "dropped", "Load b2");

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert!(diag.has_issues());
        assert!(diag.has_errors());
        assert!(diag.has_warnings());
        assert_eq!(diag.issues_by_category("load").count(), 2);
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.add_error_with_entity("reference", "Invalid bus", "Load 7");
        diag.stats = Some(BuildStats {
            busses: 3,
            ..BuildStats::default()
        });

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"entity\": \"Load 7\""));
        assert!(json.contains("\"busses\": 3"));
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");

        diag.add_warning("load", "warning");
        assert_eq!(diag.summary(), "1 warning");

        diag.add_error("structure", "error");
        diag.add_warning("load", "another warning");
        assert_eq!(diag.summary(), "2 warnings, 1 error");

        diag.stats = Some(BuildStats {
            busses: 4,
            loads: 2,
            dropped_loads: 1,
            ..BuildStats::default()
        });
        assert!(diag.summary().starts_with("4 busses"));
        assert!(diag.summary().contains("2 loads (1 dropped)"));
    }

    #[test]
    fn test_issue_display_and_merge() {
        let issue = DiagnosticIssue::new(Severity::Warning, "load", "dropped").with_entity("Load b3");
        let display = issue.to_string();
        assert!(display.contains("warning"));
        assert!(display.contains("Load b3"));

        let mut a = Diagnostics::new();
        a.add(issue);
        let mut b = Diagnostics::new();
        b.add_error("structure", "cycle");
        a.merge(b);
        assert_eq!(a.issues.len(), 2);
    }
}
