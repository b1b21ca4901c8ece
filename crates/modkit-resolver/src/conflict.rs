//! Conflict recording and reporting.

use std::fmt;

use serde::{Deserialize, Serialize};

/// All conflicts and consistency problems found during one resolution run.
///
/// Entries are recorded in both directions: if A conflicts with B, there is
/// an entry keyed by A and an entry keyed by B.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictList {
    entries: Vec<ConflictEntry>,
}

/// One conflict, keyed by the package it is reported against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConflictEntry {
    /// Identifier of the package this entry is about.
    pub package: String,
    /// Identifier of the conflicting counterpart, if the problem involves
    /// one (platform incompatibility does not).
    pub other: Option<String>,
    /// Human-readable explanation for the caller to surface.
    pub message: String,
    /// Why the keyed package is part of the change-set, when the resolver
    /// selected it. Installed state carries no selection reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ConflictList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry, ignoring exact duplicates.
    pub fn add(&mut self, entry: ConflictEntry) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    /// Record a mutual conflict between two packages, in both directions.
    pub fn add_pair(&mut self, a: &str, b: &str, message: impl Into<String>) {
        let message = message.into();
        self.add(ConflictEntry {
            package: a.to_string(),
            other: Some(b.to_string()),
            message: message.clone(),
            reason: None,
        });
        self.add(ConflictEntry {
            package: b.to_string(),
            other: Some(a.to_string()),
            message,
            reason: None,
        });
    }

    /// Record a single-party consistency problem.
    pub fn add_single(&mut self, package: &str, message: impl Into<String>) {
        self.add(ConflictEntry {
            package: package.to_string(),
            other: None,
            message: message.into(),
            reason: None,
        });
    }

    /// Fill in the keyed package's selection-reason chain on entries that
    /// don't carry one yet. `lookup` returns the chain for identifiers the
    /// resolver selected, `None` for pre-existing installed state.
    pub fn annotate_reasons(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for entry in &mut self.entries {
            if entry.reason.is_none() {
                entry.reason = lookup(&entry.package);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConflictEntry> {
        self.entries.iter()
    }

    /// Whether any entry is keyed by the given identifier.
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.iter().any(|e| e.package == identifier)
    }

    /// All entries keyed by the given identifier.
    pub fn for_package(&self, identifier: &str) -> Vec<&ConflictEntry> {
        self.entries
            .iter()
            .filter(|e| e.package == identifier)
            .collect()
    }

    /// Sort entries by package then counterpart, for reproducible output.
    pub fn sort(&mut self) {
        self.entries.sort();
    }
}

impl fmt::Display for ConflictList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "No conflicts.");
        }
        writeln!(f, "Conflicts ({}):", self.entries.len())?;
        for e in &self.entries {
            match &e.reason {
                Some(reason) => writeln!(f, "  {}: {} ({})", e.package, e.message, reason)?,
                None => writeln!(f, "  {}: {}", e.package, e.message)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list() {
        let list = ConflictList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.to_string(), "No conflicts.");
    }

    #[test]
    fn pair_records_both_directions() {
        let mut list = ConflictList::new();
        list.add_pair("ModA", "ModB", "ModA conflicts with ModB");
        assert_eq!(list.len(), 2);
        assert!(list.contains("ModA"));
        assert!(list.contains("ModB"));
        assert_eq!(
            list.for_package("ModB")[0].other.as_deref(),
            Some("ModA")
        );
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut list = ConflictList::new();
        list.add_pair("ModA", "ModB", "ModA conflicts with ModB");
        list.add_pair("ModA", "ModB", "ModA conflicts with ModB");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn display_lists_entries() {
        let mut list = ConflictList::new();
        list.add_single("ModA", "ModA is not compatible with the target platform");
        let s = list.to_string();
        assert!(s.contains("Conflicts (1):"));
        assert!(s.contains("ModA is not compatible"));
    }

    #[test]
    fn annotated_reasons_appear_in_display() {
        let mut list = ConflictList::new();
        list.add_pair("ModA", "ModB", "ModA 1.0.0 conflicts with ModB 1.0.0");
        list.annotate_reasons(|id| {
            (id == "ModA").then(|| "Requested by user.".to_string())
        });

        assert_eq!(
            list.for_package("ModA")[0].reason.as_deref(),
            Some("Requested by user.")
        );
        assert_eq!(list.for_package("ModB")[0].reason, None);

        let s = list.to_string();
        assert!(s.contains("ModA: ModA 1.0.0 conflicts with ModB 1.0.0 (Requested by user.)"));
        assert!(s.contains("ModB: ModA 1.0.0 conflicts with ModB 1.0.0\n"));
    }
}
