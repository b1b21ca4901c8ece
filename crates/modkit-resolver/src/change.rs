use std::fmt;

use modkit_core::Package;
use serde::{Deserialize, Serialize};

/// What kind of change a [`ModChange`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Install,
    Remove,
    Upgrade,
    Replace,
}

/// Why a change was selected. Exactly one reason is retained per change;
/// the first reason wins. Explanatory metadata for the caller, not part of
/// the correctness contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionReason {
    /// Chosen directly by the user.
    UserRequested,
    /// Pulled in to satisfy a dependency of the given package.
    DependencyOf(Package),
    /// Pulled in because the given package recommends it.
    RecommendedBy(Package),
    /// Pulled in because the given package suggests it.
    SuggestedBy(Package),
    /// Auto-installed and orphaned; nothing depends on it any more.
    NoLongerNeeded,
    /// Removed in favor of the given replacement package.
    Replaced(Package),
}

impl SelectionReason {
    /// The package this selection was made on behalf of, if any.
    pub fn parent(&self) -> Option<&Package> {
        match self {
            Self::DependencyOf(p) | Self::RecommendedBy(p) | Self::SuggestedBy(p)
            | Self::Replaced(p) => Some(p),
            Self::UserRequested | Self::NoLongerNeeded => None,
        }
    }
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserRequested => write!(f, "Requested by user."),
            Self::DependencyOf(p) => {
                write!(f, "To satisfy dependency from {}.", p.identifier)
            }
            Self::RecommendedBy(p) => write!(f, "Recommended by {}.", p.identifier),
            Self::SuggestedBy(p) => write!(f, "Suggested by {}.", p.identifier),
            Self::NoLongerNeeded => write!(f, "No longer needed."),
            Self::Replaced(p) => write!(f, "Replaced by {}.", p.identifier),
        }
    }
}

/// The atomic unit of resolver output: one package, one change, one reason.
/// Immutable once created; consumed by an external installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModChange {
    pub package: Package,
    pub change_type: ChangeType,
    pub reason: SelectionReason,
}

impl ModChange {
    pub fn new(package: Package, change_type: ChangeType, reason: SelectionReason) -> Self {
        Self {
            package,
            change_type,
            reason,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.package.identifier
    }
}

impl fmt::Display for ModChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.change_type {
            ChangeType::Install => "install",
            ChangeType::Remove => "remove",
            ChangeType::Upgrade => "upgrade",
            ChangeType::Replace => "replace",
        };
        write!(f, "{} {} ({})", verb, self.package, self.reason)
    }
}

/// A user-requested operation seeding one resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestedChange {
    Install(Package),
    Remove(Package),
    /// Modeled as a removal of `from` plus an install of `to`, both
    /// attributed to the user.
    Upgrade {
        from: Package,
        to: Package,
    },
    /// Caller-decided substitution: `old` is removed with a
    /// [`SelectionReason::Replaced`] reason and `new` is emitted as a
    /// [`ChangeType::Replace`] change.
    Replace {
        old: Package,
        new: Package,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    fn pkg(id: &str) -> Package {
        Package::new(id, Version::parse("1.0.0").unwrap())
    }

    #[test]
    fn reason_strings() {
        assert_eq!(SelectionReason::UserRequested.to_string(), "Requested by user.");
        assert_eq!(
            SelectionReason::DependencyOf(pkg("ModA")).to_string(),
            "To satisfy dependency from ModA."
        );
        assert_eq!(
            SelectionReason::RecommendedBy(pkg("ModA")).to_string(),
            "Recommended by ModA."
        );
        assert_eq!(SelectionReason::NoLongerNeeded.to_string(), "No longer needed.");
    }

    #[test]
    fn parent_only_for_relationship_reasons() {
        assert!(SelectionReason::UserRequested.parent().is_none());
        assert!(SelectionReason::NoLongerNeeded.parent().is_none());
        assert_eq!(
            SelectionReason::DependencyOf(pkg("ModA"))
                .parent()
                .map(|p| p.identifier.as_str()),
            Some("ModA")
        );
    }

    #[test]
    fn change_display() {
        let change = ModChange::new(pkg("ModA"), ChangeType::Install, SelectionReason::UserRequested);
        assert_eq!(change.to_string(), "install ModA 1.0.0 (Requested by user.)");
    }

    #[test]
    fn change_set_survives_serialization() {
        let change = ModChange::new(
            pkg("ModA"),
            ChangeType::Install,
            SelectionReason::DependencyOf(pkg("ModB")),
        );
        let json = serde_json::to_string(&change).unwrap();
        let back: ModChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, change);
        assert!(matches!(back.reason, SelectionReason::DependencyOf(_)));

        let request = RequestedChange::Upgrade {
            from: pkg("ModC"),
            to: Package::new("ModC", Version::parse("2.0.0").unwrap()),
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: RequestedChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
