use std::fmt;

use miette::Diagnostic;
use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::package::Package;

/// Error raised when constructing a malformed relationship descriptor.
#[derive(Debug, Error, Diagnostic)]
pub enum DescriptorError {
    /// A satisfy-any-of group must offer at least one choice.
    #[error("an any-of relationship group must contain at least one choice")]
    #[diagnostic(help("drop the empty group or list its alternatives"))]
    EmptyAnyOf,
}

/// One dependency/recommendation/conflict edge declared by a package.
///
/// Either a direct named reference with optional version bounds, or a group
/// of alternatives where any single choice satisfies the relationship
/// (used for suppressed recommends and virtual-identifier fan-out).
///
/// Invariant: `AnyOf` is never empty and never holds a single choice; the
/// [`RelationshipDescriptor::any_of`] constructor enforces both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipDescriptor {
    Named(NamedRelationship),
    AnyOf {
        any_of: Vec<RelationshipDescriptor>,
    },
}

/// A direct reference to a package (or virtual) identifier.
///
/// If `version` is set it pins an exact version and the min/max bounds are
/// ignored. Otherwise the bounds are inclusive and a missing bound is
/// unbounded on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRelationship {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version: Option<Version>,
}

impl NamedRelationship {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: None,
            min_version: None,
            max_version: None,
        }
    }

    pub fn exact(identifier: impl Into<String>, version: Version) -> Self {
        Self {
            version: Some(version),
            ..Self::new(identifier)
        }
    }

    pub fn bounded(
        identifier: impl Into<String>,
        min_version: Option<Version>,
        max_version: Option<Version>,
    ) -> Self {
        Self {
            min_version,
            max_version,
            ..Self::new(identifier)
        }
    }

    /// Whether the given version satisfies this relationship's constraint.
    ///
    /// An exact pin compares for equality; otherwise the inclusive
    /// min/max bounds apply, with missing bounds unbounded.
    pub fn within_bounds(&self, other: &Version) -> bool {
        if let Some(pinned) = &self.version {
            return pinned == other;
        }
        self.min_version.as_ref().map_or(true, |m| m <= other)
            && self.max_version.as_ref().map_or(true, |m| m >= other)
    }

    /// Whether the given package satisfies this relationship.
    ///
    /// A literal identifier match is version-checked; a provides match is
    /// not, since virtual identifiers carry no version of their own.
    pub fn satisfied_by(&self, package: &Package) -> bool {
        if package.identifier == self.identifier {
            self.within_bounds(&package.version)
        } else {
            package.provides.iter().any(|p| *p == self.identifier)
        }
    }
}

impl fmt::Display for NamedRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.version, &self.min_version, &self.max_version) {
            (Some(v), _, _) => write!(f, "{} {}", self.identifier, v),
            (None, Some(min), Some(max)) => write!(f, "{} {} -- {}", self.identifier, min, max),
            (None, Some(min), None) => write!(f, "{} {} or later", self.identifier, min),
            (None, None, Some(max)) => write!(f, "{} {} or earlier", self.identifier, max),
            (None, None, None) => write!(f, "{}", self.identifier),
        }
    }
}

impl RelationshipDescriptor {
    /// A bare named reference with no version constraint.
    pub fn named(identifier: impl Into<String>) -> Self {
        Self::Named(NamedRelationship::new(identifier))
    }

    /// Construct a satisfy-any-of group, normalizing to the invariants:
    /// nested groups are flattened, a single remaining choice collapses to
    /// itself, and an empty group is rejected.
    pub fn any_of(choices: Vec<RelationshipDescriptor>) -> Result<Self, DescriptorError> {
        let mut flat = Vec::with_capacity(choices.len());
        for choice in choices {
            match choice {
                Self::AnyOf { any_of } => flat.extend(any_of),
                named => flat.push(named),
            }
        }
        match flat.len() {
            0 => Err(DescriptorError::EmptyAnyOf),
            1 => Ok(flat.into_iter().next().unwrap()),
            _ => Ok(Self::AnyOf { any_of: flat }),
        }
    }

    /// Whether the given package satisfies this descriptor.
    pub fn satisfied_by(&self, package: &Package) -> bool {
        match self {
            Self::Named(named) => named.satisfied_by(package),
            Self::AnyOf { any_of } => any_of.iter().any(|r| r.satisfied_by(package)),
        }
    }

    /// Whether any package in the given set satisfies this descriptor.
    pub fn matches_any<'a>(&self, packages: impl IntoIterator<Item = &'a Package>) -> bool {
        packages.into_iter().any(|p| self.satisfied_by(p))
    }

    /// Whether this descriptor names any of the given identifiers.
    pub fn contains_any<S: AsRef<str>>(&self, identifiers: &[S]) -> bool {
        match self {
            Self::Named(named) => identifiers.iter().any(|id| id.as_ref() == named.identifier),
            Self::AnyOf { any_of } => any_of.iter().any(|r| r.contains_any(identifiers)),
        }
    }

    /// The identifiers this descriptor refers to, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Named(named) => vec![named.identifier.as_str()],
            Self::AnyOf { any_of } => any_of.iter().flat_map(|r| r.names()).collect(),
        }
    }
}

impl fmt::Display for RelationshipDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(named) => named.fmt(f),
            Self::AnyOf { any_of } => {
                let rendered: Vec<String> = any_of.iter().map(|r| r.to_string()).collect();
                write!(f, "{}", rendered.join(" OR "))
            }
        }
    }
}
