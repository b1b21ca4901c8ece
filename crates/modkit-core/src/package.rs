use std::fmt;
use std::hash::{Hash, Hasher};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::platform::PlatformCriteria;
use crate::relationship::RelationshipDescriptor;

/// An installable unit of content: identifier, version, declared
/// relationships, virtual identifiers it provides, and platform bounds.
///
/// Two packages are equal when identifier and version are equal; the
/// relationship lists are metadata, not identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub identifier: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<RelationshipDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommends: Vec<RelationshipDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggests: Vec<RelationshipDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<RelationshipDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_min: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_max: Option<Version>,
}

impl Package {
    pub fn new(identifier: impl Into<String>, version: Version) -> Self {
        Self {
            identifier: identifier.into(),
            version,
            depends: Vec::new(),
            recommends: Vec::new(),
            suggests: Vec::new(),
            conflicts: Vec::new(),
            provides: Vec::new(),
            platform_min: None,
            platform_max: None,
        }
    }

    pub fn with_depends(
        mut self,
        depends: impl IntoIterator<Item = RelationshipDescriptor>,
    ) -> Self {
        self.depends = depends.into_iter().collect();
        self
    }

    pub fn with_recommends(
        mut self,
        recommends: impl IntoIterator<Item = RelationshipDescriptor>,
    ) -> Self {
        self.recommends = recommends.into_iter().collect();
        self
    }

    pub fn with_suggests(
        mut self,
        suggests: impl IntoIterator<Item = RelationshipDescriptor>,
    ) -> Self {
        self.suggests = suggests.into_iter().collect();
        self
    }

    pub fn with_conflicts(
        mut self,
        conflicts: impl IntoIterator<Item = RelationshipDescriptor>,
    ) -> Self {
        self.conflicts = conflicts.into_iter().collect();
        self
    }

    pub fn with_provides<S: Into<String>>(mut self, provides: impl IntoIterator<Item = S>) -> Self {
        self.provides = provides.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_platform_bounds(mut self, min: Option<Version>, max: Option<Version>) -> Self {
        self.platform_min = min;
        self.platform_max = max;
        self
    }

    /// Every identifier this package satisfies: its own, plus provides.
    pub fn provides_list(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.identifier.as_str()).chain(self.provides.iter().map(String::as_str))
    }

    /// Whether this package can be installed against the given target
    /// platform criteria.
    pub fn is_compatible(&self, criteria: &PlatformCriteria) -> bool {
        criteria.accepts(self.platform_min.as_ref(), self.platform_max.as_ref())
    }

    /// Whether any of this package's `conflicts` descriptors matches the
    /// other package. One-directional; a package never conflicts with
    /// another version of itself.
    pub fn conflicts_with(&self, other: &Package) -> bool {
        self.identifier != other.identifier
            && self.conflicts.iter().any(|c| c.satisfied_by(other))
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier && self.version == other.version
    }
}

impl Eq for Package {}

impl Hash for Package {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.identifier, self.version)
    }
}

/// An installed package together with how it got there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub package: Package,
    /// True when the package was pulled in to satisfy a dependency rather
    /// than chosen directly by the user. Such packages are candidates for
    /// no-longer-needed pruning.
    pub auto_installed: bool,
}

impl InstalledPackage {
    pub fn new(package: Package, auto_installed: bool) -> Self {
        Self {
            package,
            auto_installed,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.package.identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::NamedRelationship;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn equality_ignores_relationships() {
        let a = Package::new("ModA", v("1.0.0"));
        let b = Package::new("ModA", v("1.0.0"))
            .with_depends([RelationshipDescriptor::named("ModB")]);
        assert_eq!(a, b);
        assert_ne!(a, Package::new("ModA", v("1.0.1")));
    }

    #[test]
    fn provides_list_includes_own_identifier() {
        let pkg = Package::new("ModA", v("1.0.0")).with_provides(["Fuel", "Oxidizer"]);
        let list: Vec<&str> = pkg.provides_list().collect();
        assert_eq!(list, vec!["ModA", "Fuel", "Oxidizer"]);
    }

    #[test]
    fn conflict_matching_respects_bounds() {
        let a = Package::new("ModA", v("1.0.0")).with_conflicts([RelationshipDescriptor::Named(
            NamedRelationship::bounded("ModB", Some(v("2.0.0")), None),
        )]);
        assert!(!a.conflicts_with(&Package::new("ModB", v("1.9.0"))));
        assert!(a.conflicts_with(&Package::new("ModB", v("2.0.0"))));
    }

    #[test]
    fn never_conflicts_with_other_versions_of_self() {
        let a = Package::new("ModA", v("2.0.0"))
            .with_conflicts([RelationshipDescriptor::named("ModA")]);
        assert!(!a.conflicts_with(&Package::new("ModA", v("1.0.0"))));
    }

    #[test]
    fn conflict_via_provides() {
        let a = Package::new("ModA", v("1.0.0"))
            .with_conflicts([RelationshipDescriptor::named("Fuel")]);
        let b = Package::new("ModB", v("1.0.0")).with_provides(["Fuel"]);
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn platform_compatibility() {
        let pkg = Package::new("ModA", v("1.0.0"))
            .with_platform_bounds(Some(v("1.2.0")), Some(v("1.4.0")));
        assert!(pkg.is_compatible(&PlatformCriteria::exact(v("1.3.0"))));
        assert!(!pkg.is_compatible(&PlatformCriteria::exact(v("1.5.0"))));
        assert!(pkg.is_compatible(&PlatformCriteria::any()));
    }
}
