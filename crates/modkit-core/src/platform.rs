use semver::Version;
use serde::{Deserialize, Serialize};

/// The set of target platform versions an install must be compatible with.
///
/// An empty criteria is unrestricted: every package is considered
/// compatible. Callers targeting a concrete platform build pass the exact
/// version (or the handful of versions the platform treats as equivalent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCriteria {
    versions: Vec<Version>,
}

impl PlatformCriteria {
    /// Criteria that accepts every package regardless of its platform bounds.
    pub fn any() -> Self {
        Self::default()
    }

    /// Criteria for a single exact platform version.
    pub fn exact(version: Version) -> Self {
        Self {
            versions: vec![version],
        }
    }

    pub fn new(versions: Vec<Version>) -> Self {
        Self { versions }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Whether any accepted platform version falls within the given
    /// inclusive bounds. Missing bounds are unbounded on that side.
    pub fn accepts(&self, min: Option<&Version>, max: Option<&Version>) -> bool {
        if self.versions.is_empty() {
            return true;
        }
        self.versions
            .iter()
            .any(|v| min.map_or(true, |m| m <= v) && max.map_or(true, |m| m >= v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn unrestricted_accepts_everything() {
        let crit = PlatformCriteria::any();
        assert!(crit.accepts(Some(&v("1.0.0")), Some(&v("1.0.0"))));
        assert!(crit.accepts(None, None));
    }

    #[test]
    fn exact_version_within_bounds() {
        let crit = PlatformCriteria::exact(v("1.4.0"));
        assert!(crit.accepts(Some(&v("1.2.0")), Some(&v("1.5.0"))));
        assert!(crit.accepts(Some(&v("1.4.0")), Some(&v("1.4.0"))));
        assert!(!crit.accepts(Some(&v("1.5.0")), None));
        assert!(!crit.accepts(None, Some(&v("1.3.0"))));
    }

    #[test]
    fn multiple_versions_any_match_suffices() {
        let crit = PlatformCriteria::new(vec![v("1.3.0"), v("1.4.0")]);
        assert!(crit.accepts(Some(&v("1.4.0")), None));
        assert!(!crit.accepts(Some(&v("1.5.0")), None));
    }
}
