//! Consistency checks over a final package set.
//!
//! These run over the union of installed-minus-removed and selected
//! packages at the end of resolution, and are also usable standalone for
//! auditing an installed state.

use modkit_core::{Package, RelationshipDescriptor};

/// A depends edge with no satisfier in the set: the depending package and
/// the unmet descriptor.
#[derive(Debug, Clone)]
pub struct UnmetDepends<'a> {
    pub package: &'a Package,
    pub descriptor: &'a RelationshipDescriptor,
}

/// A matched conflicts edge: the declaring package, the descriptor, and the
/// counterpart it matched.
#[derive(Debug, Clone)]
pub struct MatchedConflict<'a> {
    pub package: &'a Package,
    pub descriptor: &'a RelationshipDescriptor,
    pub other: &'a Package,
}

/// Find every depends edge of every package in the set that no member of
/// the set satisfies, directly or through a provides mapping.
pub fn find_unsatisfied_depends<'a>(packages: &'a [Package]) -> Vec<UnmetDepends<'a>> {
    let mut unmet = Vec::new();
    for package in packages {
        for descriptor in &package.depends {
            if !descriptor.matches_any(packages.iter()) {
                unmet.push(UnmetDepends {
                    package,
                    descriptor,
                });
            }
        }
    }
    unmet
}

/// Find every conflicts edge in the set that matches another member.
/// A package is never matched against other versions of itself, so
/// upgrades do not self-conflict.
pub fn find_conflicting<'a>(packages: &'a [Package]) -> Vec<MatchedConflict<'a>> {
    let mut found = Vec::new();
    for package in packages {
        for descriptor in &package.conflicts {
            for other in packages {
                if other.identifier == package.identifier {
                    continue;
                }
                if descriptor.satisfied_by(other) {
                    found.push(MatchedConflict {
                        package,
                        descriptor,
                        other,
                    });
                }
            }
        }
    }
    found
}

/// Whether the set can co-exist: all depends satisfied, no conflicts.
pub fn is_consistent(packages: &[Package]) -> bool {
    find_unsatisfied_depends(packages).is_empty() && find_conflicting(packages).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit_core::NamedRelationship;
    use semver::Version;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn satisfied_set_is_consistent() {
        let set = vec![
            Package::new("ModA", v("1.0.0"))
                .with_depends([RelationshipDescriptor::named("ModB")]),
            Package::new("ModB", v("1.0.0")),
        ];
        assert!(is_consistent(&set));
    }

    #[test]
    fn missing_dependency_is_reported() {
        let set = vec![Package::new("ModA", v("1.0.0"))
            .with_depends([RelationshipDescriptor::named("ModB")])];
        let unmet = find_unsatisfied_depends(&set);
        assert_eq!(unmet.len(), 1);
        assert_eq!(unmet[0].package.identifier, "ModA");
        assert_eq!(unmet[0].descriptor.to_string(), "ModB");
    }

    #[test]
    fn provides_satisfies_dependency() {
        let set = vec![
            Package::new("ModA", v("1.0.0"))
                .with_depends([RelationshipDescriptor::named("Fuel")]),
            Package::new("ModB", v("1.0.0")).with_provides(["Fuel"]),
        ];
        assert!(find_unsatisfied_depends(&set).is_empty());
    }

    #[test]
    fn conflict_is_reported_with_counterpart() {
        let set = vec![
            Package::new("ModA", v("1.0.0"))
                .with_conflicts([RelationshipDescriptor::named("ModB")]),
            Package::new("ModB", v("1.0.0")),
        ];
        let found = find_conflicting(&set);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].package.identifier, "ModA");
        assert_eq!(found[0].other.identifier, "ModB");
    }

    #[test]
    fn version_bounded_conflict() {
        let set = vec![
            Package::new("ModA", v("1.0.0")).with_conflicts([RelationshipDescriptor::Named(
                NamedRelationship::bounded("ModB", Some(v("2.0.0")), None),
            )]),
            Package::new("ModB", v("1.5.0")),
        ];
        assert!(find_conflicting(&set).is_empty());
    }

    #[test]
    fn upgrade_does_not_self_conflict() {
        let set = vec![
            Package::new("ModA", v("2.0.0"))
                .with_conflicts([RelationshipDescriptor::named("ModA")]),
            Package::new("ModA", v("1.0.0")),
        ];
        assert!(find_conflicting(&set).is_empty());
    }
}
