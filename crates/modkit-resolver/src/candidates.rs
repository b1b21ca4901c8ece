//! Candidate search for relationship descriptors.
//!
//! Given a descriptor and a registry view, produce the ordered set of
//! packages that could satisfy it: literal identifier matches within
//! version bounds, plus provides-based matches (which carry no version
//! constraint of their own). Candidates that could never complete an
//! install (their own dependency closure has no satisfiers) are dropped
//! up front.

use modkit_core::{
    NamedRelationship, Package, PlatformCriteria, RegistryView, RelationshipDescriptor,
};

/// The ordered candidates that would satisfy `descriptor`.
///
/// Tie-break order: already installed first, then newest version, then
/// declaration order. The sort is stable, so declaration order is the
/// residual key; the caller may take the first entry as the deterministic
/// auto-pick.
pub fn candidates_for<R: RegistryView + ?Sized>(
    descriptor: &RelationshipDescriptor,
    registry: &R,
    criteria: &PlatformCriteria,
) -> Vec<Package> {
    let mut found = Vec::new();
    collect(descriptor, registry, criteria, &mut found);

    // De-duplicate by identifier, keeping the first occurrence.
    let mut seen = Vec::new();
    found.retain(|p| {
        if seen.contains(&p.identifier) {
            false
        } else {
            seen.push(p.identifier.clone());
            true
        }
    });

    found.sort_by(|a, b| {
        let a_installed = registry.is_installed(&a.identifier, false);
        let b_installed = registry.is_installed(&b.identifier, false);
        b_installed
            .cmp(&a_installed)
            .then_with(|| b.version.cmp(&a.version))
    });
    found
}

fn collect<R: RegistryView + ?Sized>(
    descriptor: &RelationshipDescriptor,
    registry: &R,
    criteria: &PlatformCriteria,
    out: &mut Vec<Package>,
) {
    match descriptor {
        RelationshipDescriptor::Named(named) => {
            // Newest in-bounds compatible version under the literal name.
            let literal = registry
                .available_by_identifier(&named.identifier)
                .iter()
                .rev()
                .find(|p| {
                    named.within_bounds(&p.version)
                        && p.is_compatible(criteria)
                        && might_be_installable(p, registry, criteria)
                });
            if let Some(pkg) = literal {
                out.push(pkg.clone());
            }

            // Packages providing the identifier virtually. Provides matches
            // are not version-checked.
            for provider in registry.latest_available_with_provides(&named.identifier, criteria) {
                if provider.identifier != named.identifier
                    && might_be_installable(provider, registry, criteria)
                {
                    out.push(provider.clone());
                }
            }
        }
        RelationshipDescriptor::AnyOf { any_of } => {
            for choice in any_of {
                collect(choice, registry, criteria, out);
            }
        }
    }
}

/// Whether a package's dependency closure has at least one available or
/// installed satisfier per depends edge. Cycle-tolerant: a package under
/// consideration is assumed installable while its own dependencies are
/// checked.
pub fn might_be_installable<R: RegistryView + ?Sized>(
    package: &Package,
    registry: &R,
    criteria: &PlatformCriteria,
) -> bool {
    check_installable(package, registry, criteria, &mut Vec::new())
}

fn check_installable<R: RegistryView + ?Sized>(
    package: &Package,
    registry: &R,
    criteria: &PlatformCriteria,
    assumed: &mut Vec<String>,
) -> bool {
    if package.depends.is_empty() {
        return true;
    }
    if assumed.iter().any(|id| *id == package.identifier) {
        return true;
    }
    assumed.push(package.identifier.clone());

    let installable = package.depends.iter().all(|dep| {
        has_satisfier(dep, registry, criteria, assumed)
    });

    assumed.pop();
    installable
}

fn has_satisfier<R: RegistryView + ?Sized>(
    descriptor: &RelationshipDescriptor,
    registry: &R,
    criteria: &PlatformCriteria,
    assumed: &mut Vec<String>,
) -> bool {
    // Installed packages count as satisfiers regardless of their own deps.
    let installed_hit = registry
        .installed_packages()
        .iter()
        .any(|i| descriptor.satisfied_by(&i.package));
    if installed_hit {
        return true;
    }

    match descriptor {
        RelationshipDescriptor::Named(named) => named_has_satisfier(named, registry, criteria, assumed),
        RelationshipDescriptor::AnyOf { any_of } => any_of
            .iter()
            .any(|choice| has_satisfier(choice, registry, criteria, assumed)),
    }
}

fn named_has_satisfier<R: RegistryView + ?Sized>(
    named: &NamedRelationship,
    registry: &R,
    criteria: &PlatformCriteria,
    assumed: &mut Vec<String>,
) -> bool {
    registry
        .latest_available_with_provides(&named.identifier, criteria)
        .into_iter()
        .filter(|p| {
            p.identifier != named.identifier || named.within_bounds(&p.version)
        })
        .any(|p| check_installable(p, registry, criteria, assumed))
}
