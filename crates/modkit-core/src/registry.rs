use std::collections::{BTreeMap, BTreeSet};

use crate::package::{InstalledPackage, Package};
use crate::platform::PlatformCriteria;

/// Read-only view over available and installed packages.
///
/// The resolver borrows a `RegistryView` for the duration of one call and
/// never mutates it; callers supply a stable snapshot so concurrent index
/// updates cannot be observed mid-resolution.
pub trait RegistryView {
    /// The newest available version of `identifier` compatible with the
    /// given platform criteria.
    fn latest_available(&self, identifier: &str, criteria: &PlatformCriteria) -> Option<&Package>;

    /// Every available version of `identifier`, oldest first.
    fn available_by_identifier(&self, identifier: &str) -> &[Package];

    /// The newest compatible version of every distinct package that matches
    /// `identifier` literally or lists it in its provides set.
    fn latest_available_with_provides(
        &self,
        identifier: &str,
        criteria: &PlatformCriteria,
    ) -> Vec<&Package>;

    /// All installed packages with their auto-installed flags.
    fn installed_packages(&self) -> &[InstalledPackage];

    /// Whether `identifier` is installed, optionally counting packages that
    /// merely provide it.
    fn is_installed(&self, identifier: &str, also_via_provides: bool) -> bool {
        self.installed_packages().iter().any(|i| {
            if also_via_provides {
                i.package.provides_list().any(|p| p == identifier)
            } else {
                i.identifier() == identifier
            }
        })
    }

    /// The installed record for `identifier`, if any.
    fn installed_package(&self, identifier: &str) -> Option<&InstalledPackage> {
        self.installed_packages()
            .iter()
            .find(|i| i.identifier() == identifier)
    }

    /// Identifiers of installed packages that transitively depend on any of
    /// the given identifiers (directly or through a provides mapping).
    /// The input identifiers themselves are not included.
    fn reverse_dependencies(&self, identifiers: &BTreeSet<String>) -> BTreeSet<String> {
        let mut affected: BTreeSet<String> = identifiers.clone();
        let mut dependents = BTreeSet::new();
        loop {
            let mut grew = false;
            for installed in self.installed_packages() {
                let id = installed.identifier();
                if affected.contains(id) {
                    continue;
                }
                let names: Vec<String> = affected.iter().cloned().collect();
                let hit = installed
                    .package
                    .depends
                    .iter()
                    .any(|d| d.contains_any(&names));
                if hit {
                    affected.insert(id.to_string());
                    dependents.insert(id.to_string());
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }
        dependents
    }
}

/// An immutable in-memory registry snapshot.
///
/// Backed by ordered maps so every query iterates in a reproducible order,
/// which the resolver's determinism contract relies on.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    available: BTreeMap<String, Vec<Package>>,
    installed: Vec<InstalledPackage>,
}

impl RegistrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an available package, keeping each identifier's versions sorted
    /// oldest first. Re-adding an existing version replaces it.
    pub fn add_available(&mut self, package: Package) {
        let versions = self.available.entry(package.identifier.clone()).or_default();
        if let Some(existing) = versions.iter_mut().find(|p| p.version == package.version) {
            tracing::debug!(
                "replacing available entry {} {}",
                package.identifier,
                package.version
            );
            *existing = package;
            return;
        }
        versions.push(package);
        versions.sort_by(|a, b| a.version.cmp(&b.version));
    }

    /// Record a package as installed. Installed packages are also listed as
    /// available so re-resolution can see them as candidates.
    pub fn add_installed(&mut self, package: Package, auto_installed: bool) {
        self.add_available(package.clone());
        self.installed
            .push(InstalledPackage::new(package, auto_installed));
        self.installed
            .sort_by(|a, b| a.identifier().cmp(b.identifier()));
    }

    /// All distinct available identifiers, sorted.
    pub fn available_identifiers(&self) -> impl Iterator<Item = &str> {
        self.available.keys().map(String::as_str)
    }
}

impl RegistryView for RegistrySnapshot {
    fn latest_available(&self, identifier: &str, criteria: &PlatformCriteria) -> Option<&Package> {
        self.available
            .get(identifier)?
            .iter()
            .rev()
            .find(|p| p.is_compatible(criteria))
    }

    fn available_by_identifier(&self, identifier: &str) -> &[Package] {
        self.available
            .get(identifier)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn latest_available_with_provides(
        &self,
        identifier: &str,
        criteria: &PlatformCriteria,
    ) -> Vec<&Package> {
        let mut matches = Vec::new();
        for versions in self.available.values() {
            let latest = versions
                .iter()
                .rev()
                .find(|p| p.is_compatible(criteria) && p.provides_list().any(|n| n == identifier));
            if let Some(pkg) = latest {
                matches.push(pkg);
            }
        }
        matches
    }

    fn installed_packages(&self) -> &[InstalledPackage] {
        &self.installed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::RelationshipDescriptor;
    use semver::Version;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn snapshot_with_versions() -> RegistrySnapshot {
        let mut reg = RegistrySnapshot::new();
        reg.add_available(Package::new("ModA", v("1.0.0")));
        reg.add_available(Package::new("ModA", v("2.0.0")));
        reg.add_available(
            Package::new("ModA", v("3.0.0")).with_platform_bounds(Some(v("2.0.0")), None),
        );
        reg
    }

    #[test]
    fn latest_available_respects_criteria() {
        let reg = snapshot_with_versions();
        let latest = reg.latest_available("ModA", &PlatformCriteria::any()).unwrap();
        assert_eq!(latest.version, v("3.0.0"));

        // 3.0.0 needs platform >= 2.0.0, so a 1.x target gets 2.0.0
        let latest = reg
            .latest_available("ModA", &PlatformCriteria::exact(v("1.5.0")))
            .unwrap();
        assert_eq!(latest.version, v("2.0.0"));
    }

    #[test]
    fn provides_lookup_finds_virtual_identifier() {
        let mut reg = RegistrySnapshot::new();
        reg.add_available(Package::new("ModA", v("1.0.0")).with_provides(["Fuel"]));
        reg.add_available(Package::new("ModB", v("1.0.0")).with_provides(["Fuel"]));
        reg.add_available(Package::new("ModC", v("1.0.0")));

        let providers = reg.latest_available_with_provides("Fuel", &PlatformCriteria::any());
        let ids: Vec<&str> = providers.iter().map(|p| p.identifier.as_str()).collect();
        assert_eq!(ids, vec!["ModA", "ModB"]);
    }

    #[test]
    fn provides_lookup_includes_literal_match() {
        let mut reg = RegistrySnapshot::new();
        reg.add_available(Package::new("Fuel", v("1.0.0")));
        reg.add_available(Package::new("ModB", v("1.0.0")).with_provides(["Fuel"]));

        let providers = reg.latest_available_with_provides("Fuel", &PlatformCriteria::any());
        assert_eq!(providers.len(), 2);
    }

    #[test]
    fn is_installed_via_provides() {
        let mut reg = RegistrySnapshot::new();
        reg.add_installed(Package::new("ModA", v("1.0.0")).with_provides(["Fuel"]), false);
        assert!(reg.is_installed("ModA", false));
        assert!(!reg.is_installed("Fuel", false));
        assert!(reg.is_installed("Fuel", true));
    }

    #[test]
    fn reverse_dependencies_are_transitive() {
        let mut reg = RegistrySnapshot::new();
        reg.add_installed(Package::new("ModA", v("1.0.0")), false);
        reg.add_installed(
            Package::new("ModB", v("1.0.0"))
                .with_depends([RelationshipDescriptor::named("ModA")]),
            false,
        );
        reg.add_installed(
            Package::new("ModC", v("1.0.0"))
                .with_depends([RelationshipDescriptor::named("ModB")]),
            false,
        );

        let mut targets = BTreeSet::new();
        targets.insert("ModA".to_string());
        let deps = reg.reverse_dependencies(&targets);
        assert!(deps.contains("ModB"));
        assert!(deps.contains("ModC"));
        assert!(!deps.contains("ModA"));
    }

    #[test]
    fn duplicate_add_replaces() {
        let mut reg = RegistrySnapshot::new();
        reg.add_available(Package::new("ModA", v("1.0.0")));
        reg.add_available(Package::new("ModA", v("1.0.0")).with_provides(["Fuel"]));
        assert_eq!(reg.available_by_identifier("ModA").len(), 1);
        assert!(reg.available_by_identifier("ModA")[0]
            .provides
            .contains(&"Fuel".to_string()));
    }
}
