//! The worklist resolution engine.
//!
//! Expands user-requested changes into a complete change-set: mandatory
//! depends edges are resolved transitively (hard failures abort), optional
//! recommends/suggests edges are resolved best-effort, the final selection
//! is checked for conflicts and platform compatibility, orphaned
//! auto-installed packages are pruned, and the output is ordered so every
//! package follows its prerequisites.
//!
//! Resolution is a pure function of its inputs: the registry view is only
//! read, and identical inputs always produce identical output.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use modkit_core::{Package, PlatformCriteria, RegistryView, RelationshipDescriptor};
use semver::Version;

use crate::candidates::candidates_for;
use crate::change::{ChangeType, ModChange, RequestedChange, SelectionReason};
use crate::conflict::ConflictList;
use crate::consistency;
use crate::error::ResolveError;
use crate::graph::InstallGraph;
use crate::options::ResolverOptions;

/// The successful outcome of one resolution run.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Ordered change-set: removals first (by identifier), then installs
    /// in dependency order with identifier tie-break.
    pub changes: Vec<ModChange>,
    /// Conflicts found but tolerated. Empty unless
    /// [`ResolverOptions::tolerate_conflicts`] or
    /// [`ResolverOptions::skip_consistency_check`] let them through.
    pub conflicts: ConflictList,
    reasons: BTreeMap<String, SelectionReason>,
}

impl Resolution {
    pub fn is_consistent(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Why the given package was selected for install, if it was.
    pub fn reason_for(&self, identifier: &str) -> Option<&SelectionReason> {
        self.reasons.get(identifier)
    }

    /// A human-readable explanation chain for a selected package, walking
    /// dependency parents back to the user's own request.
    pub fn reason_chain(&self, identifier: &str) -> String {
        let mut out = String::new();
        let mut current = identifier.to_string();
        while let Some(reason) = self.reasons.get(&current) {
            out.push_str("  ");
            out.push_str(&reason.to_string());
            out.push('\n');
            match reason.parent() {
                Some(parent) if self.reasons.contains_key(&parent.identifier) => {
                    current = parent.identifier.clone();
                }
                _ => break,
            }
        }
        out
    }
}

/// Flatten a selection-reason chain into one line, walking dependency
/// parents back to the user's request.
fn reason_line(
    reasons: &BTreeMap<String, SelectionReason>,
    identifier: &str,
) -> Option<String> {
    let mut parts = Vec::new();
    let mut current = identifier;
    while let Some(reason) = reasons.get(current) {
        parts.push(reason.to_string());
        match reason.parent() {
            Some(parent) if reasons.contains_key(&parent.identifier) => {
                current = parent.identifier.as_str();
            }
            _ => break,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Build an install request for the newest compatible version of an
/// identifier.
pub fn install_request<R: RegistryView + ?Sized>(
    identifier: &str,
    registry: &R,
    criteria: &PlatformCriteria,
) -> Result<RequestedChange, ResolveError> {
    registry
        .latest_available(identifier, criteria)
        .cloned()
        .map(RequestedChange::Install)
        .ok_or_else(|| ResolveError::PackageNotFound {
            identifier: identifier.to_string(),
        })
}

/// Build a removal request for an installed identifier.
pub fn remove_request<R: RegistryView + ?Sized>(
    identifier: &str,
    registry: &R,
) -> Result<RequestedChange, ResolveError> {
    registry
        .installed_package(identifier)
        .map(|i| RequestedChange::Remove(i.package.clone()))
        .ok_or_else(|| ResolveError::PackageNotFound {
            identifier: identifier.to_string(),
        })
}

/// Build an upgrade request from the installed version of an identifier to
/// the newest compatible available version.
pub fn upgrade_request<R: RegistryView + ?Sized>(
    identifier: &str,
    registry: &R,
    criteria: &PlatformCriteria,
) -> Result<RequestedChange, ResolveError> {
    let from = registry
        .installed_package(identifier)
        .map(|i| i.package.clone())
        .ok_or_else(|| ResolveError::PackageNotFound {
            identifier: identifier.to_string(),
        })?;
    let to = registry
        .latest_available(identifier, criteria)
        .cloned()
        .ok_or_else(|| ResolveError::PackageNotFound {
            identifier: identifier.to_string(),
        })?;
    Ok(RequestedChange::Upgrade { from, to })
}

/// Expand the requested changes into a complete, ordered change-set.
///
/// All-or-nothing: on any hard failure no partial change-set is proposed.
/// The registry is never mutated; callers supply a stable snapshot.
pub fn resolve<R: RegistryView + ?Sized>(
    requested: &[RequestedChange],
    registry: &R,
    criteria: &PlatformCriteria,
    options: &ResolverOptions,
) -> Result<Resolution, ResolveError> {
    validate_request(requested)?;
    tracing::debug!("resolving {} requested changes", requested.len());

    let mut engine = Engine {
        registry,
        criteria,
        options: *options,
        selected: BTreeMap::new(),
        reasons: BTreeMap::new(),
        change_types: BTreeMap::new(),
        removals: Vec::new(),
        removed_ids: BTreeSet::new(),
        conflicts: ConflictList::new(),
        saw_version_clash: false,
        graph: InstallGraph::new(),
        queue: VecDeque::new(),
    };

    engine.seed(requested);
    engine.expand_all()?;
    engine.finish()
}

/// Reject self-contradictory request batches before doing any work.
fn validate_request(requested: &[RequestedChange]) -> Result<(), ResolveError> {
    let mut installs: BTreeMap<&str, &Version> = BTreeMap::new();
    let mut removes: BTreeSet<&str> = BTreeSet::new();

    for change in requested {
        match change {
            RequestedChange::Install(p) => {
                check_install_version(&mut installs, p)?;
            }
            RequestedChange::Remove(p) => {
                removes.insert(p.identifier.as_str());
            }
            RequestedChange::Upgrade { from, to } => {
                if from.identifier != to.identifier {
                    return Err(ResolveError::InvalidRequest {
                        message: format!(
                            "upgrade from {} to {} changes the identifier; use a replace request",
                            from, to
                        ),
                    });
                }
                check_install_version(&mut installs, to)?;
            }
            RequestedChange::Replace { old, new } => {
                removes.insert(old.identifier.as_str());
                check_install_version(&mut installs, new)?;
            }
        }
    }

    if let Some(id) = installs.keys().find(|id| removes.contains(*id)) {
        return Err(ResolveError::InvalidRequest {
            message: format!("{id} is requested both for install and for removal"),
        });
    }
    Ok(())
}

fn check_install_version<'a>(
    installs: &mut BTreeMap<&'a str, &'a Version>,
    package: &'a Package,
) -> Result<(), ResolveError> {
    match installs.get(package.identifier.as_str()) {
        Some(existing) if **existing != package.version => Err(ResolveError::InvalidRequest {
            message: format!(
                "{} is requested at two different versions ({} and {})",
                package.identifier, existing, package.version
            ),
        }),
        Some(_) => Ok(()),
        None => {
            installs.insert(&package.identifier, &package.version);
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StanzaKind {
    Depends,
    Recommends,
    Suggests,
}

impl StanzaKind {
    /// Optional stanzas are resolved best-effort; failures are skipped
    /// rather than escalated.
    fn is_soft(self) -> bool {
        !matches!(self, Self::Depends)
    }

    fn reason_for(self, parent: &Package) -> SelectionReason {
        match self {
            Self::Depends => SelectionReason::DependencyOf(parent.clone()),
            Self::Recommends => SelectionReason::RecommendedBy(parent.clone()),
            Self::Suggests => SelectionReason::SuggestedBy(parent.clone()),
        }
    }
}

struct Engine<'a, R: RegistryView + ?Sized> {
    registry: &'a R,
    criteria: &'a PlatformCriteria,
    options: ResolverOptions,
    /// Packages selected for install, keyed by identifier.
    selected: BTreeMap<String, Package>,
    /// First-wins selection reason per selected identifier.
    reasons: BTreeMap<String, SelectionReason>,
    change_types: BTreeMap<String, ChangeType>,
    /// Removal changes accumulated in seed/prune order.
    removals: Vec<(Package, SelectionReason)>,
    removed_ids: BTreeSet<String>,
    conflicts: ConflictList,
    saw_version_clash: bool,
    graph: InstallGraph,
    queue: VecDeque<String>,
}

impl<R: RegistryView + ?Sized> Engine<'_, R> {
    fn seed(&mut self, requested: &[RequestedChange]) {
        for change in requested {
            match change {
                RequestedChange::Install(p) => {
                    self.add_selected(
                        p.clone(),
                        SelectionReason::UserRequested,
                        ChangeType::Install,
                    );
                }
                RequestedChange::Remove(p) => {
                    self.add_removal(p.clone(), SelectionReason::UserRequested);
                }
                RequestedChange::Upgrade { from, to } => {
                    self.add_removal(from.clone(), SelectionReason::UserRequested);
                    self.add_selected(
                        to.clone(),
                        SelectionReason::UserRequested,
                        ChangeType::Install,
                    );
                }
                RequestedChange::Replace { old, new } => {
                    self.add_removal(old.clone(), SelectionReason::Replaced(new.clone()));
                    self.add_selected(
                        new.clone(),
                        SelectionReason::UserRequested,
                        ChangeType::Replace,
                    );
                }
            }
        }
    }

    fn add_removal(&mut self, package: Package, reason: SelectionReason) {
        if self.removed_ids.insert(package.identifier.clone()) {
            self.removals.push((package, reason));
        }
    }

    /// Select a package for install. The first selection of an identifier
    /// wins; later ones are ignored.
    fn add_selected(&mut self, package: Package, reason: SelectionReason, change_type: ChangeType) {
        let id = package.identifier.clone();
        if self.selected.contains_key(&id) {
            return;
        }
        tracing::debug!("selecting {} ({})", package, reason);
        self.graph.add_node(&id);
        self.selected.insert(id.clone(), package);
        self.reasons.insert(id.clone(), reason);
        self.change_types.insert(id.clone(), change_type);
        self.queue.push_back(id);
    }

    fn expand_all(&mut self) -> Result<(), ResolveError> {
        while let Some(id) = self.queue.pop_front() {
            if let Some(package) = self.selected.get(&id).cloned() {
                self.expand(&package)?;
            }
        }
        Ok(())
    }

    fn expand(&mut self, package: &Package) -> Result<(), ResolveError> {
        tracing::debug!("resolving relationships for {}", package.identifier);
        self.resolve_stanza(package, &package.depends, StanzaKind::Depends)?;
        if self.options.include_recommends {
            self.resolve_stanza(package, &package.recommends, StanzaKind::Recommends)?;
        }
        if self.options.include_suggests {
            self.resolve_stanza(package, &package.suggests, StanzaKind::Suggests)?;
        }
        Ok(())
    }

    fn resolve_stanza(
        &mut self,
        requester: &Package,
        stanza: &[RelationshipDescriptor],
        kind: StanzaKind,
    ) -> Result<(), ResolveError> {
        let soft = kind.is_soft();
        for descriptor in stanza {
            // Already covered by something we're installing: keep the
            // ordering edge and move on.
            if let Some(satisfier) = self.selected_satisfier(descriptor) {
                if kind == StanzaKind::Depends {
                    self.graph.add_edge(&satisfier, &requester.identifier);
                }
                continue;
            }

            // Covered by installed state that is not being removed.
            if self.installed_satisfier_exists(descriptor) {
                continue;
            }

            // The right identifier is present at the wrong version: an
            // inconsistency, not a candidate search.
            if let RelationshipDescriptor::Named(named) = descriptor {
                if let Some(existing) = self.existing_version_of(&named.identifier) {
                    if soft {
                        tracing::debug!(
                            "optional {} of {} clashes with present version {}; skipping",
                            named,
                            requester.identifier,
                            existing
                        );
                        continue;
                    }
                    self.conflicts.add_pair(
                        &requester.identifier,
                        &named.identifier,
                        format!(
                            "{} requires {}, but incompatible version {} is present",
                            requester, named, existing
                        ),
                    );
                    self.saw_version_clash = true;
                    continue;
                }
            }

            let mut candidates = candidates_for(descriptor, self.registry, self.criteria);
            candidates.retain(|c| !self.removed_ids.contains(&c.identifier));

            let candidate = match candidates.len() {
                0 => {
                    if soft {
                        tracing::debug!(
                            "no installable candidate for optional {} of {}",
                            descriptor,
                            requester.identifier
                        );
                        continue;
                    }
                    return Err(ResolveError::DependencyUnsatisfied {
                        identifier: descriptor.names().join(" OR "),
                        required_by: requester.to_string(),
                    });
                }
                1 => candidates.remove(0),
                _ => {
                    if self.options.allow_ambiguous_provides {
                        candidates.remove(0)
                    } else if soft {
                        tracing::debug!(
                            "optional {} of {} is ambiguous; skipping",
                            descriptor,
                            requester.identifier
                        );
                        continue;
                    } else {
                        return Err(ResolveError::AmbiguousProvides {
                            identifier: descriptor.names().join(" OR "),
                            required_by: requester.to_string(),
                            candidates,
                        });
                    }
                }
            };

            // Check the candidate against everything already fixed. For
            // optional stanzas a conflicting candidate is quietly dropped;
            // for mandatory ones it is kept so the final conflict map
            // shows the full picture, and the consistency gate decides.
            if let Some(objector) = self.fixed_conflict_with(&candidate) {
                if soft {
                    tracing::debug!(
                        "{} would conflict with {}; excluding it from consideration",
                        candidate,
                        objector
                    );
                    continue;
                }
            }

            if kind == StanzaKind::Depends {
                self.graph.add_edge(&candidate.identifier, &requester.identifier);
            }
            self.add_selected(candidate, kind.reason_for(requester), ChangeType::Install);
        }
        Ok(())
    }

    /// A selected package satisfying the descriptor, if any.
    fn selected_satisfier(&self, descriptor: &RelationshipDescriptor) -> Option<String> {
        self.selected
            .values()
            .find(|p| descriptor.satisfied_by(p))
            .map(|p| p.identifier.clone())
    }

    fn installed_satisfier_exists(&self, descriptor: &RelationshipDescriptor) -> bool {
        self.registry.installed_packages().iter().any(|i| {
            !self.removed_ids.contains(i.identifier()) && descriptor.satisfied_by(&i.package)
        })
    }

    /// The version of `identifier` in the selection or surviving installed
    /// state, if present.
    fn existing_version_of(&self, identifier: &str) -> Option<Version> {
        if let Some(p) = self.selected.get(identifier) {
            return Some(p.version.clone());
        }
        if self.removed_ids.contains(identifier) {
            return None;
        }
        self.registry
            .installed_package(identifier)
            .map(|i| i.package.version.clone())
    }

    /// The first fixed package (selected, or installed and surviving) that
    /// conflicts with the candidate in either direction.
    fn fixed_conflict_with(&self, candidate: &Package) -> Option<Package> {
        let fixed = self.selected.values().cloned().chain(
            self.registry
                .installed_packages()
                .iter()
                .filter(|i| {
                    !self.removed_ids.contains(i.identifier())
                        && !self.selected.contains_key(i.identifier())
                })
                .map(|i| i.package.clone()),
        );
        for other in fixed {
            if other.conflicts_with(candidate) || candidate.conflicts_with(&other) {
                return Some(other);
            }
        }
        None
    }

    /// The union of selected packages and surviving installed packages.
    fn final_set(&self) -> Vec<Package> {
        let mut set: Vec<Package> = self.selected.values().cloned().collect();
        for installed in self.registry.installed_packages() {
            let id = installed.identifier();
            if !self.removed_ids.contains(id) && !self.selected.contains_key(id) {
                set.push(installed.package.clone());
            }
        }
        set
    }

    /// Transitively prune auto-installed packages nothing depends on any
    /// more. Mark-and-sweep from the kept roots (selected packages and
    /// user-held installed packages) across depends edges, so mutually
    /// dependent orphans fall together.
    fn prune_orphans(&mut self) {
        let mut roots: Vec<Package> = self.selected.values().cloned().collect();
        let mut candidates: BTreeMap<String, Package> = BTreeMap::new();
        for installed in self.registry.installed_packages() {
            let id = installed.identifier();
            if self.removed_ids.contains(id) || self.selected.contains_key(id) {
                continue;
            }
            if installed.auto_installed {
                candidates.insert(id.to_string(), installed.package.clone());
            } else {
                roots.push(installed.package.clone());
            }
        }

        let mut needed: BTreeSet<String> = BTreeSet::new();
        let mut frontier = roots;
        while let Some(package) = frontier.pop() {
            for dep in &package.depends {
                for (id, candidate) in &candidates {
                    if !needed.contains(id) && dep.satisfied_by(candidate) {
                        needed.insert(id.clone());
                        frontier.push(candidate.clone());
                    }
                }
            }
        }

        for (id, package) in candidates {
            if !needed.contains(&id) {
                tracing::debug!("{} is auto-installed and no longer needed", id);
                self.add_removal(package, SelectionReason::NoLongerNeeded);
            }
        }
    }

    fn finish(mut self) -> Result<Resolution, ResolveError> {
        self.prune_orphans();

        let final_set = self.final_set();

        // Pairwise conflict detection over the whole surviving set.
        let matched = consistency::find_conflicting(&final_set);
        for hit in &matched {
            self.conflicts.add_pair(
                &hit.package.identifier,
                &hit.other.identifier,
                format!(
                    "{} conflicts with {} (via {})",
                    hit.package, hit.other, hit.descriptor
                ),
            );
        }
        let conflict_issues = self.saw_version_clash || !matched.is_empty();

        // Dependencies broken by removals, and platform compatibility of
        // everything newly selected.
        let unmet = consistency::find_unsatisfied_depends(&final_set);
        for u in &unmet {
            self.conflicts.add_single(
                &u.package.identifier,
                format!(
                    "{} requires {}, which is not present after the requested changes",
                    u.package, u.descriptor
                ),
            );
        }
        let mut incompatible = 0usize;
        for package in self.selected.values() {
            if !package.is_compatible(self.criteria) {
                self.conflicts.add_single(
                    &package.identifier,
                    format!("{} is not compatible with the target platform", package),
                );
                incompatible += 1;
            }
        }
        let consistency_issues = !unmet.is_empty() || incompatible > 0;

        // Every entry about a selected package carries its selection-reason
        // chain, so conflict reports explain why each party is present.
        let reasons = &self.reasons;
        self.conflicts
            .annotate_reasons(|id| reason_line(reasons, id));

        self.conflicts.sort();
        if (conflict_issues && !self.options.tolerate_conflicts)
            || (consistency_issues && !self.options.skip_consistency_check)
        {
            return Err(ResolveError::InconsistentSelection {
                conflicts: self.conflicts,
            });
        }

        // Removals first, by identifier; then installs in dependency
        // order with identifier tie-break.
        self.removals
            .sort_by(|a, b| a.0.identifier.cmp(&b.0.identifier));
        let mut changes: Vec<ModChange> = self
            .removals
            .iter()
            .map(|(p, r)| ModChange::new(p.clone(), ChangeType::Remove, r.clone()))
            .collect();

        for id in self.graph.topo_order() {
            if let Some(package) = self.selected.get(&id) {
                let change_type = self
                    .change_types
                    .get(&id)
                    .copied()
                    .unwrap_or(ChangeType::Install);
                let reason = self
                    .reasons
                    .get(&id)
                    .cloned()
                    .unwrap_or(SelectionReason::UserRequested);
                changes.push(ModChange::new(package.clone(), change_type, reason));
            }
        }

        tracing::debug!(
            "resolution complete: {} changes, {} conflict entries",
            changes.len(),
            self.conflicts.len()
        );
        Ok(Resolution {
            changes,
            conflicts: self.conflicts,
            reasons: self.reasons,
        })
    }
}
