use miette::Diagnostic;
use modkit_core::Package;
use thiserror::Error;

use crate::conflict::ConflictList;

/// Typed failures of one resolution run.
///
/// Resolution is all-or-nothing: any of these means no partial change-set
/// was proposed and no state was touched, so a retry with adjusted inputs
/// is always safe.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// A referenced identifier has no corresponding registry entry at all.
    #[error("package not found: {identifier}")]
    #[diagnostic(help("check the identifier against the registry index"))]
    PackageNotFound { identifier: String },

    /// A mandatory depends edge has zero installable candidates.
    #[error("{required_by} depends on {identifier}, which has no installable candidate")]
    #[diagnostic(help(
        "the dependency is not in the index, or no version of it is compatible with the target platform"
    ))]
    DependencyUnsatisfied {
        identifier: String,
        required_by: String,
    },

    /// A mandatory edge has several independent candidates and the caller
    /// asked to be consulted. Re-invoke resolution with the chosen package
    /// added as a user-requested install.
    #[error("{identifier} (required by {required_by}) is satisfiable by {} packages", candidates.len())]
    #[diagnostic(help("re-run with the chosen provider added to the requested installs"))]
    AmbiguousProvides {
        identifier: String,
        required_by: String,
        candidates: Vec<Package>,
    },

    /// The completed selection conflicts with itself or with installed
    /// state. The conflict list reflects the full picture.
    #[error("resolution produced an inconsistent selection:\n{conflicts}")]
    InconsistentSelection { conflicts: ConflictList },

    /// The requested change batch contradicts itself; rejected before any
    /// resolution work.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    #[test]
    fn dependency_unsatisfied_display() {
        let err = ResolveError::DependencyUnsatisfied {
            identifier: "Fuel".to_string(),
            required_by: "ModC 1.0.0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ModC 1.0.0 depends on Fuel, which has no installable candidate"
        );
    }

    #[test]
    fn ambiguous_provides_counts_candidates() {
        let err = ResolveError::AmbiguousProvides {
            identifier: "Fuel".to_string(),
            required_by: "ModC 1.0.0".to_string(),
            candidates: vec![
                Package::new("ModA", Version::parse("1.0.0").unwrap()),
                Package::new("ModB", Version::parse("1.0.0").unwrap()),
            ],
        };
        assert!(err.to_string().contains("satisfiable by 2 packages"));
    }

    #[test]
    fn inconsistent_selection_includes_conflicts() {
        let mut conflicts = ConflictList::new();
        conflicts.add_pair("ModA", "ModB", "ModA 1.0.0 conflicts with ModB 1.0.0");
        let err = ResolveError::InconsistentSelection { conflicts };
        let s = err.to_string();
        assert!(s.contains("inconsistent selection"));
        assert!(s.contains("ModA 1.0.0 conflicts with ModB 1.0.0"));
    }
}
