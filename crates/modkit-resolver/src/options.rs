use serde::{Deserialize, Serialize};

/// Behavioral toggles for one resolution run.
///
/// Every toggle is an explicit named field and `Default` turns them all
/// off; there are no hidden defaults that change behavior silently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Pull in non-mandatory recommend edges (and the recommendations of
    /// whatever they pull in).
    pub include_recommends: bool,
    /// Pull in suggest edges.
    pub include_suggests: bool,
    /// When a mandatory relationship has several independent candidates,
    /// pick deterministically by the tie-break order instead of returning
    /// an ambiguity error for the caller to disambiguate.
    pub allow_ambiguous_provides: bool,
    /// Complete resolution despite detected conflicts. The conflict list is
    /// returned for the caller to act on; the proposed change-set is not
    /// installable as-is.
    pub tolerate_conflicts: bool,
    /// Complete resolution despite platform-incompatible selections or
    /// dependencies left unsatisfied by requested removals.
    pub skip_consistency_check: bool,
}

impl ResolverOptions {
    /// The options an interactive front end typically starts from:
    /// recommendations included, everything else strict.
    pub fn standard() -> Self {
        Self {
            include_recommends: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_off() {
        let opts = ResolverOptions::default();
        assert!(!opts.include_recommends);
        assert!(!opts.include_suggests);
        assert!(!opts.allow_ambiguous_provides);
        assert!(!opts.tolerate_conflicts);
        assert!(!opts.skip_consistency_check);
    }

    #[test]
    fn standard_includes_recommends_only() {
        let opts = ResolverOptions::standard();
        assert!(opts.include_recommends);
        assert!(!opts.include_suggests);
        assert!(!opts.tolerate_conflicts);
    }
}
