//! Relationship resolution engine for modkit.
//!
//! Expands a set of user-requested changes into a complete, ordered,
//! internally-consistent change-set, or a typed failure. Pure and
//! synchronous: no I/O, no mutation of registry state.

pub mod candidates;
pub mod change;
pub mod conflict;
pub mod consistency;
pub mod error;
pub mod graph;
pub mod options;
pub mod resolver;

pub use change::{ChangeType, ModChange, RequestedChange, SelectionReason};
pub use conflict::{ConflictEntry, ConflictList};
pub use error::ResolveError;
pub use options::ResolverOptions;
pub use resolver::{
    install_request, remove_request, resolve, upgrade_request, Resolution,
};
