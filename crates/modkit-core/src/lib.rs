//! Core data types for the modkit mod manager.
//!
//! This crate defines the fundamental types the resolver operates on:
//! packages and their declared relationships, platform-version criteria,
//! and the read-only registry interface with an in-memory snapshot
//! implementation.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod package;
pub mod platform;
pub mod registry;
pub mod relationship;

pub use package::{InstalledPackage, Package};
pub use platform::PlatformCriteria;
pub use registry::{RegistrySnapshot, RegistryView};
pub use relationship::{DescriptorError, NamedRelationship, RelationshipDescriptor};
