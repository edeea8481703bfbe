//! Internal implementation modules for `appnix-core`.
//!
//! Callers should go through the re-exports in the crate root rather than
//! importing these modules directly.

pub mod apps;
pub mod build;
pub mod bundle;
pub mod config;
pub mod effects;
pub mod fs;
pub mod process;
pub mod registry;
pub mod staging;
pub mod toolchain;
pub mod tooling;

#[cfg(test)]
pub(crate) mod test_support;
