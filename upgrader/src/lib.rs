//! Tomcat upgrader library.
//!
//! This crate downloads an Apache Tomcat release, verifies it against the
//! published SHA-1 checksum, unpacks it next to the existing installation,
//! and migrates configuration files between the two trees with a checksum
//! on every copy. It backs the `tomcat-upgrader` binary and can be driven
//! programmatically with injected network and copy implementations.
//!
//! # Modules
//!
//! - [`artefact`] - Digests, checksum-gated downloads, and archive extraction
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Layered configuration (defaults, TOML file, CLI overrides)
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Top-level error type for an upgrade run
//! - [`finalize`] - Permissions, ownership, and link publication
//! - [`logging`] - Logger initialisation and the failure policy
//! - [`migration`] - Checksummed configuration file migration
//! - [`output`] - Progress output and dry-run formatting
//! - [`pipeline`] - Upgrade pipeline orchestration
//! - [`prompt`] - Interactive release selection
//! - [`release`] - Release versions and distribution URLs

#[cfg(not(unix))]
compile_error!("tomcat-upgrader manages Unix permissions, ownership, and symlinks");

pub mod artefact;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod finalize;
pub mod logging;
pub mod migration;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod release;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
