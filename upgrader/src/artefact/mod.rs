//! Release artefacts: digests, downloads, and archive extraction.
//!
//! # Sub-modules
//!
//! - [`checksum`] - SHA-1 computation over readers, files, and buffers.
//! - [`download`] - Checksum-gated transfer behind the `ReleaseFetcher` trait.
//! - [`error`] - Validation errors for versions and digests.
//! - [`exclusion`] - Exclusion keys for archive entries.
//! - [`extraction`] - Gzip decompression and tar unpacking.
//! - [`sha1_digest`] - SHA-1 digest newtype (`Sha1Digest`).

pub mod checksum;
pub mod download;
pub mod error;
pub mod exclusion;
pub mod extraction;
pub mod sha1_digest;
