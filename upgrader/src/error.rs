//! Error types for the upgrade run.
//!
//! Every stage error is wrapped by [`UpgradeError`]. Only `main` decides
//! how a failure is reported and which exit status it produces.

use crate::artefact::download::DownloadError;
use crate::artefact::extraction::ExtractionError;
use crate::config::ConfigError;
use crate::finalize::FinalizeError;
use crate::migration::MigrationError;
use crate::prompt::PromptError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that stop an upgrade run.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// The existing installation directory is missing.
    #[error("Cannot continue as the Tomcat directory {path} does not exist")]
    InstallNotFound {
        /// The configured installation directory.
        path: Utf8PathBuf,
    },

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The version could not be read from the operator.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The selected release is not published at the canonical host.
    #[error("{status} returned for {url}\nMaybe check {download_page} for the current version?")]
    ReleaseUnavailable {
        /// Status code and reason phrase.
        status: String,
        /// The URL that was requested.
        url: String,
        /// Human-facing page listing current releases.
        download_page: String,
    },

    /// Downloading or verifying the release failed.
    #[error(transparent)]
    Download(DownloadError),

    /// Decompressing or unpacking the release failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Migrating configuration files failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// A fatal finalization step failed.
    #[error(transparent)]
    Finalize(#[from] FinalizeError),
}

/// Result type alias using [`UpgradeError`].
pub type Result<T> = std::result::Result<T, UpgradeError>;

impl UpgradeError {
    /// Wrap a download error, attaching the download page to status
    /// failures.
    #[must_use]
    pub fn from_download(err: DownloadError, download_page: &str) -> Self {
        match err {
            DownloadError::HttpStatus { url, status } => Self::ReleaseUnavailable {
                status,
                url,
                download_page: download_page.to_owned(),
            },
            other => Self::Download(other),
        }
    }
}
