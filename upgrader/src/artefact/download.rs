//! Checksum-gated release download.
//!
//! HTTP access sits behind the [`ReleaseFetcher`] trait so the pipeline can
//! be driven by mocks. The production [`HttpFetcher`] uses a shared `ureq`
//! agent and streams archive bodies straight to disk.
//!
//! A transfer only counts as complete once the digest recomputed from the
//! written file equals the published digest.

use super::checksum::digest_file;
use super::sha1_digest::Sha1Digest;
use crate::output::{Reporter, download_announcement};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use ureq::http::header::{CONTENT_LENGTH, HeaderMap, HeaderName, LAST_MODIFIED};

/// Connect timeout for distribution requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for the server to start responding to a request.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Metadata reported by the probe request, before any body is transferred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// Advertised body length in bytes.
    pub content_length: Option<u64>,
    /// Raw `Last-Modified` header value.
    pub last_modified: Option<String>,
}

/// A remote release archive resolved for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifact {
    /// Archive URL.
    pub url: String,
    /// Digest published in the companion checksum file.
    pub expected_digest: Sha1Digest,
    /// Metadata from the probe request.
    pub metadata: RemoteMetadata,
}

/// A verified archive on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArchive {
    /// Location of the archive.
    pub path: PathBuf,
    /// Digest recomputed from the file on disk.
    pub digest: Sha1Digest,
}

/// How the local archive came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// An identical archive was already present; nothing was transferred.
    Reused,
    /// The archive was transferred.
    Downloaded {
        /// Bytes written to disk.
        bytes: u64,
    },
}

/// Result of [`download_if_needed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    /// The verified archive.
    pub archive: LocalArchive,
    /// Whether a transfer took place.
    pub outcome: DownloadOutcome,
    /// The transferred artefact with its probe metadata; `None` on reuse.
    pub remote: Option<RemoteArtifact>,
}

/// Errors arising from release transfers.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The server answered with a non-success status.
    #[error("{status} returned for {url}")]
    HttpStatus {
        /// The URL that was requested.
        url: String,
        /// Status code and reason phrase, e.g. `404 Not Found`.
        status: String,
    },

    /// The request could not be completed.
    #[error("request to {url} failed: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The checksum resource did not contain a usable SHA-1 digest.
    #[error("checksum file at {url} is malformed: {reason}")]
    MalformedChecksum {
        /// The checksum URL.
        url: String,
        /// Description of what was wrong with the body.
        reason: String,
    },

    /// The transferred file does not hash to the published digest.
    #[error(
        "the download failed as the checksum of {} does not match the expected checksum\nExpected: {expected}\n  Actual: {actual}",
        .path.display()
    )]
    ChecksumMismatch {
        /// The downloaded file.
        path: PathBuf,
        /// Digest from the checksum resource.
        expected: Sha1Digest,
        /// Digest recomputed from the file.
        actual: Sha1Digest,
    },

    /// I/O error reading the response or writing the file.
    #[error("I/O error during transfer: {0}")]
    Io(#[from] io::Error),
}

/// Network access needed by the download stage.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseFetcher {
    /// Issue a metadata-only request for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::HttpStatus`] for non-success statuses and
    /// [`DownloadError::Http`] when the request cannot be made.
    fn probe(&self, url: &str) -> Result<RemoteMetadata, DownloadError>;

    /// Fetch `url` and return the body as text.
    ///
    /// # Errors
    ///
    /// As for [`ReleaseFetcher::probe`], plus body read failures.
    fn fetch_text(&self, url: &str) -> Result<String, DownloadError>;

    /// Stream the body of `url` into a new file at `dest`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// As for [`ReleaseFetcher::probe`], plus [`DownloadError::Io`] when the
    /// body cannot be read or the file cannot be written.
    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, DownloadError>;
}

/// HTTP implementation of [`ReleaseFetcher`] using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher {
    show_progress: bool,
}

impl HttpFetcher {
    /// Create a fetcher; `show_progress` draws a transfer bar on stderr.
    #[must_use]
    pub const fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }

    fn progress_bar(&self, length: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let Some(length) = length else {
            return ProgressBar::new_spinner();
        };
        let bar = ProgressBar::new(length);
        if let Ok(style) = ProgressStyle::with_template(
            "{bytes}/{total_bytes} [{bar:40}] {bytes_per_sec}, {eta} remaining",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}

impl ReleaseFetcher for HttpFetcher {
    fn probe(&self, url: &str) -> Result<RemoteMetadata, DownloadError> {
        let response = http_agent()
            .head(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        ensure_success(url, response.status())?;
        Ok(metadata_from_headers(response.headers()))
    }

    fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        ensure_success(url, response.status())?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| map_ureq_error(url, &e))
    }

    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        ensure_success(url, response.status())?;
        let length = metadata_from_headers(response.headers()).content_length;

        let bar = self.progress_bar(length);
        let mut reader = bar.wrap_read(response.into_body().into_reader());
        let mut writer = BufWriter::new(File::create(dest)?);
        let written = io::copy(&mut reader, &mut writer);
        bar.finish_and_clear();
        let written = written?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(written)
    }
}

/// Shared `ureq` agent.
///
/// Status codes are checked by [`ensure_success`] so the reason phrase can
/// be reported; `ureq` is told not to turn them into errors itself.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .timeout_recv_response(Some(RESPONSE_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

fn ensure_success(url: &str, status: ureq::http::StatusCode) -> Result<(), DownloadError> {
    if status.is_success() {
        return Ok(());
    }
    Err(DownloadError::HttpStatus {
        url: url.to_owned(),
        status: status.to_string(),
    })
}

fn metadata_from_headers(headers: &HeaderMap) -> RemoteMetadata {
    let header_text = |name: &HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    RemoteMetadata {
        content_length: header_text(&CONTENT_LENGTH).and_then(|v| v.trim().parse().ok()),
        last_modified: header_text(&LAST_MODIFIED),
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    DownloadError::Http {
        url: url.to_owned(),
        reason: err.to_string(),
    }
}

/// Extract the digest from a checksum file body.
///
/// The body is cut at the first `*` and trimmed, which covers the
/// `"<hex> *<file>"` convention. Anything after the first whitespace is also
/// dropped, which covers `"<hex>  <file>"`. The result is lowercased before
/// validation.
///
/// # Errors
///
/// Returns [`DownloadError::MalformedChecksum`] if no valid SHA-1 digest
/// remains.
///
/// # Examples
///
/// ```
/// use tomcat_upgrader::artefact::download::parse_checksum_body;
///
/// let body = "  0123456789abcdef0123456789abcdef01234567 *apache-tomcat-8.5.40.tar.gz\n";
/// let digest = parse_checksum_body("https://example.test/a.sha1", body).unwrap();
/// assert_eq!(digest.as_str(), "0123456789abcdef0123456789abcdef01234567");
/// ```
pub fn parse_checksum_body(url: &str, body: &str) -> Result<Sha1Digest, DownloadError> {
    let before_marker = body.split('*').next().unwrap_or_default().trim();
    let token = before_marker
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    Sha1Digest::try_from(token).map_err(|e| DownloadError::MalformedChecksum {
        url: url.to_owned(),
        reason: e.to_string(),
    })
}

/// Fetch and parse the digest published at `checksum_url`.
///
/// # Errors
///
/// Returns any transfer error, or [`DownloadError::MalformedChecksum`].
pub fn resolve_expected_digest(
    fetcher: &dyn ReleaseFetcher,
    checksum_url: &str,
) -> Result<Sha1Digest, DownloadError> {
    let body = fetcher.fetch_text(checksum_url)?;
    let digest = parse_checksum_body(checksum_url, &body)?;
    log::debug!("published digest for {checksum_url}: {digest}");
    Ok(digest)
}

/// Download `url` to `dest` and verify it against `expected`.
///
/// Probes the URL first and reports size and last-modified, then streams
/// the body to disk, then recomputes the digest from the written file.
///
/// # Errors
///
/// Returns a transfer error for non-success statuses or failed requests,
/// [`DownloadError::Io`] if the file cannot be written, and
/// [`DownloadError::ChecksumMismatch`] if the written file does not hash to
/// `expected`.
pub fn fetch(
    fetcher: &dyn ReleaseFetcher,
    url: &str,
    expected: &Sha1Digest,
    dest: &Path,
    reporter: &mut Reporter<'_>,
) -> Result<(RemoteArtifact, LocalArchive, u64), DownloadError> {
    let metadata = fetcher.probe(url)?;
    let filename = dest
        .file_name()
        .map_or_else(|| dest.display().to_string(), |n| n.to_string_lossy().into_owned());
    reporter.progress(download_announcement(
        &filename,
        metadata.content_length,
        metadata.last_modified.as_deref(),
    ));

    let bytes = fetcher.fetch_to_file(url, dest)?;
    log::debug!("wrote {bytes} bytes from {url} to {}", dest.display());

    let actual = digest_file(dest)?;
    if !actual.matches(expected) {
        return Err(DownloadError::ChecksumMismatch {
            path: dest.to_path_buf(),
            expected: expected.clone(),
            actual,
        });
    }
    reporter.progress("Download complete");

    let artifact = RemoteArtifact {
        url: url.to_owned(),
        expected_digest: expected.clone(),
        metadata,
    };
    let archive = LocalArchive {
        path: dest.to_path_buf(),
        digest: actual,
    };
    Ok((artifact, archive, bytes))
}

/// Reuse `dest` if it already hashes to `expected`, otherwise [`fetch`] it.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] if an existing file cannot be read, and any
/// error from [`fetch`].
pub fn download_if_needed(
    fetcher: &dyn ReleaseFetcher,
    url: &str,
    expected: &Sha1Digest,
    dest: &Path,
    reporter: &mut Reporter<'_>,
) -> Result<DownloadReport, DownloadError> {
    if dest.is_file() {
        let existing = digest_file(dest)?;
        if existing.matches(expected) {
            log::debug!("{} already matches {expected}", dest.display());
            reporter.progress(format!("{} skipped file exists", dest.display()));
            return Ok(DownloadReport {
                archive: LocalArchive {
                    path: dest.to_path_buf(),
                    digest: existing,
                },
                outcome: DownloadOutcome::Reused,
                remote: None,
            });
        }
        log::debug!(
            "{} hashes to {existing}, expected {expected}; downloading again",
            dest.display()
        );
    }

    let (remote, archive, bytes) = fetch(fetcher, url, expected, dest, reporter)?;
    Ok(DownloadReport {
        archive,
        outcome: DownloadOutcome::Downloaded { bytes },
        remote: Some(remote),
    })
}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
