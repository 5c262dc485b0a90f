//! Release versions and distribution URLs.
//!
//! Every URL is derived from a typed [`ReleaseVersion`]. The distribution
//! host is fixed: release archives and their checksum files are always
//! fetched from the Apache archive, never from a mirror, so the checksum
//! and the archive share one provenance.

use crate::artefact::error::{ArtefactError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical distribution root for Tomcat releases.
pub const DIST_BASE_URL: &str = "https://archive.apache.org/dist/tomcat";

/// File and directory name prefix used by Tomcat release archives.
pub const PRODUCT_PREFIX: &str = "apache-tomcat";

/// Suffix of the companion checksum resource.
pub const CHECKSUM_SUFFIX: &str = ".sha1";

const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// The `major.minor` release line an installation tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductLine {
    /// Major version, e.g. `8`.
    pub major: u32,
    /// Minor version, e.g. `5`.
    pub minor: u32,
}

impl ProductLine {
    /// Select a point release within this line.
    #[must_use]
    pub const fn release(self, patch: u32) -> ReleaseVersion {
        ReleaseVersion {
            major: self.major,
            minor: self.minor,
            patch,
        }
    }
}

impl Default for ProductLine {
    fn default() -> Self {
        Self { major: 8, minor: 5 }
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A fully qualified `major.minor.patch` release.
///
/// # Examples
///
/// ```
/// use tomcat_upgrader::release::ReleaseVersion;
///
/// let version: ReleaseVersion = "8.5.40".parse().unwrap();
/// assert_eq!(version.patch, 40);
/// assert_eq!(version.to_string(), "8.5.40");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch (point) version.
    pub patch: u32,
}

impl ReleaseVersion {
    /// The release line this version belongs to.
    #[must_use]
    pub const fn line(&self) -> ProductLine {
        ProductLine {
            major: self.major,
            minor: self.minor,
        }
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ReleaseVersion {
    type Err = ArtefactError;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = |reason: &str| ArtefactError::InvalidVersion {
            value: value.to_owned(),
            reason: reason.to_owned(),
        };
        let parts: Vec<&str> = value.trim().split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(invalid("expected three dot-separated numbers"));
        };
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| invalid("components must be non-negative integers"))
        };
        Ok(Self {
            major: parse(*major)?,
            minor: parse(*minor)?,
            patch: parse(*patch)?,
        })
    }
}

/// Names and URLs derived from one release version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseUrls {
    version: ReleaseVersion,
    release_dir_name: String,
    archive_filename: String,
    archive_url: String,
    checksum_url: String,
}

impl ReleaseUrls {
    /// Derive every name and URL for `version`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tomcat_upgrader::release::{ReleaseUrls, ReleaseVersion};
    ///
    /// let urls = ReleaseUrls::new(ReleaseVersion { major: 8, minor: 5, patch: 40 });
    /// assert_eq!(urls.archive_filename(), "apache-tomcat-8.5.40.tar.gz");
    /// assert_eq!(
    ///     urls.archive_url(),
    ///     "https://archive.apache.org/dist/tomcat/tomcat-8/v8.5.40/bin/apache-tomcat-8.5.40.tar.gz"
    /// );
    /// assert!(urls.checksum_url().ends_with(".tar.gz.sha1"));
    /// ```
    #[must_use]
    pub fn new(version: ReleaseVersion) -> Self {
        let release_dir_name = format!("{PRODUCT_PREFIX}-{version}");
        let archive_filename = format!("{release_dir_name}{ARCHIVE_EXTENSION}");
        let archive_url = format!(
            "{DIST_BASE_URL}/tomcat-{major}/v{version}/bin/{archive_filename}",
            major = version.major
        );
        let checksum_url = format!("{archive_url}{CHECKSUM_SUFFIX}");
        Self {
            version,
            release_dir_name,
            archive_filename,
            archive_url,
            checksum_url,
        }
    }

    /// The version these names were derived from.
    #[must_use]
    pub fn version(&self) -> ReleaseVersion {
        self.version
    }

    /// Directory name the archive unpacks into (`apache-tomcat-X.Y.Z`).
    #[must_use]
    pub fn release_dir_name(&self) -> &str {
        &self.release_dir_name
    }

    /// Local file name of the downloaded archive.
    #[must_use]
    pub fn archive_filename(&self) -> &str {
        &self.archive_filename
    }

    /// Remote URL of the release archive.
    #[must_use]
    pub fn archive_url(&self) -> &str {
        &self.archive_url
    }

    /// Remote URL of the companion SHA-1 checksum file.
    #[must_use]
    pub fn checksum_url(&self) -> &str {
        &self.checksum_url
    }

    /// Human-facing download page listing current releases of this line.
    #[must_use]
    pub fn download_page(&self) -> String {
        format!("https://tomcat.apache.org/download-{}0.cgi", self.version.major)
    }
}
