//! CLI argument definitions for the Tomcat upgrader.
//!
//! Kept apart from the entrypoint so the flags can be parsed and tested
//! without running an upgrade.

use crate::artefact::error::ArtefactError;
use crate::config::ConfigOverrides;
use crate::output::Verbosity;
use crate::release::{ProductLine, ReleaseVersion};
use camino::Utf8PathBuf;
use clap::Parser;
use std::str::FromStr;

/// Upgrade an Apache Tomcat installation in place.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tomcat-upgrader")]
#[command(version, about)]
#[command(long_about = concat!(
    "Upgrade an Apache Tomcat installation in place.\n\n",
    "Downloads a release archive from the Apache archive, verifies it against the ",
    "published SHA-1 checksum, unpacks it next to the existing installation, and ",
    "migrates the configuration files between the two trees. The new tree is then ",
    "given group access and ownership, and the stable link is pointed at it.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Upgrade the default installation to 8.5.40:\n",
    "    $ tomcat-upgrader --ver 40\n\n",
    "  Preview an upgrade of another installation:\n",
    "    $ tomcat-upgrader --dir /srv/tomcat8 --ver 8.5.41 --dry-run\n\n",
    "  Log failures with timestamps and a non-zero exit status:\n",
    "    $ tomcat-upgrader --log --quiet --ver 40",
))]
pub struct Cli {
    /// Path to the existing Tomcat installation [default: /opt/tomcat8].
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<Utf8PathBuf>,

    /// Release to download: a patch number within the configured line, or a
    /// full `major.minor.patch` version. Prompted for when omitted.
    #[arg(long, value_name = "VERSION")]
    pub ver: Option<VersionArg>,

    /// Log errors with timestamps and exit with status 1 on failure.
    #[arg(long)]
    pub log: bool,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Detail each file, directory, and ownership change.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Configuration file [default: <config dir>/tomcat-upgrader/config.toml].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Directory receiving the archive and the new tree [default: current].
    #[arg(short, long, value_name = "DIR")]
    pub work_dir: Option<Utf8PathBuf>,

    /// Leave ownership of the new tree unchanged.
    #[arg(long)]
    pub no_chown: bool,

    /// Show what would be done and exit without downloading.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Progress verbosity selected by `--quiet` and `--verbose`.
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }

    /// Configuration values given on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            install_dir: self.dir.clone(),
            work_dir: self.work_dir.clone(),
            no_chown: self.no_chown,
        }
    }
}

/// The `--ver` argument.
///
/// # Examples
///
/// ```
/// use tomcat_upgrader::cli::VersionArg;
/// use tomcat_upgrader::release::ProductLine;
///
/// let patch: VersionArg = "40".parse().unwrap();
/// assert_eq!(patch.resolve(ProductLine::default()).to_string(), "8.5.40");
///
/// let full: VersionArg = "9.0.1".parse().unwrap();
/// assert_eq!(full.resolve(ProductLine::default()).to_string(), "9.0.1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionArg {
    /// A patch number within the configured product line.
    Patch(u32),
    /// A fully qualified release.
    Full(ReleaseVersion),
}

impl VersionArg {
    /// The release this argument selects within `line`.
    #[must_use]
    pub const fn resolve(self, line: ProductLine) -> ReleaseVersion {
        match self {
            Self::Patch(patch) => line.release(patch),
            Self::Full(version) => version,
        }
    }
}

impl FromStr for VersionArg {
    type Err = ArtefactError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.contains('.') {
            return trimmed.parse().map(Self::Full);
        }
        trimmed
            .parse()
            .map(Self::Patch)
            .map_err(|_| ArtefactError::InvalidVersion {
                value: value.to_owned(),
                reason: "expected a patch number or major.minor.patch".to_owned(),
            })
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
