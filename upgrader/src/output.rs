//! Progress output for the upgrade CLI.
//!
//! Progress lines are plain, human-readable text written to stderr. They are
//! not a machine-readable contract. Diagnostics that belong in a log go
//! through the `log` facade instead.

use crate::config::UpgradeConfig;
use crate::release::ReleaseUrls;
use indicatif::HumanBytes;
use std::fmt;
use std::io::Write;

/// How much progress output the operator asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// No progress output; errors are still reported.
    Quiet,
    /// One line per pipeline stage.
    #[default]
    Normal,
    /// Additionally one line per archive entry and ownership change.
    Verbose,
}

impl Verbosity {
    /// Derive the verbosity from the `--quiet` and `--verbose` flags.
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, true) => Self::Verbose,
            (false, false) => Self::Normal,
        }
    }
}

/// Writes progress lines according to a [`Verbosity`].
///
/// # Examples
///
/// ```
/// use tomcat_upgrader::output::{Reporter, Verbosity};
///
/// let mut buffer = Vec::new();
/// let mut reporter = Reporter::new(&mut buffer, Verbosity::Normal);
/// reporter.progress("Download complete");
/// reporter.detail("1. apache-tomcat-8.5.40/");
/// assert_eq!(String::from_utf8(buffer).unwrap(), "Download complete\n");
/// ```
pub struct Reporter<'a> {
    out: &'a mut dyn Write,
    verbosity: Verbosity,
}

impl<'a> Reporter<'a> {
    /// Create a reporter writing to `out`.
    pub fn new(out: &'a mut dyn Write, verbosity: Verbosity) -> Self {
        Self { out, verbosity }
    }

    /// The verbosity this reporter was created with.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Return true when detail lines are written.
    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Write a stage-level progress line unless quiet.
    pub fn progress(&mut self, message: impl fmt::Display) {
        if self.verbosity != Verbosity::Quiet {
            write_stderr_line(self.out, message);
        }
    }

    /// Write a per-item line in verbose mode only.
    pub fn detail(&mut self, message: impl fmt::Display) {
        if self.is_verbose() {
            write_stderr_line(self.out, message);
        }
    }
}

/// Write one line, ignoring write failures on the progress stream.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Format the line announcing a transfer, as reported by the metadata probe.
///
/// # Examples
///
/// ```
/// use tomcat_upgrader::output::download_announcement;
///
/// let line = download_announcement("apache-tomcat-8.5.40.tar.gz", None, None);
/// assert_eq!(line, "Downloading file: apache-tomcat-8.5.40.tar.gz");
/// ```
#[must_use]
pub fn download_announcement(
    filename: &str,
    content_length: Option<u64>,
    last_modified: Option<&str>,
) -> String {
    let mut line = format!("Downloading file: {filename}");
    if let Some(bytes) = content_length {
        line.push_str(&format!(", {}", HumanBytes(bytes)));
    }
    if let Some(modified) = last_modified {
        line.push_str(&format!(", {modified}"));
    }
    line
}

/// What a `--dry-run` invocation would do.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Effective configuration.
    pub config: &'a UpgradeConfig,
    /// Names and URLs of the selected release.
    pub urls: &'a ReleaseUrls,
}

impl DryRunInfo<'_> {
    /// Format the plan for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Release: Tomcat {}", self.urls.version()),
            format!("Archive URL: {}", self.urls.archive_url()),
            format!("Checksum URL: {}", self.urls.checksum_url()),
            format!("Work directory: {}", display_dir(config.work_dir.as_str())),
            format!("New installation: {}", self.urls.release_dir_name()),
            format!("Existing installation: {}", config.install_dir),
            format!("Migration direction: {}", config.migration.direction),
        ];

        lines.push(String::new());
        lines.push("Configuration files to migrate:".to_owned());
        for name in &config.config_files {
            lines.push(format!("  - {}/{name}", config.config_subdir));
        }

        lines.push(String::new());
        lines.push("Excluded from extraction:".to_owned());
        for key in &config.exclusions {
            lines.push(format!("  - {key}"));
        }

        lines.push(String::new());
        if config.change_owner {
            lines.push(format!(
                "Ownership: uid {} gid {}",
                config.owner.uid, config.owner.gid
            ));
        } else {
            lines.push("Ownership: unchanged".to_owned());
        }
        if let Some(link) = &config.publish_link {
            lines.push(format!("Publish link: {link} -> {}", self.urls.release_dir_name()));
        }

        lines.join("\n")
    }
}

fn display_dir(dir: &str) -> &str {
    if dir.is_empty() { "." } else { dir }
}
