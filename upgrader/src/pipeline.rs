//! Upgrade pipeline orchestration.
//!
//! The stages run strictly in order and the first failure aborts the run:
//!
//! 1. check the existing installation directory;
//! 2. derive names and URLs for the selected release;
//! 3. fetch the published digest;
//! 4. download the archive unless an identical copy is already present;
//! 5. decompress and unpack it, applying exclusions;
//! 6. migrate configuration files;
//! 7. finalize permissions, ownership, and links.

use crate::artefact::download::{
    DownloadOutcome, HttpFetcher, LocalArchive, ReleaseFetcher, RemoteArtifact, download_if_needed,
    resolve_expected_digest,
};
use crate::artefact::extraction::{UnpackSummary, decompress, unpack};
use crate::config::{MigrationDirection, UpgradeConfig};
use crate::error::{Result, UpgradeError};
use crate::finalize::{
    LinkOutcome, OwnershipReport, PublishReport, change_owner_recursive, create_link,
    ensure_group_access, publish_link,
};
use crate::migration::{FileCopier, MigrationResult, SyncingCopier, migrate_with};
use crate::output::{Reporter, Verbosity};
use crate::release::{ReleaseUrls, ReleaseVersion};
use std::path::{Path, PathBuf};

/// Names, URLs and paths for one upgrade, computed without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePlan {
    /// Names and URLs of the selected release.
    pub urls: ReleaseUrls,
    /// Where the archive is stored.
    pub archive_path: PathBuf,
    /// Where the new tree is expected to appear.
    pub release_dir: PathBuf,
}

/// Everything a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReport {
    /// The plan that was carried out.
    pub plan: UpgradePlan,
    /// The verified archive.
    pub archive: LocalArchive,
    /// Whether the archive was transferred or reused.
    pub download: DownloadOutcome,
    /// Size and last-modified of the transferred archive; `None` on reuse.
    pub remote: Option<RemoteArtifact>,
    /// The intermediate tar file.
    pub tarball: PathBuf,
    /// What unpacking wrote and skipped.
    pub unpack: UnpackSummary,
    /// The new tree as unpacked.
    pub release_dir: PathBuf,
    /// Migrated configuration files, in order.
    pub migrated: Vec<MigrationResult>,
    /// Ownership changes, when enabled.
    pub ownership: Option<OwnershipReport>,
    /// Outcome of each configured extra link.
    pub links: Vec<LinkOutcome>,
    /// The republished stable link, when configured.
    pub published: Option<PublishReport>,
}

/// Fail unless the existing installation directory is present.
///
/// # Errors
///
/// Returns [`UpgradeError::InstallNotFound`] if it is missing or is not a
/// directory.
pub fn check_install_dir(config: &UpgradeConfig) -> Result<()> {
    if config.install_dir.is_dir() {
        return Ok(());
    }
    Err(UpgradeError::InstallNotFound {
        path: config.install_dir.clone(),
    })
}

/// Compute the plan for upgrading to `version`.
#[must_use]
pub fn plan_upgrade(config: &UpgradeConfig, version: ReleaseVersion) -> UpgradePlan {
    let urls = ReleaseUrls::new(version);
    let work_dir = config.work_dir.as_std_path();
    UpgradePlan {
        archive_path: work_dir.join(urls.archive_filename()),
        release_dir: work_dir.join(urls.release_dir_name()),
        urls,
    }
}

/// Run the upgrade against the live distribution host.
///
/// # Errors
///
/// See [`run_upgrade_with`].
pub fn run_upgrade(
    config: &UpgradeConfig,
    version: ReleaseVersion,
    reporter: &mut Reporter<'_>,
) -> Result<UpgradeReport> {
    let fetcher = HttpFetcher::new(reporter.verbosity() != Verbosity::Quiet);
    run_upgrade_with(config, version, &fetcher, &SyncingCopier, reporter)
}

/// Run the upgrade with injected network and copy implementations.
///
/// # Errors
///
/// Returns the error of the first stage that fails. A release that the
/// host does not publish is reported as [`UpgradeError::ReleaseUnavailable`].
pub fn run_upgrade_with(
    config: &UpgradeConfig,
    version: ReleaseVersion,
    fetcher: &dyn ReleaseFetcher,
    copier: &dyn FileCopier,
    reporter: &mut Reporter<'_>,
) -> Result<UpgradeReport> {
    check_install_dir(config)?;
    let plan = plan_upgrade(config, version);
    let urls = &plan.urls;
    let download_page = urls.download_page();
    reporter.progress(format_args!(
        "Will download Tomcat {version} from URL: {}",
        urls.archive_url()
    ));

    let expected = resolve_expected_digest(fetcher, urls.checksum_url())
        .map_err(|e| UpgradeError::from_download(e, &download_page))?;
    let download = download_if_needed(
        fetcher,
        urls.archive_url(),
        &expected,
        &plan.archive_path,
        reporter,
    )
    .map_err(|e| UpgradeError::from_download(e, &download_page))?;

    let work_dir = config.work_dir.as_std_path();
    reporter.progress("Tarball content extraction");
    let tarball = decompress(&download.archive.path, work_dir)?;
    reporter.progress(format_args!("Tarball {} created", tarball.display()));
    let summary = unpack(&tarball, work_dir, &config.exclusion_set(), reporter)?;
    reporter.progress("Completed tarball content extraction");

    if summary.root_dir != urls.release_dir_name() {
        log::warn!(
            "archive root {} differs from expected {}",
            summary.root_dir,
            urls.release_dir_name()
        );
    }
    let release_dir = work_dir.join(&summary.root_dir);

    let migrated = migrate_configs(config, &release_dir, copier, reporter)?;
    let finalized = finalize(config, &release_dir, &summary.root_dir, reporter)?;

    Ok(UpgradeReport {
        archive: download.archive,
        download: download.outcome,
        remote: download.remote,
        tarball,
        unpack: summary,
        release_dir,
        migrated,
        ownership: finalized.ownership,
        links: finalized.links,
        published: finalized.published,
        plan,
    })
}

fn migrate_configs(
    config: &UpgradeConfig,
    release_dir: &Path,
    copier: &dyn FileCopier,
    reporter: &mut Reporter<'_>,
) -> Result<Vec<MigrationResult>> {
    let release_config = release_dir.join(&config.config_subdir);
    let install_config = config.install_config_dir().into_std_path_buf();
    let (source, destination) = match config.migration.direction {
        MigrationDirection::IntoExisting => (release_config, install_config),
        MigrationDirection::IntoRelease => (install_config, release_config),
    };
    log::debug!(
        "migrating configuration {} -> {}",
        source.display(),
        destination.display()
    );
    Ok(migrate_with(
        &source,
        &destination,
        &config.config_files,
        copier,
        reporter,
    )?)
}

struct Finalized {
    ownership: Option<OwnershipReport>,
    links: Vec<LinkOutcome>,
    published: Option<PublishReport>,
}

fn finalize(
    config: &UpgradeConfig,
    release_dir: &Path,
    release_dir_name: &str,
    reporter: &mut Reporter<'_>,
) -> Result<Finalized> {
    ensure_group_access(&release_dir.join(&config.config_subdir))?;

    let ownership = config.change_owner.then(|| {
        reporter.progress(format_args!(
            "Change ownership of {}/ to user ID {} and group ID {}",
            release_dir.display(),
            config.owner.uid,
            config.owner.gid
        ));
        let report = change_owner_recursive(release_dir, config.owner, reporter);
        if report.failed > 0 {
            reporter.progress(format_args!(
                "{} of {} entries could not be changed",
                report.failed,
                report.changed + report.failed
            ));
        }
        report
    });

    let links = config
        .links
        .iter()
        .map(|spec| {
            let outcome = create_link(release_dir, spec);
            match &outcome {
                LinkOutcome::Created => {
                    reporter.progress(format_args!("Symlink {} → {} done", spec.link, spec.target));
                }
                LinkOutcome::Skipped { reason } => reporter.progress(format_args!(
                    "Symlink {} → {} skipped {reason}",
                    spec.link, spec.target
                )),
            }
            outcome
        })
        .collect();

    let published = match &config.publish_link {
        Some(name) => {
            let report = publish_link(config.work_dir.as_std_path(), name, release_dir_name)?;
            reporter.progress(format_args!(
                "Symlink {} → {release_dir_name} done",
                report.link.display()
            ));
            Some(report)
        }
        None => None,
    };

    Ok(Finalized {
        ownership,
        links,
        published,
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
