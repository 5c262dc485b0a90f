//! Post-migration steps: permissions, ownership, and links.
//!
//! These run only after the release has been verified, unpacked and its
//! configuration migrated. Ownership changes and extra links are best
//! effort: failures are reported and counted but do not stop the run.
//! Publishing the stable link is the last step and is fatal on failure.

use crate::config::{LinkSpec, Ownership};
use crate::output::Reporter;
use std::fs::{self, Permissions};
use std::io;
use std::os::unix::fs::{PermissionsExt, lchown, symlink};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Group read, write and execute bits.
const GROUP_RWX: u32 = 0o070;

/// Errors from the fatal finalization steps.
#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    /// Group access could not be granted on a directory.
    #[error("failed to update permissions on {}: {source}", .path.display())]
    Permissions {
        /// The directory being updated.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The stable link could not be republished.
    #[error("failed to publish {} -> {target}: {source}", .link.display())]
    Publish {
        /// The link path.
        link: PathBuf,
        /// The release directory name it should point at.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Counts from [`change_owner_recursive`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnershipReport {
    /// Entries whose owner was changed.
    pub changed: usize,
    /// Entries that could not be changed.
    pub failed: usize,
}

/// Outcome of one [`create_link`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The link was created.
    Created,
    /// The link was not created.
    Skipped {
        /// Why not.
        reason: String,
    },
}

/// What [`publish_link`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// The stable link.
    pub link: PathBuf,
    /// Where a previous link was moved, if one existed.
    pub backup: Option<PathBuf>,
}

/// Add group read, write and execute to `dir`, keeping other bits.
///
/// # Errors
///
/// Returns [`FinalizeError::Permissions`] if the mode cannot be read or set.
pub fn ensure_group_access(dir: &Path) -> Result<(), FinalizeError> {
    let wrap = |source| FinalizeError::Permissions {
        path: dir.to_path_buf(),
        source,
    };
    let mode = fs::metadata(dir).map_err(wrap)?.permissions().mode();
    fs::set_permissions(dir, Permissions::from_mode(mode | GROUP_RWX)).map_err(wrap)?;
    log::debug!("{}: mode {:o}", dir.display(), (mode | GROUP_RWX) & 0o7777);
    Ok(())
}

/// Change the owner of `root` and everything below it.
///
/// Symbolic links are changed themselves, never followed. Entries that
/// cannot be changed are logged and counted.
pub fn change_owner_recursive(
    root: &Path,
    owner: Ownership,
    reporter: &mut Reporter<'_>,
) -> OwnershipReport {
    let mut report = OwnershipReport::default();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("cannot visit entry below {}: {e}", root.display());
                report.failed += 1;
                continue;
            }
        };
        match lchown(entry.path(), Some(owner.uid), Some(owner.gid)) {
            Ok(()) => {
                report.changed += 1;
                reporter.detail(format_args!(
                    "{}:{} {}",
                    owner.uid,
                    owner.gid,
                    entry.path().display()
                ));
            }
            Err(e) => {
                log::warn!("chown {} failed: {e}", entry.path().display());
                report.failed += 1;
            }
        }
    }
    report
}

/// Create the link described by `spec` inside `release_root`.
///
/// Missing parent directories are not created, and an existing entry at the
/// link path is left alone; both are reported as skipped.
pub fn create_link(release_root: &Path, spec: &LinkSpec) -> LinkOutcome {
    let link = release_root.join(&spec.link);
    let skipped = |reason: String| {
        log::warn!("link {} skipped: {reason}", link.display());
        LinkOutcome::Skipped { reason }
    };
    if fs::symlink_metadata(&link).is_ok() {
        return skipped("path already exists".to_owned());
    }
    match symlink(spec.target.as_std_path(), &link) {
        Ok(()) => {
            log::debug!("linked {} -> {}", link.display(), spec.target);
            LinkOutcome::Created
        }
        Err(e) => skipped(e.to_string()),
    }
}

/// Point `work_dir/name` at `release_dir_name`.
///
/// An existing entry called `name` is first renamed to `name~`, replacing
/// an earlier backup only when that backup is a link or a plain file. A
/// directory at `name~` is never removed; the entry goes to the first free
/// `name~N` instead. The new link is relative, so the work directory can be
/// moved as a whole.
///
/// # Errors
///
/// Returns [`FinalizeError::Publish`] if the rename or the link creation
/// fails.
pub fn publish_link(
    work_dir: &Path,
    name: &str,
    release_dir_name: &str,
) -> Result<PublishReport, FinalizeError> {
    let link = work_dir.join(name);
    let wrap = |source| FinalizeError::Publish {
        link: link.clone(),
        target: release_dir_name.to_owned(),
        source,
    };

    let backup = if fs::symlink_metadata(&link).is_ok() {
        let backup = free_backup_path(work_dir, name).map_err(wrap)?;
        fs::rename(&link, &backup).map_err(wrap)?;
        log::debug!("moved {} to {}", link.display(), backup.display());
        Some(backup)
    } else {
        None
    };

    symlink(release_dir_name, &link).map_err(wrap)?;
    Ok(PublishReport { link, backup })
}

/// Choose where the current entry goes.
///
/// A link or file at `name~` is removed so the rename can replace it. A
/// directory there is kept, and the first unused `name~N` is returned.
fn free_backup_path(work_dir: &Path, name: &str) -> io::Result<PathBuf> {
    let backup = work_dir.join(format!("{name}~"));
    match fs::symlink_metadata(&backup) {
        Ok(meta) if meta.is_dir() => {
            log::warn!(
                "{} is a directory; keeping it and choosing another backup name",
                backup.display()
            );
        }
        Ok(_) => {
            fs::remove_file(&backup)?;
            return Ok(backup);
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(backup),
        Err(e) => return Err(e),
    }
    for n in 1.. {
        let candidate = work_dir.join(format!("{name}~{n}"));
        match fs::symlink_metadata(&candidate) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(candidate),
            Err(e) => return Err(e),
            Ok(_) => {}
        }
    }
    Err(io::Error::other("no free backup name"))
}
