//! Checksummed migration of configuration files.
//!
//! Each named file is digested at the source, copied over the destination,
//! flushed to stable storage, and digested again. A file counts as migrated
//! only when both digests agree. The first failure stops the run; files
//! migrated before it stay in place.

use crate::artefact::checksum::digest_file;
use crate::artefact::sha1_digest::Sha1Digest;
use crate::output::Reporter;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Errors arising from configuration migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The source is missing or is not a regular file.
    #[error("{} is not a regular file", .path.display())]
    NotRegularFile {
        /// The offending source path.
        path: PathBuf,
    },

    /// The destination does not hash to the source digest after copying.
    #[error(
        "{} did not copy correctly to {}\nExpected: {expected}\n  Actual: {actual}",
        .source_path.display(),
        .destination.display()
    )]
    Integrity {
        /// File that was copied.
        source_path: PathBuf,
        /// File that was written.
        destination: PathBuf,
        /// Digest of the source.
        expected: Sha1Digest,
        /// Digest of the destination after the copy.
        actual: Sha1Digest,
    },

    /// An I/O operation on `path` failed.
    #[error("failed to migrate {}: {source}", .path.display())]
    Io {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// One successfully migrated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    /// The file that was read.
    pub source: PathBuf,
    /// The file that was written.
    pub destination: PathBuf,
    /// Digest shared by source and destination.
    pub digest: Sha1Digest,
    /// Bytes written to the destination.
    pub bytes: u64,
}

/// Copies one file's content over another.
#[cfg_attr(test, mockall::automock)]
pub trait FileCopier {
    /// Replace the content of `destination` with that of `source`.
    ///
    /// Returns the number of bytes written. Implementations must not return
    /// until the data has been flushed.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from reading, writing, or flushing.
    fn copy(&self, source: &Path, destination: &Path) -> io::Result<u64>;
}

/// [`FileCopier`] that truncates the destination, streams the source into
/// it, and calls `sync_all` before returning.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncingCopier;

impl FileCopier for SyncingCopier {
    fn copy(&self, source: &Path, destination: &Path) -> io::Result<u64> {
        let mut reader = BufReader::new(File::open(source)?);
        let mut writer = File::create(destination)?;
        let bytes = io::copy(&mut reader, &mut writer)?;
        writer.sync_all()?;
        Ok(bytes)
    }
}

/// Migrate `file_names` from `source_dir` into `destination_dir`.
///
/// # Errors
///
/// See [`migrate_with`].
pub fn migrate(
    source_dir: &Path,
    destination_dir: &Path,
    file_names: &[String],
    reporter: &mut Reporter<'_>,
) -> Result<Vec<MigrationResult>, MigrationError> {
    migrate_with(source_dir, destination_dir, file_names, &SyncingCopier, reporter)
}

/// Migrate `file_names` in order using `copier` for the copy step.
///
/// # Errors
///
/// Returns [`MigrationError::NotRegularFile`] when a source is missing or
/// not a regular file, [`MigrationError::Integrity`] when the destination
/// digest differs from the source digest, and [`MigrationError::Io`] for
/// other I/O failures. Processing stops at the first error.
pub fn migrate_with(
    source_dir: &Path,
    destination_dir: &Path,
    file_names: &[String],
    copier: &dyn FileCopier,
    reporter: &mut Reporter<'_>,
) -> Result<Vec<MigrationResult>, MigrationError> {
    let mut results = Vec::with_capacity(file_names.len());
    for name in file_names {
        let source = source_dir.join(name);
        let destination = destination_dir.join(name);
        results.push(migrate_one(&source, &destination, copier, reporter)?);
    }
    Ok(results)
}

fn migrate_one(
    source: &Path,
    destination: &Path,
    copier: &dyn FileCopier,
    reporter: &mut Reporter<'_>,
) -> Result<MigrationResult, MigrationError> {
    let is_regular = fs::metadata(source).is_ok_and(|m| m.is_file());
    if !is_regular {
        return Err(MigrationError::NotRegularFile {
            path: source.to_path_buf(),
        });
    }

    let expected = digest_file(source).map_err(|e| io_error(source, e))?;
    reporter.progress(format_args!("{} will be replaced", destination.display()));
    let bytes = copier
        .copy(source, destination)
        .map_err(|e| io_error(destination, e))?;
    let actual = digest_file(destination).map_err(|e| io_error(destination, e))?;

    if !actual.matches(&expected) {
        return Err(MigrationError::Integrity {
            source_path: source.to_path_buf(),
            destination: destination.to_path_buf(),
            expected,
            actual,
        });
    }
    log::debug!(
        "migrated {} -> {} ({bytes} bytes, {actual})",
        source.display(),
        destination.display()
    );
    Ok(MigrationResult {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        digest: actual,
        bytes,
    })
}

fn io_error(path: &Path, source: io::Error) -> MigrationError {
    MigrationError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Verbosity;
    use rstest::{fixture, rstest};
    use std::io::Write;

    struct Dirs {
        _temp: tempfile::TempDir,
        source: PathBuf,
        destination: PathBuf,
    }

    #[fixture]
    fn dirs() -> Dirs {
        let temp = tempfile::tempdir().expect("temp dir");
        let source = temp.path().join("apache-tomcat-8.5.40/conf");
        let destination = temp.path().join("tomcat8/conf");
        fs::create_dir_all(&source).expect("create source");
        fs::create_dir_all(&destination).expect("create destination");
        for (name, body) in [
            ("logging.properties", "handlers = java.util.logging.ConsoleHandler\n"),
            ("server.xml", "<Server port=\"8005\"/>\n"),
            ("web.xml", "<web-app/>\n"),
        ] {
            fs::write(source.join(name), body).expect("write source file");
            fs::write(destination.join(name), "old").expect("write destination file");
        }
        Dirs {
            _temp: temp,
            source,
            destination,
        }
    }

    fn config_files() -> Vec<String> {
        ["logging.properties", "server.xml", "web.xml"]
            .map(str::to_owned)
            .to_vec()
    }

    /// Copier that writes only the first half of the source.
    struct TruncatingCopier;

    impl FileCopier for TruncatingCopier {
        fn copy(&self, source: &Path, destination: &Path) -> io::Result<u64> {
            let bytes = fs::read(source)?;
            let half = &bytes[..bytes.len() / 2];
            let mut out = File::create(destination)?;
            out.write_all(half)?;
            out.sync_all()?;
            Ok(half.len() as u64)
        }
    }

    #[rstest]
    fn migrates_all_files_in_order(dirs: Dirs) {
        let mut out = Vec::new();
        let mut reporter = Reporter::new(&mut out, Verbosity::Normal);
        let results = migrate(&dirs.source, &dirs.destination, &config_files(), &mut reporter)
            .expect("migrate");

        assert_eq!(results.len(), 3);
        for (result, name) in results.iter().zip(config_files()) {
            assert_eq!(result.destination, dirs.destination.join(&name));
            assert_eq!(
                fs::read(&result.destination).expect("read destination"),
                fs::read(dirs.source.join(&name)).expect("read source")
            );
            assert_eq!(
                digest_file(&result.source).expect("digest"),
                digest_file(&result.destination).expect("digest")
            );
        }
        let text = String::from_utf8(out).expect("UTF-8");
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("server.xml will be replaced"));
    }

    #[rstest]
    fn truncated_copy_is_an_integrity_error(dirs: Dirs) {
        let mut out = Vec::new();
        let mut reporter = Reporter::new(&mut out, Verbosity::Quiet);
        let err = migrate_with(
            &dirs.source,
            &dirs.destination,
            &config_files(),
            &TruncatingCopier,
            &mut reporter,
        )
        .expect_err("integrity failure");

        match err {
            MigrationError::Integrity {
                source_path,
                expected,
                actual,
                ..
            } => {
                assert_eq!(source_path, dirs.source.join("logging.properties"));
                assert_ne!(expected, actual);
            }
            other => panic!("expected Integrity, got {other:?}"),
        }
        assert_eq!(
            fs::read_to_string(dirs.destination.join("server.xml")).expect("read"),
            "old",
            "migration must stop at the first failure"
        );
    }

    #[rstest]
    fn missing_source_is_not_a_regular_file(dirs: Dirs) {
        fs::remove_file(dirs.source.join("server.xml")).expect("remove source");
        let mut out = Vec::new();
        let mut reporter = Reporter::new(&mut out, Verbosity::Quiet);
        let err = migrate(&dirs.source, &dirs.destination, &config_files(), &mut reporter)
            .expect_err("missing source");

        assert!(
            matches!(err, MigrationError::NotRegularFile { ref path } if *path == dirs.source.join("server.xml")),
            "unexpected error: {err:?}"
        );
        assert_eq!(
            fs::read_to_string(dirs.destination.join("logging.properties")).expect("read"),
            "handlers = java.util.logging.ConsoleHandler\n",
            "files before the failure stay migrated"
        );
    }

    #[rstest]
    fn directory_source_is_not_a_regular_file(dirs: Dirs) {
        fs::remove_file(dirs.source.join("web.xml")).expect("remove source");
        fs::create_dir(dirs.source.join("web.xml")).expect("create directory");
        let mut out = Vec::new();
        let mut reporter = Reporter::new(&mut out, Verbosity::Quiet);
        let err = migrate(&dirs.source, &dirs.destination, &config_files(), &mut reporter)
            .expect_err("directory source");
        assert!(matches!(err, MigrationError::NotRegularFile { .. }));
    }

    #[rstest]
    fn copier_failure_names_destination(dirs: Dirs) {
        let mut copier = MockFileCopier::new();
        copier
            .expect_copy()
            .times(1)
            .returning(|_, _| Err(io::Error::from(io::ErrorKind::PermissionDenied)));

        let mut out = Vec::new();
        let mut reporter = Reporter::new(&mut out, Verbosity::Quiet);
        let err = migrate_with(
            &dirs.source,
            &dirs.destination,
            &config_files(),
            &copier,
            &mut reporter,
        )
        .expect_err("copy failure");
        assert!(
            matches!(err, MigrationError::Io { ref path, .. } if *path == dirs.destination.join("logging.properties")),
            "unexpected error: {err:?}"
        );
    }

    #[rstest]
    fn empty_file_list_is_a_no_op(dirs: Dirs) {
        let mut out = Vec::new();
        let mut reporter = Reporter::new(&mut out, Verbosity::Normal);
        let results =
            migrate(&dirs.source, &dirs.destination, &[], &mut reporter).expect("migrate");
        assert!(results.is_empty());
        assert!(out.is_empty());
    }
}
