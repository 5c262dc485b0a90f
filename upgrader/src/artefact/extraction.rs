//! Two-stage extraction of release archives.
//!
//! Stage one strips the gzip layer to an intermediate `.tar` file, which is
//! kept on disk next to the archive. Stage two walks the tar entries once,
//! skipping excluded keys and writing directories and regular files with
//! their recorded mode bits.
//!
//! Entry paths are validated before anything is written so an archive cannot
//! escape the destination root.

use super::exclusion::{ExclusionSet, root_segment};
use crate::output::Reporter;
use flate2::read::GzDecoder;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use tar::EntryType;

const CHUNK_SIZE: usize = 64 * 1024;

/// Permission bits kept from tar headers (rwx plus setuid, setgid, sticky).
const MODE_MASK: u32 = 0o7777;

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The gzip layer could not be decoded.
    #[error("{} is not a valid gzip stream: {reason}", .path.display())]
    InvalidGzip {
        /// The compressed source file.
        path: PathBuf,
        /// What the decoder reported.
        reason: String,
    },

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no directory or regular file entries.
    #[error("archive {} contains no entries", .path.display())]
    EmptyArchive {
        /// The tar file that was read.
        path: PathBuf,
    },
}

/// What [`unpack`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackSummary {
    /// First path segment of the entries, e.g. `apache-tomcat-8.5.40`.
    pub root_dir: String,
    /// Directories and files written.
    pub extracted: usize,
    /// Entries skipped because their exclusion key matched.
    pub excluded: usize,
    /// Entries skipped because they are neither directories nor regular files.
    pub unsupported: usize,
}

/// Decompress the gzip file at `source` into `output_dir`.
///
/// The output takes the file name recorded in the gzip header, reduced to
/// its final component. When the header carries no name the source name
/// with its last extension removed is used instead, so
/// `apache-tomcat-8.5.40.tar.gz` becomes `apache-tomcat-8.5.40.tar`.
/// A header name that would resolve to `source` itself is ignored the same
/// way.
///
/// Returns the path of the intermediate file.
///
/// # Errors
///
/// Returns [`ExtractionError::InvalidGzip`] if the header cannot be parsed or
/// the compressed body is corrupt, and [`ExtractionError::Io`] for other I/O
/// failures.
pub fn decompress(source: &Path, output_dir: &Path) -> Result<PathBuf, ExtractionError> {
    let file = File::open(source)?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let Some(header) = decoder.header() else {
        return Err(invalid_gzip(source, "missing or malformed gzip header"));
    };

    let header_name = header
        .filename()
        .map(|raw| String::from_utf8_lossy(raw).into_owned())
        .and_then(|raw| {
            Path::new(&raw)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        });
    let stem_name = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned());

    // The verified archive is never an output.
    let output = [header_name, stem_name]
        .into_iter()
        .flatten()
        .map(|name| output_dir.join(name))
        .find(|candidate| !is_same_file(candidate, source))
        .ok_or_else(|| invalid_gzip(source, "cannot derive an output file name"))?;
    log::debug!("decompressing {} to {}", source.display(), output.display());

    let mut writer = BufWriter::new(File::create(&output)?);
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match decoder.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_format_error(&e) => return Err(invalid_gzip(source, &e.to_string())),
            Err(e) => return Err(e.into()),
        };
        writer.write_all(&buffer[..n])?;
    }
    writer.flush()?;
    Ok(output)
}

fn is_same_file(candidate: &Path, source: &Path) -> bool {
    if candidate == source {
        return true;
    }
    match (fs::canonicalize(candidate), fs::canonicalize(source)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn is_format_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
    )
}

fn invalid_gzip(path: &Path, reason: &str) -> ExtractionError {
    ExtractionError::InvalidGzip {
        path: path.to_path_buf(),
        reason: reason.to_owned(),
    }
}

/// Unpack the tar file at `tarball` below `destination_root`.
///
/// Entries whose exclusion key is in `exclusions` are skipped without
/// touching the filesystem. Directories are created (existing ones are
/// fine) and regular files are created or truncated; both get the mode bits
/// recorded in the archive, applied explicitly so the process umask has no
/// effect. Other entry kinds are skipped with a warning.
///
/// # Errors
///
/// Returns [`ExtractionError::PathTraversal`] for absolute entry paths or
/// paths containing `..`, [`ExtractionError::EmptyArchive`] when nothing
/// could be unpacked, and [`ExtractionError::Io`] for any I/O failure.
pub fn unpack(
    tarball: &Path,
    destination_root: &Path,
    exclusions: &ExclusionSet,
    reporter: &mut Reporter<'_>,
) -> Result<UnpackSummary, ExtractionError> {
    let file = File::open(tarball)?;
    let mut archive = tar::Archive::new(BufReader::new(file));

    let mut root_dir: Option<String> = None;
    let mut extracted = 0;
    let mut excluded = 0;
    let mut unsupported = 0;

    for (index, entry_result) in archive.entries()?.enumerate() {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;

        let entry_type = entry.header().entry_type();
        if !entry_type.is_dir() && !entry_type.is_file() {
            note_unsupported(&entry_path, entry_type);
            unsupported += 1;
            continue;
        }

        if root_dir.is_none() {
            root_dir = root_segment(&entry_path);
        }
        reporter.detail(format_args!("{}. {}", index + 1, entry_path.display()));

        if exclusions.excludes(&entry_path) {
            log::trace!("excluded {}", entry_path.display());
            excluded += 1;
            continue;
        }

        let mode = entry.header().mode()? & MODE_MASK;
        let dest = destination_root.join(&entry_path);
        if entry_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let mut out = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(mode)
                .open(&dest)?;
            io::copy(&mut entry, &mut out)?;
        }
        fs::set_permissions(&dest, Permissions::from_mode(mode))?;
        extracted += 1;
    }

    let root_dir = root_dir.ok_or_else(|| ExtractionError::EmptyArchive {
        path: tarball.to_path_buf(),
    })?;
    log::debug!(
        "unpacked {root_dir}: {extracted} written, {excluded} excluded, {unsupported} unsupported"
    );
    Ok(UnpackSummary {
        root_dir,
        extracted,
        excluded,
        unsupported,
    })
}

fn note_unsupported(path: &Path, entry_type: EntryType) {
    match entry_type {
        // Metadata records carry no filesystem object of their own.
        EntryType::XGlobalHeader | EntryType::XHeader => {
            log::debug!("ignoring {entry_type:?} record {}", path.display());
        }
        _ => log::warn!(
            "skipping {} entry {}: only directories and regular files are unpacked",
            format!("{entry_type:?}").to_lowercase(),
            path.display()
        ),
    }
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "extraction_tests.rs"]
mod tests;
