//! Shared test utilities for the upgrader crate.
//!
//! Builds release-shaped `.tar.gz` fixtures on disk so extraction and the
//! pipeline can be exercised without network access.

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tar::{EntryType, Header};

/// One member of a fixture archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureEntry {
    /// A directory record.
    Dir {
        /// Entry path inside the archive.
        path: String,
        /// Permission bits.
        mode: u32,
    },
    /// A regular file record.
    File {
        /// Entry path inside the archive.
        path: String,
        /// Permission bits.
        mode: u32,
        /// File content.
        contents: Vec<u8>,
    },
    /// A symbolic link record.
    Symlink {
        /// Entry path inside the archive.
        path: String,
        /// Link target.
        target: String,
    },
    /// A regular file whose name is written verbatim, bypassing the path
    /// checks `tar` applies when building archives.
    Unchecked {
        /// Raw entry name; must be shorter than 100 bytes.
        path: String,
        /// File content.
        contents: Vec<u8>,
    },
}

impl FixtureEntry {
    /// A directory with mode `0o755`.
    pub fn dir(path: &str) -> Self {
        Self::Dir {
            path: path.to_owned(),
            mode: 0o755,
        }
    }

    /// A regular file with mode `0o644`.
    pub fn file(path: &str, contents: &[u8]) -> Self {
        Self::File {
            path: path.to_owned(),
            mode: 0o644,
            contents: contents.to_vec(),
        }
    }
}

/// A small release tree rooted at `root`, mirroring the layout of a Tomcat
/// distribution: the root directory, `bin`, `conf` with the three migrated
/// files, and `webapps` with a kept and several excluded applications.
pub fn release_entries(root: &str) -> Vec<FixtureEntry> {
    vec![
        FixtureEntry::dir(&format!("{root}/")),
        FixtureEntry::file(&format!("{root}/LICENSE"), b"Apache License 2.0\n"),
        FixtureEntry::file(&format!("{root}/NOTICE"), b"Apache Tomcat\n"),
        FixtureEntry::dir(&format!("{root}/bin/")),
        FixtureEntry::File {
            path: format!("{root}/bin/catalina.sh"),
            mode: 0o750,
            contents: b"#!/bin/sh\nexec java \"$@\"\n".to_vec(),
        },
        FixtureEntry::Dir {
            path: format!("{root}/conf/"),
            mode: 0o700,
        },
        FixtureEntry::File {
            path: format!("{root}/conf/server.xml"),
            mode: 0o600,
            contents: b"<Server port=\"8005\" shutdown=\"SHUTDOWN\"/>\n".to_vec(),
        },
        FixtureEntry::File {
            path: format!("{root}/conf/web.xml"),
            mode: 0o600,
            contents: b"<web-app version=\"3.1\"/>\n".to_vec(),
        },
        FixtureEntry::File {
            path: format!("{root}/conf/logging.properties"),
            mode: 0o600,
            contents: b"handlers = java.util.logging.ConsoleHandler\n".to_vec(),
        },
        FixtureEntry::dir(&format!("{root}/webapps/")),
        FixtureEntry::dir(&format!("{root}/webapps/ROOT/")),
        FixtureEntry::file(&format!("{root}/webapps/ROOT/index.jsp"), b"<html/>\n"),
        FixtureEntry::dir(&format!("{root}/webapps/examples/")),
        FixtureEntry::file(
            &format!("{root}/webapps/examples/index.html"),
            b"<html>examples</html>\n",
        ),
        FixtureEntry::dir(&format!("{root}/webapps/docs/")),
        FixtureEntry::file(&format!("{root}/webapps/docs/index.html"), b"<html>docs</html>\n"),
        FixtureEntry::dir(&format!("{root}/lib/")),
        FixtureEntry::file(&format!("{root}/lib/catalina.jar"), b"PK\x03\x04 not really a jar"),
    ]
}

/// Write `entries` as a plain tar stream into `writer`.
///
/// # Errors
///
/// Returns any I/O error from the underlying writer.
pub fn write_tar<W: Write>(writer: W, entries: &[FixtureEntry]) -> io::Result<W> {
    let mut builder = tar::Builder::new(writer);
    for entry in entries {
        append_entry(&mut builder, entry)?;
    }
    builder.into_inner()
}

/// Write `entries` as a gzip-compressed tar file at `dest`.
///
/// When `embedded_name` is given it is recorded as the file name in the
/// gzip header.
///
/// # Errors
///
/// Returns any I/O error from creating or writing the file.
pub fn write_tar_gz(
    dest: &Path,
    entries: &[FixtureEntry],
    embedded_name: Option<&str>,
) -> io::Result<()> {
    let file = File::create(dest)?;
    let encoder: GzEncoder<File> = match embedded_name {
        Some(name) => GzBuilder::new()
            .filename(name)
            .write(file, Compression::default()),
        None => GzEncoder::new(file, Compression::default()),
    };
    let encoder = write_tar(encoder, entries)?;
    encoder.finish()?.sync_all()
}

fn append_entry<W: Write>(builder: &mut tar::Builder<W>, entry: &FixtureEntry) -> io::Result<()> {
    let mut header = Header::new_gnu();
    match entry {
        FixtureEntry::Dir { path, mode } => {
            header.set_entry_type(EntryType::Directory);
            header.set_mode(*mode);
            header.set_size(0);
            builder.append_data(&mut header, path, io::empty())
        }
        FixtureEntry::File {
            path,
            mode,
            contents,
        } => {
            header.set_entry_type(EntryType::Regular);
            header.set_mode(*mode);
            header.set_size(contents.len() as u64);
            builder.append_data(&mut header, path, contents.as_slice())
        }
        FixtureEntry::Symlink { path, target } => {
            header.set_entry_type(EntryType::Symlink);
            header.set_mode(0o777);
            header.set_size(0);
            builder.append_link(&mut header, path, target)
        }
        FixtureEntry::Unchecked { path, contents } => {
            header.set_entry_type(EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(contents.len() as u64);
            let name = &mut header.as_old_mut().name;
            let bytes = path.as_bytes();
            if bytes.len() >= name.len() {
                return Err(io::Error::other("unchecked entry name too long"));
            }
            name[..bytes.len()].copy_from_slice(bytes);
            header.set_cksum();
            builder.append(&header, contents.as_slice())
        }
    }
}

/// Compute the lowercase hex SHA-1 of `bytes`.
pub fn sha1_hex(bytes: &[u8]) -> String {
    crate::artefact::checksum::digest_bytes(bytes).into_inner()
}
