//! SHA-1 digest computation over byte streams.
//!
//! Every digest is taken over the complete stream, read to EOF in fixed-size
//! chunks, so memory use does not grow with the input. The same routine
//! serves network bodies, open files, and in-memory buffers.

use super::sha1_digest::Sha1Digest;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 8192;

/// Compute the SHA-1 digest of everything `reader` yields until EOF.
///
/// # Errors
///
/// Returns the underlying I/O error if any read fails. Interrupted reads are
/// retried.
///
/// # Examples
///
/// ```
/// use tomcat_upgrader::artefact::checksum::digest_reader;
///
/// let digest = digest_reader(&mut &b"abc"[..]).unwrap();
/// assert_eq!(digest.as_str(), "a9993e364706816aba3e25717850c26c9cd0d89d");
/// ```
pub fn digest_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<Sha1Digest> {
    let mut hasher = Sha1::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(finish(hasher))
}

/// Compute the SHA-1 digest of the file at `path`.
///
/// The file handle is closed before this function returns.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn digest_file(path: &Path) -> io::Result<Sha1Digest> {
    let mut file = File::open(path)?;
    digest_reader(&mut file)
}

/// Compute the SHA-1 digest of an in-memory buffer.
#[must_use]
pub fn digest_bytes(bytes: &[u8]) -> Sha1Digest {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    finish(hasher)
}

fn finish(hasher: Sha1) -> Sha1Digest {
    Sha1Digest::from_bytes(hasher.finalize().into())
}
