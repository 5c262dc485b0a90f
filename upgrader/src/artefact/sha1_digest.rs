//! The `Sha1Digest` value published beside every release archive.

use super::error::{ArtefactError, Result};
use std::fmt::{self, Write as _};
use std::str::FromStr;

/// Raw SHA-1 output length in bytes.
pub const DIGEST_LEN: usize = 20;

/// Hex length of a SHA-1 digest.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// SHA-1 digest held as 40 lowercase hex characters.
///
/// Checksum files may carry uppercase hex; callers lowercase before
/// parsing, so two digests are equal exactly when their text is.
///
/// ```
/// use tomcat_upgrader::artefact::sha1_digest::Sha1Digest;
///
/// let digest: Sha1Digest = "a9993e364706816aba3e25717850c26c9cd0d89d".parse().unwrap();
/// assert!(digest.matches(&Sha1Digest::from_bytes([
///     0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e,
///     0x25, 0x71, 0x78, 0x50, 0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d,
/// ])));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha1Digest(String);

impl Sha1Digest {
    /// Render raw hasher output.
    #[must_use]
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        let mut hex = String::with_capacity(DIGEST_HEX_LEN);
        for byte in bytes {
            // Writing to a String cannot fail.
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    /// The hex text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hex text, by value.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether `other` is the same digest. No prefix or case folding.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

fn check(value: &str) -> Result<()> {
    let invalid = |reason: String| ArtefactError::InvalidSha1Digest { reason };
    if value.len() != DIGEST_HEX_LEN {
        return Err(invalid(format!(
            "expected {DIGEST_HEX_LEN} hex characters, got {}",
            value.len()
        )));
    }
    match value.chars().find(|c| !matches!(c, '0'..='9' | 'a'..='f')) {
        None => Ok(()),
        Some(c) if c.is_ascii_hexdigit() => Err(invalid("digest must be lowercase".to_owned())),
        Some(c) => Err(invalid(format!("non-hex character '{c}'"))),
    }
}

impl TryFrom<String> for Sha1Digest {
    type Error = ArtefactError;

    fn try_from(value: String) -> Result<Self> {
        check(&value)?;
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Sha1Digest {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        Self::try_from(value.to_owned())
    }
}

impl FromStr for Sha1Digest {
    type Err = ArtefactError;

    fn from_str(value: &str) -> Result<Self> {
        Self::try_from(value)
    }
}

impl AsRef<str> for Sha1Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn from_bytes_renders_lowercase_hex() {
        let digest = Sha1Digest::from_bytes([0xab; DIGEST_LEN]);
        assert_eq!(digest.as_str(), "ab".repeat(DIGEST_LEN));
        assert_eq!(Sha1Digest::try_from(digest.as_str()).expect("valid"), digest);
    }

    #[rstest]
    #[case::too_short("abcdef", "got 6")]
    #[case::sha256_length(
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        "got 64"
    )]
    #[case::non_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaag", "non-hex character 'g'")]
    #[case::uppercase("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", "lowercase")]
    #[case::empty("", "got 0")]
    fn rejects_malformed_digests(#[case] value: &str, #[case] reason_fragment: &str) {
        match value.parse::<Sha1Digest>() {
            Err(ArtefactError::InvalidSha1Digest { reason }) => {
                assert!(reason.contains(reason_fragment), "reason: {reason}");
            }
            other => panic!("expected rejection for {value:?}, got {other:?}"),
        }
    }

    #[test]
    fn matches_only_identical_digests() {
        let a = Sha1Digest::from_bytes([0xaa; DIGEST_LEN]);
        let mut near = [0xaa; DIGEST_LEN];
        near[DIGEST_LEN - 1] = 0xab;
        assert!(a.matches(&a.clone()));
        assert!(!a.matches(&Sha1Digest::from_bytes(near)));
    }
}
