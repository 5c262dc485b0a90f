//! Exclusion keys for archive entries.
//!
//! Release archives nest everything under one top-level directory
//! (`apache-tomcat-8.5.40/`). An entry's exclusion key is made of the one or
//! two path segments that follow that root, so `webapps/docs` matches both
//! the directory entry and every file below it.
//!
//! The root directory itself has no key and can never be excluded.

use std::path::{Component, Path};

/// An ordered set of exclusion keys applied while unpacking.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tomcat_upgrader::artefact::exclusion::ExclusionSet;
///
/// let set = ExclusionSet::new(["webapps/docs", "LICENSE"]);
/// assert!(set.excludes(Path::new("apache-tomcat-8.5.40/webapps/docs/index.html")));
/// assert!(set.excludes(Path::new("apache-tomcat-8.5.40/LICENSE")));
/// assert!(!set.excludes(Path::new("apache-tomcat-8.5.40/conf/server.xml")));
/// assert!(!set.excludes(Path::new("apache-tomcat-8.5.40")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    keys: Vec<String>,
}

impl ExclusionSet {
    /// Build a set from keys, preserving their order and dropping duplicates.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into();
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        Self { keys: unique }
    }

    /// Return the keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Return true when `key` is a member of the set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Return true when the archive entry at `entry_path` must be skipped.
    #[must_use]
    pub fn excludes(&self, entry_path: &Path) -> bool {
        exclusion_key(entry_path).is_some_and(|key| self.contains(&key))
    }
}

/// Compute the exclusion key for an archive entry path.
///
/// - three or more segments: segments two and three joined by `/`;
/// - exactly two segments: segment two;
/// - a single segment (the archive root): `None`.
///
/// `.` components are ignored, so `./root/conf` and `root/conf` share a key.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tomcat_upgrader::artefact::exclusion::exclusion_key;
///
/// assert_eq!(
///     exclusion_key(Path::new("apache-tomcat-8.5.40/webapps/ROOT/index.jsp")).as_deref(),
///     Some("webapps/ROOT")
/// );
/// assert_eq!(exclusion_key(Path::new("apache-tomcat-8.5.40/NOTICE")).as_deref(), Some("NOTICE"));
/// assert_eq!(exclusion_key(Path::new("apache-tomcat-8.5.40/")), None);
/// ```
#[must_use]
pub fn exclusion_key(entry_path: &Path) -> Option<String> {
    let mut below_root = normal_segments(entry_path).skip(1);
    let first = below_root.next()?;
    match below_root.next() {
        Some(second) => Some(format!("{first}/{second}")),
        None => Some(first),
    }
}

/// Return the top-level directory name an entry path lives under.
#[must_use]
pub fn root_segment(entry_path: &Path) -> Option<String> {
    normal_segments(entry_path).next()
}

fn normal_segments(path: &Path) -> impl Iterator<Item = String> + '_ {
    path.components().filter_map(|component| match component {
        Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn tomcat_exclusions() -> ExclusionSet {
        ExclusionSet::new([
            "LICENSE",
            "NOTICE",
            "webapps/docs",
            "webapps/examples",
            "webapps/host-manager",
            "webapps/manager",
            "webapps/ROOT",
        ])
    }

    #[rstest]
    #[case::deep_file("apache-tomcat-8.5.40/webapps/examples/index.jsp", Some("webapps/examples"))]
    #[case::directory("apache-tomcat-8.5.40/webapps/ROOT/", Some("webapps/ROOT"))]
    #[case::two_segments("apache-tomcat-8.5.40/LICENSE", Some("LICENSE"))]
    #[case::config_file("apache-tomcat-8.5.40/conf/server.xml", Some("conf/server.xml"))]
    #[case::root_only("apache-tomcat-8.5.40", None)]
    #[case::root_with_slash("apache-tomcat-8.5.40/", None)]
    #[case::dot_prefixed("./apache-tomcat-8.5.40/webapps/docs", Some("webapps/docs"))]
    fn computes_exclusion_keys(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(exclusion_key(Path::new(path)).as_deref(), expected);
    }

    #[rstest]
    #[case::examples("apache-tomcat-8.5.40/webapps/examples/index.jsp", true)]
    #[case::root_webapp("apache-tomcat-8.5.40/webapps/ROOT/index.jsp", true)]
    #[case::notice("apache-tomcat-8.5.40/NOTICE", true)]
    #[case::server_xml("apache-tomcat-8.5.40/conf/server.xml", false)]
    #[case::webapps_dir("apache-tomcat-8.5.40/webapps/", false)]
    #[case::archive_root("apache-tomcat-8.5.40/", false)]
    fn applies_default_tomcat_exclusions(
        tomcat_exclusions: ExclusionSet,
        #[case] path: &str,
        #[case] excluded: bool,
    ) {
        assert_eq!(tomcat_exclusions.excludes(Path::new(path)), excluded);
    }

    #[test]
    fn keys_match_exactly_not_by_prefix() {
        let set = ExclusionSet::new(["webapps/doc"]);
        assert!(!set.excludes(Path::new("root/webapps/docs/index.html")));
    }

    #[test]
    fn new_preserves_order_and_drops_duplicates() {
        let set = ExclusionSet::new(["b", "a", "b"]);
        assert_eq!(set.keys(), ["b".to_owned(), "a".to_owned()]);
    }

    #[test]
    fn root_segment_skips_current_dir_prefix() {
        assert_eq!(
            root_segment(Path::new("./apache-tomcat-8.5.40/bin")).as_deref(),
            Some("apache-tomcat-8.5.40")
        );
    }
}
