//! Upgrade configuration.
//!
//! [`UpgradeConfig`] is built once in `main` from three layers: built-in
//! defaults, an optional TOML file, and command-line overrides. The result
//! is immutable and passed by reference to every stage.
//!
//! ```toml
//! install_dir = "/opt/tomcat8"
//! work_dir = "/opt"
//! config_files = ["logging.properties", "server.xml", "web.xml"]
//!
//! [product]
//! major = 8
//! minor = 5
//!
//! [owner]
//! uid = 106
//! gid = 114
//!
//! [migration]
//! direction = "into-existing"
//!
//! [[links]]
//! link = "webapps/ROOT"
//! target = "/var/www/site"
//! ```

use crate::artefact::exclusion::ExclusionSet;
use crate::dirs::{BaseDirs, upgrader_config_file};
use crate::release::ProductLine;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Errors arising from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {}: {source}", .path.display())]
    Read {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`UpgradeConfig`].
    #[error("invalid configuration file {}: {source}", .path.display())]
    Parse {
        /// The file that was parsed.
        path: PathBuf,
        /// The TOML error, including the offending location.
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// The offending key.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Which installation's configuration files win.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationDirection {
    /// Files from the new release overwrite those in the existing install.
    #[default]
    IntoExisting,
    /// Files from the existing install overwrite those in the new release.
    IntoRelease,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IntoExisting => "into-existing",
            Self::IntoRelease => "into-release",
        })
    }
}

/// Settings for the configuration migration stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationSettings {
    /// Copy direction.
    pub direction: MigrationDirection,
}

/// Numeric owner applied to the new release tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ownership {
    /// User id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
}

impl Default for Ownership {
    fn default() -> Self {
        Self { uid: 106, gid: 114 }
    }
}

/// A symbolic link created inside the new release tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSpec {
    /// Link location relative to the release root, e.g. `conf/lucee.xml`.
    pub link: String,
    /// Where the link points.
    pub target: Utf8PathBuf,
}

/// Effective settings for one upgrade run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpgradeConfig {
    /// The live installation; must exist before anything is downloaded.
    pub install_dir: Utf8PathBuf,
    /// Directory receiving the archive, the intermediate tar and the new
    /// tree. Empty means the current directory.
    pub work_dir: Utf8PathBuf,
    /// Release line to upgrade within.
    pub product: ProductLine,
    /// Configuration subdirectory in both installations.
    pub config_subdir: String,
    /// Configuration file names to migrate, in order.
    pub config_files: Vec<String>,
    /// Exclusion keys applied while unpacking.
    pub exclusions: Vec<String>,
    /// Owner applied to the new tree.
    pub owner: Ownership,
    /// Whether to change ownership at all.
    pub change_owner: bool,
    /// Migration settings.
    pub migration: MigrationSettings,
    /// Name of the stable link in the work directory pointing at the active
    /// release. `None` leaves links alone.
    pub publish_link: Option<String>,
    /// Extra links created inside the new tree.
    pub links: Vec<LinkSpec>,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            install_dir: Utf8PathBuf::from("/opt/tomcat8"),
            work_dir: Utf8PathBuf::new(),
            product: ProductLine::default(),
            config_subdir: "conf".to_owned(),
            config_files: ["logging.properties", "server.xml", "web.xml"]
                .map(str::to_owned)
                .to_vec(),
            exclusions: [
                "LICENSE",
                "NOTICE",
                "webapps/docs",
                "webapps/examples",
                "webapps/host-manager",
                "webapps/manager",
                "webapps/ROOT",
            ]
            .map(str::to_owned)
            .to_vec(),
            owner: Ownership::default(),
            change_owner: true,
            migration: MigrationSettings::default(),
            publish_link: Some("tomcat8".to_owned()),
            links: Vec::new(),
        }
    }
}

/// Values from the command line that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `--dir`.
    pub install_dir: Option<Utf8PathBuf>,
    /// `--work-dir`.
    pub work_dir: Option<Utf8PathBuf>,
    /// `--no-chown`.
    pub no_chown: bool,
}

impl UpgradeConfig {
    /// Parse and validate configuration from TOML text.
    ///
    /// Missing keys take their defaults; unknown keys are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML, attributing it to
    /// `origin`, and [`ConfigError::Invalid`] for unusable values.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use tomcat_upgrader::config::UpgradeConfig;
    ///
    /// let config = UpgradeConfig::from_toml_str("install_dir = \"/srv/tomcat\"\n", Path::new("inline"))
    ///     .unwrap();
    /// assert_eq!(config.install_dir, "/srv/tomcat");
    /// assert_eq!(config.config_subdir, "conf");
    /// ```
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise
    /// as for [`UpgradeConfig::from_toml_str`].
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Locate and load the configuration.
    ///
    /// An explicit path must exist. Otherwise the per-user file is used when
    /// present, and the defaults when it is not.
    ///
    /// # Errors
    ///
    /// As for [`UpgradeConfig::load_file`].
    pub fn discover(explicit: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::debug!("loading configuration from {path}");
            return Self::load_file(path.as_std_path());
        }
        match upgrader_config_file(dirs) {
            Some(path) if path.is_file() => {
                log::debug!("loading configuration from {}", path.display());
                Self::load_file(&path)
            }
            _ => {
                log::debug!("no configuration file found; using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(dir) = overrides.install_dir {
            self.install_dir = dir;
        }
        if let Some(dir) = overrides.work_dir {
            self.work_dir = dir;
        }
        if overrides.no_chown {
            self.change_owner = false;
        }
        self
    }

    /// The exclusion keys as an [`ExclusionSet`].
    #[must_use]
    pub fn exclusion_set(&self) -> ExclusionSet {
        ExclusionSet::new(self.exclusions.iter().cloned())
    }

    /// Configuration directory of the existing installation.
    #[must_use]
    pub fn install_config_dir(&self) -> Utf8PathBuf {
        self.install_dir.join(&self.config_subdir)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for name in &self.config_files {
            if !is_plain_file_name(name) {
                return Err(ConfigError::Invalid {
                    field: "config_files",
                    reason: format!("\"{name}\" must be a file name without directories"),
                });
            }
        }
        if self.exclusions.iter().any(|key| key.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "exclusions",
                reason: "keys must not be empty".to_owned(),
            });
        }
        if let Some(name) = self
            .publish_link
            .as_deref()
            .filter(|name| !is_plain_file_name(name))
        {
            return Err(ConfigError::Invalid {
                field: "publish_link",
                reason: format!("\"{name}\" must be a name without directories"),
            });
        }
        for spec in &self.links {
            if !is_relative_inside(&spec.link) {
                return Err(ConfigError::Invalid {
                    field: "links",
                    reason: format!("\"{}\" must be a relative path inside the release", spec.link),
                });
            }
        }
        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn is_relative_inside(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirs::MockBaseDirs;
    use rstest::rstest;

    fn parse(text: &str) -> Result<UpgradeConfig, ConfigError> {
        UpgradeConfig::from_toml_str(text, Path::new("test.toml"))
    }

    #[rstest]
    fn defaults_match_historic_constants() {
        let config = UpgradeConfig::default();
        assert_eq!(config.install_dir, "/opt/tomcat8");
        assert_eq!(config.product, ProductLine { major: 8, minor: 5 });
        assert_eq!(config.owner, Ownership { uid: 106, gid: 114 });
        assert_eq!(config.migration.direction, MigrationDirection::IntoExisting);
        assert_eq!(config.publish_link.as_deref(), Some("tomcat8"));
        assert_eq!(config.exclusions.len(), 7);
        assert!(config.exclusion_set().contains("webapps/host-manager"));
        assert_eq!(config.install_config_dir(), "/opt/tomcat8/conf");
    }

    #[rstest]
    fn empty_file_yields_defaults() {
        assert_eq!(parse("").expect("parse"), UpgradeConfig::default());
    }

    #[rstest]
    fn parses_full_file() {
        let config = parse(concat!(
            "install_dir = \"/srv/tomcat9\"\n",
            "work_dir = \"/srv\"\n",
            "config_files = [\"server.xml\"]\n",
            "exclusions = [\"webapps/docs\"]\n",
            "change_owner = false\n",
            "publish_link = \"tomcat9\"\n",
            "[product]\nmajor = 9\nminor = 0\n",
            "[owner]\nuid = 1000\ngid = 1000\n",
            "[migration]\ndirection = \"into-release\"\n",
            "[[links]]\nlink = \"conf/lucee.xml\"\ntarget = \"/etc/lucee/lucee.xml\"\n",
        ))
        .expect("parse");

        assert_eq!(config.product, ProductLine { major: 9, minor: 0 });
        assert_eq!(config.work_dir, "/srv");
        assert_eq!(config.config_files, ["server.xml"]);
        assert!(!config.change_owner);
        assert_eq!(config.migration.direction, MigrationDirection::IntoRelease);
        assert_eq!(
            config.links,
            [LinkSpec {
                link: "conf/lucee.xml".to_owned(),
                target: Utf8PathBuf::from("/etc/lucee/lucee.xml"),
            }]
        );
    }

    #[rstest]
    #[case::unknown_key("mirror = \"https://example.test\"\n")]
    #[case::bad_direction("[migration]\ndirection = \"sideways\"\n")]
    #[case::wrong_type("change_owner = \"yes\"\n")]
    fn rejects_malformed_files(#[case] text: &str) {
        assert!(matches!(parse(text), Err(ConfigError::Parse { .. })));
    }

    #[rstest]
    #[case::nested_config_file("config_files = [\"conf/server.xml\"]\n", "config_files")]
    #[case::parent_config_file("config_files = [\"..\"]\n", "config_files")]
    #[case::blank_exclusion("exclusions = [\" \"]\n", "exclusions")]
    #[case::nested_publish_link("publish_link = \"a/b\"\n", "publish_link")]
    #[case::escaping_link(
        "[[links]]\nlink = \"../outside\"\ntarget = \"/tmp\"\n",
        "links"
    )]
    fn rejects_unusable_values(#[case] text: &str, #[case] expected_field: &str) {
        match parse(text) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[rstest]
    fn overrides_take_precedence() {
        let config = UpgradeConfig::default().with_overrides(ConfigOverrides {
            install_dir: Some(Utf8PathBuf::from("/srv/tomcat")),
            work_dir: Some(Utf8PathBuf::from("/srv")),
            no_chown: true,
        });
        assert_eq!(config.install_dir, "/srv/tomcat");
        assert_eq!(config.work_dir, "/srv");
        assert!(!config.change_owner);
    }

    #[rstest]
    fn discover_prefers_explicit_path() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().join("custom.toml")).expect("UTF-8 path");
        std::fs::write(&path, "install_dir = \"/srv/explicit\"\n").expect("write config");

        let mut dirs = MockBaseDirs::new();
        dirs.expect_config_dir().never();
        let config = UpgradeConfig::discover(Some(&path), &dirs).expect("discover");
        assert_eq!(config.install_dir, "/srv/explicit");
    }

    #[rstest]
    fn discover_reports_missing_explicit_path() {
        let dirs = MockBaseDirs::new();
        let err = UpgradeConfig::discover(Some(Utf8Path::new("/nonexistent/upgrader.toml")), &dirs)
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[rstest]
    fn discover_uses_user_config_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let app_dir = temp.path().join("tomcat-upgrader");
        std::fs::create_dir_all(&app_dir).expect("create app dir");
        std::fs::write(app_dir.join("config.toml"), "work_dir = \"/var/tmp\"\n")
            .expect("write config");

        let config_dir = temp.path().to_path_buf();
        let mut dirs = MockBaseDirs::new();
        dirs.expect_config_dir()
            .returning(move || Some(config_dir.clone()));
        let config = UpgradeConfig::discover(None, &dirs).expect("discover");
        assert_eq!(config.work_dir, "/var/tmp");
    }

    #[rstest]
    fn discover_falls_back_to_defaults() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config_dir = temp.path().to_path_buf();
        let mut dirs = MockBaseDirs::new();
        dirs.expect_config_dir()
            .returning(move || Some(config_dir.clone()));
        let config = UpgradeConfig::discover(None, &dirs).expect("discover");
        assert_eq!(config, UpgradeConfig::default());
    }
}
