//! Platform directory resolution.
//!
//! Wraps `directories-next` behind a trait so configuration discovery can be
//! tested without touching the real user profile.

use std::path::PathBuf;

/// Name of the per-user configuration subdirectory.
pub const APP_DIR_NAME: &str = "tomcat-upgrader";

/// Name of the configuration file inside [`APP_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Source of platform-specific base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The user's configuration directory, e.g. `~/.config` on Linux.
    fn config_dir(&self) -> Option<PathBuf>;
}

/// Location of this tool's configuration file, if a config directory is
/// known.
pub fn upgrader_config_file(dirs: &dyn BaseDirs) -> Option<PathBuf> {
    dirs.config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// [`BaseDirs`] backed by the current user's profile.
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    inner: directories_next::BaseDirs,
}

impl SystemBaseDirs {
    /// Resolve the current user's directories.
    ///
    /// Returns `None` when no home directory can be determined.
    #[must_use]
    pub fn new() -> Option<Self> {
        directories_next::BaseDirs::new().map(|inner| Self { inner })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn config_dir(&self) -> Option<PathBuf> {
        Some(self.inner.config_dir().to_path_buf())
    }
}
