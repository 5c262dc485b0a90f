//! Logger initialisation and the failure policy.
//!
//! Diagnostics go through the `log` facade to an `env_logger` sink with
//! second-resolution timestamps. `RUST_LOG` takes precedence over the
//! defaults chosen here.

use crate::output::write_stderr_line;
use std::fmt;
use std::io::Write;

/// Install the global logger.
///
/// The default filter is `warn`, or `debug` for this crate when `verbose`
/// is set. Calling this more than once is harmless; later calls are ignored.
pub fn init(verbose: bool) {
    let env = env_logger::Env::default().default_filter_or(default_filter(verbose));
    if env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init()
        .is_err()
    {
        log::debug!("logger already initialised");
    }
}

/// Filter directive used when `RUST_LOG` is unset.
#[must_use]
pub const fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,tomcat_upgrader=debug"
    } else {
        "warn"
    }
}

/// How a failed run is reported and which status it exits with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the error with a timestamp and exit with status 1.
    LogAndHalt,
    /// Print the error to stderr and exit with status 0.
    #[default]
    PrintAndExit,
}

impl FailurePolicy {
    /// Select the policy from the `--log` flag.
    #[must_use]
    pub const fn from_flag(log: bool) -> Self {
        if log {
            Self::LogAndHalt
        } else {
            Self::PrintAndExit
        }
    }

    /// Report `error` and return the process exit code.
    pub fn report(self, error: &dyn fmt::Display, stderr: &mut dyn Write) -> i32 {
        match self {
            Self::LogAndHalt => {
                log::error!("{error}");
                1
            }
            Self::PrintAndExit => {
                write_stderr_line(stderr, error);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::logged(true, FailurePolicy::LogAndHalt)]
    #[case::printed(false, FailurePolicy::PrintAndExit)]
    fn policy_follows_log_flag(#[case] flag: bool, #[case] expected: FailurePolicy) {
        assert_eq!(FailurePolicy::from_flag(flag), expected);
    }

    #[test]
    fn print_and_exit_writes_message_and_exits_zero() {
        let mut stderr = Vec::new();
        let code = FailurePolicy::PrintAndExit.report(&"archive missing", &mut stderr);
        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(stderr).expect("UTF-8"), "archive missing\n");
    }

    #[test]
    fn log_and_halt_exits_one_without_printing() {
        let mut stderr = Vec::new();
        let code = FailurePolicy::LogAndHalt.report(&"archive missing", &mut stderr);
        assert_eq!(code, 1);
        assert!(stderr.is_empty());
    }

    #[test]
    fn verbose_raises_crate_filter() {
        assert_eq!(default_filter(false), "warn");
        assert!(default_filter(true).contains("tomcat_upgrader=debug"));
    }
}
