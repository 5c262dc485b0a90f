//! Tests for upgrader CLI parsing.

use super::*;
use clap::CommandFactory;
use rstest::rstest;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["tomcat-upgrader"]);
    assert!(cli.dir.is_none());
    assert!(cli.ver.is_none());
    assert!(!cli.log);
    assert!(!cli.quiet);
    assert!(!cli.verbose);
    assert!(cli.config.is_none());
    assert!(cli.work_dir.is_none());
    assert!(!cli.no_chown);
    assert!(!cli.dry_run);
    assert_eq!(cli.verbosity(), Verbosity::Normal);
    assert_eq!(cli.overrides(), ConfigOverrides::default());
}

#[test]
fn cli_parses_all_flags() {
    let cli = Cli::parse_from([
        "tomcat-upgrader",
        "--dir",
        "/srv/tomcat8",
        "--ver",
        "40",
        "--log",
        "--verbose",
        "--config",
        "/etc/tomcat-upgrader.toml",
        "--work-dir",
        "/srv",
        "--no-chown",
        "--dry-run",
    ]);
    assert_eq!(cli.ver, Some(VersionArg::Patch(40)));
    assert!(cli.log);
    assert!(cli.dry_run);
    assert_eq!(cli.verbosity(), Verbosity::Verbose);
    assert_eq!(
        cli.config,
        Some(Utf8PathBuf::from("/etc/tomcat-upgrader.toml"))
    );
    assert_eq!(
        cli.overrides(),
        ConfigOverrides {
            install_dir: Some(Utf8PathBuf::from("/srv/tomcat8")),
            work_dir: Some(Utf8PathBuf::from("/srv")),
            no_chown: true,
        }
    );
}

#[test]
fn quiet_conflicts_with_verbose() {
    let result = Cli::try_parse_from(["tomcat-upgrader", "--quiet", "--verbose"]);
    assert!(result.is_err());
}

#[test]
fn quiet_selects_quiet_verbosity() {
    let cli = Cli::parse_from(["tomcat-upgrader", "-q"]);
    assert_eq!(cli.verbosity(), Verbosity::Quiet);
}

#[rstest]
#[case::patch("40", VersionArg::Patch(40))]
#[case::full("8.5.41", VersionArg::Full(ReleaseVersion { major: 8, minor: 5, patch: 41 }))]
fn ver_accepts_patch_or_full_version(#[case] value: &str, #[case] expected: VersionArg) {
    let cli = Cli::parse_from(["tomcat-upgrader", "--ver", value]);
    assert_eq!(cli.ver, Some(expected));
}

#[rstest]
#[case::negative("-1")]
#[case::word("latest")]
#[case::partial("8.5")]
fn ver_rejects_malformed_values(#[case] value: &str) {
    let result = Cli::try_parse_from(["tomcat-upgrader", &format!("--ver={value}")]);
    assert!(result.is_err(), "accepted {value}");
}

#[test]
fn patch_resolves_within_product_line() {
    let line = ProductLine { major: 9, minor: 0 };
    assert_eq!(
        VersionArg::Patch(7).resolve(line),
        ReleaseVersion {
            major: 9,
            minor: 0,
            patch: 7
        }
    );
}
