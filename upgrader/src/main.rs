//! Tomcat upgrader CLI entrypoint.
//!
//! Downloads and verifies a Tomcat release, unpacks it beside the existing
//! installation, migrates its configuration, and republishes the stable
//! link.

use clap::Parser;
use std::io::{self, BufRead, Write};
use tomcat_upgrader::cli::Cli;
use tomcat_upgrader::config::UpgradeConfig;
use tomcat_upgrader::dirs::{BaseDirs, SystemBaseDirs};
use tomcat_upgrader::error::Result;
use tomcat_upgrader::logging::{self, FailurePolicy};
use tomcat_upgrader::output::{DryRunInfo, Reporter, write_stderr_line};
use tomcat_upgrader::pipeline::{check_install_dir, plan_upgrade, run_upgrade};
use tomcat_upgrader::prompt::prompt_for_patch;
use tomcat_upgrader::release::ReleaseVersion;

/// Used when the user profile cannot be resolved; no config dir is known.
struct NoBaseDirs;

impl BaseDirs for NoBaseDirs {
    fn config_dir(&self) -> Option<std::path::PathBuf> {
        None
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let mut stderr = io::stderr();
    let run_result = run(&cli, &mut io::stdin().lock(), &mut stderr);
    let exit_code =
        exit_code_for_run_result(run_result, FailurePolicy::from_flag(cli.log), &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdin: &mut dyn BufRead, stderr: &mut dyn Write) -> Result<()> {
    let config = load_config(cli)?;

    // The installation is checked before asking for a version.
    check_install_dir(&config)?;
    let version = select_version(cli, &config, stdin, stderr)?;

    if cli.dry_run {
        let plan = plan_upgrade(&config, version);
        let info = DryRunInfo {
            config: &config,
            urls: &plan.urls,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    let mut reporter = Reporter::new(stderr, cli.verbosity());
    let report = run_upgrade(&config, version, &mut reporter)?;
    log::debug!(
        "upgraded to {} ({} files migrated)",
        report.release_dir.display(),
        report.migrated.len()
    );
    if let Some(remote) = &report.remote {
        log::debug!(
            "transferred {} ({} bytes, last modified {})",
            remote.url,
            remote.metadata.content_length.unwrap_or_default(),
            remote.metadata.last_modified.as_deref().unwrap_or("unknown")
        );
    }
    reporter.progress("Tomcat update complete");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<UpgradeConfig> {
    let config = match SystemBaseDirs::new() {
        Some(dirs) => UpgradeConfig::discover(cli.config.as_deref(), &dirs)?,
        None => UpgradeConfig::discover(cli.config.as_deref(), &NoBaseDirs)?,
    };
    Ok(config.with_overrides(cli.overrides()))
}

fn select_version(
    cli: &Cli,
    config: &UpgradeConfig,
    stdin: &mut dyn BufRead,
    stderr: &mut dyn Write,
) -> Result<ReleaseVersion> {
    if let Some(ver) = cli.ver {
        return Ok(ver.resolve(config.product));
    }
    let patch = prompt_for_patch(&config.product, stdin, stderr)?;
    Ok(config.product.release(patch))
}

fn exit_code_for_run_result(
    result: Result<()>,
    policy: FailurePolicy,
    stderr: &mut dyn Write,
) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => policy.report(&err, stderr),
    }
}
