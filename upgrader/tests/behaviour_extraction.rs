//! Behaviour tests for decompressing and unpacking a release archive.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::path::PathBuf;
use tomcat_upgrader::artefact::extraction::{ExtractionError, UnpackSummary, decompress, unpack};
use tomcat_upgrader::config::UpgradeConfig;
use tomcat_upgrader::output::{Reporter, Verbosity};
use tomcat_upgrader::test_utils::{FixtureEntry, release_entries, write_tar_gz};

struct ExtractionWorld {
    _temp_dir: tempfile::TempDir,
    archive: PathBuf,
    dest: PathBuf,
    result: Option<Result<UnpackSummary, ExtractionError>>,
}

#[fixture]
fn world() -> ExtractionWorld {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let archive = temp_dir.path().join("apache-tomcat-8.5.40.tar.gz");
    let dest = temp_dir.path().join("work");
    std::fs::create_dir(&dest).expect("create work dir");
    ExtractionWorld {
        _temp_dir: temp_dir,
        archive,
        dest,
        result: None,
    }
}

impl ExtractionWorld {
    fn summary(&self) -> &UnpackSummary {
        match self.result.as_ref().expect("extraction attempted") {
            Ok(summary) => summary,
            Err(err) => panic!("extraction failed: {err}"),
        }
    }

    fn error(&self) -> &ExtractionError {
        match self.result.as_ref().expect("extraction attempted") {
            Ok(summary) => panic!("extraction succeeded: {summary:?}"),
            Err(err) => err,
        }
    }
}

#[given("a release archive rooted at \"{root}\"")]
fn given_release_archive(world: &mut ExtractionWorld, root: String) {
    write_tar_gz(&world.archive, &release_entries(&root), None).expect("write archive");
}

#[given("an archive holding the entry \"{path}\"")]
fn given_archive_with_entry(world: &mut ExtractionWorld, path: String) {
    let entries = [
        FixtureEntry::dir("apache-tomcat-8.5.40/"),
        FixtureEntry::Unchecked {
            path,
            contents: b"outside".to_vec(),
        },
    ];
    write_tar_gz(&world.archive, &entries, None).expect("write archive");
}

#[given("a download that is not gzip-compressed")]
fn given_plain_download(world: &mut ExtractionWorld) {
    std::fs::write(&world.archive, b"<html>404 Not Found</html>").expect("write file");
}

#[when("the archive is extracted with the default exclusions")]
fn when_extracted(world: &mut ExtractionWorld) {
    let exclusions = UpgradeConfig::default().exclusion_set();
    let mut out = Vec::new();
    let mut reporter = Reporter::new(&mut out, Verbosity::Normal);
    let result = decompress(&world.archive, &world.dest)
        .and_then(|tarball| unpack(&tarball, &world.dest, &exclusions, &mut reporter));
    world.result = Some(result);
}

#[then("the tree contains \"{path}\"")]
fn then_tree_contains(world: &mut ExtractionWorld, path: String) {
    world.summary();
    assert!(world.dest.join(&path).exists(), "{path} missing");
}

#[then("the tree does not contain \"{path}\"")]
fn then_tree_lacks(world: &mut ExtractionWorld, path: String) {
    world.summary();
    assert!(!world.dest.join(&path).exists(), "{path} was extracted");
}

#[then("{count} entries were excluded")]
fn then_excluded_count(world: &mut ExtractionWorld, count: usize) {
    assert_eq!(world.summary().excluded, count);
}

#[then("extraction fails with a path traversal error")]
fn then_path_traversal(world: &mut ExtractionWorld) {
    assert!(
        matches!(world.error(), ExtractionError::PathTraversal { .. }),
        "unexpected error {:?}",
        world.error()
    );
    assert!(!world.dest.parent().expect("parent").join("escape.txt").exists());
}

#[then("extraction fails as invalid gzip")]
fn then_invalid_gzip(world: &mut ExtractionWorld) {
    assert!(
        matches!(world.error(), ExtractionError::InvalidGzip { .. }),
        "unexpected error {:?}",
        world.error()
    );
}

#[scenario(
    path = "tests/features/archive_extraction.feature",
    name = "Default exclusions skip bundled applications"
)]
fn scenario_default_exclusions(world: ExtractionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/archive_extraction.feature",
    name = "Entries escaping the destination are rejected"
)]
fn scenario_path_traversal(world: ExtractionWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/archive_extraction.feature",
    name = "Input that is not gzip-compressed is rejected"
)]
fn scenario_not_gzip(world: ExtractionWorld) {
    let _ = world;
}
