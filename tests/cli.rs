//! End-to-end tests driving the binary against a fake `ia` executable on PATH.

#![cfg(unix)]
// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Installs a fake `ia` shell script into `dir` and makes it executable.
fn install_fake_ia(dir: &Path, script: &str) {
    let path = dir.join("ia");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Builds a command running in `work` with `fake_bin` first on PATH.
/// `/usr/bin:/bin` stays on PATH so the fake script can use the shell tools.
fn downloader(work: &Path, fake_bin: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ia-downloader").unwrap();
    cmd.current_dir(work)
        .env("PATH", format!("{}:/usr/bin:/bin", fake_bin.display()))
        .arg("--plain")
        .timeout(Duration::from_secs(30));
    cmd
}

#[test]
fn help_shows_plain_flag() {
    let mut cmd = Command::cargo_bin("ia-downloader").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--plain"));
}

#[test]
fn missing_ia_tool_is_fatal_before_any_prompt() {
    let work = TempDir::new().unwrap();
    let empty_bin = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("ia-downloader").unwrap();
    cmd.current_dir(work.path())
        .env("PATH", empty_bin.path().display().to_string())
        .arg("--plain")
        .timeout(Duration::from_secs(30))
        .write_stdin("")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains(
            "The Internet Archive CLI tool ('ia') is not installed or not in your PATH.",
        ))
        .stdout(predicate::str::contains("pip install internetarchive"));
}

#[test]
fn size_check_reports_totals_and_exports_csv() {
    let work = TempDir::new().unwrap();
    let fake_bin = TempDir::new().unwrap();
    install_fake_ia(
        fake_bin.path(),
        r#"#!/bin/sh
case "$1" in
  --version) echo "ia 3.5.0"; exit 0 ;;
  search) printf 'a1\na2\n'; exit 0 ;;
  metadata)
    if [ "$2" = "a1" ]; then
      printf '{"files":[{"name":"x.pdf","size":"2048"},{"name":"y.txt","size":999}],"metadata":{"title":"First Item"}}'
      exit 0
    fi
    echo "item not found" >&2
    exit 1
    ;;
  *) exit 1 ;;
esac
"#,
    );

    downloader(work.path(), fake_bin.path())
        .write_stdin("collection:test AND mediatype:texts\n1\ny\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 items matching your search."))
        .stdout(predicate::str::contains("Total Items Scanned: 2"))
        .stdout(predicate::str::contains("Total PDF Files: 1"))
        .stdout(predicate::str::contains("Total Size: 2.00 KB"))
        .stdout(predicate::str::contains("Encountered 1 errors:"))
        .stdout(predicate::str::contains("Failed to get metadata for item: a2"))
        .stdout(predicate::str::contains("Size report exported to:"));

    let csv = fs::read_to_string(work.path().join("filesize_report.csv")).unwrap();
    assert_eq!(
        csv,
        "Item ID,Title,PDF Count,Size (Bytes),Size (Formatted)\n\
         a1,First Item,1,2048,2.00 KB\n"
    );
}

#[test]
fn size_check_with_no_usable_items_skips_the_report_file() {
    let work = TempDir::new().unwrap();
    let fake_bin = TempDir::new().unwrap();
    install_fake_ia(
        fake_bin.path(),
        r#"#!/bin/sh
case "$1" in
  --version) exit 0 ;;
  search) printf 'ghost\n'; exit 0 ;;
  metadata) printf '{}'; exit 0 ;;
  *) exit 1 ;;
esac
"#,
    );

    downloader(work.path(), fake_bin.path())
        .write_stdin("q\n1\ny\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encountered 1 errors:"))
        .stdout(predicate::str::contains("empty metadata record"))
        .stdout(predicate::str::contains("Total PDF Files: 0"))
        .stdout(predicate::str::contains("Total Size: 0 Bytes"))
        .stdout(predicate::str::contains("Nothing to export"));

    assert!(!work.path().join("filesize_report.csv").exists());
}

#[test]
fn download_relocates_pdfs_and_writes_metadata_csv() {
    let work = TempDir::new().unwrap();
    let fake_bin = TempDir::new().unwrap();
    install_fake_ia(
        fake_bin.path(),
        r#"#!/bin/sh
case "$1" in
  --version) exit 0 ;;
  search) printf 'item-one\nitem-two\n'; exit 0 ;;
  metadata)
    printf '{"files":[{"name":"scan.pdf","size":10}],"metadata":{"title":"Annual Report","call number":"CN 42"}}'
    exit 0
    ;;
  download)
    mkdir -p "$2"
    printf 'pdfbytes' > "$2/scan.pdf"
    exit 0
    ;;
  *) exit 1 ;;
esac
"#,
    );

    downloader(work.path(), fake_bin.path())
        .write_stdin("q\n2\npdfs\ny\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created directory:"))
        .stdout(predicate::str::contains(
            "Successfully processed 2 files from 2 items.",
        ))
        .stdout(predicate::str::contains("Metadata file created:"));

    let dest = work.path().join("pdfs");
    assert!(dest.join("scan.pdf").exists());
    assert!(dest.join("scan (1).pdf").exists());
    assert!(!work.path().join("item-one").exists());
    assert!(!work.path().join("item-two").exists());

    let csv = fs::read_to_string(dest.join("internet_archive_metadata.csv")).unwrap();
    assert_eq!(
        csv,
        "ItemID,FileName,title,creator,publisher,date,subject,language,description,call_number\n\
         item-one,scan.pdf,Annual Report,,,,,,,CN 42\n\
         item-two,scan (1).pdf,Annual Report,,,,,,,CN 42\n"
    );
}

#[test]
fn download_with_no_usable_items_reports_and_skips_the_csv() {
    let work = TempDir::new().unwrap();
    let fake_bin = TempDir::new().unwrap();
    install_fake_ia(
        fake_bin.path(),
        r#"#!/bin/sh
case "$1" in
  --version) exit 0 ;;
  search) printf 'bad-one\nbad-two\n'; exit 0 ;;
  metadata) echo "connection reset" >&2; exit 1 ;;
  *) exit 1 ;;
esac
"#,
    );

    downloader(work.path(), fake_bin.path())
        .write_stdin("q\n2\n\ny\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Download location: Current directory"))
        .stdout(predicate::str::contains("Encountered 2 errors during download:"))
        .stdout(predicate::str::contains(" - Failed to get metadata for item: bad-one"))
        .stdout(predicate::str::contains("bad-one. Error:").not())
        .stdout(predicate::str::contains(
            "No items were successfully processed or downloaded.",
        ));

    assert!(!work.path().join("internet_archive_metadata.csv").exists());
}

#[test]
fn declining_download_confirmation_is_a_clean_no_op() {
    let work = TempDir::new().unwrap();
    let fake_bin = TempDir::new().unwrap();
    install_fake_ia(
        fake_bin.path(),
        r#"#!/bin/sh
case "$1" in
  --version) exit 0 ;;
  search) printf 'item-one\n'; exit 0 ;;
  metadata) printf '{"metadata":{"title":"T"}}'; exit 0 ;;
  download) mkdir -p "$2"; exit 0 ;;
  *) exit 1 ;;
esac
"#,
    );

    downloader(work.path(), fake_bin.path())
        .write_stdin("q\n2\n\nn\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Download cancelled."));

    assert!(!work.path().join("internet_archive_metadata.csv").exists());
    assert!(!work.path().join("item-one").exists());
}

#[test]
fn zero_search_results_exit_nonzero() {
    let work = TempDir::new().unwrap();
    let fake_bin = TempDir::new().unwrap();
    install_fake_ia(
        fake_bin.path(),
        r#"#!/bin/sh
case "$1" in
  --version) exit 0 ;;
  search) exit 0 ;;
  *) exit 1 ;;
esac
"#,
    );

    downloader(work.path(), fake_bin.path())
        .write_stdin("nothing here\n")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains(
            "No items found for the search query: nothing here",
        ))
        .stdout(predicate::str::contains(
            "Please check your search syntax and try again.",
        ));
}

#[test]
fn search_failure_surfaces_the_diagnostic() {
    let work = TempDir::new().unwrap();
    let fake_bin = TempDir::new().unwrap();
    install_fake_ia(
        fake_bin.path(),
        r#"#!/bin/sh
case "$1" in
  --version) exit 0 ;;
  search) echo "service unavailable" >&2; exit 2 ;;
  *) exit 1 ;;
esac
"#,
    );

    downloader(work.path(), fake_bin.path())
        .write_stdin("q\n")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains(
            "Error searching Internet Archive: ia search failed: service unavailable",
        ));
}

#[test]
fn closed_stdin_is_an_unexpected_error() {
    let work = TempDir::new().unwrap();
    let fake_bin = TempDir::new().unwrap();
    install_fake_ia(
        fake_bin.path(),
        r#"#!/bin/sh
case "$1" in
  --version) exit 0 ;;
  *) exit 1 ;;
esac
"#,
    );

    downloader(work.path(), fake_bin.path())
        .write_stdin("")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("An unexpected error occurred"));
}

#[test]
fn invalid_menu_answers_reprompt_until_valid() {
    let work = TempDir::new().unwrap();
    let fake_bin = TempDir::new().unwrap();
    install_fake_ia(
        fake_bin.path(),
        r#"#!/bin/sh
case "$1" in
  --version) exit 0 ;;
  search) printf 'lone-item\n'; exit 0 ;;
  metadata) printf '{"files":[{"name":"a.pdf","size":100}],"metadata":{"title":"T"}}'; exit 0 ;;
  *) exit 1 ;;
esac
"#,
    );

    // Empty query, then a real one; "3" is rejected before "1" is accepted;
    // "maybe" is rejected before the export confirm accepts "no".
    downloader(work.path(), fake_bin.path())
        .write_stdin("\nq\n3\n1\nmaybe\nno\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Please enter a valid search query."))
        .stdout(predicate::str::contains("Please enter 1 or 2."))
        .stdout(predicate::str::contains("Please answer y or n."))
        .stdout(predicate::str::contains("Total PDF Files: 1"));

    assert!(!work.path().join("filesize_report.csv").exists());
}
