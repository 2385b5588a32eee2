use assert_cmd::Command;
use predicates::prelude::*;

fn ooo() -> Command {
    let mut cmd = Command::cargo_bin("ooo").unwrap();
    // Keep host credentials out of the tests.
    cmd.env_remove("OOO_API_KEY").env_remove("OPENAI_API_KEY");
    cmd
}

#[test]
fn help_describes_the_date_arguments() {
    ooo()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start_date").ignore_case());
}

#[test]
fn a_single_date_argument_is_a_usage_error() {
    ooo()
        .arg("2024-02-01")
        .assert()
        .failure()
        .stderr(predicate::str::contains("usage"));
}

#[test]
fn malformed_dates_are_rejected() {
    ooo()
        .args(["02/01/2024", "02/14/2024"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid date"));
}

#[test]
fn inverted_range_is_rejected() {
    ooo()
        .args(["2024-02-14", "2024-02-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid date range"));
}

#[test]
fn missing_credentials_fail_before_any_session_work() {
    let dir = tempfile::TempDir::new().unwrap();
    ooo()
        .current_dir(dir.path())
        .args(["2024-01-01", "2024-01-03"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OOO_API_KEY"));
}
