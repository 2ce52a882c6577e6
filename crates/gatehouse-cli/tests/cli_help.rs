use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("gatehouse")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("signin"))
        .stdout(predicate::str::contains("signup"))
        .stdout(predicate::str::contains("oauth"))
        .stdout(predicate::str::contains("whoami"))
        .stdout(predicate::str::contains("signout"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_signup_help_lists_image_flags() {
    cargo_bin_cmd!("gatehouse")
        .args(["signup", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--avatar"))
        .stdout(predicate::str::contains("--cover"))
        .stdout(predicate::str::contains("--password-stdin"));
}

#[test]
fn test_unknown_oauth_provider_is_rejected() {
    cargo_bin_cmd!("gatehouse")
        .args(["oauth", "myspace"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("myspace"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("gatehouse")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gatehouse"));
}
