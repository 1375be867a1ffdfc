use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_version() {
    Command::cargo_bin("devfeed")
        .expect("binary built")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    Command::cargo_bin("devfeed")
        .expect("binary built")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("devfeed"))
        .stdout(predicate::str::contains("--version"))
        .stdout(predicate::str::contains("--whois"));
}

#[test]
fn whois_requires_a_username() {
    Command::cargo_bin("devfeed")
        .expect("binary built")
        .arg("--whois")
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires a username"));
}
