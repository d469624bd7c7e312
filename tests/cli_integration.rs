//! Binary-level tests.
//!
//! Each test runs `ssoenv` with a temporary home and config file and checks
//! the exit code and stderr. Nothing here reaches the network: every case
//! fails (or finishes) before the identity provider would be contacted.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"
url_action = "print"
secure_store = "file"

[sso.Default]
start_url = "https://example.awsapps.com/start"
sso_region = "us-east-1"
"#;

struct Home {
    dir: TempDir,
}

impl Home {
    fn new(config: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        std::fs::write(dir.path().join("config.toml"), config).expect("write config");
        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    /// `ssoenv` with a clean environment rooted at this home.
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("ssoenv").expect("binary built");
        for var in [
            "AWS_PROFILE",
            "AWS_ACCESS_KEY_ID",
            "AWS_SECRET_ACCESS_KEY",
            "AWS_SSO",
            "RUST_LOG",
            "SSOENV_CONFIG",
        ] {
            cmd.env_remove(var);
        }
        cmd.env("SSOENV_HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg"))
            .env("AWS_SSO_FILE_PASSWORD", "test-password")
            .arg("--config")
            .arg(self.config());
        cmd
    }
}

#[test]
fn help_lists_commands() {
    let home = Home::new(CONFIG);
    home.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("flush"));
}

#[test]
fn exec_refuses_existing_profile() {
    let home = Home::new(CONFIG);
    home.cmd()
        .env("AWS_PROFILE", "already-set")
        .args(["exec", "--arn", "arn:aws:iam::000000000042:role/admin", "--", "true"])
        .assert()
        .code(9)
        .stderr(predicate::str::starts_with("error:"))
        .stderr(predicate::str::contains("AWS_PROFILE"));
}

#[test]
fn exec_partial_account_role_is_input_error() {
    let home = Home::new(CONFIG);
    home.cmd()
        .args(["exec", "--account", "42", "--", "true"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("both --account and --role"));
}

#[test]
fn exec_without_selection_is_input_error() {
    let home = Home::new(CONFIG);
    home.cmd().args(["exec", "--", "true"]).assert().code(3);
}

#[test]
fn no_sso_instance_is_config_error() {
    let home = Home::new("");
    home.cmd()
        .arg("login")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no SSO instance configured"));
}

#[test]
fn unknown_sso_instance_is_config_error() {
    let home = Home::new(CONFIG);
    home.cmd()
        .env("AWS_SSO", "Elsewhere")
        .arg("login")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Elsewhere"));
}

#[test]
fn malformed_config_is_config_error() {
    let home = Home::new("url_action = \"fax\"\n");
    home.cmd().arg("login").assert().code(2);
}

#[test]
fn non_interactive_login_requires_auth() {
    let home = Home::new(CONFIG);
    home.cmd()
        .args(["login", "--no-interactive"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("ssoenv login"));
}

#[test]
fn flush_on_empty_store_succeeds() {
    let home = Home::new(CONFIG);
    home.cmd()
        .arg("flush")
        .assert()
        .success()
        .stderr(predicate::str::contains("Deleted 0 role credential(s) for Default."));
}

#[test]
fn invalid_url_action_flag_is_rejected_by_parser() {
    let home = Home::new(CONFIG);
    home.cmd()
        .args(["login", "--url-action", "fax"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("fax"));
}
