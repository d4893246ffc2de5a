/// Invocation contract: the provisioner is parameterized by the env file
/// alone. Anything on the command line is a mistake and must fail before the
/// host is touched.
use assert_cmd::Command;

#[test]
fn any_argument_is_rejected_with_a_usage_diagnostic() {
    let mut cmd = Command::cargo_bin("fablink-provision").unwrap();
    // clap's usage-error exit code.
    cmd.arg("--force").assert().failure().code(2);
}

#[test]
fn positional_arguments_are_rejected_too() {
    let mut cmd = Command::cargo_bin("fablink-provision").unwrap();
    cmd.arg("install").assert().failure().code(2);
}

#[test]
fn help_flag_counts_as_an_argument() {
    let mut cmd = Command::cargo_bin("fablink-provision").unwrap();
    cmd.arg("--help").assert().failure().code(2);
}

#[test]
fn a_bare_run_without_an_env_file_is_fatal() {
    // The test binary's sibling directory has no `.env`, so the run must
    // abort on the missing environment file with the provisioner's own
    // (non-clap) failure code.
    let mut cmd = Command::cargo_bin("fablink-provision").unwrap();
    cmd.assert().failure().code(1);
}
