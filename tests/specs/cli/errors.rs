//! Argument error specs

use crate::prelude::*;

#[test]
fn unknown_command_fails() {
    cli()
        .args(&["unlock"])
        .fails()
        .code(2)
        .stderr_has("unrecognized subcommand");
}

#[test]
fn lock_requires_a_name() {
    cli()
        .args(&["lock"])
        .fails()
        .stderr_has("<NAME>");
}

#[test]
fn lock_rejects_bad_timeout() {
    cli()
        .args(&["lock", "--timeout", "eventually", "a"])
        .fails()
        .stderr_has("--timeout");
}

#[test]
fn lock_rejects_non_numeric_ttl() {
    cli()
        .args(&["lock", "--ttl", "forever", "a"])
        .fails()
        .stderr_has("--ttl");
}
