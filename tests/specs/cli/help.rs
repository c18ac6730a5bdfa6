//! Help and version specs

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("lock")
        .stdout_has("daemon")
        .stdout_has("--endpoint");
}

#[test]
fn lock_help_shows_flags() {
    cli()
        .args(&["lock", "--help"])
        .passes()
        .stdout_has("--ttl")
        .stdout_has("--timeout")
        .stdout_has("[default: 60]");
}

#[test]
fn daemon_help_lists_subcommands() {
    cli()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status")
        .stdout_has("logs");
}

#[test]
fn version_is_printed() {
    cli()
        .args(&["--version"])
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}
