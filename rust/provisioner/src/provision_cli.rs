use clap::Parser;

/// The provisioner takes no arguments at all: every parameter comes from the
/// deployment's env file. Help and version flags are disabled so that *any*
/// token on the command line is rejected with a usage diagnostic before the
/// host is touched.
#[derive(Parser, Debug)]
#[command(
    name = "fablink-provision",
    about = "Prepare this host's MongoDB instance for the FabLink backend",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Root {}
