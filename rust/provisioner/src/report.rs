use crate::env_config::EnvConfig;
use crate::target::ConnectionTarget;
use std::fmt::Display;

/// Operator-facing console output. Status lines go to stdout in the same
/// color scheme the rest of the FabLink deploy tooling uses; RUST_LOG-gated
/// diagnostics flow through `log` separately.
const RED: &str = "\x1b[0;31m";
const GREEN: &str = "\x1b[0;32m";
const YELLOW: &str = "\x1b[1;33m";
const BLUE: &str = "\x1b[0;34m";
const RESET: &str = "\x1b[0m";

pub fn info(msg: impl Display) {
    println!("{BLUE}[INFO]{RESET} {msg}");
}

pub fn ok(msg: impl Display) {
    println!("{GREEN}[OK]{RESET} {msg}");
}

pub fn warn(msg: impl Display) {
    println!("{YELLOW}[WARN]{RESET} {msg}");
}

pub fn fail(msg: impl Display) {
    eprintln!("{RED}[FAIL]{RESET} {msg}");
}

/// The closing block: what got provisioned and what the operator does next.
pub fn summary(config: &EnvConfig, target: &ConnectionTarget) {
    println!();
    println!("==========================================");
    println!(" MongoDB ready for FabLink");
    println!("==========================================");
    println!("  URI:               {}", config.uri);
    println!("  Database:          {}", config.db_name);
    println!("  Orders collection: {}", config.orders_collection);
    println!("  Listening on:      {target}");
    println!();
    println!("Next steps:");
    println!("  mongosh {}              # inspect the instance", config.uri);
    println!("  # then start the FabLink backend against this URI");
}
