/*
 One-shot MongoDB provisioner for FabLink hosts.

 // Reads the deployment env file, then in order:
   - installs the release-appropriate MongoDB series if absent
   - points mongod.conf at the configured port on loopback (with backup)
   - restarts the service and pings it
 Only a missing env file or an unrecoverable install aborts the run;
 everything else is reported and left for the operator.
*/

mod apt_repo;
mod env_config;
mod mongod_conf;
mod provision_cli;
mod report;
mod series;
mod target;
mod verify;

use anyhow::Result;
use apt_repo::AptLayout;
use clap::Parser;
use env_config::EnvConfig;
use hostops::os_release;
use hostops::runner::{CommandRunner, HostRunner};
use hostops::service;
use log::debug;
use serde_derive::Serialize;
use std::path::PathBuf;
use target::ConnectionTarget;
use verify::Liveness;

const SERVICE_UNIT: &str = "mongod";

/// Everything the sequential steps need, resolved up front so each step is an
/// explicit function of this plan rather than of ambient process state.
#[derive(Debug, Serialize)]
struct ProvisionPlan {
    config: EnvConfig,
    target: ConnectionTarget,
    codename: String,
    series: series::Series,
}

/// Host locations the run touches. Split from the logic so the whole pipeline
/// can be exercised against a tempdir and a recording runner.
struct ProvisionPaths {
    env_file: PathBuf,
    mongod_conf: PathBuf,
    apt: AptLayout,
}

impl ProvisionPaths {
    fn host_defaults() -> Result<ProvisionPaths> {
        Ok(ProvisionPaths {
            env_file: EnvConfig::default_path()?,
            mongod_conf: PathBuf::from(mongod_conf::MONGOD_CONF_PATH),
            apt: AptLayout::default(),
        })
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    provision_cli::Root::parse();

    let paths = match ProvisionPaths::host_defaults() {
        Ok(paths) => paths,
        Err(e) => fatal(&e),
    };

    match run(&HostRunner, &paths).await {
        Ok(plan) => report::summary(&plan.config, &plan.target),
        Err(e) => fatal(&e),
    }
}

fn fatal(e: &anyhow::Error) -> ! {
    report::fail(format!("{e:#}"));
    std::process::exit(1);
}

async fn run(runner: &dyn CommandRunner, paths: &ProvisionPaths) -> Result<ProvisionPlan> {
    let config = EnvConfig::load(&paths.env_file)?;
    report::info(format!(
        "Environment loaded from {}",
        paths.env_file.display()
    ));

    let target = ConnectionTarget::from_uri(&config.uri);
    let codename = os_release::release_codename();
    let series = series::series_for_release(&codename);
    let plan = ProvisionPlan {
        config,
        target,
        codename,
        series,
    };
    debug!(
        "Resolved provisioning plan:\n{}",
        serde_json::to_string_pretty(&plan)?
    );
    report::info(format!(
        "Target {} on release {} (series {})",
        plan.target, plan.codename, plan.series
    ));

    if runner.has_binary("mongod") {
        report::info("mongod already installed, skipping package installation");
    } else {
        report::info(format!("Installing MongoDB {} packages", plan.series));
        let installed =
            apt_repo::install_server(runner, &paths.apt, &plan.codename, plan.series).await?;
        report::ok(format!("MongoDB {installed} installed"));
    }

    match mongod_conf::apply_network_settings(&paths.mongod_conf, plan.target.port) {
        Ok(applied) => {
            if let Some(backup) = &applied.backup {
                report::info(format!("Existing config backed up to {}", backup.display()));
            }
            if applied.written {
                report::ok(format!(
                    "{} now binds {}:{}",
                    paths.mongod_conf.display(),
                    mongod_conf::LOOPBACK,
                    plan.target.port
                ));
            } else {
                report::info("Config already has the requested network settings");
            }
        }
        Err(e) => report::warn(format!(
            "Could not update {} ({e:#}); set port/bindIp manually",
            paths.mongod_conf.display()
        )),
    }

    report::info("Restarting mongod");
    match service::restart_or_start(runner, SERVICE_UNIT).await {
        Ok(()) => report::ok("mongod is running"),
        Err(e) => report::warn(format!(
            "Could not restart mongod ({e}); start it manually once the host is ready"
        )),
    }

    match verify::ping(runner, &plan.config.uri).await {
        Liveness::Confirmed => report::ok("MongoDB answered the liveness ping"),
        Liveness::NotResponding(detail) => report::warn(format!(
            "No ping response yet ({detail}); the service may still be starting"
        )),
        Liveness::NoClientTool => {
            report::warn("mongosh not found, skipping the connectivity check")
        }
    }

    Ok(plan)
}
