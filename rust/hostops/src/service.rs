/// Service lifecycle control. Hosts provisioned for FabLink are expected to
/// run systemd, but the container images used for local work don't, so
/// everything here degrades to the legacy `service` tool.
use crate::runner::{CommandRunner, ExecError, ExecOutput};
use log::warn;

/// Which service-control mechanism the host offers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ServiceManager {
    Systemd,
    Legacy,
}

/// Prefer systemd when it reports itself operational. `is-system-running`
/// exits nonzero on an otherwise healthy host with a single failed unit
/// ("degraded"), which is still a usable manager.
pub async fn detect_manager(runner: &dyn CommandRunner) -> ServiceManager {
    if !runner.has_binary("systemctl") {
        return ServiceManager::Legacy;
    }

    match runner.run("systemctl", &["is-system-running"]).await {
        Ok(out) => {
            let state = out.stdout.trim();
            if out.success() || state == "running" || state == "degraded" {
                ServiceManager::Systemd
            } else {
                ServiceManager::Legacy
            }
        }
        Err(e) => {
            warn!("systemctl probe failed ({e}), using legacy service control");
            ServiceManager::Legacy
        }
    }
}

/// Restart `unit` if it's already active, else start it fresh. Manager
/// reload/enable hiccups are logged and swallowed; only the final
/// start/restart outcome is reported to the caller.
pub async fn restart_or_start(runner: &dyn CommandRunner, unit: &str) -> Result<(), ExecError> {
    match detect_manager(runner).await {
        ServiceManager::Systemd => {
            if let Err(e) = run_checked(runner, "systemctl", &["daemon-reload"]).await {
                warn!("systemctl daemon-reload failed: {e}");
            }
            if let Err(e) = run_checked(runner, "systemctl", &["enable", unit]).await {
                warn!("systemctl enable {unit} failed: {e}");
            }

            let active = runner
                .run("systemctl", &["is-active", "--quiet", unit])
                .await?;
            let verb = if active.success() { "restart" } else { "start" };
            runner.run("systemctl", &[verb, unit]).await?.require_success()?;
            Ok(())
        }
        ServiceManager::Legacy => {
            if let Ok(out) = runner.run("service", &[unit, "restart"]).await {
                if out.success() {
                    return Ok(());
                }
            }
            runner
                .run("service", &[unit, "start"])
                .await?
                .require_success()?;
            Ok(())
        }
    }
}

async fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<ExecOutput, ExecError> {
    runner.run(program, args).await?.require_success()
}

// Unit tests for this module live in `tests/service.rs` as integration tests:
// they exercise the module through the recording fake in `mock_utils`, which
// depends on `hostops`. A `#[cfg(test)]` module here would compile `hostops`
// as a distinct crate instance from the one `mock_utils` links against, so the
// `CommandRunner` trait would fail to unify. Integration tests link `hostops`
// as a normal dependency, matching `mock_utils`.
