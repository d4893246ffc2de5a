use hostops::runner::CommandRunner;
use std::time::Duration;

const PING_WAIT: Duration = Duration::from_secs(15);

/// What the liveness check concluded. Nothing here is fatal: the service can
/// legitimately still be coming up when the check runs.
#[derive(Debug, PartialEq, Eq)]
pub enum Liveness {
    Confirmed,
    NotResponding(String),
    NoClientTool,
}

/// Round-trip a `ping` admin command through the mongosh client, bounded by
/// [`PING_WAIT`]. Hosts without the client tool skip verification entirely.
pub async fn ping(runner: &dyn CommandRunner, uri: &str) -> Liveness {
    if !runner.has_binary("mongosh") {
        return Liveness::NoClientTool;
    }

    let args = [uri, "--quiet", "--eval", "db.adminCommand({ ping: 1 })"];
    match tokio::time::timeout(PING_WAIT, runner.run("mongosh", &args)).await {
        Ok(Ok(out)) if out.success() => Liveness::Confirmed,
        Ok(Ok(out)) => Liveness::NotResponding(out.stderr.trim().to_string()),
        Ok(Err(e)) => Liveness::NotResponding(e.to_string()),
        Err(_) => Liveness::NotResponding(format!(
            "no ping response within {}s",
            PING_WAIT.as_secs()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_utils::RecordingRunner;

    #[tokio::test]
    async fn confirmed_when_the_server_answers() {
        let runner = RecordingRunner::with_binaries(&["mongosh"]);
        runner.stub_stdout("adminCommand", "{ ok: 1 }\n");

        let result = ping(&runner, "mongodb://localhost:27017").await;
        assert_eq!(result, Liveness::Confirmed);
        assert!(runner.ran("mongosh mongodb://localhost:27017 --quiet --eval"));
    }

    #[tokio::test]
    async fn refused_connection_is_advisory() {
        let runner = RecordingRunner::with_binaries(&["mongosh"]);
        runner.stub_failure("adminCommand", 1, "MongoNetworkError: connect ECONNREFUSED");

        match ping(&runner, "mongodb://localhost:27017").await {
            Liveness::NotResponding(detail) => assert!(detail.contains("ECONNREFUSED")),
            other => panic!("expected NotResponding, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_client_tool_skips_the_check() {
        let runner = RecordingRunner::new();
        assert_eq!(
            ping(&runner, "mongodb://localhost:27017").await,
            Liveness::NoClientTool
        );
        assert!(runner.invocations().is_empty());
    }
}
