use async_trait::async_trait;
use hostops::runner::{CommandRunner, ExecError, ExecOutput};
use std::sync::Mutex;

/// A scripted [`CommandRunner`] for tests. Every invocation is recorded as a
/// rendered command line; results come from a FIFO of one-shot stubs keyed by
/// substring. An invocation with no matching stub answers with a successful,
/// empty [`ExecOutput`], so tests only script the interesting commands.
#[derive(Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<String>>,
    stubs: Mutex<Vec<(String, ExecOutput)>>,
    binaries: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner that reports the given names as present on the PATH.
    pub fn with_binaries(names: &[&str]) -> Self {
        let runner = Self::default();
        for name in names {
            runner.add_binary(name);
        }
        runner
    }

    pub fn add_binary(&self, name: &str) {
        self.binaries.lock().unwrap().push(name.to_string());
    }

    /// Queue a one-shot canned result for the next invocation whose rendered
    /// command line contains `needle`.
    pub fn stub(&self, needle: &str, output: ExecOutput) {
        self.stubs
            .lock()
            .unwrap()
            .push((needle.to_string(), output));
    }

    pub fn stub_stdout(&self, needle: &str, stdout: &str) {
        self.stub(
            needle,
            ExecOutput {
                code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
    }

    pub fn stub_failure(&self, needle: &str, code: i32, stderr: &str) {
        self.stub(
            needle,
            ExecOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        );
    }

    /// Every command line this runner has been asked to execute, in order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }

    /// Whether any recorded command line contains `needle`.
    pub fn ran(&self, needle: &str) -> bool {
        self.runs_matching(needle) > 0
    }

    pub fn runs_matching(&self, needle: &str) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ExecOutput, ExecError> {
        let line = if args.is_empty() {
            program.to_string()
        } else {
            format!("{program} {}", args.join(" "))
        };
        log::trace!("RecordingRunner invoked: {line}");
        self.invocations.lock().unwrap().push(line.clone());

        let mut stubs = self.stubs.lock().unwrap();
        if let Some(pos) = stubs.iter().position(|(needle, _)| line.contains(needle)) {
            return Ok(stubs.remove(pos).1);
        }

        Ok(ExecOutput {
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn shell(&self, pipeline: &str) -> Result<ExecOutput, ExecError> {
        self.run("/usr/bin/env", &["bash", "-c", pipeline]).await
    }

    fn has_binary(&self, name: &str) -> bool {
        self.binaries.lock().unwrap().iter().any(|b| b == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_answers_in_fifo_order() {
        let runner = RecordingRunner::new();
        runner.stub_stdout("echo", "first\n");
        runner.stub_stdout("echo", "second\n");

        let a = runner.run("echo", &["hi"]).await.unwrap();
        let b = runner.run("echo", &["hi"]).await.unwrap();
        let c = runner.run("echo", &["hi"]).await.unwrap();

        assert_eq!(a.stdout, "first\n");
        assert_eq!(b.stdout, "second\n");
        assert_eq!(c.stdout, "");
        assert_eq!(runner.runs_matching("echo hi"), 3);
    }

    #[tokio::test]
    async fn shell_renders_through_bash() {
        let runner = RecordingRunner::new();
        runner.shell("curl | gpg").await.unwrap();
        assert!(runner.ran("bash -c curl | gpg"));
    }

    #[test]
    fn binary_probe_is_scripted() {
        let runner = RecordingRunner::with_binaries(&["mongod"]);
        assert!(runner.has_binary("mongod"));
        assert!(!runner.has_binary("mongosh"));
    }
}
