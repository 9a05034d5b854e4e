//! Hand-off to the external ingestion process.
//!
//! The ingestion program (by default a Python script that generates FAQs and
//! embeddings) is opaque to us: it receives a Markdown file and a table name
//! on its command line and reports through its exit code and output streams.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, instrument, warn};

use sitedigest_shared::{IngestSection, Result, SiteDigestError};

/// Captured result of a successful ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// How to launch the ingestion process.
#[derive(Debug, Clone)]
pub struct IngestCommand {
    pub program: String,
    /// Passed before the flags; skipped when empty.
    pub script: String,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl From<&IngestSection> for IngestCommand {
    fn from(section: &IngestSection) -> Self {
        Self {
            program: section.program.clone(),
            script: section.script.clone(),
            working_dir: section.working_dir.as_ref().map(PathBuf::from),
            timeout: Duration::from_secs(section.timeout_secs),
        }
    }
}

impl IngestCommand {
    /// Run `<program> <script> --input <path> --table <table> [--clear]`.
    #[instrument(skip(self), fields(program = %self.program, input = %input.display()))]
    pub async fn run(&self, input: &Path, table: &str, clear: bool) -> Result<IngestOutput> {
        let mut cmd = Command::new(&self.program);
        if !self.script.is_empty() {
            cmd.arg(&self.script);
        }
        cmd.arg("--input").arg(input).arg("--table").arg(table);
        if clear {
            cmd.arg("--clear");
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!("starting ingestion");
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(error = %e, "failed to spawn ingestion process");
                return Err(SiteDigestError::Collaborator {
                    code: None,
                    stdout: String::new(),
                    stderr: format!("failed to spawn `{}`: {e}", self.program),
                });
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "ingestion timed out");
                return Err(SiteDigestError::Collaborator {
                    code: None,
                    stdout: String::new(),
                    stderr: format!("ingestion timed out after {:?}", self.timeout),
                });
            }
        };

        let result = IngestOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            warn!(code = ?result.code, "ingestion failed");
            return Err(SiteDigestError::Collaborator {
                code: result.code,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        info!(stdout_len = result.stdout.len(), "ingestion finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(body: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sitedigest-ingest-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ingest.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn sh(script: &Path, timeout: Duration) -> IngestCommand {
        IngestCommand {
            program: "sh".into(),
            script: script.to_string_lossy().into_owned(),
            working_dir: None,
            timeout,
        }
    }

    #[tokio::test]
    async fn passes_arguments_and_captures_stdout() {
        let path = script("echo \"$@\"\n");
        let out = sh(&path, Duration::from_secs(10))
            .run(Path::new("report.md"), "loja_example", true)
            .await
            .unwrap();

        assert_eq!(out.code, Some(0));
        assert_eq!(out.stdout.trim(), "--input report.md --table loja_example --clear");
    }

    #[tokio::test]
    async fn non_zero_exit_is_collaborator_failure() {
        let path = script("echo partial\necho 'table missing' >&2\nexit 3\n");
        let err = sh(&path, Duration::from_secs(10))
            .run(Path::new("report.md"), "t", false)
            .await
            .unwrap_err();

        match err {
            SiteDigestError::Collaborator { code, stdout, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stdout, "partial\n");
                assert_eq!(stderr, "table missing\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_collaborator_failure() {
        let path = script("sleep 5\n");
        let err = sh(&path, Duration::from_millis(100))
            .run(Path::new("report.md"), "t", false)
            .await
            .unwrap_err();

        assert!(matches!(err, SiteDigestError::Collaborator { code: None, .. }));
    }

    #[tokio::test]
    async fn missing_program_is_collaborator_failure() {
        let cmd = IngestCommand {
            program: "sitedigest-no-such-program".into(),
            script: String::new(),
            working_dir: None,
            timeout: Duration::from_secs(5),
        };
        let err = cmd.run(Path::new("report.md"), "t", false).await.unwrap_err();
        assert!(matches!(err, SiteDigestError::Collaborator { code: None, .. }));
    }

    #[test]
    fn built_from_config_section() {
        let cmd = IngestCommand::from(&IngestSection::default());
        assert_eq!(cmd.program, "python3");
        assert_eq!(cmd.script, "langchain/Agente_FAQ.py");
        assert_eq!(cmd.timeout, Duration::from_secs(300));
    }
}
