use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::model::RawRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    pub decompress: Vec<String>,
    pub query: Vec<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            decompress: vec!["zstd".to_string(), "-c".to_string(), "-d".to_string()],
            query: vec![
                "jq".to_string(),
                "--slurp".to_string(),
                "map({seq, code, latency})".to_string(),
            ],
        }
    }
}

impl Toolchain {
    pub fn programs(&self) -> impl Iterator<Item = &str> {
        [&self.decompress, &self.query]
            .into_iter()
            .filter_map(|stage| stage.first().map(String::as_str))
    }

    pub fn read_records(&self, path: &Path) -> PipelineResult<Vec<RawRecord>> {
        let mut decompress = stage_command(&self.decompress)?;
        decompress.arg(path);
        let query = stage_command(&self.query)?;

        let stdout = pipe_processes(vec![decompress, query])?;
        serde_json::from_slice(&stdout).map_err(|source| PipelineError::json(path, source))
    }
}

fn stage_command(stage: &[String]) -> PipelineResult<Command> {
    let (program, args) = stage.split_first().ok_or_else(|| PipelineError::Spawn {
        program: String::new(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
    })?;
    let mut command = Command::new(program);
    command.args(args);
    Ok(command)
}

/// Runs `stages` as a shell-style pipeline and returns the stdout of the last
/// stage. Every stage must exit successfully.
pub fn pipe_processes(stages: Vec<Command>) -> PipelineResult<Vec<u8>> {
    let stage_count = stages.len();
    let mut children: Vec<(String, Child)> = Vec::with_capacity(stage_count);
    let mut upstream: Option<ChildStdout> = None;

    for (position, mut command) in stages.into_iter().enumerate() {
        let program = command.get_program().to_string_lossy().into_owned();
        let is_last = position + 1 == stage_count;

        if let Some(stdout) = upstream.take() {
            command.stdin(Stdio::from(stdout));
        }
        command.stdout(Stdio::piped());
        if is_last {
            command.stderr(Stdio::piped());
        }

        let spawned = command.spawn();
        // dropping the command closes the parent's end of the upstream pipe
        drop(command);

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                reap(children);
                return Err(PipelineError::Spawn { program, source });
            }
        };
        debug!(program = %program, pid = child.id(), "spawned pipeline stage");

        if !is_last {
            upstream = child.stdout.take();
        }
        children.push((program, child));
    }

    let Some((program, last)) = children.pop() else {
        return Ok(Vec::new());
    };

    let output = last.wait_with_output().map_err(|source| PipelineError::Spawn {
        program: program.clone(),
        source,
    })?;

    let mut upstream_statuses = Vec::with_capacity(children.len());
    for (name, mut child) in children {
        let status = child
            .wait()
            .map_err(|source| PipelineError::Spawn {
                program: name.clone(),
                source,
            })?;
        upstream_statuses.push((name, status));
    }

    if !output.status.success() {
        return Err(PipelineError::ProcessFailed {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    if let Some((name, status)) = upstream_statuses
        .into_iter()
        .find(|(_, status)| !status.success())
    {
        return Err(PipelineError::ProcessFailed {
            program: name,
            status,
            stderr: String::new(),
        });
    }

    Ok(output.stdout)
}

fn reap(children: Vec<(String, Child)>) {
    for (_, mut child) in children {
        let _ = child.kill();
        let _ = child.wait();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn command(program: &str, args: &[&str]) -> Command {
        let mut command = Command::new(program);
        command.args(args);
        command
    }

    #[test]
    fn pipes_stdout_between_stages() {
        let output = pipe_processes(vec![
            command("printf", &["b\\na\\nc\\n"]),
            command("sort", &[]),
        ])
        .expect("pipeline runs");

        assert_eq!(String::from_utf8_lossy(&output), "a\nb\nc\n");
    }

    #[test]
    fn empty_pipeline_yields_nothing() {
        let output = pipe_processes(Vec::new()).expect("nothing to run");
        assert!(output.is_empty());
    }

    #[test]
    fn failing_stage_is_reported() {
        let err = pipe_processes(vec![command("printf", &["x"]), command("false", &[])])
            .expect_err("false exits non-zero");
        assert!(matches!(err, PipelineError::ProcessFailed { ref program, .. } if program == "false"));

        let err = pipe_processes(vec![command("false", &[]), command("cat", &[])])
            .expect_err("upstream failure is fatal");
        assert!(matches!(err, PipelineError::ProcessFailed { ref program, .. } if program == "false"));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = pipe_processes(vec![command("benchstats-no-such-tool", &[])])
            .expect_err("program does not exist");
        assert!(matches!(err, PipelineError::Spawn { .. }));
    }

    #[test]
    fn read_records_parses_query_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("1.results.json.zst");
        fs::write(
            &path,
            r#"[{"seq":1,"code":200,"latency":100000000},{"seq":2,"code":503,"latency":200000000}]"#,
        )
        .expect("write fixture");

        let toolchain = Toolchain {
            decompress: vec!["cat".to_string()],
            query: vec!["cat".to_string()],
        };
        let records = toolchain.read_records(&path).expect("records parse");

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].code, 503);
        assert_eq!(records[0].latency, 1e8);
    }
}
