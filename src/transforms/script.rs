// src/transforms/script.rs

//! Script stages: transpile through an external command, minify in-process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use minify_js::{Session, TopLevelMode, minify};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Handle;
use tracing::debug;

use crate::pipeline::{Artifact, Transform, TransformError};

/// Pipe the source through a shell command (stdin -> stdout).
///
/// Without a command the source passes through unchanged. The command runs
/// in the project root, so `npx`-style tools find the project's
/// `node_modules`. The source path is exported as `ASSETFLOW_SOURCE` for
/// tools that want a filename.
#[derive(Debug, Clone)]
pub struct Transpile {
    command: Option<String>,
    root: PathBuf,
}

impl Transpile {
    pub fn new(command: Option<&str>, root: impl Into<PathBuf>) -> Self {
        Self {
            command: command.map(str::to_owned),
            root: root.into(),
        }
    }

    fn shell(cmd: &str) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(cmd);
            c
        }
    }

    async fn run(&self, cmd: &str, source: &Path, input: Vec<u8>) -> Result<Vec<u8>, TransformError> {
        let mut child = Self::shell(cmd)
            .current_dir(&self.root)
            .env("ASSETFLOW_SOURCE", source)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransformError::tool(format!("failed to spawn `{cmd}`: {e}")))?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&input).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };
        // Write and drain together so a chatty child cannot stall on a full
        // stdout pipe.
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output =
            output.map_err(|e| TransformError::tool(format!("waiting for `{cmd}`: {e}")))?;
        match fed {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Err(e) => return Err(TransformError::tool(format!("writing to `{cmd}`: {e}"))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransformError::tool(format!(
                "`{cmd}` exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl Transform for Transpile {
    fn name(&self) -> &'static str {
        "transpile"
    }

    /// Stages run on the blocking pool, so the child process is driven on
    /// the surrounding runtime through its handle.
    fn apply(&self, mut artifact: Artifact) -> Result<Artifact, TransformError> {
        let Some(cmd) = &self.command else {
            return Ok(artifact);
        };
        debug!(cmd = %cmd, cwd = ?self.root, file = ?artifact.source, "spawning transpiler");

        let handle = Handle::try_current()
            .map_err(|e| TransformError::tool(format!("no async runtime for `{cmd}`: {e}")))?;
        let input = std::mem::take(&mut artifact.contents);
        artifact.contents = handle.block_on(self.run(cmd, &artifact.source, input))?;
        Ok(artifact)
    }
}

/// In-process JavaScript minification via `minify-js`.
#[derive(Debug, Clone, Default)]
pub struct MinifyJs;

impl Transform for MinifyJs {
    fn name(&self) -> &'static str {
        "uglify"
    }

    fn apply(&self, mut artifact: Artifact) -> Result<Artifact, TransformError> {
        let session = Session::new();
        let mut out = Vec::with_capacity(artifact.contents.len());
        minify(&session, TopLevelMode::Global, &artifact.contents, &mut out)
            .map_err(|e| TransformError::syntax(format!("{e:?}")))?;
        artifact.contents = out;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorKind;

    fn js(src: &str) -> Artifact {
        Artifact::new("src/assets/js/main.js", "main.js", src.as_bytes().to_vec())
    }

    /// Run the stage the way a task does: on the blocking pool.
    async fn transpile(stage: Transpile, artifact: Artifact) -> Result<Artifact, TransformError> {
        tokio::task::spawn_blocking(move || stage.apply(artifact))
            .await
            .unwrap()
    }

    #[test]
    fn no_command_passes_through() {
        let out = Transpile::new(None, ".").apply(js("const a = 1;")).unwrap();
        assert_eq!(out.contents, b"const a = 1;");
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn pipes_source_through_the_command() {
        let out = transpile(Transpile::new(Some("tr a-z A-Z"), "."), js("let x;"))
            .await
            .unwrap();
        assert_eq!(out.contents, b"LET X;");
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn command_runs_in_the_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let out = transpile(Transpile::new(Some("cat >/dev/null; pwd -P"), &root), js("x"))
            .await
            .unwrap();
        let printed = String::from_utf8(out.contents).unwrap();
        assert_eq!(PathBuf::from(printed.trim()), root);
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn non_zero_exit_is_a_tool_failure() {
        let err = transpile(Transpile::new(Some("echo nope >&2; exit 3"), "."), js("let x;"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Tool);
        assert!(err.message.contains("nope"), "{}", err.message);
    }

    #[test]
    fn command_without_a_runtime_is_a_tool_failure() {
        let err = Transpile::new(Some("cat"), ".").apply(js("x")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Tool);
    }

    #[test]
    fn minifies_and_shrinks() {
        let src = "function add(first, second) {\n    return first + second;\n}\nconsole.log( add(1, 2) );\n";
        let out = MinifyJs.apply(js(src)).unwrap();
        assert!(!out.contents.is_empty());
        assert!(out.contents.len() < src.len());
        assert!(String::from_utf8(out.contents).unwrap().contains("console.log"));
    }

    #[test]
    fn minifier_syntax_error_is_reported() {
        let err = MinifyJs.apply(js("let = = ;")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }
}
