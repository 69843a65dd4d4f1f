//! LaTeX compilation via an external TeX binary.
//!
//! The filled source is written to `{build_dir}/{id}.tex`, the compiler runs
//! with `build_dir` as its working directory, and the resulting `{id}.pdf`
//! is moved to the final output path. Auxiliary files stay in `build_dir`.

use crate::error::FillError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Keep at most this many bytes of compiler output in error messages.
const LOG_TAIL_BYTES: usize = 4000;

/// How to invoke the TeX compiler.
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl LatexCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }

    /// Write `source` as `{build_dir}/{stem}.tex`, compile it, and move the
    /// PDF to `output`. Returns the path of the written `.tex` file.
    pub async fn compile(
        &self,
        source: &str,
        build_dir: &Path,
        stem: &str,
        output: &Path,
    ) -> Result<PathBuf, FillError> {
        tokio::fs::create_dir_all(build_dir)
            .await
            .map_err(|e| FillError::io(build_dir, e))?;
        let tex_name = format!("{stem}.tex");
        let tex_path = build_dir.join(&tex_name);
        tokio::fs::write(&tex_path, source)
            .await
            .map_err(|e| FillError::io(&tex_path, e))?;
        debug!("Wrote LaTeX source to {}", tex_path.display());

        self.run(build_dir, &tex_name).await?;

        let built = build_dir.join(format!("{stem}.pdf"));
        if !tokio::fs::try_exists(&built).await.unwrap_or(false) {
            return Err(FillError::LatexOutputMissing { path: built });
        }
        move_file(&built, output).await?;
        info!("Compiled {} to {}", tex_path.display(), output.display());
        Ok(tex_path)
    }

    async fn run(&self, dir: &Path, tex_name: &str) -> Result<(), FillError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(tex_name)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FillError::LatexCompilerUnavailable {
                program: self.program.clone(),
                source,
            })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| FillError::LatexTimeout {
                    secs: limit.as_secs(),
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| FillError::Internal(format!("waiting for {}: {e}", self.program)))?;

        if output.status.success() {
            return Ok(());
        }

        let log = compiler_log(&output.stderr, &output.stdout);
        error!(
            "{} exited with {:?} on {}:\n{}",
            self.program,
            output.status.code(),
            tex_name,
            log
        );
        Err(FillError::LatexCompileFailed {
            status: output.status.code(),
            log,
        })
    }
}

/// Prefer stderr; TeX engines report most errors on stdout, so fall back to
/// its tail.
fn compiler_log(stderr: &[u8], stdout: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let chosen = if stderr.trim().is_empty() {
        String::from_utf8_lossy(stdout).into_owned()
    } else {
        stderr.into_owned()
    };
    tail(chosen.trim(), LOG_TAIL_BYTES).to_string()
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

async fn move_file(from: &Path, to: &Path) -> Result<(), FillError> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FillError::io(parent, e))?;
    }
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    // Cross-device: copy then remove.
    tokio::fs::copy(from, to)
        .await
        .map_err(|e| FillError::io(to, e))?;
    tokio::fs::remove_file(from)
        .await
        .map_err(|e| FillError::io(from, e))
}
