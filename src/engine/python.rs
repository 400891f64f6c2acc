use super::{Engine, types::*};
use crate::{config::Config, util::expand_tilde};
use anyhow::{Context, Result, anyhow, bail};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const RUNNER_SCRIPT: &str = "docling_extract.py";

/// Runs Docling through `scripts/docling_extract.py`, one process per call.
pub struct PythonEngine {
    cfg: Config,
    runner: PathBuf,
    python_exe: PathBuf,
}

impl PythonEngine {
    pub fn new(cfg: &Config) -> Result<Self> {
        let scripts_dir = PathBuf::from(&cfg.paths.scripts_dir);
        if cfg.security.pin_scripts_dir {
            let cwd = std::env::current_dir().with_context(|| "current_dir")?;
            let canon = scripts_dir
                .canonicalize()
                .with_context(|| format!("canonicalize scripts_dir: {}", scripts_dir.display()))?;
            if !canon.starts_with(&cwd) {
                bail!(
                    "scripts_dir is outside cwd while pin_scripts_dir=true: {}",
                    canon.display()
                );
            }
        }
        let runner = scripts_dir.join(RUNNER_SCRIPT);
        if !runner.exists() {
            bail!("missing script: {}", runner.display());
        }
        let python_exe = resolve_python_exe(&cfg.docling.python_exe);
        debug!("docling runner {} via {}", runner.display(), python_exe.display());
        Ok(Self {
            cfg: cfg.clone(),
            runner,
            python_exe,
        })
    }

    fn run_json<I: serde::Serialize, O: for<'de> serde::Deserialize<'de>>(
        &self,
        input: &I,
        timeout: Option<Duration>,
    ) -> Result<O> {
        let script = &self.runner;
        debug!("python run {} timeout={:?}", script.display(), timeout);

        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(script);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &self.cfg.docling.env {
            cmd.env(k, v);
        }
        if !self.cfg.paths.docling_artifacts_dir.is_empty() {
            cmd.env(
                "DOCLING_ARTIFACTS_PATH",
                expand_tilde(&self.cfg.paths.docling_artifacts_dir),
            );
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", self.python_exe.display()))?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
            let bytes = serde_json::to_vec(input)?;
            stdin
                .write_all(&bytes)
                .with_context(|| "writing runner request")?;
        }

        let output = wait_with_timeout(&mut child, timeout)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "docling runner failed ({}): {}",
                output.status,
                stderr.trim()
            );
        }

        if self.cfg.debug.keep_python_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("python stderr: {}", stderr.trim());
        }

        serde_json::from_slice(&output.stdout).with_context(|| "parsing runner JSON output")
    }
}

impl Engine for PythonEngine {
    fn doctor(&self) -> Result<DocDiag> {
        self.run_json(
            &serde_json::json!({"cmd": "doctor"}),
            seconds(self.cfg.docling.doctor_timeout_seconds),
        )
    }

    fn extract(&self, req: &ExtractIn) -> Result<ExtractOut> {
        let out: ExtractOut = self.run_json(
            &serde_json::json!({"cmd": "extract", "req": req}),
            seconds(self.cfg.docling.timeout_seconds),
        )?;
        if !out.ok {
            bail!(
                "docling conversion failed: {}",
                out.error.as_deref().unwrap_or("no error message")
            );
        }
        for w in &out.warnings {
            warn!("docling: {w}");
        }
        Ok(out)
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// `auto` (or empty) tries `$DOCLING_PYTHON`, then `python3` on PATH.
pub fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("DOCLING_PYTHON") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
        }
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn drain<R: Read + Send + 'static>(reader: Option<R>, name: &'static str) -> JoinHandle<Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = reader {
            r.read_to_end(&mut buf)
                .with_context(|| format!("read {name}"))?;
        }
        Ok(buf)
    })
}

fn join(handle: JoinHandle<Result<Vec<u8>>>) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| anyhow!("pipe reader thread panicked"))?
}

fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> Result<Output> {
    // Both pipes drain on their own threads; docling logs heavily to stderr
    // and a full pipe would stall the child.
    let stdout = drain(child.stdout.take(), "stdout");
    let stderr = drain(child.stderr.take(), "stderr");

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            return Ok(Output {
                status,
                stdout: join(stdout)?,
                stderr: join(stderr)?,
            });
        }

        if let Some(limit) = timeout {
            if start.elapsed() > limit {
                warn!("docling runner timed out after {:?}", limit);
                let _ = child.kill();
                child.wait().with_context(|| "wait after kill")?;
                let _ = join(stdout);
                let stderr = join(stderr).unwrap_or_default();
                bail!(
                    "docling runner exceeded timeout ({:?}); stderr: {}",
                    limit,
                    String::from_utf8_lossy(&stderr).trim()
                );
            }
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}

