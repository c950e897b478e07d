//! Office-suite backend: drive a headless LibreOffice child process.
//!
//! The engine is invoked with `--convert-to pdf` and the output directory
//! pinned to the job workspace. Three failure modes stay distinct for the
//! caller: the engine is not installed at all ([`ConvertError::EngineNotFound`],
//! no process is spawned), the conversion ran past its wall-clock budget
//! ([`ConvertError::ConversionTimeout`], the child is killed), or the engine
//! exited non-zero ([`ConvertError::ProcessFailed`], with captured
//! diagnostics). A clean exit that leaves no PDF behind is itself an error.

use crate::config::Config;
use crate::dispatch::CANONICAL_OUTPUT;
use crate::error::ConvertError;
use crate::locate;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, UNIX_EPOCH};
use tokio::process::Command;
use tracing::{info, warn};

/// Convert `input` by spawning the office engine with `work_dir` as its
/// output directory. Returns the path of the PDF the engine wrote; the
/// dispatcher copies it to the canonical location.
pub async fn convert(
    input: &Path,
    work_dir: &Path,
    config: &Config,
) -> Result<PathBuf, ConvertError> {
    let engine = resolve_engine(config)?;

    info!(
        "office conversion: {} -> {} (engine {}, budget {}s)",
        input.display(),
        work_dir.display(),
        engine.display(),
        config.office_timeout_secs
    );

    let child = Command::new(&engine)
        .args([
            "--headless",
            "--nologo",
            "--nofirststartwizard",
            "--norestore",
            "--convert-to",
            "pdf",
        ])
        .arg(input)
        .arg("--outdir")
        .arg(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // dropping the child on the timeout path must kill it, not leak it
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ConvertError::Io {
            path: engine.clone(),
            source: e,
        })?;

    let budget = Duration::from_secs(config.office_timeout_secs);
    let output = match tokio::time::timeout(budget, child.wait_with_output()).await {
        // timeout drops the wait future and with it the child handle;
        // kill_on_drop terminates the process
        Err(_elapsed) => {
            warn!("office engine exceeded {}s budget, killed", config.office_timeout_secs);
            return Err(ConvertError::ConversionTimeout {
                secs: config.office_timeout_secs,
            });
        }
        Ok(result) => result.map_err(|e| ConvertError::Io {
            path: engine.clone(),
            source: e,
        })?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        // soffice reports most load errors on stdout
        let diagnostics = if stderr.trim().is_empty() { stdout } else { stderr };
        return Err(ConvertError::ProcessFailed {
            code: output.status.code(),
            stderr: diagnostics.trim().to_string(),
        });
    }

    discover_output(input, work_dir)
}

/// Resolve the engine binary: explicit config override first, then discovery.
fn resolve_engine(config: &Config) -> Result<PathBuf, ConvertError> {
    match &config.office_engine {
        Some(path) if path.is_file() => Ok(path.clone()),
        Some(_) => Err(ConvertError::EngineNotFound),
        None => locate::find_office_engine().ok_or(ConvertError::EngineNotFound),
    }
}

/// Find the PDF the engine wrote.
///
/// The engine usually writes `<input stem>.pdf`, but naming varies across
/// versions and locales, so fall back to the most recently modified PDF in
/// the work directory. The canonical output name is excluded so a rerun can
/// never rediscover its own previous artifact.
fn discover_output(input: &Path, work_dir: &Path) -> Result<PathBuf, ConvertError> {
    if let Some(stem) = input.file_stem() {
        let expected = work_dir.join(Path::new(stem).with_extension("pdf"));
        if expected.is_file() {
            return Ok(expected);
        }
        warn!(
            "expected output {} missing, scanning for newest PDF",
            expected.display()
        );
    }

    let entries = std::fs::read_dir(work_dir).map_err(|e| ConvertError::Io {
        path: work_dir.to_path_buf(),
        source: e,
    })?;

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| ConvertError::Io {
            path: work_dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let is_pdf = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !is_pdf || path.file_name() == Some(OsStr::new(CANONICAL_OUTPUT)) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(UNIX_EPOCH);
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| ConvertError::NoOutputProduced {
            dir: work_dir.to_path_buf(),
        })
}
