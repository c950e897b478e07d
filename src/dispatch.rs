//! Conversion dispatch: one entry point, one canonical artifact location.
//!
//! [`convert_to_pdf`] classifies the input by extension, invokes the matching
//! backend, and normalises whatever the backend produced to
//! `<work_dir>/output.pdf`. Callers never learn which backend ran; they get
//! either the canonical path (guaranteed to exist and be non-empty) or the
//! backend's own error kind, propagated unchanged.
//!
//! CPU-bound backends (image, text) run on the blocking pool so a large
//! render never stalls other jobs' events; the office backend awaits its
//! child process under the configured timeout.

use crate::backend;
use crate::classify::{classify, Strategy};
use crate::config::Config;
use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fixed relative name of the normalised artifact inside a job workspace.
pub const CANONICAL_OUTPUT: &str = "output.pdf";

/// Convert `input` to a PDF at the canonical location inside `work_dir`.
///
/// Single attempt, no retries. On success the returned path exists and is
/// non-empty; on failure the backend's error kind is returned as-is.
pub async fn convert_to_pdf(
    input: &Path,
    work_dir: &Path,
    config: &Config,
) -> Result<PathBuf, ConvertError> {
    let ext = extension_of(input);
    let strategy = classify(&ext);
    let canonical = work_dir.join(CANONICAL_OUTPUT);
    debug!("dispatch: ext {ext:?} -> {strategy:?}");

    match strategy {
        Strategy::PassThrough => {
            // an upload already at the canonical location (under whatever
            // spelling or symlink) must not be copied onto itself — fs::copy
            // would truncate it
            if !is_same_file(input, &canonical) {
                std::fs::copy(input, &canonical).map_err(|e| ConvertError::Io {
                    path: canonical.clone(),
                    source: e,
                })?;
            }
        }
        Strategy::Image => {
            let (input, out) = (input.to_path_buf(), canonical.clone());
            run_blocking(move || backend::image::render(&input, &out)).await?;
        }
        Strategy::Text => {
            let (input, out) = (input.to_path_buf(), canonical.clone());
            run_blocking(move || backend::text::render(&input, &out)).await?;
        }
        Strategy::OfficeSuite => {
            let produced = backend::office::convert(input, work_dir, config).await?;
            if produced != canonical {
                std::fs::copy(&produced, &canonical).map_err(|e| ConvertError::Io {
                    path: canonical.clone(),
                    source: e,
                })?;
            }
        }
    }

    // normalisation contract: the canonical artifact exists and is non-empty
    let len = std::fs::metadata(&canonical).map(|m| m.len()).unwrap_or(0);
    if len == 0 {
        return Err(ConvertError::NoOutputProduced {
            dir: work_dir.to_path_buf(),
        });
    }

    info!("converted {} -> {} ({} bytes)", input.display(), canonical.display(), len);
    Ok(canonical)
}

/// Run a CPU-bound render off the async executor.
async fn run_blocking<F>(f: F) -> Result<(), ConvertError>
where
    F: FnOnce() -> Result<(), ConvertError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConvertError::Internal(format!("render task failed: {e}")))?
}

/// Whether `a` and `b` resolve to the same existing file, seeing through
/// symlinks and path spelling differences. A file missing on either side
/// cannot be the same file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Lower-cased extension of `path`, with its leading dot (`".docx"`),
/// or the empty string when there is none.
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
