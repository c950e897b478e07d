//! Error types for the any2pdf library.
//!
//! One enum covers every failure the pipeline can classify. The dispatcher
//! promises to propagate the backend's kind *unchanged* — a timeout stays a
//! timeout, a missing engine stays a missing engine — so the session layer
//! can map each kind to a distinct user-facing message without ever showing
//! a raw low-level error to the user.
//!
//! All kinds are non-fatal to the running process. The only fatal condition
//! is startup configuration ([`ConvertError::MissingToken`] /
//! [`ConvertError::InvalidConfig`]), surfaced before any job exists.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the any2pdf library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// Declared upload size exceeds the transport download ceiling.
    /// Rejected before any download is attempted.
    #[error("input is {size} bytes, exceeding the {limit}-byte limit")]
    OversizedInput { size: u64, limit: u64 },

    /// Fetching the raw bytes from the transport failed.
    #[error("failed to download the file: {reason}")]
    DownloadFailed { reason: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The image or text decoder could not make sense of the input bytes.
    #[error("could not read '{path}': {detail}")]
    UnreadableInput { path: PathBuf, detail: String },

    /// No office conversion engine (soffice/libreoffice) is installed.
    #[error("no office conversion engine found on this host")]
    EngineNotFound,

    /// The office engine ran past the wall-clock budget and was killed.
    #[error("office conversion timed out after {secs}s")]
    ConversionTimeout { secs: u64 },

    /// The office engine exited non-zero. `stderr` carries its diagnostics.
    #[error("office conversion failed (exit code {code:?}): {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    /// The engine exited successfully but left no PDF behind.
    #[error("conversion finished but no PDF was produced in {dir}")]
    NoOutputProduced { dir: PathBuf },

    // ── Session errors ────────────────────────────────────────────────────
    /// The name step arrived but the job's workspace is gone
    /// (e.g. process restart between the two steps).
    #[error("session context lost: the uploaded file is no longer available")]
    ContextLost,

    /// The artifact was produced but sending it back failed.
    #[error("failed to deliver the converted file: {reason}")]
    DeliveryFailed { reason: String },

    // ── Configuration errors (fatal at startup) ───────────────────────────
    /// The required transport token environment variable is unset.
    #[error("environment variable {var} is not set")]
    MissingToken { var: &'static str },

    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Filesystem failure while copying or writing an artifact.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error (e.g. a blocking task was cancelled).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Human-readable message for the chat user.
    ///
    /// Every kind gets its own wording; none of them leak paths, exit codes,
    /// or other internals beyond what helps the user act on the failure.
    pub fn user_message(&self) -> String {
        match self {
            ConvertError::OversizedInput { limit, .. } => format!(
                "That file is too big. The transport can only fetch files up to {} MB — \
                 please send a smaller one.",
                limit / (1024 * 1024)
            ),
            ConvertError::DownloadFailed { reason } => {
                format!("I couldn't download your file: {reason}. Please try sending it again.")
            }
            ConvertError::UnreadableInput { .. } => {
                "I couldn't read that file — it may be corrupt or in an unsupported encoding."
                    .to_string()
            }
            ConvertError::EngineNotFound => {
                "This format needs LibreOffice for conversion, but it isn't installed here."
                    .to_string()
            }
            ConvertError::ConversionTimeout { secs } => format!(
                "Conversion timed out after {secs} seconds. Try a smaller or simpler file."
            ),
            ConvertError::ProcessFailed { stderr, .. } => format!(
                "The office converter rejected this file — it may be an unsupported format.\n\
                 Details: {}",
                stderr.trim()
            ),
            ConvertError::NoOutputProduced { .. } => {
                "The converter finished but produced no PDF. This format is probably unsupported."
                    .to_string()
            }
            ConvertError::ContextLost => {
                "I lost the file context (the upload is no longer available). \
                 Please send the file again."
                    .to_string()
            }
            ConvertError::DeliveryFailed { .. } => {
                "The PDF was created but I couldn't send it back. Please try again.".to_string()
            }
            ConvertError::MissingToken { var } => format!("Startup error: {var} is not set."),
            ConvertError::InvalidConfig(detail) => format!("Configuration error: {detail}."),
            ConvertError::Io { .. } => "A disk error interrupted the conversion.".to_string(),
            ConvertError::Internal(_) => {
                "Something went wrong on my side. Please try again.".to_string()
            }
        }
    }
}
