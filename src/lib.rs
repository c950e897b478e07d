//! # any2pdf
//!
//! Convert arbitrary user-supplied files to PDF through a multi-backend
//! dispatch engine, plus the two-step chat-session workflow that drives it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Session   await file → await name (explicit job map, RAII cleanup)
//!  ├─ 2. Classify  extension → PassThrough / Image / Text / OfficeSuite
//!  ├─ 3. Backend   copy | printpdf image page | printpdf text layout |
//!  │               headless soffice child under a timeout
//!  ├─ 4. Normalise every backend lands at <workdir>/output.pdf
//!  └─ 5. Deliver   attachment renamed to <sanitised stem>.pdf
//! ```
//!
//! The chat transport itself (receiving messages, downloading uploads,
//! sending replies) is out of scope; it plugs in through the
//! [`session::Transport`] and [`session::FileFetcher`] traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use any2pdf::{convert_to_pdf, Config};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let work_dir = tempfile::tempdir()?;
//!     let pdf = convert_to_pdf(Path::new("report.docx"), work_dir.path(), &config).await?;
//!     std::fs::copy(&pdf, "report.pdf")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `any2pdf` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod locate;
pub mod sanitize;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use classify::{classify, Strategy, IMAGE_EXTS, TEXT_EXTS};
pub use config::{Config, ConfigBuilder, OFFICE_ENGINE_ENV, TOKEN_ENV};
pub use dispatch::{convert_to_pdf, CANONICAL_OUTPUT};
pub use error::ConvertError;
pub use locate::find_office_engine;
pub use sanitize::{sanitize_name, FALLBACK_STEM};
pub use session::{
    Event, FileFetcher, IncomingFile, SessionEngine, SessionId, SessionState, Transport,
};
