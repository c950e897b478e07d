//! Two-step conversion sessions: await a file, then await a name.
//!
//! One [`SessionEngine`] serves all users. Each in-flight conversion is an
//! explicit [`Job`] record keyed by session id in a process-wide map — never
//! ambient per-user state. A session with no job is in `AwaitingFile`; a
//! session with a job is in `AwaitingName`; removing the job is the terminal
//! transition.
//!
//! ## Cleanup guarantee
//!
//! The job owns its workspace as a [`TempDir`], so the directory and
//! everything in it is removed when the job leaves the map — on success, on
//! every failure kind, on cancel, and even if delivery fails after the
//! artifact was produced. No exit path leaks a directory.
//!
//! ## Concurrency
//!
//! One event per inbound message; events for different sessions may run
//! concurrently, each against its own workspace. The jobs lock is never held
//! across an `.await`, so a slow office conversion for one user cannot block
//! another user's events.

use crate::config::Config;
use crate::dispatch;
use crate::error::ConvertError;
use crate::sanitize::sanitize_name;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Identifies one chat conversation at the transport boundary.
pub type SessionId = i64;

/// Outbound side of the chat transport. Implemented by the bot wiring;
/// tests use a recording fake.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a plain text reply.
    async fn send_text(&self, session: SessionId, text: &str) -> Result<(), ConvertError>;

    /// Send the file at `path` as an attachment named `filename`.
    async fn send_document(
        &self,
        session: SessionId,
        path: &Path,
        filename: &str,
    ) -> Result<(), ConvertError>;
}

/// Fetches the raw bytes of an upload from the transport, given the handle
/// carried by the "file delivered" event.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Download the upload identified by `handle` to `dest`.
    async fn fetch(&self, handle: &str, dest: &Path) -> Result<(), ConvertError>;
}

/// A "file delivered" event from the transport.
///
/// For photo messages the transport supplies the fixed hint `photo.jpg`,
/// since photos carry no filename of their own.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Original filename as declared by the sender. Untrusted.
    pub name_hint: String,
    /// Declared size in bytes, checked against the ceiling before download.
    pub size: u64,
    /// Opaque retrieval handle understood by the [`FileFetcher`].
    pub handle: String,
}

/// One inbound message, already decoded by the transport wiring.
#[derive(Debug, Clone)]
pub enum Event {
    File(IncomingFile),
    Text(String),
    Cancel,
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingFile,
    AwaitingName,
}

/// One user's in-flight conversion: the uploaded file inside its
/// exclusively-owned workspace. Dropping the job removes the workspace.
struct Job {
    work_dir: TempDir,
    input_path: PathBuf,
}

/// The session state machine, shared across all users.
pub struct SessionEngine<T, F> {
    config: Config,
    transport: T,
    fetcher: F,
    jobs: Mutex<HashMap<SessionId, Job>>,
}

impl<T: Transport, F: FileFetcher> SessionEngine<T, F> {
    pub fn new(config: Config, transport: T, fetcher: F) -> Self {
        Self {
            config,
            transport,
            fetcher,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Current state of a session.
    pub fn state_of(&self, session: SessionId) -> SessionState {
        if self.jobs.lock().unwrap().contains_key(&session) {
            SessionState::AwaitingName
        } else {
            SessionState::AwaitingFile
        }
    }

    /// Process one inbound event for `session`.
    ///
    /// Never returns an error: every failure kind is mapped to a
    /// human-readable reply, and reply failures are logged rather than
    /// propagated (there is nobody left to tell).
    pub async fn handle_event(&self, session: SessionId, event: Event) {
        match event {
            Event::File(file) => self.on_file(session, file).await,
            Event::Text(text) => self.on_text(session, text).await,
            Event::Cancel => self.on_cancel(session).await,
        }
    }

    /// `AwaitingFile` (or a replacement upload in `AwaitingName`):
    /// check the size ceiling, create the workspace, fetch the bytes,
    /// and ask for the output name.
    async fn on_file(&self, session: SessionId, file: IncomingFile) {
        if file.size > self.config.max_input_bytes {
            let err = ConvertError::OversizedInput {
                size: file.size,
                limit: self.config.max_input_bytes,
            };
            debug!("session {session}: rejected oversized upload ({} bytes)", file.size);
            self.reply(session, &err.user_message()).await;
            return;
        }

        let work_dir = match tempfile::Builder::new().prefix("any2pdf_").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!("session {session}: workspace creation failed: {e}");
                self.reply(session, &ConvertError::Internal(e.to_string()).user_message())
                    .await;
                return;
            }
        };

        // keep only the final component of the untrusted name so it cannot
        // escape the workspace
        let base_name = Path::new(&file.name_hint)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let input_path = work_dir.path().join(&base_name);

        if let Err(e) = self.fetcher.fetch(&file.handle, &input_path).await {
            // workspace dropped here; the session stays in AwaitingFile
            warn!("session {session}: download failed: {e}");
            self.reply(session, &e.user_message()).await;
            return;
        }

        let suggested = sanitize_name(
            Path::new(&base_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
                .as_str(),
            self.config.max_name_len,
        );

        let previous = self
            .jobs
            .lock()
            .unwrap()
            .insert(session, Job { work_dir, input_path });
        if previous.is_some() {
            // a second upload replaces the pending job; the old workspace
            // is reclaimed when `previous` drops
            info!("session {session}: replaced pending job with a new upload");
        }

        self.reply(
            session,
            &format!(
                "Got it. Now send the PDF filename you want (without .pdf).\n\
                 Example: {suggested}"
            ),
        )
        .await;
    }

    /// `AwaitingName`: sanitise the name, convert, deliver, and finish the
    /// job — terminal on success and on every failure kind alike.
    async fn on_text(&self, session: SessionId, text: String) {
        // take the job out in its own statement so the guard drops before
        // any await below
        let job = self.jobs.lock().unwrap().remove(&session);
        let Some(job) = job else {
            // no job: the session is in AwaitingFile and this is just chatter
            self.reply(session, "Please send a document or a photo to convert.")
                .await;
            return;
        };

        // the workspace can vanish between the two steps (process restart,
        // tmp reaper); report context loss instead of attempting conversion
        if !job.input_path.is_file() {
            warn!("session {session}: context lost, input missing");
            self.reply(session, &ConvertError::ContextLost.user_message())
                .await;
            return;
        }

        let stem = sanitize_name(&text, self.config.max_name_len);
        self.reply(session, "Converting…").await;

        match dispatch::convert_to_pdf(&job.input_path, job.work_dir.path(), &self.config).await {
            Ok(pdf_path) => {
                let filename = format!("{stem}.pdf");
                match self
                    .transport
                    .send_document(session, &pdf_path, &filename)
                    .await
                {
                    Ok(()) => {
                        info!("session {session}: delivered {filename}");
                        self.reply(session, "Done. Send another file anytime.").await;
                    }
                    Err(e) => {
                        let err = ConvertError::DeliveryFailed {
                            reason: e.to_string(),
                        };
                        warn!("session {session}: {err}");
                        self.reply(session, &err.user_message()).await;
                    }
                }
            }
            Err(e) => {
                warn!("session {session}: conversion failed: {e}");
                self.reply(session, &e.user_message()).await;
            }
        }
        // `job` drops here: the workspace is removed on every path above
    }

    /// `Cancel` from either state: discard any pending job and acknowledge.
    async fn on_cancel(&self, session: SessionId) {
        let discarded = self.jobs.lock().unwrap().remove(&session);
        if discarded.is_some() {
            info!("session {session}: cancelled, workspace discarded");
        }
        self.reply(session, "Cancelled. Send a file whenever you're ready.")
            .await;
    }

    async fn reply(&self, session: SessionId, text: &str) {
        if let Err(e) = self.transport.send_text(session, text).await {
            warn!("session {session}: reply failed: {e}");
        }
    }
}
