//! End-to-end tests for the conversion dispatcher and the session workflow.
//!
//! The office engine is exercised through small stub shell scripts standing
//! in for `soffice` (success, localized output naming, non-zero exit, no
//! output, hang). No LibreOffice install is required; the stubs reproduce
//! each behaviour the backend must classify. Stub-based tests are unix-only.

use any2pdf::{
    convert_to_pdf, Config, ConvertError, Event, FileFetcher, IncomingFile, SessionEngine,
    SessionId, SessionState, Transport, CANONICAL_OUTPUT,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(w, h, |x, y| image::Rgb([x as u8, y as u8, 200]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Write an executable stub standing in for the office engine.
///
/// The engine is always invoked as
/// `--headless --nologo --nofirststartwizard --norestore --convert-to pdf
/// <input> --outdir <dir>`, so inside the stub `$7` is the input path and
/// `$9` is the output directory.
#[cfg(unix)]
fn write_stub_engine(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("soffice-stub.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
fn stub_config(engine: &Path, timeout_secs: u64) -> Config {
    Config::builder()
        .office_engine(engine)
        .office_timeout_secs(timeout_secs)
        .build()
        .unwrap()
}

// ── Dispatcher: local backends ───────────────────────────────────────────────

#[tokio::test]
async fn passthrough_output_is_byte_identical() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("already.pdf");
    let payload = b"%PDF-1.7\nnot really parsed, just copied\n%%EOF\n";
    std::fs::write(&input, payload).unwrap();

    let out = convert_to_pdf(&input, work.path(), &Config::default())
        .await
        .unwrap();

    assert_eq!(out, work.path().join(CANONICAL_OUTPUT));
    assert_eq!(std::fs::read(&out).unwrap(), payload);

    // converting again yields the same content
    let out2 = convert_to_pdf(&input, work.path(), &Config::default())
        .await
        .unwrap();
    assert_eq!(std::fs::read(&out2).unwrap(), payload);
}

#[tokio::test]
async fn upload_already_at_the_canonical_path_is_not_truncated() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join(CANONICAL_OUTPUT);
    let payload = b"%PDF-1.7\nuploaded under the canonical name\n%%EOF\n";
    std::fs::write(&input, payload).unwrap();

    let out = convert_to_pdf(&input, work.path(), &Config::default())
        .await
        .unwrap();

    assert_eq!(std::fs::read(&out).unwrap(), payload);
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_to_the_canonical_path_is_not_truncated() {
    let work = tempfile::tempdir().unwrap();
    let target = work.path().join(CANONICAL_OUTPUT);
    let payload = b"%PDF-1.7\nreached through an alias\n%%EOF\n";
    std::fs::write(&target, payload).unwrap();
    let link = work.path().join("alias.pdf");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let out = convert_to_pdf(&link, work.path(), &Config::default())
        .await
        .unwrap();

    assert_eq!(std::fs::read(&out).unwrap(), payload);
}

#[tokio::test]
async fn text_input_lands_at_the_canonical_path() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("notes.txt");
    std::fs::write(&input, "a few lines\nof plain text\n").unwrap();

    let out = convert_to_pdf(&input, work.path(), &Config::default())
        .await
        .unwrap();

    assert_eq!(out, work.path().join(CANONICAL_OUTPUT));
    let bytes = std::fs::read(&out).unwrap();
    assert!(!bytes.is_empty());
    assert_eq!(&bytes[..5], b"%PDF-");
}

#[tokio::test]
async fn image_input_lands_at_the_canonical_path() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("shot.png");
    std::fs::write(&input, png_bytes(80, 60)).unwrap();

    let out = convert_to_pdf(&input, work.path(), &Config::default())
        .await
        .unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[..5], b"%PDF-");
}

#[tokio::test]
async fn undecodable_image_is_classified_unreadable() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("broken.jpg");
    std::fs::write(&input, b"nope").unwrap();

    let err = convert_to_pdf(&input, work.path(), &Config::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::UnreadableInput { .. }), "got {err:?}");
}

// ── Dispatcher: office backend via stub engines ──────────────────────────────

#[tokio::test]
async fn missing_engine_is_engine_not_found_without_spawning() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("slides.docx");
    std::fs::write(&input, b"fake docx").unwrap();

    let config = Config::builder()
        .office_engine("/nonexistent/soffice")
        .build()
        .unwrap();

    let err = convert_to_pdf(&input, work.path(), &config).await.unwrap_err();
    assert!(matches!(err, ConvertError::EngineNotFound), "got {err:?}");
    // nothing ran, so nothing was written
    assert!(!work.path().join(CANONICAL_OUTPUT).exists());
}

#[cfg(unix)]
#[tokio::test]
async fn stub_engine_success_is_normalised_to_canonical_output() {
    let bin = tempfile::tempdir().unwrap();
    let engine = write_stub_engine(
        bin.path(),
        r#"name=$(basename "$7"); stem=${name%.*}
printf '%%PDF-1.4\nstub office output\n' > "$9/$stem.pdf""#,
    );

    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("report.docx");
    std::fs::write(&input, b"fake docx").unwrap();

    let out = convert_to_pdf(&input, work.path(), &stub_config(&engine, 10))
        .await
        .unwrap();

    assert_eq!(out, work.path().join(CANONICAL_OUTPUT));
    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
}

#[cfg(unix)]
#[tokio::test]
async fn stub_engine_with_localized_naming_is_found_by_fallback() {
    let bin = tempfile::tempdir().unwrap();
    let engine = write_stub_engine(
        bin.path(),
        r#"printf '%%PDF-1.4\nrenamed output\n' > "$9/Umbenannt 1.pdf""#,
    );

    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("report.docx");
    std::fs::write(&input, b"fake docx").unwrap();

    let out = convert_to_pdf(&input, work.path(), &stub_config(&engine, 10))
        .await
        .unwrap();
    assert!(std::fs::read(&out).unwrap().starts_with(b"%PDF-1.4"));
}

#[cfg(unix)]
#[tokio::test]
async fn rerun_in_the_same_workdir_ignores_the_stale_canonical_artifact() {
    // Fallback discovery must never pick up output.pdf left by a previous
    // run; each dispatch re-normalises from the engine's own output.
    let bin = tempfile::tempdir().unwrap();
    let engine = write_stub_engine(
        bin.path(),
        r#"printf '%%PDF-1.4\nfresh result\n' > "$9/whatever.pdf""#,
    );

    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("report.docx");
    std::fs::write(&input, b"fake docx").unwrap();
    let config = stub_config(&engine, 10);

    let first = convert_to_pdf(&input, work.path(), &config).await.unwrap();
    let first_bytes = std::fs::read(&first).unwrap();
    let second = convert_to_pdf(&input, work.path(), &config).await.unwrap();
    assert_eq!(std::fs::read(&second).unwrap(), first_bytes);
}

#[cfg(unix)]
#[tokio::test]
async fn nonzero_exit_is_process_failed_with_diagnostics() {
    let bin = tempfile::tempdir().unwrap();
    let engine = write_stub_engine(
        bin.path(),
        r#"echo "source file could not be loaded" >&2; exit 1"#,
    );

    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("report.docx");
    std::fs::write(&input, b"fake docx").unwrap();

    let err = convert_to_pdf(&input, work.path(), &stub_config(&engine, 10))
        .await
        .unwrap_err();
    match err {
        ConvertError::ProcessFailed { code, stderr } => {
            assert_eq!(code, Some(1));
            assert!(stderr.contains("could not be loaded"));
        }
        other => panic!("expected ProcessFailed, got {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn clean_exit_without_output_is_no_output_produced() {
    let bin = tempfile::tempdir().unwrap();
    let engine = write_stub_engine(bin.path(), "exit 0");

    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("report.docx");
    std::fs::write(&input, b"fake docx").unwrap();

    let err = convert_to_pdf(&input, work.path(), &stub_config(&engine, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::NoOutputProduced { .. }), "got {err:?}");
}

#[cfg(unix)]
#[tokio::test]
async fn hung_engine_is_killed_and_reported_as_timeout() {
    // The stub sleeps past the budget and only then tries to drop a marker.
    // If the child were left running, the marker would appear after the
    // timeout; the kill must prevent that.
    let bin = tempfile::tempdir().unwrap();
    let engine = write_stub_engine(bin.path(), r#"sleep 2; touch "$9/late.marker""#);

    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("report.docx");
    std::fs::write(&input, b"fake docx").unwrap();

    let started = std::time::Instant::now();
    let err = convert_to_pdf(&input, work.path(), &stub_config(&engine, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::ConversionTimeout { secs: 1 }), "got {err:?}");
    assert!(started.elapsed().as_secs() < 2, "timeout fired late");

    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
    assert!(
        !work.path().join("late.marker").exists(),
        "stub engine survived the timeout kill"
    );
}

// ── Session workflow ─────────────────────────────────────────────────────────

#[derive(Debug)]
enum Outbound {
    Text(String),
    Document { filename: String, bytes: Vec<u8> },
}

#[derive(Clone, Default)]
struct FakeTransport {
    sent: Arc<Mutex<Vec<(SessionId, Outbound)>>>,
    fail_documents: bool,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_text(&self, session: SessionId, text: &str) -> Result<(), ConvertError> {
        self.sent
            .lock()
            .unwrap()
            .push((session, Outbound::Text(text.to_string())));
        Ok(())
    }

    async fn send_document(
        &self,
        session: SessionId,
        path: &Path,
        filename: &str,
    ) -> Result<(), ConvertError> {
        if self.fail_documents {
            return Err(ConvertError::DeliveryFailed {
                reason: "simulated network failure".into(),
            });
        }
        // read eagerly to prove the artifact exists at delivery time
        let bytes = std::fs::read(path).map_err(|e| ConvertError::DeliveryFailed {
            reason: e.to_string(),
        })?;
        self.sent.lock().unwrap().push((
            session,
            Outbound::Document {
                filename: filename.to_string(),
                bytes,
            },
        ));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakeFetcher {
    files: HashMap<String, Vec<u8>>,
    fetched_to: Arc<Mutex<Vec<PathBuf>>>,
}

#[async_trait]
impl FileFetcher for FakeFetcher {
    async fn fetch(&self, handle: &str, dest: &Path) -> Result<(), ConvertError> {
        let bytes = self
            .files
            .get(handle)
            .ok_or_else(|| ConvertError::DownloadFailed {
                reason: format!("unknown handle {handle}"),
            })?;
        std::fs::write(dest, bytes).map_err(|e| ConvertError::DownloadFailed {
            reason: e.to_string(),
        })?;
        self.fetched_to.lock().unwrap().push(dest.to_path_buf());
        Ok(())
    }
}

struct Harness {
    engine: SessionEngine<FakeTransport, FakeFetcher>,
    sent: Arc<Mutex<Vec<(SessionId, Outbound)>>>,
    fetched_to: Arc<Mutex<Vec<PathBuf>>>,
}

impl Harness {
    fn new(config: Config, files: &[(&str, Vec<u8>)], fail_documents: bool) -> Self {
        let transport = FakeTransport {
            fail_documents,
            ..FakeTransport::default()
        };
        let fetcher = FakeFetcher {
            files: files
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            ..FakeFetcher::default()
        };
        let sent = Arc::clone(&transport.sent);
        let fetched_to = Arc::clone(&fetcher.fetched_to);
        Harness {
            engine: SessionEngine::new(config, transport, fetcher),
            sent,
            fetched_to,
        }
    }

    fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, o)| match o {
                Outbound::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    fn last_workdir(&self) -> PathBuf {
        self.fetched_to
            .lock()
            .unwrap()
            .last()
            .expect("nothing fetched")
            .parent()
            .unwrap()
            .to_path_buf()
    }
}

const CHAT: SessionId = 42;

fn txt_upload(handle: &str) -> Event {
    Event::File(IncomingFile {
        name_hint: "My Notes.txt".into(),
        size: 128,
        handle: handle.into(),
    })
}

#[tokio::test]
async fn full_flow_delivers_a_renamed_pdf_and_cleans_up() {
    let h = Harness::new(
        Config::default(),
        &[("f1", b"hello from the upload\n".to_vec())],
        false,
    );

    h.engine.handle_event(CHAT, txt_upload("f1")).await;
    assert_eq!(h.engine.state_of(CHAT), SessionState::AwaitingName);
    assert!(
        h.texts().iter().any(|t| t.contains("My Notes")),
        "suggestion should echo the sanitised original stem"
    );
    let workdir = h.last_workdir();
    assert!(workdir.exists());

    h.engine
        .handle_event(CHAT, Event::Text("Trip Report.pdf".into()))
        .await;

    assert_eq!(h.engine.state_of(CHAT), SessionState::AwaitingFile);
    assert!(!workdir.exists(), "workspace must be removed after delivery");

    let sent = h.sent.lock().unwrap();
    let doc = sent
        .iter()
        .find_map(|(_, o)| match o {
            Outbound::Document { filename, bytes } => Some((filename.clone(), bytes.clone())),
            _ => None,
        })
        .expect("a document should have been delivered");
    assert_eq!(doc.0, "Trip Report.pdf");
    assert_eq!(&doc.1[..5], b"%PDF-");
}

#[tokio::test]
async fn oversized_upload_is_rejected_before_any_download() {
    let h = Harness::new(Config::default(), &[("f1", vec![0u8; 16])], false);

    h.engine
        .handle_event(
            CHAT,
            Event::File(IncomingFile {
                name_hint: "big.bin".into(),
                size: 21 * 1024 * 1024,
                handle: "f1".into(),
            }),
        )
        .await;

    assert_eq!(h.engine.state_of(CHAT), SessionState::AwaitingFile);
    assert!(h.fetched_to.lock().unwrap().is_empty(), "must not fetch");
    assert!(h.texts().iter().any(|t| t.contains("too big")));
}

#[tokio::test]
async fn chatter_before_an_upload_prompts_for_a_file() {
    let h = Harness::new(Config::default(), &[], false);

    h.engine.handle_event(CHAT, Event::Text("hi there".into())).await;

    assert_eq!(h.engine.state_of(CHAT), SessionState::AwaitingFile);
    assert!(h.texts().iter().any(|t| t.contains("send a document or a photo")));
}

#[tokio::test]
async fn cancel_discards_the_pending_job_and_its_workspace() {
    let h = Harness::new(Config::default(), &[("f1", b"data".to_vec())], false);

    h.engine.handle_event(CHAT, txt_upload("f1")).await;
    let workdir = h.last_workdir();
    assert!(workdir.exists());

    h.engine.handle_event(CHAT, Event::Cancel).await;

    assert_eq!(h.engine.state_of(CHAT), SessionState::AwaitingFile);
    assert!(!workdir.exists());
    assert!(h.texts().iter().any(|t| t.contains("Cancelled")));
}

#[tokio::test]
async fn missing_workspace_at_the_name_step_reports_context_loss() {
    let h = Harness::new(Config::default(), &[("f1", b"data".to_vec())], false);

    h.engine.handle_event(CHAT, txt_upload("f1")).await;
    let input = h.fetched_to.lock().unwrap().last().unwrap().clone();
    std::fs::remove_file(&input).unwrap();

    h.engine.handle_event(CHAT, Event::Text("name".into())).await;

    assert_eq!(h.engine.state_of(CHAT), SessionState::AwaitingFile);
    assert!(h.texts().iter().any(|t| t.contains("lost the file context")));
}

#[tokio::test]
async fn conversion_failure_still_reaches_terminal_and_cleans_up() {
    let config = Config::builder()
        .office_engine("/nonexistent/soffice")
        .build()
        .unwrap();
    let h = Harness::new(config, &[("f1", b"fake docx".to_vec())], false);

    h.engine
        .handle_event(
            CHAT,
            Event::File(IncomingFile {
                name_hint: "slides.docx".into(),
                size: 9,
                handle: "f1".into(),
            }),
        )
        .await;
    let workdir = h.last_workdir();

    h.engine.handle_event(CHAT, Event::Text("slides".into())).await;

    assert_eq!(h.engine.state_of(CHAT), SessionState::AwaitingFile);
    assert!(!workdir.exists(), "failed jobs must not leak their workspace");
    assert!(h.texts().iter().any(|t| t.contains("LibreOffice")));
}

#[tokio::test]
async fn delivery_failure_after_conversion_still_cleans_up() {
    let h = Harness::new(
        Config::default(),
        &[("f1", b"text to convert\n".to_vec())],
        true,
    );

    h.engine.handle_event(CHAT, txt_upload("f1")).await;
    let workdir = h.last_workdir();

    h.engine.handle_event(CHAT, Event::Text("report".into())).await;

    assert_eq!(h.engine.state_of(CHAT), SessionState::AwaitingFile);
    assert!(!workdir.exists());
    assert!(h.texts().iter().any(|t| t.contains("couldn't send it back")));
}

#[tokio::test]
async fn failed_download_leaves_the_session_awaiting_a_file() {
    let h = Harness::new(Config::default(), &[], false);

    h.engine.handle_event(CHAT, txt_upload("unknown-handle")).await;

    assert_eq!(h.engine.state_of(CHAT), SessionState::AwaitingFile);
    assert!(h.texts().iter().any(|t| t.contains("couldn't download")));
}

#[tokio::test]
async fn a_second_upload_replaces_the_pending_job() {
    let h = Harness::new(
        Config::default(),
        &[("f1", b"first".to_vec()), ("f2", b"second".to_vec())],
        false,
    );

    h.engine.handle_event(CHAT, txt_upload("f1")).await;
    let first_workdir = h.last_workdir();

    h.engine.handle_event(CHAT, txt_upload("f2")).await;
    let second_workdir = h.last_workdir();

    assert_ne!(first_workdir, second_workdir);
    assert!(!first_workdir.exists(), "replaced job must be reclaimed");
    assert!(second_workdir.exists());
    assert_eq!(h.engine.state_of(CHAT), SessionState::AwaitingName);
}

#[tokio::test]
async fn sessions_are_isolated_from_each_other() {
    let h = Harness::new(
        Config::default(),
        &[("f1", b"alpha".to_vec()), ("f2", b"beta".to_vec())],
        false,
    );

    h.engine.handle_event(1, txt_upload("f1")).await;
    h.engine.handle_event(2, txt_upload("f2")).await;
    assert_eq!(h.engine.state_of(1), SessionState::AwaitingName);
    assert_eq!(h.engine.state_of(2), SessionState::AwaitingName);

    h.engine.handle_event(1, Event::Cancel).await;
    assert_eq!(h.engine.state_of(1), SessionState::AwaitingFile);
    assert_eq!(h.engine.state_of(2), SessionState::AwaitingName, "cancel must not cross sessions");
}
