//! Document ingestion: turn an attached file into prompt text.
//!
//! The file is uploaded to the router's document-parsing endpoint and the
//! returned plain text is appended to the prompt buffer as a delimited block.
//! A failed upload appends a visible error marker instead, so an attachment
//! never silently disappears.
//!
//! Uploads can run in the background ([`DocumentIngestor::spawn`]); the
//! result is spliced into whatever the buffer holds when it arrives, always
//! at the end, so the operator's typing before and during the upload is kept.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::client::RouterApi;
use crate::error::{ConsoleError, Result};
use crate::trace::TraceSession;

/// Result of one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Attached { file_name: String, text: String },
    Failed { file_name: String, error: ConsoleError },
}

impl IngestOutcome {
    pub fn file_name(&self) -> &str {
        match self {
            Self::Attached { file_name, .. } | Self::Failed { file_name, .. } => file_name,
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Attached { .. })
    }

    /// Text appended to the prompt buffer.
    pub fn block(&self) -> String {
        match self {
            Self::Attached { file_name, text } => {
                format!("\n\n[Attached File: {file_name}]\n{text}\n\n")
            }
            Self::Failed { file_name, error } => {
                format!("\n[Error uploading {file_name}: {error}]")
            }
        }
    }

    /// Append this outcome to the end of the session's prompt.
    pub fn splice_into(&self, session: &mut TraceSession) -> Result<()> {
        session.append_prompt(&self.block())
    }
}

/// Uploads attachments through a [`RouterApi`].
pub struct DocumentIngestor {
    api: Arc<dyn RouterApi>,
}

impl DocumentIngestor {
    pub fn new(api: Arc<dyn RouterApi>) -> Self {
        Self { api }
    }

    /// Upload a file from disk.
    ///
    /// An empty path is a validation error; anything that goes wrong after
    /// that (unreadable file, router failure) becomes a `Failed` outcome.
    pub fn ingest_path(&self, path: &Path) -> Result<IngestOutcome> {
        let file_name = selected_file_name(path)?;
        Ok(match fs::read(path) {
            Ok(bytes) => self.ingest_bytes(&file_name, &bytes),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "could not read attachment");
                IngestOutcome::Failed {
                    file_name,
                    error: ConsoleError::validation(format!("could not read file: {e}")),
                }
            }
        })
    }

    /// Upload already-loaded file contents.
    pub fn ingest_bytes(&self, file_name: &str, bytes: &[u8]) -> IngestOutcome {
        match self.api.parse_document(file_name, bytes) {
            Ok(text) => IngestOutcome::Attached {
                file_name: file_name.to_string(),
                text,
            },
            Err(error) => {
                tracing::warn!(file = file_name, kind = error.kind(), error = %error, "document parsing failed");
                IngestOutcome::Failed {
                    file_name: file_name.to_string(),
                    error,
                }
            }
        }
    }

    /// Upload on a background thread.
    pub fn spawn(&self, path: &Path) -> Result<PendingIngest> {
        let file_name = selected_file_name(path)?;
        let (tx, rx) = mpsc::channel();
        let ingestor = Self {
            api: Arc::clone(&self.api),
        };
        let path = path.to_path_buf();
        let fallback_name = file_name.clone();
        let spawned = thread::Builder::new()
            .name("routescope-ingest".to_string())
            .spawn(move || {
                let outcome = ingestor
                    .ingest_path(&path)
                    .unwrap_or_else(|error| IngestOutcome::Failed {
                        file_name: fallback_name,
                        error,
                    });
                let _ = tx.send(outcome);
            });
        if let Err(e) = spawned {
            return Ok(PendingIngest::ready(IngestOutcome::Failed {
                file_name,
                error: ConsoleError::transport(format!("could not start upload: {e}")),
            }));
        }
        Ok(PendingIngest {
            file_name,
            rx: Some(rx),
            ready: None,
        })
    }
}

/// An upload still in flight.
pub struct PendingIngest {
    file_name: String,
    rx: Option<Receiver<IngestOutcome>>,
    ready: Option<IngestOutcome>,
}

impl PendingIngest {
    fn ready(outcome: IngestOutcome) -> Self {
        Self {
            file_name: outcome.file_name().to_string(),
            rx: None,
            ready: Some(outcome),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The outcome, if the upload has finished. Yields it exactly once.
    pub fn try_take(&mut self) -> Option<IngestOutcome> {
        if let Some(outcome) = self.ready.take() {
            return Some(outcome);
        }
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(outcome) => {
                self.rx = None;
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.rx = None;
                Some(IngestOutcome::Failed {
                    file_name: self.file_name.clone(),
                    error: ConsoleError::transport("upload worker exited without a result"),
                })
            }
        }
    }

    /// Block until the upload finishes.
    pub fn wait(mut self) -> IngestOutcome {
        if let Some(outcome) = self.ready.take() {
            return outcome;
        }
        self.rx
            .take()
            .and_then(|rx| rx.recv().ok())
            .unwrap_or_else(|| IngestOutcome::Failed {
                file_name: self.file_name.clone(),
                error: ConsoleError::transport("upload worker exited without a result"),
            })
    }
}

fn selected_file_name(path: &Path) -> Result<String> {
    if path.as_os_str().is_empty() {
        return Err(ConsoleError::validation("no file selected"));
    }
    Ok(path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::client::wire::{CompletionRequest, CompletionResponse};
    use crate::store::StatsPatch;

    /// Echoes the upload back as upper-case text, or fails.
    struct EchoApi {
        fail: bool,
    }

    impl RouterApi for EchoApi {
        fn fetch_stats(&self) -> Result<StatsPatch> {
            Ok(StatsPatch::default())
        }
        fn complete(&self, _: &CompletionRequest) -> Result<CompletionResponse> {
            Err(ConsoleError::transport("not used"))
        }
        fn parse_document(&self, _: &str, data: &[u8]) -> Result<String> {
            if self.fail {
                Err(ConsoleError::protocol("HTTP 400: Invalid PDF file"))
            } else {
                Ok(String::from_utf8_lossy(data).to_uppercase())
            }
        }
        fn clear_cache(&self) -> Result<()> {
            Ok(())
        }
        fn health(&self) -> Result<()> {
            Ok(())
        }
    }

    fn ingestor(fail: bool) -> DocumentIngestor {
        DocumentIngestor::new(Arc::new(EchoApi { fail }))
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("routescope-ingest-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn attached_block_is_appended_after_typed_text() {
        let mut session = TraceSession::with_prompt("Summarize this:");
        let outcome = ingestor(false).ingest_bytes("notes.txt", b"alpha beta");
        outcome.splice_into(&mut session).unwrap();
        assert_eq!(
            session.prompt(),
            "Summarize this:\n\n[Attached File: notes.txt]\nALPHA BETA\n\n"
        );
    }

    #[test]
    fn failed_upload_leaves_inline_marker() {
        let mut session = TraceSession::with_prompt("Read:");
        let outcome = ingestor(true).ingest_bytes("report.pdf", b"%PDF");
        assert!(!outcome.is_attached());
        outcome.splice_into(&mut session).unwrap();
        assert!(session.prompt().starts_with("Read:\n[Error uploading report.pdf: "));
        assert!(session.prompt().contains("Invalid PDF file"));
        assert!(session.prompt().ends_with(']'));
    }

    #[test]
    fn empty_path_is_no_file_selected() {
        let err = ingestor(false).ingest_path(Path::new("")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "no file selected");
    }

    #[test]
    fn unreadable_file_becomes_failed_outcome() {
        let outcome = ingestor(false)
            .ingest_path(Path::new("/definitely/not/here/missing.txt"))
            .unwrap();
        assert_eq!(outcome.file_name(), "missing.txt");
        assert!(!outcome.is_attached());
    }

    #[test]
    fn background_failure_names_the_bare_file() {
        let outcome = ingestor(false)
            .spawn(Path::new("/definitely/not/here/notes.txt"))
            .unwrap()
            .wait();
        assert_eq!(outcome.file_name(), "notes.txt");
        assert!(outcome.block().starts_with("\n[Error uploading notes.txt: "));
    }

    #[test]
    fn background_upload_splices_at_arrival() {
        let path = temp_file("bg.txt", "body");
        let pending = ingestor(false).spawn(&path).unwrap();
        assert_eq!(pending.file_name(), "bg.txt");

        // The operator keeps typing while the upload runs.
        let mut session = TraceSession::with_prompt("first");
        session.append_prompt(" second").unwrap();

        let outcome = pending.wait();
        outcome.splice_into(&mut session).unwrap();
        assert_eq!(
            session.prompt(),
            "first second\n\n[Attached File: bg.txt]\nBODY\n\n"
        );
    }

    #[test]
    fn two_quick_uploads_each_append_once() {
        let a = temp_file("a.txt", "one");
        let b = temp_file("b.txt", "two");
        let ing = ingestor(false);
        let first = ing.spawn(&a).unwrap();
        let second = ing.spawn(&b).unwrap();

        let mut session = TraceSession::with_prompt("ctx");
        // Whichever lands first goes first; both survive intact.
        second.wait().splice_into(&mut session).unwrap();
        first.wait().splice_into(&mut session).unwrap();
        assert_eq!(
            session.prompt(),
            "ctx\n\n[Attached File: b.txt]\nTWO\n\n\n\n[Attached File: a.txt]\nONE\n\n"
        );
    }

    #[test]
    fn try_take_yields_once() {
        let path = temp_file("once.txt", "x");
        let mut pending = ingestor(false).spawn(&path).unwrap();
        let outcome = loop {
            if let Some(outcome) = pending.try_take() {
                break outcome;
            }
            thread::yield_now();
        };
        assert!(outcome.is_attached());
        assert!(pending.try_take().is_none());
    }
}
